// src/tests/client_tests.rs

//! tests for `session.rs`

use std::fs::File;
use std::io::Write;
use std::os::unix::io::{AsRawFd, FromRawFd};

use ::test_case::test_case;

use crate::backends::memory::MemoryBackend;
use crate::backends::Capabilities;
use crate::client::{Attributes, Client, Message};
use crate::common::{AslError, Errno};
use crate::data::level::{FilterMask, Level};
use crate::data::options::{ClientOptions, DescriptorKind};
use crate::debug::helpers::{create_temp_file, ntf_fd, read_temp_file};
use crate::tests::common::{
    new_backend,
    new_query,
    new_record,
    open_client,
    FACILITY_TEST,
    SENDER_TEST,
};

/// `Message` attribute of every stored record, oldest first.
fn stored_texts(backend: &MemoryBackend) -> Vec<String> {
    backend
        .records()
        .iter()
        .filter_map(|record| {
            record
                .iter()
                .find(|(k, _)| k == "Message")
                .map(|(_, v)| v.clone())
        })
        .collect()
}

#[test]
fn test_client_send_then_close() {
    let backend = new_backend();
    let mut client = Client::open(&backend, None, FACILITY_TEST, ClientOptions::NONE).unwrap();
    let msg = new_record(&backend, &[("Sender", SENDER_TEST), ("Message", "hello")]);
    client.send(&msg).unwrap();
    assert_eq!(stored_texts(&backend), vec!["hello"]);
    client.close();
    assert!(client.is_closed());
    assert!(matches!(client.send(&msg), Err(AslError::Closed)));
    assert_eq!(backend.count_records(), 1);
}

#[test]
fn test_client_close_twice() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    assert_eq!(backend.count_clients(), 1);
    client.close();
    client.close();
    assert!(client.is_closed());
    assert_eq!(backend.count_clients(), 0);
}

#[test]
fn test_client_drop_closes() {
    let backend = new_backend();
    {
        let _client = open_client(&backend);
        assert_eq!(backend.count_clients(), 1);
    }
    assert_eq!(backend.count_clients(), 0);
}

#[test]
fn test_client_every_operation_closed() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    let record = new_record(&backend, &[("Message", "m")]);
    let query = new_query(&backend, &[("Message", "m")]);
    client.close();

    assert!(client.add_log_file(2).unwrap_err().is_closed());
    assert!(client.remove_log_file(2).unwrap_err().is_closed());
    assert!(client.set_filter(FilterMask::upto(Level::Debug)).unwrap_err().is_closed());
    assert!(client.send(&record).unwrap_err().is_closed());
    assert!(client.log(None, Level::Error, "m").unwrap_err().is_closed());
    assert!(client
        .log_to_descriptor(None, Level::Error, 0, DescriptorKind::Read)
        .unwrap_err()
        .is_closed());
    assert!(client
        .log_to_descriptor_type(None, Level::Error, 0, 9)
        .unwrap_err()
        .is_closed());
    assert!(client.search(&query).unwrap_err().is_closed());
}

#[test]
fn test_client_set_filter_restore() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    let original = client.set_filter(FilterMask::upto(Level::Debug)).unwrap();
    assert_eq!(original, FilterMask::upto(Level::Notice));
    let prev = client.set_filter(original).unwrap();
    assert_eq!(prev, FilterMask::upto(Level::Debug));
    let prev = client.set_filter(original).unwrap();
    assert_eq!(prev, original);
}

#[test_case(Level::Emergency, true)]
#[test_case(Level::Error, true)]
#[test_case(Level::Notice, true)]
#[test_case(Level::Info, false)]
#[test_case(Level::Debug, false)]
fn test_client_log_default_filter(
    level: Level,
    stored: bool,
) {
    let backend = new_backend();
    let mut client = open_client(&backend);
    client.log(None, level, "text").unwrap();
    assert_eq!(backend.count_records() == 1, stored);
}

#[test]
fn test_client_set_filter_applies() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    client.set_filter(FilterMask::of(Level::Debug)).unwrap();
    client.log(None, Level::Error, "error").unwrap();
    client.log(None, Level::Debug, "debug").unwrap();
    assert_eq!(stored_texts(&backend), vec!["debug"]);
}

#[test]
fn test_client_log_template_untouched() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    let template = new_record(&backend, &[("Color", "blue")]);
    client.log(Some(&template), Level::Warning, "from template").unwrap();
    assert!(template.get("Message").unwrap_err().is_not_found());
    assert!(template.get("Level").unwrap_err().is_not_found());

    let record = &backend.records()[0];
    let get = |key: &str| {
        record
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };
    assert_eq!(get("Color"), Some("blue"));
    assert_eq!(get("Level"), Some("4"));
    assert_eq!(get("Message"), Some("from template"));
    assert_eq!(get("Sender"), Some(SENDER_TEST));
    assert_eq!(get("Facility"), Some(FACILITY_TEST));
}

#[test]
fn test_client_log_nul() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    assert!(matches!(
        client.log(None, Level::Error, "a\0b"),
        Err(AslError::InvalidArgument(_))
    ));
    assert_eq!(backend.count_records(), 0);
}

#[test]
fn test_client_open_nul() {
    let backend = new_backend();
    let result = Client::open(&backend, Some("id\0"), FACILITY_TEST, ClientOptions::NONE);
    assert!(matches!(result, Err(AslError::InvalidArgument(_))));
    assert_eq!(backend.count_clients(), 0);
}

#[test]
fn test_client_search_requires_query() {
    let backend = new_backend();
    let client = open_client(&backend);
    let record = new_record(&backend, &[("Message", "m")]);
    assert!(matches!(client.search(&record), Err(AslError::InvalidArgument(_))));
}

#[test]
fn test_client_search_scenario() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    client.log(None, Level::Error, "one").unwrap();
    let mut query = Message::query(&backend).unwrap();
    query
        .set_query_predicate("Sender", SENDER_TEST, crate::data::query::QueryOp::EQUAL)
        .unwrap();
    let response = client.search(&query).unwrap();
    let mut count: usize = 0;
    while response.next().is_some() {
        count += 1;
    }
    assert_eq!(count, 1);
    assert!(response.next().is_none());
}

#[test]
fn test_client_scoped_closes() {
    let backend = new_backend();
    let n = Client::scoped(&backend, Some(SENDER_TEST), FACILITY_TEST, ClientOptions::NONE, |client| {
        assert_eq!(client.ident(), Some(SENDER_TEST));
        assert_eq!(client.facility(), FACILITY_TEST);
        client.log(None, Level::Error, "inside")?;
        Ok(7)
    })
    .unwrap();
    assert_eq!(n, 7);
    assert_eq!(backend.count_clients(), 0);
    assert_eq!(stored_texts(&backend), vec!["inside"]);
}

#[test]
fn test_client_scoped_error_unchanged() {
    let backend = new_backend();
    let result: Result<(), AslError> =
        Client::scoped(&backend, None, FACILITY_TEST, ClientOptions::NONE, |client| {
            client.log(None, Level::Error, "before")?;
            Err(AslError::NotFound(String::from("sentinel")))
        });
    match result {
        Err(AslError::NotFound(key)) => assert_eq!(key, "sentinel"),
        result => panic!("unexpected {:?}", result),
    }
    assert_eq!(backend.count_clients(), 0);
}

#[test]
fn test_client_add_log_file() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    let ntf = create_temp_file("");
    client.add_log_file(ntf_fd(&ntf)).unwrap();
    client.log(None, Level::Error, "disk full").unwrap();
    // passes the output's own mask, not the client's
    client.log(None, Level::Debug, "detail").unwrap();

    let data = read_temp_file(&ntf);
    let lines: Vec<&str> = data.lines().collect();
    assert_eq!(lines.len(), 2, "{:?}", data);
    assert!(lines[0].contains(" localhost unit-test["), "{:?}", lines[0]);
    assert!(lines[0].ends_with("] <Error>: disk full"), "{:?}", lines[0]);
    assert!(lines[1].ends_with("] <Debug>: detail"), "{:?}", lines[1]);
    assert_eq!(stored_texts(&backend), vec!["disk full"]);
}

#[test]
fn test_client_remove_log_file() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    let ntf = create_temp_file("");
    let fd = ntf_fd(&ntf);
    client.add_log_file(fd).unwrap();
    client.log(None, Level::Error, "one").unwrap();
    client.remove_log_file(fd).unwrap();
    client.log(None, Level::Error, "two").unwrap();
    assert_eq!(read_temp_file(&ntf).lines().count(), 1);
    assert_eq!(stored_texts(&backend), vec!["one", "two"]);
}

#[test]
fn test_client_add_log_file_bad_fd() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    let err = client.add_log_file(-1).unwrap_err();
    assert_eq!(err.errno(), Some(Errno::EBADF));
}

#[test]
fn test_client_remove_log_file_unknown() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    let ntf = create_temp_file("");
    let err = client.remove_log_file(ntf_fd(&ntf)).unwrap_err();
    assert_eq!(err.errno(), Some(Errno::EINVAL));
    let err = client.remove_log_file(-1).unwrap_err();
    assert_eq!(err.errno(), Some(Errno::EBADF));
}

#[test]
fn test_client_log_to_descriptor_read() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    let ntf = create_temp_file("line one\nline two\n\nline three");
    let template = new_record(&backend, &[("Source", "file")]);
    client
        .log_to_descriptor(Some(&template), Level::Error, ntf_fd(&ntf), DescriptorKind::Read)
        .unwrap();
    backend.wait_descriptors();
    assert_eq!(stored_texts(&backend), vec!["line one", "line two", "line three"]);
    for record in backend.records().iter() {
        assert!(record.contains(&(String::from("Source"), String::from("file"))));
        assert!(record.contains(&(String::from("Level"), String::from("3"))));
    }
}

#[test]
fn test_client_log_to_descriptor_read_pipe() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    let mut fds: [::libc::c_int; 2] = [-1; 2];
    assert_eq!(unsafe { ::libc::pipe(fds.as_mut_ptr()) }, 0);
    let (read_end, write_end) = (fds[0], fds[1]);
    let mut writer: File = unsafe { File::from_raw_fd(write_end) };
    writer.write_all(b"first\n").unwrap();
    // returns while the write end is still open
    client
        .log_to_descriptor(None, Level::Error, read_end, DescriptorKind::Read)
        .unwrap();
    // the caller's descriptor stays the caller's
    assert_ne!(unsafe { ::libc::fcntl(read_end, ::libc::F_GETFD) }, -1);
    drop(unsafe { File::from_raw_fd(read_end) });
    writer.write_all(b"second\n").unwrap();
    drop(writer);
    backend.wait_descriptors();
    assert_eq!(stored_texts(&backend), vec!["first", "second"]);
    assert_eq!(backend.count_readers(), 0);
}

#[test]
fn test_client_log_to_descriptor_write() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    let ntf = create_temp_file("");
    let mut file: File = ntf.reopen().unwrap();
    client
        .log_to_descriptor(None, Level::Notice, file.as_raw_fd(), DescriptorKind::Write)
        .unwrap();
    file.write_all(b"alpha\nbeta\n").unwrap();
    drop(file);
    backend.wait_descriptors();
    assert_eq!(stored_texts(&backend), vec!["alpha", "beta"]);
    // the file itself was bypassed
    assert_eq!(read_temp_file(&ntf), "");
}

#[test_case(0)]
#[test_case(3)]
fn test_client_log_to_descriptor_type_invalid(kind: u32) {
    let backend = new_backend();
    let mut client = open_client(&backend);
    let result = client.log_to_descriptor_type(None, Level::Error, 0, kind);
    assert!(matches!(result, Err(AslError::InvalidArgument(_))));
}

#[test]
fn test_client_log_to_descriptor_type_read() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    let ntf = create_temp_file("typed\n");
    client
        .log_to_descriptor_type(None, Level::Error, ntf_fd(&ntf), 1)
        .unwrap();
    backend.wait_descriptors();
    assert_eq!(stored_texts(&backend), vec!["typed"]);
}

#[test]
fn test_client_open_from_descriptor() {
    let backend = new_backend();
    let ntf = create_temp_file("");
    let mut client =
        Client::open_from_descriptor(&backend, ntf_fd(&ntf), Some(SENDER_TEST), FACILITY_TEST).unwrap();
    client.log(None, Level::Debug, "to the file").unwrap();
    let data = read_temp_file(&ntf);
    assert!(data.contains("[Message to the file]"), "{:?}", data);
    assert!(data.contains("[Sender unit-test]"), "{:?}", data);
    assert!(data.contains("[Facility test]"), "{:?}", data);
    assert_eq!(backend.count_records(), 0);
}

#[test]
fn test_client_open_from_descriptor_bad_fd() {
    let backend = new_backend();
    let result = Client::open_from_descriptor(&backend, -1, None, FACILITY_TEST);
    assert_eq!(result.unwrap_err().errno(), Some(Errno::EBADF));
}

#[test]
fn test_client_unsupported() {
    let backend = MemoryBackend::with_capabilities(Capabilities::NONE);
    let ntf = create_temp_file("x\n");
    let fd = ntf_fd(&ntf);
    assert!(matches!(
        Client::open_from_descriptor(&backend, fd, None, FACILITY_TEST),
        Err(AslError::Unsupported(_))
    ));
    let mut client = open_client(&backend);
    assert_eq!(client.capabilities(), Capabilities::NONE);
    assert!(matches!(
        client.log_to_descriptor(None, Level::Error, fd, DescriptorKind::Read),
        Err(AslError::Unsupported(_))
    ));
    // required operations still work
    client.log(None, Level::Error, "still here").unwrap();
    assert_eq!(backend.count_records(), 1);
}
