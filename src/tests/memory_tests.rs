// src/tests/memory_tests.rs

//! tests for `memory.rs`

use std::ffi::CString;
use std::time::{Duration, Instant};

use ::more_asserts::assert_gt;
use ::test_case::test_case;

use crate::backends::memory::{record_level, Attrs, MemoryBackend, MemorySettings};
use crate::backends::{Backend, Capabilities};
use crate::client::{Attributes, Client, Message};
use crate::data::level::Level;
use crate::data::options::{ClientOptions, DescriptorKind};
use crate::data::query::QueryOp;
use crate::debug::helpers::{create_temp_file, ntf_fd};
use crate::tests::common::{new_backend, new_query, new_record, open_client, FACILITY_TEST, SENDER_TEST};

fn get<'a>(
    record: &'a Attrs,
    key: &str,
) -> Option<&'a str> {
    record
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[test]
fn test_memory_stamps_record() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    client.log(None, Level::Error, "stamped").unwrap();
    let records = backend.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    let time: i64 = get(record, "Time").unwrap().parse().unwrap();
    assert_gt!(time, 0);
    let nsec: u32 = get(record, "TimeNanoSec").unwrap().parse().unwrap();
    assert!(nsec < 2_000_000_000);
    assert_eq!(get(record, "Host"), Some("localhost"));
    assert_eq!(get(record, "Sender"), Some(SENDER_TEST));
    assert_eq!(get(record, "Facility"), Some(FACILITY_TEST));
    assert_eq!(get(record, "PID"), Some(std::process::id().to_string().as_str()));
    assert_eq!(get(record, "Level"), Some("3"));
    assert_eq!(get(record, "Message"), Some("stamped"));
    assert_eq!(get(record, "ASLMessageID"), Some("1"));
}

#[test]
fn test_memory_message_ids_increase() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    for _ in 0..3 {
        client.log(None, Level::Error, "m").unwrap();
    }
    let ids: Vec<String> = backend
        .records()
        .iter()
        .map(|record| get(record, "ASLMessageID").unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[test]
fn test_memory_keeps_caller_values() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    let msg = new_record(
        &backend,
        &[("Sender", "custom"), ("Host", "elsewhere"), ("ASLMessageID", "999")],
    );
    client.send(&msg).unwrap();
    let record = &backend.records()[0];
    assert_eq!(get(record, "Sender"), Some("custom"));
    assert_eq!(get(record, "Host"), Some("elsewhere"));
    assert_eq!(get(record, "Level"), Some("5"));
    // always assigned by the sink
    assert_eq!(get(record, "ASLMessageID"), Some("1"));
    // the sent message is not modified
    assert!(msg.get("Level").unwrap_err().is_not_found());
}

#[test]
fn test_memory_settings() {
    let backend = MemoryBackend::with_settings(MemorySettings {
        host: String::from("build-host"),
        default_sender: String::from("fallback"),
        capabilities: Capabilities::ALL,
    });
    let mut client = Client::open(&backend, None, FACILITY_TEST, ClientOptions::NONE).unwrap();
    client.log(None, Level::Error, "m").unwrap();
    let record = &backend.records()[0];
    assert_eq!(get(record, "Host"), Some("build-host"));
    assert_eq!(get(record, "Sender"), Some("fallback"));
    assert_eq!(backend.settings().host, "build-host");
}

#[test]
fn test_memory_settings_default() {
    let settings = MemorySettings::default();
    assert_eq!(settings.host, "localhost");
    assert!(!settings.default_sender.is_empty());
    assert_eq!(settings.capabilities, Capabilities::ALL);
    assert_eq!(new_backend().capabilities(), Capabilities::ALL);
}

#[test]
fn test_memory_clones_share_store() {
    let backend = new_backend();
    let other = backend.clone();
    let mut client = open_client(&other);
    client.log(None, Level::Error, "shared").unwrap();
    assert_eq!(backend.count_records(), 1);
    assert!(!format!("{:?}", backend).is_empty());
}

#[test]
fn test_memory_stderr_option() {
    let backend = new_backend();
    let mut client = Client::open(&backend, Some(SENDER_TEST), FACILITY_TEST, ClientOptions::STDERR).unwrap();
    client.log(None, Level::Error, "echoed to stderr").unwrap();
    assert_eq!(backend.count_records(), 1);
}

#[test_case("3", Level::Error)]
#[test_case("Critical", Level::Critical)]
#[test_case("bogus", Level::Notice)]
fn test_record_level(
    value: &str,
    expect: Level,
) {
    let record: Attrs = vec![(String::from("Level"), value.to_string())];
    assert_eq!(record_level(&record), expect);
    assert_eq!(record_level(&Attrs::new()), Level::Notice);
}

/// Store records at each level with a `Seq` attribute.
fn fill(backend: &MemoryBackend) {
    let mut client = open_client(backend);
    client
        .set_filter(crate::data::level::FilterMask::upto(Level::Debug))
        .unwrap();
    for (i, level) in Level::ALL.iter().enumerate() {
        let mut msg = Message::record(backend).unwrap();
        msg.set("Seq", &i.to_string()).unwrap();
        msg.set("Level", &level.as_i32().to_string()).unwrap();
        msg.set("Message", &format!("{} happened", level)).unwrap();
        client.send(&msg).unwrap();
    }
}

fn count(
    backend: &MemoryBackend,
    predicates: &[(&str, &str, QueryOp)],
) -> usize {
    let client = open_client(backend);
    let mut query = Message::query(backend).unwrap();
    for (key, value, op) in predicates.iter() {
        query.set_query_predicate(key, value, *op).unwrap();
    }
    let response = client.search(&query).unwrap();

    response.iter().count()
}

#[test]
fn test_memory_search_numeric() {
    let backend = new_backend();
    fill(&backend);
    assert_eq!(count(&backend, &[("Level", "3", QueryOp::LESS_EQUAL | QueryOp::NUMERIC)]), 4);
    assert_eq!(count(&backend, &[("Level", "5", QueryOp::GREATER | QueryOp::NUMERIC)]), 2);
}

#[test]
fn test_memory_search_all_predicates_must_match() {
    let backend = new_backend();
    fill(&backend);
    assert_eq!(
        count(
            &backend,
            &[
                ("Level", "3", QueryOp::LESS_EQUAL | QueryOp::NUMERIC),
                ("Message", "Er", QueryOp::EQUAL | QueryOp::PREFIX),
            ]
        ),
        1
    );
    assert_eq!(
        count(
            &backend,
            &[
                ("Message", "happened", QueryOp::EQUAL | QueryOp::SUFFIX),
                ("Missing", "", QueryOp::TRUE),
            ]
        ),
        0
    );
}

#[test]
fn test_memory_search_regex_casefold() {
    let backend = new_backend();
    fill(&backend);
    assert_eq!(
        count(&backend, &[("Message", "^(ERROR|WARNING) ", QueryOp::EQUAL | QueryOp::REGEX | QueryOp::CASEFOLD)]),
        2
    );
}

#[test]
fn test_memory_search_empty_query_matches_all() {
    let backend = new_backend();
    fill(&backend);
    assert_eq!(count(&backend, &[]), Level::ALL.len());
}

#[test]
fn test_memory_search_returns_copies() {
    let backend = new_backend();
    fill(&backend);
    let client = open_client(&backend);
    let query = new_query(&backend, &[("Seq", "0")]);
    let response = client.search(&query).unwrap();
    let record = response.next().unwrap();
    assert_eq!(record.get("Level").unwrap(), "0");
    drop(response);
    assert_eq!(backend.count_records(), Level::ALL.len() as u64);
}

#[test]
fn test_memory_handles_unknown() {
    let backend = new_backend();
    let client = open_client(&backend);
    let msg = Message::record(&backend).unwrap();
    let raw = msg.raw();
    drop(msg);
    assert!(backend.msg_key(raw, 0).is_none());
    let key = CString::new("Level").unwrap();
    let value = CString::new("1").unwrap();
    assert!(backend.msg_get(raw, &key).is_none());
    assert!(backend.msg_set(raw, &key, &value).is_err());
    assert!(backend.msg_unset(raw, &key).is_err());
    drop(client);
}

#[test]
fn test_memory_search_not_query_kind_is_none() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    client.log(None, Level::Error, "m").unwrap();
    let record = new_record(&backend, &[("Message", "m")]);
    let facility = CString::new("test").unwrap();
    let handle = backend.open(None, &facility, ClientOptions::NONE).unwrap();
    assert!(backend.search(handle, record.raw()).is_none());
    backend.close(handle);
}

#[test]
fn test_memory_finished_readers_pruned() {
    let backend = new_backend();
    let mut client = open_client(&backend);
    for _ in 0..8 {
        let ntf = create_temp_file("line\n");
        client
            .log_to_descriptor(None, Level::Error, ntf_fd(&ntf), DescriptorKind::Read)
            .unwrap();
    }
    let deadline = Instant::now() + Duration::from_secs(10);
    while backend.count_records() < 8 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(backend.count_records(), 8);
    // each new reader drops the handles of readers that have finished
    let empty = create_temp_file("");
    loop {
        std::thread::sleep(Duration::from_millis(20));
        client
            .log_to_descriptor(None, Level::Error, ntf_fd(&empty), DescriptorKind::Read)
            .unwrap();
        if backend.count_readers() == 1 || Instant::now() >= deadline {
            break;
        }
    }
    assert_eq!(backend.count_readers(), 1);
    backend.wait_descriptors();
    assert_eq!(backend.count_readers(), 0);
    assert_eq!(backend.count_records(), 8);
}
