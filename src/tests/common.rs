// src/tests/common.rs

//! Shared values and constructors for tests.

use crate::backends::memory::MemoryBackend;
use crate::client::{Client, Message};
use crate::data::options::ClientOptions;

pub const FACILITY_TEST: &str = "test";
pub const SENDER_TEST: &str = "unit-test";

pub fn new_backend() -> MemoryBackend {
    MemoryBackend::new()
}

/// Client with ident [`SENDER_TEST`] and facility [`FACILITY_TEST`].
pub fn open_client(backend: &MemoryBackend) -> Client<MemoryBackend> {
    match Client::open(backend, Some(SENDER_TEST), FACILITY_TEST, ClientOptions::NONE) {
        Ok(client) => client,
        Err(err) => panic!("Client::open failed {}", err),
    }
}

/// Record-kind message holding `attrs`.
pub fn new_record(
    backend: &MemoryBackend,
    attrs: &[(&str, &str)],
) -> Message<MemoryBackend> {
    let mut msg = Message::record(backend).unwrap();
    for (key, value) in attrs.iter() {
        msg.set(key, value).unwrap();
    }

    msg
}

/// Query-kind message with one `EQUAL` predicate per pair of `attrs`.
pub fn new_query(
    backend: &MemoryBackend,
    attrs: &[(&str, &str)],
) -> Message<MemoryBackend> {
    let mut msg = Message::query(backend).unwrap();
    for (key, value) in attrs.iter() {
        msg.set_query_predicate(key, value, crate::data::query::QueryOp::EQUAL)
            .unwrap();
    }

    msg
}
