// src/tests/mod.rs

//! Tests for _asl_.
//!
//! Tests are placed at `src/tests/`, inside the crate, so they can reach
//! crate-internal items. Tests of the public surface only are at top-level
//! path `tests/`.
//!
//! Everything but `libload_tests` runs against the in-process
//! `MemoryBackend` and so runs on every platform.

pub mod client_tests;
pub mod common;
pub mod level_tests;
pub mod memory_tests;
