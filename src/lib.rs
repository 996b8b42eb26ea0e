// src/lib.rs

//! Structured system-log client: messages, queries and responses over the
//! Apple System Log library, with an in-process sink.
//!
//! The platform C API is the [`Backend`] trait. [`NativeBackend`] loads
//! `libsystem_asl` at runtime; [`MemoryBackend`] keeps records in memory
//! and works everywhere. The owning wrappers in [`client`] sit on top of
//! either.
//!
//! ```no_run
//! use asl::backends::memory::MemoryBackend;
//! use asl::client::{Attributes, Client, Message};
//! use asl::data::level::Level;
//! use asl::data::options::ClientOptions;
//! use asl::data::query::QueryOp;
//!
//! let backend = MemoryBackend::new();
//! Client::scoped(&backend, Some("unit-test"), "test", ClientOptions::NONE, |client| {
//!     client.log(None, Level::Error, "disk full")?;
//!
//!     let mut query = Message::query(&backend)?;
//!     query.set_query_predicate("Sender", "unit-test", QueryOp::EQUAL)?;
//!     let response = client.search(&query)?;
//!     for record in response.iter() {
//!         println!("{}", record.get("Message")?);
//!     }
//!     Ok(())
//! })?;
//! # Ok::<(), asl::common::AslError>(())
//! ```
//!
//! [`Backend`]: crate::backends::Backend
//! [`NativeBackend`]: crate::backends::native::NativeBackend
//! [`MemoryBackend`]: crate::backends::memory::MemoryBackend

pub mod backends;
pub mod bindings;
pub mod client;
pub mod common;
pub mod data;
pub mod debug;
pub mod libload;
#[cfg(test)]
pub mod tests;
