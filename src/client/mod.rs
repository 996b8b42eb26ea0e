// src/client/mod.rs

//! The owning wrappers over a [`Backend`]: [`Client`], [`Message`],
//! [`MessageView`] and [`Response`].
//!
//! Each wrapper holds exactly one backend handle and releases it in `Drop`.
//! A [`MessageView`] borrows its [`Response`], so the compiler rejects any
//! use of a yielded record after the response is gone.
//!
//! A typical write path:
//!
//! ```no_run
//! use asl::backends::memory::MemoryBackend;
//! use asl::client::{Client, Message};
//! use asl::data::options::{ClientOptions, MessageKind};
//!
//! let backend = MemoryBackend::new();
//! let mut client = Client::open(&backend, None, "test", ClientOptions::NONE)?;
//! let mut msg = Message::new(&backend, MessageKind::Record)?;
//! msg.set("Sender", "unit-test")?;
//! msg.set("Message", "hello")?;
//! client.send(&msg)?;
//! # Ok::<(), asl::common::AslError>(())
//! ```
//!
//! [`Backend`]: crate::backends::Backend

pub mod auxiliary;
pub mod message;
pub mod response;
pub mod session;

pub use auxiliary::{close_auxiliary_file, create_auxiliary_file, log_auxiliary_location};
pub use message::{Attributes, Message, MessageView};
pub use response::{Response, ResponseIter};
pub use session::Client;
