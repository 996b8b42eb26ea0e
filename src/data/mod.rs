// src/data/mod.rs

//! The `data` module is the plain values shared by clients, messages and
//! backends.
//!
//! ## Definitions of data
//!
//! ### Record
//!
//! A "record" is one log message: an unordered set of attribute name to
//! attribute value pairs, both strings. A record is held by a
//! [`Message`] of kind [`MessageKind::Record`].
//!
//! ### Query
//!
//! A "query" is a [`Message`] of kind [`MessageKind::Query`] where each
//! attribute also carries a [`QueryOp`]. A record matches a query when every
//! [`QueryPredicate`] of the query matches.
//!
//! ### Level
//!
//! Every record has a severity [`Level`]. Clients and output targets pass
//! records by [`FilterMask`].
//!
//! [`Message`]: crate::client::message::Message
//! [`MessageKind::Record`]: crate::data::options::MessageKind::Record
//! [`MessageKind::Query`]: crate::data::options::MessageKind::Query
//! [`QueryOp`]: crate::data::query::QueryOp
//! [`QueryPredicate`]: crate::data::query::QueryPredicate
//! [`Level`]: crate::data::level::Level
//! [`FilterMask`]: crate::data::level::FilterMask

pub mod format;
pub mod keys;
pub mod level;
pub mod options;
pub mod query;
