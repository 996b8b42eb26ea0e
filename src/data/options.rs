// src/data/options.rs

//! Small enumerations and bitmasks passed through to the logging library:
//! [`MessageKind`], [`ClientOptions`], [`DescriptorKind`].

use std::fmt;

use crate::bindings::asl_h::{
    ASL_LOG_DESCRIPTOR_READ,
    ASL_LOG_DESCRIPTOR_WRITE,
    ASL_OPT_NO_DELAY,
    ASL_OPT_NO_REMOTE,
    ASL_OPT_STDERR,
    ASL_TYPE_MSG,
    ASL_TYPE_QUERY,
};
use crate::common::{AslError, Result};

/// The two shapes of a message object.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u32)]
pub enum MessageKind {
    /// Carries values to emit.
    Record = ASL_TYPE_MSG,
    /// Carries per-key match predicates.
    Query = ASL_TYPE_QUERY,
}

impl MessageKind {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for MessageKind {
    type Error = AslError;

    fn try_from(value: u32) -> Result<MessageKind> {
        match value {
            ASL_TYPE_MSG => Ok(MessageKind::Record),
            ASL_TYPE_QUERY => Ok(MessageKind::Query),
            _ => Err(AslError::InvalidArgument(format!("invalid message type {}", value))),
        }
    }
}

/// Behavior flags given when a client is opened.
///
/// Only `STDERR` is interpreted by the in-process sink; every bit is
/// forwarded to the native library unchanged.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct ClientOptions(u32);

impl ClientOptions {
    pub const NONE: ClientOptions = ClientOptions(0);
    /// Also echo messages to standard error.
    pub const STDERR: ClientOptions = ClientOptions(ASL_OPT_STDERR);
    /// Connect to the sink immediately.
    pub const NO_DELAY: ClientOptions = ClientOptions(ASL_OPT_NO_DELAY);
    /// Ignore remote filter changes.
    pub const NO_REMOTE: ClientOptions = ClientOptions(ASL_OPT_NO_REMOTE);

    pub const fn from_bits(bits: u32) -> ClientOptions {
        ClientOptions(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(
        self,
        other: ClientOptions,
    ) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ClientOptions {
    type Output = ClientOptions;

    fn bitor(self, rhs: ClientOptions) -> ClientOptions {
        ClientOptions(self.0 | rhs.0)
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientOptions({:#x})", self.0)
    }
}

/// Direction of a descriptor given to `Client::log_to_descriptor`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u32)]
pub enum DescriptorKind {
    /// The descriptor is read until end-of-file; each line becomes a record.
    Read = ASL_LOG_DESCRIPTOR_READ,
    /// The descriptor is replaced by the write end of a pipe; each line
    /// later written to it becomes a record.
    Write = ASL_LOG_DESCRIPTOR_WRITE,
}

impl DescriptorKind {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for DescriptorKind {
    type Error = AslError;

    fn try_from(value: u32) -> Result<DescriptorKind> {
        match value {
            ASL_LOG_DESCRIPTOR_READ => Ok(DescriptorKind::Read),
            ASL_LOG_DESCRIPTOR_WRITE => Ok(DescriptorKind::Write),
            _ => Err(AslError::InvalidArgument(format!("invalid fd_type {}", value))),
        }
    }
}
