// src/backends/mod.rs

//! The [`Backend`] seam: the native logging API expressed as a trait.
//!
//! A `Backend` is a one-to-one rendition of the C interface of the platform
//! logging library. Handles are opaque `Copy` tokens; freeing them exactly
//! once is the job of the wrapper types in [`crate::client`], never of the
//! caller of a `Backend`.
//!
//! * [`NativeBackend`] forwards every call to the dynamically loaded
//!   platform library.
//! * [`MemoryBackend`] is an in-process sink honouring the same contract.
//!
//! [`NativeBackend`]: crate::backends::native::NativeBackend
//! [`MemoryBackend`]: crate::backends::memory::MemoryBackend

use std::ffi::CStr;
use std::fmt;

use crate::common::{Fd, Result};
use crate::data::level::{FilterMask, Level};
use crate::data::options::{ClientOptions, DescriptorKind, MessageKind};
use crate::data::query::QueryOp;

pub mod memory;
pub mod native;

/// Optional operations. Which of these exist depends on the version of the
/// platform library.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Capabilities {
    /// `Client::log_to_descriptor`.
    pub log_descriptor: bool,
    /// `Client::open_from_descriptor`.
    pub open_from_descriptor: bool,
    /// `create_auxiliary_file` and `close_auxiliary_file`.
    pub auxiliary_file: bool,
    /// `log_auxiliary_location`.
    pub auxiliary_location: bool,
}

impl Capabilities {
    pub const ALL: Capabilities = Capabilities {
        log_descriptor: true,
        open_from_descriptor: true,
        auxiliary_file: true,
        auxiliary_location: true,
    };

    pub const NONE: Capabilities = Capabilities {
        log_descriptor: false,
        open_from_descriptor: false,
        auxiliary_file: false,
        auxiliary_location: false,
    };
}

/// The native logging API.
///
/// Every method is a synchronous forward; none retries. Methods taking a
/// handle assume the handle is live: liveness is guaranteed by the wrapper
/// types.
///
/// Strings cross as `&CStr` because that is what the native library takes;
/// the wrappers reject interior NUL bytes before calling in.
pub trait Backend: Clone + fmt::Debug {
    /// A client session.
    type Client: Copy + fmt::Debug;
    /// A message object, record or query.
    type Msg: Copy + fmt::Debug;
    /// A result set of a search.
    type Response: Copy + fmt::Debug;

    fn capabilities(&self) -> Capabilities;

    // client

    fn open(
        &self,
        ident: Option<&CStr>,
        facility: &CStr,
        options: ClientOptions,
    ) -> Result<Self::Client>;

    /// Optional, see [`Capabilities::open_from_descriptor`].
    fn open_from_descriptor(
        &self,
        fd: Fd,
        ident: Option<&CStr>,
        facility: &CStr,
    ) -> Result<Self::Client>;

    /// Release the session. Failures are not reported.
    fn close(
        &self,
        client: Self::Client,
    );

    fn add_log_file(
        &self,
        client: Self::Client,
        fd: Fd,
    ) -> Result<()>;

    fn remove_log_file(
        &self,
        client: Self::Client,
        fd: Fd,
    ) -> Result<()>;

    /// Set the filter mask, return the previous one.
    fn set_filter(
        &self,
        client: Self::Client,
        filter: FilterMask,
    ) -> FilterMask;

    fn send(
        &self,
        client: Self::Client,
        msg: Self::Msg,
    ) -> Result<()>;

    /// Merge `level` and `text` into a copy of the template `msg` (or an
    /// empty record) and send it.
    fn log(
        &self,
        client: Self::Client,
        msg: Option<Self::Msg>,
        level: Level,
        text: &CStr,
    ) -> Result<()>;

    /// Optional, see [`Capabilities::log_descriptor`].
    fn log_descriptor(
        &self,
        client: Self::Client,
        msg: Option<Self::Msg>,
        level: Level,
        fd: Fd,
        kind: DescriptorKind,
    ) -> Result<()>;

    /// `None` both when nothing matched and when the query was rejected.
    fn search(
        &self,
        client: Self::Client,
        query: Self::Msg,
    ) -> Option<Self::Response>;

    // response

    /// The next record of `response`. The returned handle is owned by
    /// `response` and lives until `response_free`.
    fn response_next(
        &self,
        response: Self::Response,
    ) -> Option<Self::Msg>;

    /// Release `response` and every record it produced or still holds.
    fn response_free(
        &self,
        response: Self::Response,
    );

    // message

    fn msg_new(
        &self,
        kind: MessageKind,
    ) -> Result<Self::Msg>;

    fn msg_free(
        &self,
        msg: Self::Msg,
    );

    /// Key at ordinal `index`, `None` past the last key.
    fn msg_key(
        &self,
        msg: Self::Msg,
        index: u32,
    ) -> Option<String>;

    fn msg_get(
        &self,
        msg: Self::Msg,
        key: &CStr,
    ) -> Option<String>;

    fn msg_set(
        &self,
        msg: Self::Msg,
        key: &CStr,
        value: &CStr,
    ) -> Result<()>;

    /// Removing an absent key succeeds.
    fn msg_unset(
        &self,
        msg: Self::Msg,
        key: &CStr,
    ) -> Result<()>;

    fn msg_set_query(
        &self,
        msg: Self::Msg,
        key: &CStr,
        value: &CStr,
        op: QueryOp,
    ) -> Result<()>;

    // auxiliary

    /// Optional, see [`Capabilities::auxiliary_location`].
    fn log_auxiliary_location(
        &self,
        msg: Self::Msg,
        title: &CStr,
        uti: Option<&CStr>,
        url: &CStr,
    ) -> Result<()>;

    /// Optional, see [`Capabilities::auxiliary_file`].
    fn create_auxiliary_file(
        &self,
        msg: Self::Msg,
        title: &CStr,
        uti: Option<&CStr>,
    ) -> Result<Fd>;

    /// Optional, see [`Capabilities::auxiliary_file`].
    fn close_auxiliary_file(
        &self,
        fd: Fd,
    ) -> Result<()>;
}
