// src/common.rs
//
// common imports, type aliases, error types, and other globals (avoids circular imports)

use std::ffi::CString;
use std::io::ErrorKind;

pub use ::nix::errno::Errno;
use ::thiserror::Error;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// type aliases
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A raw file descriptor. Ownership always remains with the caller unless
/// an operation documents otherwise.
pub type Fd = std::os::unix::io::RawFd;

/// A generic counter.
pub type Count = u64;

/// Map of attribute name to attribute value.
pub type AttrMap = std::collections::HashMap<String, String>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Every failure surfaced by this crate.
///
/// Errors are returned to the caller of the operation that detected them;
/// nothing is retried and nothing is logged-and-ignored.
#[derive(Debug, Error)]
pub enum AslError {
    /// A value outside an accepted enumeration (message kind, descriptor
    /// kind, query operation) or a string that cannot cross the C boundary
    /// (interior NUL byte).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Attribute lookup on a missing key.
    #[error("key {0:?} not found")]
    NotFound(String),
    /// Operation attempted on a closed `Client`.
    #[error("client is closed")]
    Closed,
    /// A native call reported failure; `errno` is what the call left behind.
    #[error("{func} failed; {errno}")]
    Os {
        func: &'static str,
        errno: Errno,
    },
    /// The loaded logging library does not provide this operation.
    #[error("{0} is not supported by the logging library")]
    Unsupported(&'static str),
    /// The native logging library could not be loaded.
    #[error("failed to load {name}: {reason}")]
    LibraryLoad {
        name: &'static str,
        reason: String,
    },
}

impl AslError {
    /// `Os` error for `func` using the given `errno`.
    pub const fn os(func: &'static str, errno: Errno) -> AslError {
        AslError::Os { func, errno }
    }

    /// `Os` error for `func` using the thread's current `errno`.
    ///
    /// Some native calls fail without setting `errno`; then `EIO` is used so
    /// the error never claims success.
    pub fn last_os(func: &'static str) -> AslError {
        let errno = match Errno::last() {
            Errno::UnknownErrno => Errno::EIO,
            errno => errno,
        };
        AslError::Os { func, errno }
    }

    /// The platform error code, for `Os` errors.
    pub const fn errno(&self) -> Option<Errno> {
        match self {
            AslError::Os { errno, .. } => Some(*errno),
            _ => None,
        }
    }

    pub const fn is_closed(&self) -> bool {
        matches!(self, AslError::Closed)
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, AslError::NotFound(_))
    }
}

/// `Result` for all operations of this crate.
pub type Result<T> = std::result::Result<T, AslError>;

/// Helper to map an `Errno` to an `ErrorKind`.
pub fn errno_to_errorkind(err: &Errno) -> ErrorKind {
    match *err {
        Errno::EACCES => ErrorKind::PermissionDenied,
        Errno::EPERM => ErrorKind::PermissionDenied,
        Errno::EADDRINUSE => ErrorKind::AddrInUse,
        Errno::EADDRNOTAVAIL => ErrorKind::AddrNotAvailable,
        Errno::EAFNOSUPPORT => ErrorKind::AddrNotAvailable,
        Errno::EALREADY => ErrorKind::AlreadyExists,
        Errno::EEXIST => ErrorKind::AlreadyExists,
        Errno::EBADF => ErrorKind::InvalidInput,
        Errno::EINVAL => ErrorKind::InvalidInput,
        Errno::EBADMSG => ErrorKind::InvalidData,
        Errno::ECANCELED => ErrorKind::Interrupted,
        Errno::EINTR => ErrorKind::Interrupted,
        Errno::ENOENT => ErrorKind::NotFound,
        Errno::EPIPE => ErrorKind::BrokenPipe,
        Errno::ENOTCONN => ErrorKind::NotConnected,
        Errno::ETIMEDOUT => ErrorKind::TimedOut,
        Errno::EAGAIN => ErrorKind::WouldBlock,
        _ => ErrorKind::Other,
    }
}

impl From<AslError> for std::io::Error {
    fn from(err: AslError) -> std::io::Error {
        let kind: ErrorKind = match &err {
            AslError::InvalidArgument(_) => ErrorKind::InvalidInput,
            AslError::NotFound(_) => ErrorKind::NotFound,
            AslError::Closed => ErrorKind::NotConnected,
            AslError::Os { errno, .. } => errno_to_errorkind(errno),
            AslError::Unsupported(_) => ErrorKind::Unsupported,
            AslError::LibraryLoad { .. } => ErrorKind::NotFound,
        };

        std::io::Error::new(kind, err)
    }
}

/// Convert `s` to a `CString` for passing to a native call.
/// `what` names the argument in the error.
pub fn to_cstring(
    what: &str,
    s: &str,
) -> Result<CString> {
    match CString::new(s) {
        Ok(cs) => Ok(cs),
        Err(err) => Err(AslError::InvalidArgument(format!(
            "{} {:?} contains a NUL byte at {}",
            what,
            s,
            err.nul_position()
        ))),
    }
}
