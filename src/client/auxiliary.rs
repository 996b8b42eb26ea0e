// src/client/auxiliary.rs

//! Auxiliary data attached to a record: a location (URL) or a file whose
//! contents are logged when it is closed. All three operations are
//! optional capabilities of the backend.

use ::si_trace_print::{defn, defx};

use crate::backends::Backend;
use crate::client::message::{Attributes, Message};
use crate::common::{to_cstring, AslError, Fd, Result};

/// Log `msg` with a title, an optional uniform type identifier and a URL.
pub fn log_auxiliary_location<B: Backend>(
    msg: &Message<B>,
    title: &str,
    uti: Option<&str>,
    url: &str,
) -> Result<()> {
    defn!("({:?}, {:?}, {:?}, {:?})", msg, title, uti, url);
    if !msg.backend().capabilities().auxiliary_location {
        defx!("unsupported");
        return Err(AslError::Unsupported("asl_log_auxiliary_location"));
    }
    let title_c = to_cstring("title", title)?;
    let uti_c = match uti {
        Some(uti) => Some(to_cstring("uti", uti)?),
        None => None,
    };
    let url_c = to_cstring("url", url)?;
    let result = msg
        .backend()
        .log_auxiliary_location(msg.raw(), &title_c, uti_c.as_deref(), &url_c);
    defx!("return {:?}", result);

    result
}

/// Create a file to be logged with `msg` and return a descriptor to write
/// it through. The record is sent by [`close_auxiliary_file`], which must
/// be called exactly once for the returned descriptor.
pub fn create_auxiliary_file<B: Backend>(
    msg: &Message<B>,
    title: &str,
    uti: Option<&str>,
) -> Result<Fd> {
    defn!("({:?}, {:?}, {:?})", msg, title, uti);
    if !msg.backend().capabilities().auxiliary_file {
        defx!("unsupported");
        return Err(AslError::Unsupported("asl_create_auxiliary_file"));
    }
    let title_c = to_cstring("title", title)?;
    let uti_c = match uti {
        Some(uti) => Some(to_cstring("uti", uti)?),
        None => None,
    };
    let result = msg
        .backend()
        .create_auxiliary_file(msg.raw(), &title_c, uti_c.as_deref());
    defx!("return {:?}", result);

    result
}

/// Close a descriptor from [`create_auxiliary_file`] and log the record.
pub fn close_auxiliary_file<B: Backend>(
    backend: &B,
    fd: Fd,
) -> Result<()> {
    defn!("({})", fd);
    if !backend.capabilities().auxiliary_file {
        defx!("unsupported");
        return Err(AslError::Unsupported("asl_close_auxiliary_file"));
    }
    let result = backend.close_auxiliary_file(fd);
    defx!("return {:?}", result);

    result
}
