// src/bindings/asl_h.rs

//! Types and constants of [`asl.h`].
//!
//! Only the subset used by this crate. Function signatures live in
//! [`crate::libload::asl_dlopen2`].
//!
//! [`asl.h`]: https://opensource.apple.com/source/Libc/Libc-825.24/include/asl.h

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]

/// Opaque native object. Clients, messages and responses are all
/// `asl_object_t` in later versions of the library.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct asl_object_s {
    pub _unused: [u8; 0],
}

pub type asl_object_t = *mut asl_object_s;
pub type aslclient = asl_object_t;
pub type aslmsg = asl_object_t;
pub type aslresponse = asl_object_t;

pub const ASL_TYPE_MSG: u32 = 0;
pub const ASL_TYPE_QUERY: u32 = 1;

pub const ASL_LOG_DESCRIPTOR_READ: u32 = 1;
pub const ASL_LOG_DESCRIPTOR_WRITE: u32 = 2;

pub const ASL_OPT_STDERR: u32 = 0x0000_0001;
pub const ASL_OPT_NO_DELAY: u32 = 0x0000_0002;
pub const ASL_OPT_NO_REMOTE: u32 = 0x0000_0004;

pub const ASL_QUERY_OP_CASEFOLD: u32 = 0x0010;
pub const ASL_QUERY_OP_PREFIX: u32 = 0x0020;
pub const ASL_QUERY_OP_SUFFIX: u32 = 0x0040;
pub const ASL_QUERY_OP_SUBSTRING: u32 = 0x0060;
pub const ASL_QUERY_OP_NUMERIC: u32 = 0x0080;
pub const ASL_QUERY_OP_REGEX: u32 = 0x0100;

pub const ASL_QUERY_OP_EQUAL: u32 = 0x0001;
pub const ASL_QUERY_OP_GREATER: u32 = 0x0002;
pub const ASL_QUERY_OP_GREATER_EQUAL: u32 = 0x0003;
pub const ASL_QUERY_OP_LESS: u32 = 0x0004;
pub const ASL_QUERY_OP_LESS_EQUAL: u32 = 0x0005;
pub const ASL_QUERY_OP_NOT_EQUAL: u32 = 0x0006;
pub const ASL_QUERY_OP_TRUE: u32 = 0x0007;

/// Mask of the comparison bits of a query operation.
pub const ASL_QUERY_OP_MASK: u32 = 0x000f;
/// Mask of the modifier bits of a query operation.
pub const ASL_QUERY_OP_MODIFIER_MASK: u32 = 0x01f0;
