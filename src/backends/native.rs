// src/backends/native.rs

//! [`NativeBackend`], the [`Backend`] forwarding to the dynamically loaded
//! platform library.
//!
//! Every method is one call (or a short fixed sequence of calls) into
//! [`AslApi`]. Native failures are read from `errno` right after the call.
//!
//! [`AslApi`]: crate::libload::asl_dlopen2::AslApi

use std::ffi::{CStr, CString};
use std::fmt;
use std::os::raw::{c_char, c_int};
use std::ptr;

use ::bstr::ByteSlice;
use ::lazy_static::lazy_static;
use ::si_trace_print::{
    def1n,
    def1o,
    def1x,
    defn,
    defx,
    defñ,
};

use crate::backends::{Backend, Capabilities};
use crate::bindings::asl_h::asl_object_s;
use crate::common::{to_cstring, AslError, Fd, Result};
use crate::data::keys::{ASL_KEY_LEVEL, ASL_KEY_MSG};
use crate::data::level::{FilterMask, Level};
use crate::data::options::{ClientOptions, DescriptorKind, MessageKind};
use crate::data::query::QueryOp;
use crate::de_wrn;
use crate::libload::asl_dlopen2::{
    asl_api,
    load_library_asl,
    AslApiPtr,
    LoadLibraryError,
    LIB_NAME_ASL,
};

lazy_static! {
    static ref KEY_LEVEL_CSTR: CString = CString::new(ASL_KEY_LEVEL).unwrap();
    static ref KEY_MSG_CSTR: CString = CString::new(ASL_KEY_MSG).unwrap();
}

/// A native object pointer; never null.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct NativeHandle(*mut asl_object_s);

impl NativeHandle {
    fn from_ptr(p: *mut asl_object_s) -> Option<NativeHandle> {
        if p.is_null() {
            None
        } else {
            Some(NativeHandle(p))
        }
    }

    pub fn as_ptr(self) -> *mut asl_object_s {
        self.0
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeHandle(@{:p})", self.0)
    }
}

/// The platform library. Cheap to clone.
#[derive(Clone)]
pub struct NativeBackend {
    api: AslApiPtr,
}

impl fmt::Debug for NativeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBackend")
            .field("api", &*self.api)
            .finish()
    }
}

/// Pointer of an optional string argument.
fn opt_ptr(s: Option<&CStr>) -> *const c_char {
    match s {
        Some(s) => s.as_ptr(),
        None => ptr::null(),
    }
}

/// Copy a native string. Invalid UTF-8 is replaced.
///
/// # Safety
///
/// `p` must be null or point to a NUL-terminated string.
unsafe fn ptr_to_string(p: *const c_char) -> Option<String> {
    if p.is_null() {
        return None;
    }
    let bytes: &[u8] = CStr::from_ptr(p).to_bytes();

    Some(bytes.to_str_lossy().into_owned())
}

/// `Ok` for a zero status, else the current `errno`.
fn check(
    func: &'static str,
    r: c_int,
) -> Result<()> {
    if r == 0 {
        Ok(())
    } else {
        Err(AslError::last_os(func))
    }
}

impl NativeBackend {
    /// Load the platform library (once per process) and return a backend
    /// using it.
    pub fn new() -> Result<NativeBackend> {
        defn!();
        match load_library_asl() {
            LoadLibraryError::Ok => {}
            LoadLibraryError::Err(err) => {
                defx!("load_library_asl Err {}", err);
                return Err(AslError::LibraryLoad {
                    name: LIB_NAME_ASL,
                    reason: err.to_string(),
                });
            }
            LoadLibraryError::PrevErr => {
                defx!("load_library_asl PrevErr");
                return Err(AslError::LibraryLoad {
                    name: LIB_NAME_ASL,
                    reason: String::from("a previous attempt to load the library failed"),
                });
            }
        }
        match asl_api() {
            Some(api) => {
                defx!("{:?}", api);
                Ok(NativeBackend { api })
            }
            None => {
                defx!("asl_api() None");
                Err(AslError::LibraryLoad {
                    name: LIB_NAME_ASL,
                    reason: String::from("library interface is not set"),
                })
            }
        }
    }

    /// Name or path of the loaded library.
    pub fn libname(&self) -> &str {
        &self.api.libname
    }

    /// Copy every attribute of `from` into `to`.
    fn copy_attributes(
        &self,
        from: NativeHandle,
        to: NativeHandle,
    ) -> Result<()> {
        let mut n: u32 = 0;
        loop {
            // SAFETY: `from` and `to` are live messages; returned strings are
            // owned by `from` and copied before the next call
            unsafe {
                let pkey: *const c_char = self.api.core.asl_key(from.as_ptr(), n);
                if pkey.is_null() {
                    return Ok(());
                }
                let pvalue: *const c_char = self.api.core.asl_get(from.as_ptr(), pkey);
                if pvalue.is_null() {
                    return Err(AslError::last_os("asl_get"));
                }
                check("asl_set", self.api.core.asl_set(to.as_ptr(), pkey, pvalue))?;
            }
            n += 1;
        }
    }
}

impl Backend for NativeBackend {
    type Client = NativeHandle;
    type Msg = NativeHandle;
    type Response = NativeHandle;

    fn capabilities(&self) -> Capabilities {
        self.api.capabilities()
    }

    fn open(
        &self,
        ident: Option<&CStr>,
        facility: &CStr,
        options: ClientOptions,
    ) -> Result<NativeHandle> {
        def1n!("({:?}, {:?}, {:?})", ident, facility, options);
        // SAFETY: both strings are NUL-terminated and outlive the call
        let p = unsafe { self.api.core.asl_open(opt_ptr(ident), facility.as_ptr(), options.bits()) };
        match NativeHandle::from_ptr(p) {
            Some(h) => {
                def1x!("return {:?}", h);
                Ok(h)
            }
            None => {
                let err = AslError::last_os("asl_open");
                def1x!("return {:?}", err);
                Err(err)
            }
        }
    }

    fn open_from_descriptor(
        &self,
        fd: Fd,
        ident: Option<&CStr>,
        facility: &CStr,
    ) -> Result<NativeHandle> {
        def1n!("({}, {:?}, {:?})", fd, ident, facility);
        let api = match &self.api.open_from_file {
            Some(api) => api,
            None => {
                def1x!("unsupported");
                return Err(AslError::Unsupported("asl_open_from_file"));
            }
        };
        // SAFETY: both strings are NUL-terminated and outlive the call
        let p = unsafe { api.asl_open_from_file(fd, opt_ptr(ident), facility.as_ptr()) };
        match NativeHandle::from_ptr(p) {
            Some(h) => {
                def1x!("return {:?}", h);
                Ok(h)
            }
            None => {
                let err = AslError::last_os("asl_open_from_file");
                def1x!("return {:?}", err);
                Err(err)
            }
        }
    }

    fn close(
        &self,
        client: NativeHandle,
    ) {
        defñ!("asl_close({:?})", client);
        // SAFETY: `client` is live and is not used again
        unsafe { self.api.core.asl_close(client.as_ptr()) }
    }

    fn add_log_file(
        &self,
        client: NativeHandle,
        fd: Fd,
    ) -> Result<()> {
        defñ!("asl_add_log_file({:?}, {})", client, fd);
        // SAFETY: `client` is live
        check("asl_add_log_file", unsafe { self.api.core.asl_add_log_file(client.as_ptr(), fd) })
    }

    fn remove_log_file(
        &self,
        client: NativeHandle,
        fd: Fd,
    ) -> Result<()> {
        defñ!("asl_remove_log_file({:?}, {})", client, fd);
        // SAFETY: `client` is live
        check("asl_remove_log_file", unsafe { self.api.core.asl_remove_log_file(client.as_ptr(), fd) })
    }

    fn set_filter(
        &self,
        client: NativeHandle,
        filter: FilterMask,
    ) -> FilterMask {
        // SAFETY: `client` is live
        let prev = unsafe { self.api.core.asl_set_filter(client.as_ptr(), filter.bits()) };
        defñ!("asl_set_filter({:?}, {}) returned {:#x}", client, filter, prev);

        FilterMask::from_bits(prev)
    }

    fn send(
        &self,
        client: NativeHandle,
        msg: NativeHandle,
    ) -> Result<()> {
        defñ!("asl_send({:?}, {:?})", client, msg);
        // SAFETY: `client` and `msg` are live
        check("asl_send", unsafe { self.api.core.asl_send(client.as_ptr(), msg.as_ptr()) })
    }

    /// `asl_log` takes a format string and varargs, which a function pointer
    /// loaded at runtime cannot express portably. The same record is built
    /// here: a copy of the template with `Level` and `Message` set, then
    /// `asl_send`, which applies the client filter by `Level`.
    fn log(
        &self,
        client: NativeHandle,
        msg: Option<NativeHandle>,
        level: Level,
        text: &CStr,
    ) -> Result<()> {
        def1n!("({:?}, {:?}, {:?}, {:?})", client, msg, level, text);
        let record = self.msg_new(MessageKind::Record)?;
        let result = (|| -> Result<()> {
            if let Some(template) = msg {
                self.copy_attributes(template, record)?;
            }
            let value_level: CString = to_cstring("level", &level.as_i32().to_string())?;
            self.msg_set(record, &KEY_LEVEL_CSTR, &value_level)?;
            self.msg_set(record, &KEY_MSG_CSTR, text)?;
            self.send(client, record)
        })();
        self.msg_free(record);
        def1x!("return {:?}", result);

        result
    }

    fn log_descriptor(
        &self,
        client: NativeHandle,
        msg: Option<NativeHandle>,
        level: Level,
        fd: Fd,
        kind: DescriptorKind,
    ) -> Result<()> {
        defñ!("asl_log_descriptor({:?}, {:?}, {:?}, {}, {:?})", client, msg, level, fd, kind);
        let api = match &self.api.descriptor {
            Some(api) => api,
            None => return Err(AslError::Unsupported("asl_log_descriptor")),
        };
        let pmsg = match msg {
            Some(m) => m.as_ptr(),
            None => ptr::null_mut(),
        };
        // SAFETY: `client` is live; `pmsg` is live or null
        check("asl_log_descriptor", unsafe {
            api.asl_log_descriptor(client.as_ptr(), pmsg, level.as_i32(), fd, kind.as_u32())
        })
    }

    fn search(
        &self,
        client: NativeHandle,
        query: NativeHandle,
    ) -> Option<NativeHandle> {
        // SAFETY: `client` and `query` are live
        let p = unsafe { self.api.core.asl_search(client.as_ptr(), query.as_ptr()) };
        defñ!("asl_search({:?}, {:?}) returned @{:p}", client, query, p);

        NativeHandle::from_ptr(p)
    }

    fn response_next(
        &self,
        response: NativeHandle,
    ) -> Option<NativeHandle> {
        // SAFETY: `response` is live
        let p = unsafe { self.api.core.aslresponse_next(response.as_ptr()) };

        NativeHandle::from_ptr(p)
    }

    fn response_free(
        &self,
        response: NativeHandle,
    ) {
        defñ!("aslresponse_free({:?})", response);
        // SAFETY: `response` is live and is not used again
        unsafe { self.api.core.aslresponse_free(response.as_ptr()) }
    }

    fn msg_new(
        &self,
        kind: MessageKind,
    ) -> Result<NativeHandle> {
        // SAFETY: no pointer arguments
        let p = unsafe { self.api.core.asl_new(kind.as_u32()) };
        defñ!("asl_new({:?}) returned @{:p}", kind, p);
        match NativeHandle::from_ptr(p) {
            Some(h) => Ok(h),
            None => Err(AslError::last_os("asl_new")),
        }
    }

    fn msg_free(
        &self,
        msg: NativeHandle,
    ) {
        defñ!("asl_free({:?})", msg);
        // SAFETY: `msg` is owned, live and is not used again
        unsafe { self.api.core.asl_free(msg.as_ptr()) }
    }

    fn msg_key(
        &self,
        msg: NativeHandle,
        index: u32,
    ) -> Option<String> {
        // SAFETY: `msg` is live; the key is copied before returning
        unsafe { ptr_to_string(self.api.core.asl_key(msg.as_ptr(), index)) }
    }

    fn msg_get(
        &self,
        msg: NativeHandle,
        key: &CStr,
    ) -> Option<String> {
        // SAFETY: `msg` is live; the value is copied before returning
        unsafe { ptr_to_string(self.api.core.asl_get(msg.as_ptr(), key.as_ptr())) }
    }

    fn msg_set(
        &self,
        msg: NativeHandle,
        key: &CStr,
        value: &CStr,
    ) -> Result<()> {
        // SAFETY: `msg` is live; strings outlive the call
        check("asl_set", unsafe { self.api.core.asl_set(msg.as_ptr(), key.as_ptr(), value.as_ptr()) })
    }

    fn msg_unset(
        &self,
        msg: NativeHandle,
        key: &CStr,
    ) -> Result<()> {
        // SAFETY: `msg` is live; `key` outlives the call
        check("asl_unset", unsafe { self.api.core.asl_unset(msg.as_ptr(), key.as_ptr()) })
    }

    fn msg_set_query(
        &self,
        msg: NativeHandle,
        key: &CStr,
        value: &CStr,
        op: QueryOp,
    ) -> Result<()> {
        def1o!("asl_set_query({:?}, {:?}, {:?}, {:?})", msg, key, value, op);
        // SAFETY: `msg` is live; strings outlive the call
        check("asl_set_query", unsafe {
            self.api.core.asl_set_query(msg.as_ptr(), key.as_ptr(), value.as_ptr(), op.bits())
        })
    }

    fn log_auxiliary_location(
        &self,
        msg: NativeHandle,
        title: &CStr,
        uti: Option<&CStr>,
        url: &CStr,
    ) -> Result<()> {
        let api = match &self.api.auxiliary_location {
            Some(api) => api,
            None => return Err(AslError::Unsupported("asl_log_auxiliary_location")),
        };
        // SAFETY: `msg` is live; strings outlive the call or are null
        check("asl_log_auxiliary_location", unsafe {
            api.asl_log_auxiliary_location(msg.as_ptr(), title.as_ptr(), opt_ptr(uti), url.as_ptr())
        })
    }

    fn create_auxiliary_file(
        &self,
        msg: NativeHandle,
        title: &CStr,
        uti: Option<&CStr>,
    ) -> Result<Fd> {
        let api = match &self.api.auxiliary_file {
            Some(api) => api,
            None => return Err(AslError::Unsupported("asl_create_auxiliary_file")),
        };
        let mut fd: c_int = -1;
        // SAFETY: `msg` is live; strings outlive the call or are null; `fd`
        // is a valid out-pointer
        check("asl_create_auxiliary_file", unsafe {
            api.asl_create_auxiliary_file(msg.as_ptr(), title.as_ptr(), opt_ptr(uti), &mut fd)
        })?;

        Ok(fd)
    }

    fn close_auxiliary_file(
        &self,
        fd: Fd,
    ) -> Result<()> {
        let api = match &self.api.auxiliary_file {
            Some(api) => api,
            None => {
                de_wrn!("asl_close_auxiliary_file({}) unsupported", fd);
                return Err(AslError::Unsupported("asl_close_auxiliary_file"));
            }
        };
        // SAFETY: no pointer arguments
        check("asl_close_auxiliary_file", unsafe { api.asl_close_auxiliary_file(fd) })
    }
}
