// src/libload/asl_dlopen2.rs

//! Functions to dynamically load the `libsystem_asl` library using [`dlopen2`].
//!
//! The required interface is [`AslCoreApi`]. Functions that only exist in
//! later versions of the library are grouped into separate interfaces that
//! are loaded independently; a group that fails to load is reported as
//! absent in [`Capabilities`] instead of failing the whole library.
//!
//! [`dlopen2`]: https://docs.rs/dlopen2/0.7.0/dlopen2/index.html
//! [`Capabilities`]: crate::backends::Capabilities

use std::ffi::OsString;
use std::fmt;
use std::os::raw::{c_char, c_int};
use std::sync::{Arc, RwLock};

use ::const_format::concatcp;
use ::dlopen2::wrapper::{Container, WrapperApi};
use ::lazy_static::lazy_static;
use ::si_trace_print::{
    defn,
    defo,
    defx,
    defñ,
};

use crate::backends::Capabilities;
use crate::bindings::asl_h::{aslclient, aslmsg, aslresponse};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// User-friendly name for the `libsystem_asl` library, used in error messages.
pub const LIB_NAME_ASL: &str = "libsystem_asl.dylib";

/// Directory of the system libraries on macOS.
const LIB_DIR_SYSTEM: &str = "/usr/lib/system/";

/// Environment variable naming a library file to try before
/// [`LIB_NAME_ASL_NAMES`].
pub const ENV_ASL_LIBRARY_PATH: &str = "ASL_LIBRARY_PATH";

/// All possible names for the `libsystem_asl` library
/// used in [`load_library_asl`].
///
/// On macOS the library is part of `libSystem` and lives in the dyld shared
/// cache; `dlopen` still resolves these paths even though no file exists on
/// disk.
pub const LIB_NAME_ASL_NAMES: [&str; 3] = [
    concatcp!(LIB_DIR_SYSTEM, LIB_NAME_ASL),
    LIB_NAME_ASL,
    "/usr/lib/libSystem.B.dylib",
];

/// [`dlopen2`] API wrapper for `libsystem_asl`. The functions of [`asl.h`]
/// present in every version of the library.
///
/// `asl_log` is variadic and is not loaded; see
/// [`NativeBackend::log`](crate::backends::native::NativeBackend).
///
/// [`dlopen2`]: https://docs.rs/dlopen2/0.7.0/dlopen2/index.html
/// [`asl.h`]: https://opensource.apple.com/source/Libc/Libc-825.24/include/asl.h
#[derive(WrapperApi)]
pub struct AslCoreApi {
    asl_open: unsafe extern "C" fn(
        ident: *const c_char,
        facility: *const c_char,
        opts: u32,
    ) -> aslclient,

    asl_close: unsafe extern "C" fn(
        asl: aslclient,
    ),

    asl_add_log_file: unsafe extern "C" fn(
        asl: aslclient,
        fd: c_int,
    ) -> c_int,

    asl_remove_log_file: unsafe extern "C" fn(
        asl: aslclient,
        fd: c_int,
    ) -> c_int,

    asl_set_filter: unsafe extern "C" fn(
        asl: aslclient,
        f: c_int,
    ) -> c_int,

    asl_new: unsafe extern "C" fn(
        type_: u32,
    ) -> aslmsg,

    asl_free: unsafe extern "C" fn(
        msg: aslmsg,
    ),

    asl_key: unsafe extern "C" fn(
        msg: aslmsg,
        n: u32,
    ) -> *const c_char,

    asl_get: unsafe extern "C" fn(
        msg: aslmsg,
        key: *const c_char,
    ) -> *const c_char,

    asl_set: unsafe extern "C" fn(
        msg: aslmsg,
        key: *const c_char,
        value: *const c_char,
    ) -> c_int,

    asl_unset: unsafe extern "C" fn(
        msg: aslmsg,
        key: *const c_char,
    ) -> c_int,

    asl_set_query: unsafe extern "C" fn(
        msg: aslmsg,
        key: *const c_char,
        value: *const c_char,
        op: u32,
    ) -> c_int,

    asl_send: unsafe extern "C" fn(
        asl: aslclient,
        msg: aslmsg,
    ) -> c_int,

    asl_search: unsafe extern "C" fn(
        asl: aslclient,
        msg: aslmsg,
    ) -> aslresponse,

    aslresponse_next: unsafe extern "C" fn(
        r: aslresponse,
    ) -> aslmsg,

    aslresponse_free: unsafe extern "C" fn(
        r: aslresponse,
    ),
}

/// `asl_log_descriptor`, since Mac OS X 10.8.
#[derive(WrapperApi)]
pub struct AslDescriptorApi {
    asl_log_descriptor: unsafe extern "C" fn(
        asl: aslclient,
        msg: aslmsg,
        level: c_int,
        descriptor: c_int,
        fd_type: u32,
    ) -> c_int,
}

/// `asl_open_from_file`, since Mac OS X 10.7.
#[derive(WrapperApi)]
pub struct AslOpenFromFileApi {
    asl_open_from_file: unsafe extern "C" fn(
        descriptor: c_int,
        ident: *const c_char,
        facility: *const c_char,
    ) -> aslclient,
}

/// `asl_create_auxiliary_file` and `asl_close_auxiliary_file`, since
/// Mac OS X 10.7.
#[derive(WrapperApi)]
pub struct AslAuxiliaryFileApi {
    asl_create_auxiliary_file: unsafe extern "C" fn(
        msg: aslmsg,
        title: *const c_char,
        uti: *const c_char,
        out_descriptor: *mut c_int,
    ) -> c_int,

    asl_close_auxiliary_file: unsafe extern "C" fn(
        descriptor: c_int,
    ) -> c_int,
}

/// `asl_log_auxiliary_location`, since Mac OS X 10.7.
#[derive(WrapperApi)]
pub struct AslAuxiliaryLocationApi {
    asl_log_auxiliary_location: unsafe extern "C" fn(
        msg: aslmsg,
        title: *const c_char,
        uti: *const c_char,
        url: *const c_char,
    ) -> c_int,
}

/// All loaded interfaces of one library.
pub struct AslApi {
    /// The library name or path that was loaded.
    pub libname: String,
    pub core: Container<AslCoreApi>,
    pub descriptor: Option<Container<AslDescriptorApi>>,
    pub open_from_file: Option<Container<AslOpenFromFileApi>>,
    pub auxiliary_file: Option<Container<AslAuxiliaryFileApi>>,
    pub auxiliary_location: Option<Container<AslAuxiliaryLocationApi>>,
}

impl AslApi {
    /// Which optional interfaces were found.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            log_descriptor: self.descriptor.is_some(),
            open_from_descriptor: self.open_from_file.is_some(),
            auxiliary_file: self.auxiliary_file.is_some(),
            auxiliary_location: self.auxiliary_location.is_some(),
        }
    }
}

impl fmt::Debug for AslApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AslApi")
            .field("libname", &self.libname)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// Multi-threaded pointer to the `libsystem_asl` interface.
pub type AslApiPtr = Arc<AslApi>;

lazy_static! {
    /// The interface for using shared library `libsystem_asl`.
    ///
    /// `None` until [`load_library_asl`] succeeds.
    pub static ref ASL_API: RwLock<Option<AslApiPtr>> = {
        RwLock::new(None)
    };

    /// None means `load_library_asl()` has not been called yet.
    /// Some(false) means `load_library_asl()` was called but failed.
    /// Some(true) means `load_library_asl()` was called and succeeded.
    pub static ref LOAD_LIBRARY_ASL_OK: RwLock<Option<bool>> = {
        RwLock::new(None)
    };
}

/// Helpful accessor for lazy_static [`ASL_API`].
///
/// `None` if [`load_library_asl`] has not succeeded.
///
/// [`ASL_API`]: static@ASL_API
pub fn asl_api() -> Option<AslApiPtr> {
    match ASL_API.read() {
        Ok(guard) => guard.as_ref().cloned(),
        Err(poisoned) => poisoned.into_inner().as_ref().cloned(),
    }
}

/// Return values for [`load_library_asl`].
pub enum LoadLibraryError {
    /// The library was successfully loaded.
    Ok,
    /// The library failed to load and this was the error.
    Err(::dlopen2::Error),
    /// A previous attempt to load the library failed (the previous attempt
    /// returned `Err`). No more attempts will be made to load the library.
    PrevErr,
}

impl PartialEq for LoadLibraryError {
    /// allow `Err` == `PrevErr`
    fn eq(&self, other: &LoadLibraryError) -> bool {
        matches!(
            (self, other),
            (LoadLibraryError::Ok, LoadLibraryError::Ok)
                | (LoadLibraryError::Err(_), LoadLibraryError::Err(_))
                | (LoadLibraryError::Err(_), LoadLibraryError::PrevErr)
                | (LoadLibraryError::PrevErr, LoadLibraryError::Err(_))
                | (LoadLibraryError::PrevErr, LoadLibraryError::PrevErr)
        )
    }
}
impl Eq for LoadLibraryError {}

impl fmt::Debug for LoadLibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadLibraryError::Ok => f.write_str("LoadLibraryError::Ok"),
            LoadLibraryError::Err(err) => write!(f, "LoadLibraryError::Err({})", err),
            LoadLibraryError::PrevErr => f.write_str("LoadLibraryError::PrevErr"),
        }
    }
}

fn set_load_library_asl_ok(ok: bool) {
    match LOAD_LIBRARY_ASL_OK.write() {
        Ok(mut guard) => *guard = Some(ok),
        Err(poisoned) => *poisoned.into_inner() = Some(ok),
    }
}

/// Wrapper to set the global static variables.
fn set_asl_api(api: AslApi) {
    defñ!("{:?}", api);
    match ASL_API.write() {
        Ok(mut guard) => *guard = Some(Arc::new(api)),
        Err(poisoned) => *poisoned.into_inner() = Some(Arc::new(api)),
    }
    set_load_library_asl_ok(true);
}

/// Library names to try, in order.
fn library_candidates() -> Vec<OsString> {
    let mut names: Vec<OsString> = Vec::with_capacity(LIB_NAME_ASL_NAMES.len() + 1);
    if let Some(path) = std::env::var_os(ENV_ASL_LIBRARY_PATH) {
        if !path.is_empty() {
            names.push(path);
        }
    }
    names.extend(LIB_NAME_ASL_NAMES.iter().map(OsString::from));

    names
}

/// Load the optional interfaces from the already-loaded `libname`.
fn load_optional(
    libname: &OsString,
    core: Container<AslCoreApi>,
) -> AslApi {
    // SAFETY: the signatures above match `asl.h`
    unsafe {
        AslApi {
            libname: libname.to_string_lossy().into_owned(),
            core,
            descriptor: Container::<AslDescriptorApi>::load(libname).ok(),
            open_from_file: Container::<AslOpenFromFileApi>::load(libname).ok(),
            auxiliary_file: Container::<AslAuxiliaryFileApi>::load(libname).ok(),
            auxiliary_location: Container::<AslAuxiliaryLocationApi>::load(libname).ok(),
        }
    }
}

/// Load the shared library `libsystem_asl`. Store in the global static
/// variable `ASL_API` the loaded [`AslApi`].
///
/// Only attempts to load the library once.
///
/// If the load library attempt fails the first time then that call will
/// return `LoadLibraryError::Err`. All subsequent calls to
/// `load_library_asl` will return `LoadLibraryError::PrevErr`.
///
/// If the load library succeeds in the current call or in a previous call
/// then return `LoadLibraryError::Ok`.
pub fn load_library_asl() -> LoadLibraryError {
    // only attempt to load the library once. if that fails don't try again.
    let prev: Option<bool> = match LOAD_LIBRARY_ASL_OK.read() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    };
    match prev {
        Some(true) => return LoadLibraryError::Ok,
        Some(false) => return LoadLibraryError::PrevErr,
        None => {}
    }

    defn!();

    let candidates = library_candidates();
    let mut last_err: Option<::dlopen2::Error> = None;
    for libname in candidates.iter() {
        defo!("Container::load({:?})", libname);
        // SAFETY: the signatures of `AslCoreApi` match `asl.h`
        match unsafe { Container::<AslCoreApi>::load(libname) } {
            Ok(core) => {
                defx!("loaded library {:?}", libname);
                set_asl_api(load_optional(libname, core));
                return LoadLibraryError::Ok;
            }
            Err(err) => {
                defo!("failed to load library: {}", err);
                last_err = Some(err);
            }
        }
    }

    set_load_library_asl_ok(false);
    match last_err {
        Some(err) => {
            defx!("return Err({:?})", err);
            LoadLibraryError::Err(err)
        }
        None => {
            defx!("return PrevErr");
            LoadLibraryError::PrevErr
        }
    }
}
