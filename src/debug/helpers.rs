// src/debug/helpers.rs

//! Helper functions for testing: temporary files standing in for the
//! descriptors handed to a client.

use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::io::AsRawFd;

use ::lazy_static::lazy_static;
use ::si_trace_print::defñ;

#[doc(hidden)]
pub use ::tempfile::NamedTempFile;

use crate::common::Fd;

/// NamedTempFile instances default to this file name prefix.
///
/// Used to find and delete temporary files remaining after testing.
/// See <https://github.com/Stebalien/tempfile/issues/183>.
pub const STR_TEMPFILE_PREFIX: &str = "tmp-asl-test-";

lazy_static! {
    pub static ref STRING_TEMPFILE_PREFIX: String = String::from(STR_TEMPFILE_PREFIX);
}

/// Testing helper function to write a `str` to a temporary file.
pub fn create_temp_file(data: &str) -> NamedTempFile {
    let mut ntf = match ::tempfile::Builder::new()
        // use known prefix for easier cleanup
        .prefix::<str>(&STRING_TEMPFILE_PREFIX)
        .tempfile()
    {
        Ok(val) => val,
        Err(err) => {
            panic!("NamedTempFile::new() return Err {}", err);
        }
    };
    match ntf.write_all(data.as_bytes()) {
        Ok(_) => {}
        Err(err) => {
            panic!("NamedTempFile::write_all() return Err {}", err);
        }
    }
    // leave the position at the start for readers of the descriptor
    match ntf.as_file_mut().seek(SeekFrom::Start(0)) {
        Ok(_) => {}
        Err(err) => {
            panic!("NamedTempFile::seek() return Err {}", err);
        }
    }
    defñ!("{:?}", ntf.path());

    ntf
}

/// The raw descriptor of `ntf`; it stays owned by `ntf`.
pub fn ntf_fd(ntf: &NamedTempFile) -> Fd {
    ntf.as_file().as_raw_fd()
}

/// Entire contents of the file at `ntf`, read through its path so the
/// position of `ntf`'s own descriptor does not matter.
pub fn read_temp_file(ntf: &NamedTempFile) -> String {
    let mut file = match std::fs::File::open(ntf.path()) {
        Ok(val) => val,
        Err(err) => {
            panic!("File::open({:?}) return Err {}", ntf.path(), err);
        }
    };
    let mut s = String::new();
    match file.read_to_string(&mut s) {
        Ok(_) => {}
        Err(err) => {
            panic!("File::read_to_string({:?}) return Err {}", ntf.path(), err);
        }
    }

    s
}
