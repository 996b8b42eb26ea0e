// src/debug/printers.rs

//! Printer macros and helpers for test and debug builds.

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `d`ebug `e`println! an `err`or
#[macro_export]
macro_rules! de_err {
    (
        $($args:tt)*
    ) => {
        {
            #[cfg(any(debug_assertions,test))]
            eprint!("ERROR: ");
            #[cfg(any(debug_assertions,test))]
            eprintln!($($args)*)
        }
    }
}
pub use de_err;

/// `d`ebug `e`println! a `w`a`rn`ing
#[macro_export]
macro_rules! de_wrn {
    (
        $($args:tt)*
    ) => {
        {
            #[cfg(any(debug_assertions,test))]
            eprint!("WARNING: ");
            #[cfg(any(debug_assertions,test))]
            eprintln!($($args)*)
        }
    }
}
pub use de_wrn;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// helper functions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Replace C0 control characters with their visible pictures, e.g. `'\n'`
/// becomes `'␊'`, so a logged line prints on one line at a fixed width.
///
/// only intended to aid visual debugging
#[cfg(any(debug_assertions, test))]
pub const fn char_to_char_noraw(c: char) -> char {
    match c as u32 {
        // U+2400 "SYMBOL FOR NULL" is the first of the control pictures
        0..=31 => match char::from_u32(0x2400 + c as u32) {
            Some(c_) => c_,
            None => c,
        },
        127 => '␡',
        _ => c,
    }
}

/// `str_buf` with each control character replaced by
/// [`char_to_char_noraw`].
///
/// only intended for debugging
#[doc(hidden)]
#[allow(non_snake_case)]
#[cfg(any(debug_assertions, test))]
pub fn str_to_String_noraw(str_buf: &str) -> String {
    str_buf.chars().map(char_to_char_noraw).collect()
}

/// One-line rendition of a list of attributes, e.g. `{Level=5 Message=hi␊}`.
///
/// only intended for debugging
#[doc(hidden)]
#[allow(non_snake_case)]
#[cfg(any(debug_assertions, test))]
pub fn attrs_to_String_noraw(attrs: &[(String, String)]) -> String {
    let mut s = String::from("{");
    for (i, (key, value)) in attrs.iter().enumerate() {
        if i != 0 {
            s.push(' ');
        }
        s.push_str(&str_to_String_noraw(key));
        s.push('=');
        s.push_str(&str_to_String_noraw(value));
    }
    s.push('}');

    s
}
