// src/data/format.rs

//! Rendering of records into text lines, as written to auxiliary output
//! targets.

use std::fmt;
use std::str::FromStr;

use ::chrono::{Local, TimeZone};
use ::itertools::Itertools; // for `join`

use crate::common::{AslError, Result};
use crate::data::keys::{
    ASL_KEY_HOST,
    ASL_KEY_LEVEL,
    ASL_KEY_MSG,
    ASL_KEY_PID,
    ASL_KEY_SENDER,
    ASL_KEY_TIME,
};
use crate::data::level::Level;

pub const ASL_MSG_FMT_RAW: &str = "raw";
pub const ASL_MSG_FMT_STD: &str = "std";
pub const ASL_MSG_FMT_BSD: &str = "bsd";
pub const ASL_MSG_FMT_MSG: &str = "msg";

/// `strftime` format for the `Time` field of `std` and `bsd` lines.
pub const TIME_FORMAT: &str = "%b %e %H:%M:%S";

/// Line layouts.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MsgFormat {
    /// `[Key value] [Key value] …`, every attribute in record order.
    Raw,
    /// `Time Host Sender[PID] <Level>: Message`
    #[default]
    Std,
    /// `Time Host Sender[PID]: Message`
    Bsd,
    /// `Message` only.
    Msg,
}

impl MsgFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            MsgFormat::Raw => ASL_MSG_FMT_RAW,
            MsgFormat::Std => ASL_MSG_FMT_STD,
            MsgFormat::Bsd => ASL_MSG_FMT_BSD,
            MsgFormat::Msg => ASL_MSG_FMT_MSG,
        }
    }
}

impl FromStr for MsgFormat {
    type Err = AslError;

    fn from_str(s: &str) -> Result<MsgFormat> {
        match s {
            ASL_MSG_FMT_RAW => Ok(MsgFormat::Raw),
            ASL_MSG_FMT_STD => Ok(MsgFormat::Std),
            ASL_MSG_FMT_BSD => Ok(MsgFormat::Bsd),
            ASL_MSG_FMT_MSG => Ok(MsgFormat::Msg),
            _ => Err(AslError::InvalidArgument(format!("invalid message format {:?}", s))),
        }
    }
}

impl fmt::Display for MsgFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lookup<'a>(
    attrs: &'a [(String, String)],
    key: &str,
) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Render a `Time` attribute (seconds since the epoch) in local time.
/// Values that are not a timestamp are returned unchanged.
pub fn format_time(value: &str) -> String {
    let secs: i64 = match value.trim().parse::<i64>() {
        Ok(secs) => secs,
        Err(_) => return value.to_string(),
    };
    match Local.timestamp_opt(secs, 0).single() {
        Some(dt) => dt.format(TIME_FORMAT).to_string(),
        None => value.to_string(),
    }
}

/// Escape `]` and `\` so a raw field can be split again.
fn escape_raw(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == ']' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }

    out
}

/// Render `attrs` as one line, without the trailing newline.
///
/// Missing fields render as empty strings; a missing or unknown `Level`
/// renders as its raw value.
pub fn format_message(
    attrs: &[(String, String)],
    format: MsgFormat,
) -> String {
    let message: &str = lookup(attrs, ASL_KEY_MSG).unwrap_or("");
    let header = || -> String {
        format!(
            "{} {} {}[{}]",
            format_time(lookup(attrs, ASL_KEY_TIME).unwrap_or("")),
            lookup(attrs, ASL_KEY_HOST).unwrap_or(""),
            lookup(attrs, ASL_KEY_SENDER).unwrap_or(""),
            lookup(attrs, ASL_KEY_PID).unwrap_or(""),
        )
    };
    match format {
        MsgFormat::Raw => attrs
            .iter()
            .map(|(k, v)| format!("[{} {}]", escape_raw(k), escape_raw(v)))
            .join(" "),
        MsgFormat::Std => {
            let level_raw: &str = lookup(attrs, ASL_KEY_LEVEL).unwrap_or("");
            let level: String = match Level::from_attribute(level_raw) {
                Some(level) => level.as_str().to_string(),
                None => level_raw.to_string(),
            };
            format!("{} <{}>: {}", header(), level, message)
        }
        MsgFormat::Bsd => format!("{}: {}", header(), message),
        MsgFormat::Msg => message.to_string(),
    }
}
