// src/data/level.rs

//! Severity [`Level`]s and [`FilterMask`]s.

use std::fmt;
use std::str::FromStr;

use ::phf::phf_map;

use crate::common::{AslError, Result};

/// Severity of a log record, most severe first.
///
/// The numeric values are fixed by the platform and passed through
/// unchanged.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(i32)]
pub enum Level {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

pub const ASL_STRING_EMERG: &str = "Emergency";
pub const ASL_STRING_ALERT: &str = "Alert";
pub const ASL_STRING_CRIT: &str = "Critical";
pub const ASL_STRING_ERR: &str = "Error";
pub const ASL_STRING_WARNING: &str = "Warning";
pub const ASL_STRING_NOTICE: &str = "Notice";
pub const ASL_STRING_INFO: &str = "Info";
pub const ASL_STRING_DEBUG: &str = "Debug";

/// Level name to [`Level`].
pub static STRING2LEVEL: phf::Map<&'static str, Level> = phf_map! {
    "Emergency" => Level::Emergency,
    "Alert" => Level::Alert,
    "Critical" => Level::Critical,
    "Error" => Level::Error,
    "Warning" => Level::Warning,
    "Notice" => Level::Notice,
    "Info" => Level::Info,
    "Debug" => Level::Debug,
};

impl Level {
    /// All levels, most severe first.
    pub const ALL: [Level; 8] = [
        Level::Emergency,
        Level::Alert,
        Level::Critical,
        Level::Error,
        Level::Warning,
        Level::Notice,
        Level::Info,
        Level::Debug,
    ];

    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// The platform's name for this level, e.g. `"Notice"`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Emergency => ASL_STRING_EMERG,
            Level::Alert => ASL_STRING_ALERT,
            Level::Critical => ASL_STRING_CRIT,
            Level::Error => ASL_STRING_ERR,
            Level::Warning => ASL_STRING_WARNING,
            Level::Notice => ASL_STRING_NOTICE,
            Level::Info => ASL_STRING_INFO,
            Level::Debug => ASL_STRING_DEBUG,
        }
    }

    /// Parse the value of a `Level` attribute. Records carry the level as a
    /// decimal number; the level name is accepted too.
    pub fn from_attribute(value: &str) -> Option<Level> {
        match value.trim().parse::<i32>() {
            Ok(n) => Level::try_from(n).ok(),
            Err(_) => STRING2LEVEL.get(value.trim()).copied(),
        }
    }
}

impl TryFrom<i32> for Level {
    type Error = AslError;

    fn try_from(value: i32) -> Result<Level> {
        match Level::ALL.get(value as usize) {
            Some(level) if value >= 0 => Ok(*level),
            _ => Err(AslError::InvalidArgument(format!("invalid level {}", value))),
        }
    }
}

impl FromStr for Level {
    type Err = AslError;

    fn from_str(s: &str) -> Result<Level> {
        match STRING2LEVEL.get(s) {
            Some(level) => Ok(*level),
            None => Err(AslError::InvalidArgument(format!("invalid level name {:?}", s))),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of [`Level`]s passed by a client or an output target, one bit per
/// level (`1 << level`).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct FilterMask(i32);

impl FilterMask {
    pub const EMERG: FilterMask = FilterMask::of(Level::Emergency);
    pub const ALERT: FilterMask = FilterMask::of(Level::Alert);
    pub const CRIT: FilterMask = FilterMask::of(Level::Critical);
    pub const ERR: FilterMask = FilterMask::of(Level::Error);
    pub const WARNING: FilterMask = FilterMask::of(Level::Warning);
    pub const NOTICE: FilterMask = FilterMask::of(Level::Notice);
    pub const INFO: FilterMask = FilterMask::of(Level::Info);
    pub const DEBUG: FilterMask = FilterMask::of(Level::Debug);

    /// Mask passing only `level`.
    pub const fn of(level: Level) -> FilterMask {
        FilterMask(1 << level.as_i32())
    }

    /// Mask passing `level` and every more severe level.
    pub const fn upto(level: Level) -> FilterMask {
        FilterMask((1 << (level.as_i32() + 1)) - 1)
    }

    /// Mask from raw bits as used by the native library. Bits are not
    /// interpreted.
    pub const fn from_bits(bits: i32) -> FilterMask {
        FilterMask(bits)
    }

    pub const fn bits(self) -> i32 {
        self.0
    }

    pub const fn contains(self, level: Level) -> bool {
        self.0 & (1 << level.as_i32()) != 0
    }
}

impl std::ops::BitOr for FilterMask {
    type Output = FilterMask;

    fn bitor(self, rhs: FilterMask) -> FilterMask {
        FilterMask(self.0 | rhs.0)
    }
}

impl fmt::Display for FilterMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}
