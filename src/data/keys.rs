// src/data/keys.rs

//! Well-known attribute names of log records.
//!
//! Keys are free-form and case-sensitive; these are the ones the platform
//! itself sets or interprets.

pub const ASL_KEY_TIME: &str = "Time";
pub const ASL_KEY_TIME_NSEC: &str = "TimeNanoSec";
pub const ASL_KEY_HOST: &str = "Host";
pub const ASL_KEY_SENDER: &str = "Sender";
pub const ASL_KEY_FACILITY: &str = "Facility";
pub const ASL_KEY_PID: &str = "PID";
pub const ASL_KEY_UID: &str = "UID";
pub const ASL_KEY_GID: &str = "GID";
pub const ASL_KEY_LEVEL: &str = "Level";
pub const ASL_KEY_MSG: &str = "Message";
pub const ASL_KEY_READ_UID: &str = "ReadUID";
pub const ASL_KEY_READ_GID: &str = "ReadGID";
pub const ASL_KEY_EXPIRE_TIME: &str = "ASLExpireTime";
pub const ASL_KEY_MSG_ID: &str = "ASLMessageID";
pub const ASL_KEY_SESSION: &str = "Session";
pub const ASL_KEY_REF_PID: &str = "RefPID";
pub const ASL_KEY_REF_PROC: &str = "RefProc";
pub const ASL_KEY_AUX_TITLE: &str = "ASLAuxTitle";
pub const ASL_KEY_AUX_UTI: &str = "ASLAuxUTI";
pub const ASL_KEY_AUX_URL: &str = "ASLAuxURL";
pub const ASL_KEY_AUX_DATA: &str = "ASLAuxData";
pub const ASL_KEY_OPTION: &str = "ASLOption";
pub const ASL_KEY_MODULE: &str = "ASLModule";
pub const ASL_KEY_SENDER_INSTANCE: &str = "SenderInstance";
pub const ASL_KEY_SENDER_MACH_UUID: &str = "SenderMachUUID";
pub const ASL_KEY_FINAL_NOTIFICATION: &str = "ASLFinalNotification";
pub const ASL_KEY_OS_ACTIVITY_ID: &str = "OSActivityID";

/// Facility used when a client does not name one.
pub const FACILITY_USER: &str = "user";
/// Facility shown by the system console.
pub const FACILITY_CONSOLE: &str = "com.apple.console";
