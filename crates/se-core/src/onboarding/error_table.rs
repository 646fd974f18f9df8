//! Session error classification.
//!
//! Maps the error code reported by an onboarding session to what the flow
//! should do about it. The table is built once per process and never mutated.
//!
//! 会话错误码分类表：进程内只构建一次。

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

use crate::navigation::Screen;

pub const GENERIC_ERROR_CODE: &str = "GenericError";
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";
pub const DECRYPTION_ERROR_CODE: &str = "DecryptionError";

const MSG_INVALID_MESSAGE: &str =
    "Invalid message received from meter. If the error persists it could be a connection or hardware issue.";
const MSG_CONTACT_SUPPORT: &str = "Couldn't read data from meter. Contact customer support.";

/// Classified, actionable meaning of a session error code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDisposition {
    pub error_code: String,
    /// May be empty when a redirect supersedes messaging.
    pub user_message: String,
    /// Whether onboarding may keep waiting for the device to recover.
    pub can_continue: bool,
    pub redirect_target: Option<Screen>,
}

impl ErrorDisposition {
    /// Fatal: no redirect and the flow may not continue.
    pub fn is_fatal(&self) -> bool {
        !self.can_continue && self.redirect_target.is_none()
    }

    pub fn generic() -> Self {
        Self {
            error_code: GENERIC_ERROR_CODE.to_string(),
            user_message: GENERIC_ERROR_MESSAGE.to_string(),
            can_continue: false,
            redirect_target: None,
        }
    }
}

struct ErrorEntry {
    message: &'static str,
    can_continue: bool,
    redirect_target: Option<Screen>,
}

const fn entry(message: &'static str, can_continue: bool) -> ErrorEntry {
    ErrorEntry {
        message,
        can_continue,
        redirect_target: None,
    }
}

const fn needs_key() -> ErrorEntry {
    ErrorEntry {
        message: "",
        can_continue: false,
        redirect_target: Some(Screen::EncryptionKey),
    }
}

static ERROR_TABLE: Lazy<HashMap<&'static str, ErrorEntry>> = Lazy::new(|| {
    HashMap::from([
        (DECRYPTION_ERROR_CODE, needs_key()),
        ("AuthenticationFailure", needs_key()),
        (
            "ACKError",
            entry(
                "Error connecting to the device. Try reconnecting the device to the meter.",
                true,
            ),
        ),
        (
            "Timeout",
            entry(
                "No response from meter. The port might be closed or the device is not properly connected.",
                true,
            ),
        ),
        ("LengthMismatch", entry(MSG_INVALID_MESSAGE, true)),
        ("SequenceError", entry(MSG_INVALID_MESSAGE, true)),
        ("InvalidData", entry(MSG_INVALID_MESSAGE, true)),
        (
            "CRCError",
            entry(
                "Invalid data received from meter. Try removing the splitter if you're using one.",
                true,
            ),
        ),
        (
            "IdentificationError",
            entry(
                "Error communicating with the meter. If the error persists contact customer support.",
                true,
            ),
        ),
        (
            "NegotiateError",
            entry(
                "The device had trouble negotiating with the meter. Try adjusting the placement of the device.",
                false,
            ),
        ),
        (
            "LogonError",
            entry(
                "Error while communicating with the meter. If the error persists it could be a hardware issue.",
                true,
            ),
        ),
        ("SecurityError", needs_key()),
        ("ReadError", entry("Error reading data from the meter.", true)),
        ("InvalidDeviceID", entry(MSG_CONTACT_SUPPORT, false)),
        ("InitializationError", entry(MSG_CONTACT_SUPPORT, false)),
        ("AssociationError", entry(MSG_CONTACT_SUPPORT, false)),
    ])
});

/// Classify a session error code. Total: unknown codes degrade to the generic
/// fatal disposition.
pub fn classify(error_code: &str) -> ErrorDisposition {
    match ERROR_TABLE.get(error_code) {
        Some(entry) => ErrorDisposition {
            error_code: error_code.to_string(),
            user_message: entry.message.to_string(),
            can_continue: entry.can_continue,
            redirect_target: entry.redirect_target,
        },
        None => ErrorDisposition::generic(),
    }
}

/// Every code the table knows about.
pub fn known_error_codes() -> impl Iterator<Item = &'static str> {
    ERROR_TABLE.keys().copied()
}
