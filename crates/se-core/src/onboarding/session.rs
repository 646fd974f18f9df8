//! Onboarding session snapshot as returned by the session query service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-side status of an onboarding session.
///
/// Statuses the flow does not branch on are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OnboardingSessionStatus {
    Done,
    FirmwareUpdateInProgress,
    ErrorMessages,
    Other(String),
}

impl OnboardingSessionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OnboardingSessionStatus::Done => "Done",
            OnboardingSessionStatus::FirmwareUpdateInProgress => "FirmwareUpdateInProgress",
            OnboardingSessionStatus::ErrorMessages => "ErrorMessages",
            OnboardingSessionStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for OnboardingSessionStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Done" => OnboardingSessionStatus::Done,
            "FirmwareUpdateInProgress" => OnboardingSessionStatus::FirmwareUpdateInProgress,
            "ErrorMessages" => OnboardingSessionStatus::ErrorMessages,
            _ => OnboardingSessionStatus::Other(raw),
        }
    }
}

impl From<&str> for OnboardingSessionStatus {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<OnboardingSessionStatus> for String {
    fn from(status: OnboardingSessionStatus) -> Self {
        match status {
            OnboardingSessionStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for OnboardingSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One poll result. Never persisted by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingSession {
    pub status: OnboardingSessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_progress: Option<u8>,
}

impl OnboardingSession {
    pub fn with_status(status: impl Into<OnboardingSessionStatus>) -> Self {
        Self {
            status: status.into(),
            error_code: None,
            firmware_progress: None,
        }
    }

    pub fn done() -> Self {
        Self::with_status(OnboardingSessionStatus::Done)
    }

    pub fn firmware_update(progress: Option<u8>) -> Self {
        Self {
            status: OnboardingSessionStatus::FirmwareUpdateInProgress,
            error_code: None,
            firmware_progress: progress,
        }
    }

    pub fn error(code: impl Into<String>) -> Self {
        Self {
            status: OnboardingSessionStatus::ErrorMessages,
            error_code: Some(code.into()),
            firmware_progress: None,
        }
    }

    /// Error code to classify, if this snapshot reports one.
    ///
    /// Only `ErrorMessages` snapshots with a non-empty code count; anything
    /// else is an intermediate state.
    pub fn reported_error(&self) -> Option<&str> {
        match (&self.status, self.error_code.as_deref()) {
            (OnboardingSessionStatus::ErrorMessages, Some(code)) if !code.is_empty() => Some(code),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == OnboardingSessionStatus::Done
    }

    pub fn is_firmware_updating(&self) -> bool {
        self.status == OnboardingSessionStatus::FirmwareUpdateInProgress
    }
}
