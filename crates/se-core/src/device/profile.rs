//! Device-type profile.
//!
//! The profile identifies the metering hardware family and decides which
//! post-Wi-Fi branch and which encryption-key sub-form apply.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer hardware profile reported by the SDK (known values: 1, 2, 4, 5, 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceProfile(u8);

/// Encryption-key sub-form selected by profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFormKind {
    /// Profile 4: a single optical key.
    Optical,
    /// Profile 5: a 20 character MEP key.
    Mep,
    /// Profile 6: GPK60 and GPK61, 32 characters each.
    Gpk,
    /// Any other profile: nothing to enter, all keys are sent empty.
    NoKey,
}

impl DeviceProfile {
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    /// LED pulse meters (profiles 1 and 2) need a blinks-per-kWh setting.
    pub fn needs_blinks_per_kwh(self) -> bool {
        matches!(self.0, 1 | 2)
    }

    pub fn key_form(self) -> KeyFormKind {
        match self.0 {
            4 => KeyFormKind::Optical,
            5 => KeyFormKind::Mep,
            6 => KeyFormKind::Gpk,
            _ => KeyFormKind::NoKey,
        }
    }
}

impl From<u8> for DeviceProfile {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
