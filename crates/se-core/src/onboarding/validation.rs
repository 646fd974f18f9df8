//! Input validation for the onboarding forms.
//!
//! Validation failures are surfaced next to the offending field and never
//! advance the state machine.

use serde::Serialize;
use std::fmt;
use std::num::{IntErrorKind, ParseIntError};

pub const MEP_KEY_LEN: usize = 20;
pub const GPK_KEY_LEN: usize = 32;

/// Which of the two GPK keys a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum GpkSlot {
    Gpk60,
    Gpk61,
}

impl fmt::Display for GpkSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpkSlot::Gpk60 => f.write_str("GPK60"),
            GpkSlot::Gpk61 => f.write_str("GPK61"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum ValidationError {
    #[error("Blinks per kWh must be a higher number than 0.")]
    BlinksPerKwhNotPositive,
    #[error("Blinks per kWh must be a whole number.")]
    BlinksPerKwhNotANumber,
    #[error("Blinks per kWh must not be higher than {}.", u32::MAX)]
    BlinksPerKwhTooLarge,
    #[error("MEP key must be exactly 20 characters long")]
    MepKeyLength { actual: usize },
    #[error("{slot} key must be exactly 32 characters long")]
    GpkKeyLength { slot: GpkSlot, actual: usize },
    #[error("Optical key must not be empty")]
    OpticalKeyEmpty,
    #[error("Password must not be empty")]
    WifiCredentialEmpty,
}

/// Parse the blinks-per-kWh field. Empty input counts as 0.
pub fn validate_blinks_per_kwh(raw: &str) -> Result<u32, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlinksPerKwhNotPositive);
    }

    let value: i64 = trimmed.parse().map_err(|err: ParseIntError| match err.kind() {
        IntErrorKind::PosOverflow => ValidationError::BlinksPerKwhTooLarge,
        IntErrorKind::NegOverflow => ValidationError::BlinksPerKwhNotPositive,
        _ => ValidationError::BlinksPerKwhNotANumber,
    })?;
    if value <= 0 {
        return Err(ValidationError::BlinksPerKwhNotPositive);
    }
    u32::try_from(value).map_err(|_| ValidationError::BlinksPerKwhTooLarge)
}

pub fn validate_mep_key(key: &str) -> Result<(), ValidationError> {
    let actual = key.chars().count();
    if actual != MEP_KEY_LEN {
        return Err(ValidationError::MepKeyLength { actual });
    }
    Ok(())
}

pub fn validate_gpk_key(slot: GpkSlot, key: &str) -> Result<(), ValidationError> {
    let actual = key.chars().count();
    if actual != GPK_KEY_LEN {
        return Err(ValidationError::GpkKeyLength { slot, actual });
    }
    Ok(())
}

/// No length rule for optical keys beyond being present.
pub fn validate_optical_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::OpticalKeyEmpty);
    }
    Ok(())
}

pub fn validate_wifi_credential(credential: &str) -> Result<(), ValidationError> {
    if credential.is_empty() {
        return Err(ValidationError::WifiCredentialEmpty);
    }
    Ok(())
}
