use serde::Serialize;

use super::validation::ValidationError;

/// User-facing failure held in the onboarding state next to the step it
/// belongs to.
///
/// 引导流程中展示给用户的错误。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum OnboardingError {
    #[error("Error provisioning device, reset device and try again")]
    ProvisioningFailed,
    #[error("Could not load WiFi networks. Please try again.")]
    AccessPointsUnavailable,
    #[error("Failed to connect to WiFi")]
    WifiConnectFailed,
    #[error("Error getting device info")]
    DeviceInfoUnavailable,
    #[error("An error occurred. Please try again.")]
    BlinksPerKwhSaveFailed,
    #[error("Failed to set encryption key")]
    EncryptionKeySaveFailed,
    #[error("Failed to get device information")]
    KeyProfileLookupFailed,
    #[error("Could not add the device to your account. Please scan again.")]
    DeviceLinkFailed,
    #[error("The meter did not accept the encryption key. Check the key and try again.")]
    KeyNotAccepted,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl OnboardingError {
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, OnboardingError::Validation(_))
    }
}
