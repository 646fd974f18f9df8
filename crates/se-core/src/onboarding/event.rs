use crate::device::{AccessPoint, DeviceHandle, DeviceProfile};
use crate::ids::DeviceId;
use crate::security::SecretString;

use super::key_form::KeyField;
use super::session::OnboardingSession;

/// Events that drive the onboarding flow.
///
/// User intents come from the screens; result events are produced by the
/// orchestrator after executing an action.
///
/// 驱动引导流程的事件：用户操作与副作用结果。
#[derive(Debug, PartialEq)]
pub enum OnboardingEvent {
    // Scan entry
    DeviceScanned { device_id: DeviceId },
    DeviceOnlineChecked { online: bool },
    DeviceLinked,
    DeviceLinkFailed,

    // Pairing
    StartPairing { device_id: DeviceId },
    RetryPairing,
    ProvisioningSucceeded { device: DeviceHandle },
    ProvisioningFailed,

    // Wi-Fi
    AccessPointsListed { access_points: Vec<AccessPoint> },
    AccessPointsUnavailable,
    RefreshAccessPoints,
    SelectAccessPoint { ssid: String },
    CredentialProvided { credential: SecretString },
    CredentialDismissed,
    WifiConnected,
    WifiConnectFailed,

    // Profile branch
    DeviceProfileResolved { profile: DeviceProfile },
    DeviceProfileLookupFailed,
    RetryProfileLookup,

    // Blinks per kWh
    EditBlinksPerKwh { value: String },
    SubmitBlinksPerKwh,
    BlinksPerKwhSaved,
    BlinksPerKwhSaveFailed,

    // Encryption keys
    EditEncryptionKey { field: KeyField, value: String },
    BlurEncryptionKey { field: KeyField },
    SubmitEncryptionKeys,
    EncryptionKeysSaved,
    EncryptionKeysSaveFailed,

    // Session polling
    SessionPolled {
        session: OnboardingSession,
        observed_at_ms: i64,
    },

    // Control
    Cancel,
}

impl OnboardingEvent {
    /// Short name used in spans and logs. Never includes payloads.
    pub fn name(&self) -> &'static str {
        match self {
            OnboardingEvent::DeviceScanned { .. } => "DeviceScanned",
            OnboardingEvent::DeviceOnlineChecked { .. } => "DeviceOnlineChecked",
            OnboardingEvent::DeviceLinked => "DeviceLinked",
            OnboardingEvent::DeviceLinkFailed => "DeviceLinkFailed",
            OnboardingEvent::StartPairing { .. } => "StartPairing",
            OnboardingEvent::RetryPairing => "RetryPairing",
            OnboardingEvent::ProvisioningSucceeded { .. } => "ProvisioningSucceeded",
            OnboardingEvent::ProvisioningFailed => "ProvisioningFailed",
            OnboardingEvent::AccessPointsListed { .. } => "AccessPointsListed",
            OnboardingEvent::AccessPointsUnavailable => "AccessPointsUnavailable",
            OnboardingEvent::RefreshAccessPoints => "RefreshAccessPoints",
            OnboardingEvent::SelectAccessPoint { .. } => "SelectAccessPoint",
            OnboardingEvent::CredentialProvided { .. } => "CredentialProvided",
            OnboardingEvent::CredentialDismissed => "CredentialDismissed",
            OnboardingEvent::WifiConnected => "WifiConnected",
            OnboardingEvent::WifiConnectFailed => "WifiConnectFailed",
            OnboardingEvent::DeviceProfileResolved { .. } => "DeviceProfileResolved",
            OnboardingEvent::DeviceProfileLookupFailed => "DeviceProfileLookupFailed",
            OnboardingEvent::RetryProfileLookup => "RetryProfileLookup",
            OnboardingEvent::EditBlinksPerKwh { .. } => "EditBlinksPerKwh",
            OnboardingEvent::SubmitBlinksPerKwh => "SubmitBlinksPerKwh",
            OnboardingEvent::BlinksPerKwhSaved => "BlinksPerKwhSaved",
            OnboardingEvent::BlinksPerKwhSaveFailed => "BlinksPerKwhSaveFailed",
            OnboardingEvent::EditEncryptionKey { .. } => "EditEncryptionKey",
            OnboardingEvent::BlurEncryptionKey { .. } => "BlurEncryptionKey",
            OnboardingEvent::SubmitEncryptionKeys => "SubmitEncryptionKeys",
            OnboardingEvent::EncryptionKeysSaved => "EncryptionKeysSaved",
            OnboardingEvent::EncryptionKeysSaveFailed => "EncryptionKeysSaveFailed",
            OnboardingEvent::SessionPolled { .. } => "SessionPolled",
            OnboardingEvent::Cancel => "Cancel",
        }
    }
}
