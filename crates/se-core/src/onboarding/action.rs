use crate::device::DeviceHandle;
use crate::ids::DeviceId;
use crate::navigation::NavigationRequest;
use crate::security::SecretString;

use super::key_form::EncryptionKeys;

/// Side effects requested by a transition. Executed by the orchestrator in
/// order.
///
/// 状态迁移产生的副作用。
#[derive(Debug, PartialEq)]
pub enum OnboardingAction {
    /// Ask the registry whether a scanned device already reports in.
    CheckDeviceOnline { device_id: DeviceId },

    /// Link an online device to the signed-in account.
    LinkDevice { device_id: DeviceId },

    /// Run device provisioning, streaming connection stages to the UI.
    ProvisionDevice { device_id: DeviceId },

    ListAccessPoints { device: DeviceHandle },

    /// Obtain a credential for a secured network through the prompt port.
    RequestCredential { ssid: String },

    ConnectWifi {
        device: DeviceHandle,
        ssid: String,
        credential: SecretString,
    },

    LookupDeviceProfile { device_id: DeviceId },

    SetBlinksPerKwh { device_id: DeviceId, value: u32 },

    SetEncryptionKey {
        device_id: DeviceId,
        keys: EncryptionKeys,
    },

    /// Start (or restart) the session poll loop for a device.
    StartSessionPolling { device_id: DeviceId },

    StopSessionPolling,

    Navigate(NavigationRequest),
}
