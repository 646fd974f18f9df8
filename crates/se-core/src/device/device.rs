use serde::{Deserialize, Serialize};

use super::DeviceProfile;
use crate::ids::DeviceId;

/// Device type block of an SDK device record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceType {
    pub profile: DeviceProfile,
}

/// Read-only view of the SDK device record returned by `getDeviceById`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub id: DeviceId,
    pub device_type: DeviceType,
}

impl DeviceRecord {
    pub fn new(id: DeviceId, profile: DeviceProfile) -> Self {
        Self {
            id,
            device_type: DeviceType { profile },
        }
    }

    pub fn profile(&self) -> DeviceProfile {
        self.device_type.profile
    }
}

/// Handle to a provisioned device, returned by the provisioning service and
/// required by every Wi-Fi call.
///
/// 配网成功后得到的设备句柄。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceHandle {
    pub device_id: DeviceId,
    /// Transport name assigned by the provisioning layer (e.g. the BLE name).
    pub transport_name: String,
}
