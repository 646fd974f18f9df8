use crate::{
    device::{AccessPoint, DeviceHandle},
    security::SecretString,
};
use anyhow::Result;
use async_trait::async_trait;

/// Wi-Fi operations on a provisioned device.
#[async_trait]
pub trait WifiPort: Send + Sync {
    async fn list_access_points(&self, device: &DeviceHandle) -> Result<Vec<AccessPoint>>;

    /// Open networks are joined with an empty credential.
    async fn connect_to_wifi(
        &self,
        device: &DeviceHandle,
        ssid: &str,
        credential: &SecretString,
    ) -> Result<()>;
}
