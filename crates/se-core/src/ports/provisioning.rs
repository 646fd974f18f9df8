use crate::{
    device::{ConnectionStage, DeviceHandle},
    ids::DeviceId,
};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

#[async_trait]
pub trait ProvisioningPort: Send + Sync {
    /// Provision a device over the local transport.
    ///
    /// Coarse progress is pushed to `stages` while the call runs; a closed
    /// receiver must not fail provisioning.
    async fn provision_device(
        &self,
        id: &DeviceId,
        stages: mpsc::UnboundedSender<ConnectionStage>,
    ) -> Result<DeviceHandle>;
}
