use crate::{ids::DeviceId, onboarding::EncryptionKeys};
use anyhow::Result;
use async_trait::async_trait;

/// Meter-side settings written through the SDK.
///
/// 写入设备的电表配置。
#[async_trait]
pub trait DeviceConfigPort: Send + Sync {
    async fn set_blinks_per_kwh(&self, id: &DeviceId, blinks_per_kwh: u32) -> Result<()>;

    async fn set_encryption_key(&self, id: &DeviceId, keys: &EncryptionKeys) -> Result<()>;
}
