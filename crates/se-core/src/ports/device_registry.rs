use crate::{device::DeviceRecord, ids::DeviceId, ports::errors::DeviceRegistryError};
use async_trait::async_trait;

/// Device records owned by the Saveeye backend.
///
/// 设备注册表：由 SDK / 后端持有设备记录，核心只读。
#[async_trait]
pub trait DeviceRegistryPort: Send + Sync {
    /// 根据 device_id 查询设备
    async fn get_device_by_id(&self, id: &DeviceId) -> Result<DeviceRecord, DeviceRegistryError>;

    /// Whether the device already reports to the backend.
    async fn is_device_online(&self, id: &DeviceId) -> anyhow::Result<bool>;

    /// Link the device to the signed-in account.
    ///
    /// 绑定设备到当前账户
    async fn pair_device(&self, id: &DeviceId) -> anyhow::Result<()>;
}
