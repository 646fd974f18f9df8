use serde::{Deserialize, Serialize};

/// Coarse provisioning progress reported by the SDK while pairing runs.
///
/// 配网过程中 SDK 上报的连接阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStage {
    None,
    Searching,
    Pairing,
    Paired,
    FetchedDeviceConfig,
    Connected,
}

impl ConnectionStage {
    /// Status line shown on the pairing screen.
    pub fn status_message(self) -> &'static str {
        match self {
            ConnectionStage::Searching => "Searching for device",
            ConnectionStage::Pairing => "Pairing with device",
            ConnectionStage::Paired => "Device paired successfully",
            ConnectionStage::FetchedDeviceConfig => "Fetched device configuration",
            ConnectionStage::Connected => "Device connected",
            ConnectionStage::None => "Initializing...",
        }
    }
}
