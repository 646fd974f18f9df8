use serde::{Deserialize, Serialize};

/// Authentication mode advertised by an access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WifiAuthMode {
    Open,
    Wep,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
    Wpa2Enterprise,
    Wpa3Psk,
    Wpa2Wpa3Psk,
}

impl WifiAuthMode {
    pub fn is_open(self) -> bool {
        matches!(self, WifiAuthMode::Open)
    }
}

/// An access point visible to the device during provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPoint {
    pub ssid: String,
    pub auth_mode: WifiAuthMode,
    #[serde(default)]
    pub rssi: Option<i16>,
}

impl AccessPoint {
    pub fn new(ssid: impl Into<String>, auth_mode: WifiAuthMode) -> Self {
        Self {
            ssid: ssid.into(),
            auth_mode,
            rssi: None,
        }
    }

    /// Secured networks show a lock and need a credential before connecting.
    pub fn requires_credential(&self) -> bool {
        !self.auth_mode.is_open()
    }
}
