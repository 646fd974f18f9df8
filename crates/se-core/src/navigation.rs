//! Navigation targets requested by the onboarding flow.
//!
//! The core never renders; it only asks the navigation sink to move.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::DeviceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Screen {
    Home,
    QrScan,
    Pair,
    ConnectWifi,
    BlinksPerKwh,
    OnboardingWait,
    EncryptionKey,
    Main,
}

impl Screen {
    /// Route name used by the navigation stack.
    pub fn route_name(self) -> &'static str {
        match self {
            Screen::Home => "Home",
            Screen::QrScan => "QR",
            Screen::Pair => "Pair",
            Screen::ConnectWifi => "ConnectWifi",
            Screen::BlinksPerKwh => "BlinksPerKwh",
            Screen::OnboardingWait => "OnboardingWait",
            Screen::EncryptionKey => "EncryptionKey",
            Screen::Main => "Main",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route_name())
    }
}

/// A screen transition plus its route parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub screen: Screen,
    pub device_id: Option<DeviceId>,
}

impl NavigationRequest {
    pub fn to(screen: Screen) -> Self {
        Self {
            screen,
            device_id: None,
        }
    }

    pub fn with_device(screen: Screen, device_id: DeviceId) -> Self {
        Self {
            screen,
            device_id: Some(device_id),
        }
    }
}
