use serde::Serialize;

use crate::device::{AccessPoint, DeviceHandle};
use crate::ids::DeviceId;
use crate::navigation::Screen;

use super::error::OnboardingError;
use super::error_table::ErrorDisposition;
use super::key_form::EncryptionKeyForm;
use super::wait::{WaitContext, WaitMode};

/// Onboarding flow state.
///
/// 设备引导流程状态。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum OnboardingState {
    /// Nothing in flight.
    ///
    /// 空闲。
    #[default]
    Idle,

    /// Scanned device: checking whether it is online and linking it.
    ///
    /// 扫码后检查在线状态并绑定账户。
    Linking {
        device_id: DeviceId,
        error: Option<OnboardingError>,
    },

    /// Provisioning the device over the local transport.
    ///
    /// 配网中。
    Pairing {
        device_id: DeviceId,
        in_progress: bool,
        error: Option<OnboardingError>,
    },

    /// Choosing an access point and connecting the device to it.
    ///
    /// 选择 Wi-Fi 并连接。
    WifiConnecting {
        device: DeviceHandle,
        access_points: Vec<AccessPoint>,
        selected_ssid: Option<String>,
        connecting: bool,
        error: Option<OnboardingError>,
    },

    /// Looking up the device profile to pick the next step.
    ProfileBranch {
        device_id: DeviceId,
        error: Option<OnboardingError>,
    },

    /// Pulse meters: entering blinks per kWh.
    ///
    /// 输入每千瓦时脉冲数。
    BlinksPerKwhEntry {
        device_id: DeviceId,
        /// Raw input as typed.
        value: String,
        saving: bool,
        error: Option<OnboardingError>,
    },

    /// Entering meter encryption keys. `form` is `None` until the profile
    /// lookup resolves.
    ///
    /// 输入电表加密密钥。
    EncryptionKeyEntry {
        device_id: DeviceId,
        form: Option<EncryptionKeyForm>,
        saving: bool,
        error: Option<OnboardingError>,
    },

    /// Polling the onboarding session.
    ///
    /// 等待引导会话完成。
    OnboardingWait { wait: WaitContext },

    /// Polling while the device reports a firmware update.
    ///
    /// 固件升级中。
    FirmwareUpdating { wait: WaitContext },

    /// Onboarding finished.
    ///
    /// 完成。
    Done,

    /// Fatal device error; the user has to restart pairing.
    ///
    /// 致命错误，需要重新配对。
    Error {
        device_id: DeviceId,
        disposition: ErrorDisposition,
    },
}

impl OnboardingState {
    /// Variant name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            OnboardingState::Idle => "Idle",
            OnboardingState::Linking { .. } => "Linking",
            OnboardingState::Pairing { .. } => "Pairing",
            OnboardingState::WifiConnecting { .. } => "WifiConnecting",
            OnboardingState::ProfileBranch { .. } => "ProfileBranch",
            OnboardingState::BlinksPerKwhEntry { .. } => "BlinksPerKwhEntry",
            OnboardingState::EncryptionKeyEntry { .. } => "EncryptionKeyEntry",
            OnboardingState::OnboardingWait { .. } => "OnboardingWait",
            OnboardingState::FirmwareUpdating { .. } => "FirmwareUpdating",
            OnboardingState::Done => "Done",
            OnboardingState::Error { .. } => "Error",
        }
    }

    pub fn device_id(&self) -> Option<&DeviceId> {
        match self {
            OnboardingState::Idle | OnboardingState::Done => None,
            OnboardingState::Linking { device_id, .. }
            | OnboardingState::Pairing { device_id, .. }
            | OnboardingState::ProfileBranch { device_id, .. }
            | OnboardingState::BlinksPerKwhEntry { device_id, .. }
            | OnboardingState::EncryptionKeyEntry { device_id, .. }
            | OnboardingState::Error { device_id, .. } => Some(device_id),
            OnboardingState::WifiConnecting { device, .. } => Some(&device.device_id),
            OnboardingState::OnboardingWait { wait } | OnboardingState::FirmwareUpdating { wait } => {
                Some(&wait.device_id)
            }
        }
    }

    /// Screen that renders this state.
    pub fn screen(&self) -> Screen {
        match self {
            OnboardingState::Idle => Screen::Home,
            OnboardingState::Linking { .. } => Screen::QrScan,
            OnboardingState::Pairing { .. } => Screen::Pair,
            OnboardingState::WifiConnecting { .. } | OnboardingState::ProfileBranch { .. } => {
                Screen::ConnectWifi
            }
            OnboardingState::BlinksPerKwhEntry { .. } => Screen::BlinksPerKwh,
            OnboardingState::EncryptionKeyEntry { .. } => Screen::EncryptionKey,
            OnboardingState::OnboardingWait { wait } | OnboardingState::FirmwareUpdating { wait } => {
                match wait.mode {
                    WaitMode::Onboarding => Screen::OnboardingWait,
                    WaitMode::KeyVerification => Screen::EncryptionKey,
                }
            }
            OnboardingState::Done => Screen::Main,
            OnboardingState::Error { .. } => Screen::OnboardingWait,
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            OnboardingState::OnboardingWait { .. } | OnboardingState::FirmwareUpdating { .. }
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OnboardingState::Done | OnboardingState::Error { .. })
    }

    /// Message to show as the status line, if any.
    pub fn status_message(&self) -> Option<String> {
        match self {
            OnboardingState::Linking { error, .. }
            | OnboardingState::Pairing { error, .. }
            | OnboardingState::WifiConnecting { error, .. }
            | OnboardingState::ProfileBranch { error, .. }
            | OnboardingState::BlinksPerKwhEntry { error, .. }
            | OnboardingState::EncryptionKeyEntry { error, .. } => {
                error.as_ref().map(OnboardingError::user_message)
            }
            OnboardingState::OnboardingWait { wait } | OnboardingState::FirmwareUpdating { wait } => {
                wait.notice.as_ref().map(|notice| notice.user_message.clone())
            }
            OnboardingState::Error { disposition, .. } => Some(disposition.user_message.clone()),
            OnboardingState::Idle | OnboardingState::Done => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::classify;

    #[test]
    fn key_verification_wait_is_hosted_on_key_screen() {
        let wait = WaitContext::new(DeviceId::from("SE-1"), WaitMode::KeyVerification);
        let state = OnboardingState::OnboardingWait { wait };
        assert_eq!(state.screen(), Screen::EncryptionKey);
        assert!(state.is_waiting());
        assert_eq!(state.device_id(), Some(&DeviceId::from("SE-1")));
    }

    #[test]
    fn fatal_state_shows_disposition_message() {
        let state = OnboardingState::Error {
            device_id: DeviceId::from("SE-1"),
            disposition: classify("AssociationError"),
        };
        assert!(state.is_terminal());
        assert_eq!(
            state.status_message().as_deref(),
            Some("Couldn't read data from meter. Contact customer support.")
        );
    }

    #[test]
    fn name_omits_state_payload() {
        let wait = WaitContext::new(DeviceId::from("SE-1"), WaitMode::Onboarding);
        assert_eq!(OnboardingState::OnboardingWait { wait }.name(), "OnboardingWait");
        assert_eq!(OnboardingState::Idle.name(), "Idle");
    }
}
