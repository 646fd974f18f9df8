use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use se_core::{
    config::SdkSettings,
    device::{AccessPoint, ConnectionStage, DeviceHandle, DeviceProfile, DeviceRecord, WifiAuthMode},
    ids::DeviceId,
    onboarding::{EncryptionKeys, OnboardingSession},
    ports::{
        DeviceConfigPort, DeviceRegistryError, DeviceRegistryPort, OnboardingSessionPort,
        ProvisioningPort, WifiPort,
    },
    security::SecretString,
};

use super::scenario::{Scenario, UnknownScenario};
use super::script::{SessionScript, SessionStep};

const DEFAULT_PROFILE: u8 = 6;

const PROVISIONING_STAGES: [ConnectionStage; 5] = [
    ConnectionStage::Searching,
    ConnectionStage::Pairing,
    ConnectionStage::Paired,
    ConnectionStage::FetchedDeviceConfig,
    ConnectionStage::Connected,
];

#[derive(Debug, Clone)]
pub struct SimulatedSdkConfig {
    pub profile: DeviceProfile,
    pub online: bool,
    /// Added before every call answers.
    pub latency: Duration,
    pub access_points: Vec<AccessPoint>,
    pub script: SessionScript,
}

impl Default for SimulatedSdkConfig {
    fn default() -> Self {
        Self {
            profile: DeviceProfile::new(DEFAULT_PROFILE),
            online: false,
            latency: Duration::ZERO,
            access_points: vec![
                AccessPoint {
                    ssid: "Home".to_string(),
                    auth_mode: WifiAuthMode::Wpa2Psk,
                    rssi: Some(-48),
                },
                AccessPoint {
                    ssid: "Guest".to_string(),
                    auth_mode: WifiAuthMode::Open,
                    rssi: Some(-71),
                },
            ],
            script: Scenario::default().script(),
        }
    }
}

impl SimulatedSdkConfig {
    /// Build from the `[sdk]` section. `script` files are loaded by the caller.
    pub fn from_settings(settings: &SdkSettings) -> Result<Self, UnknownScenario> {
        let scenario: Scenario = settings.scenario.parse()?;
        Ok(Self {
            profile: DeviceProfile::new(settings.device_profile.unwrap_or(DEFAULT_PROFILE)),
            online: settings.device_online,
            latency: Duration::from_millis(settings.latency_ms),
            script: scenario.script(),
            ..Self::default()
        })
    }
}

/// SDK call as recorded by [`SimulatedSdk`]. Secrets are never recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkCall {
    GetDeviceById(DeviceId),
    IsDeviceOnline(DeviceId),
    PairDevice(DeviceId),
    ProvisionDevice(DeviceId),
    ListAccessPoints(DeviceId),
    ConnectWifi { ssid: String },
    SetBlinksPerKwh(u32),
    SetEncryptionKey(DeviceId),
    GetOnboardingSession(DeviceId),
}

#[derive(Debug, Default)]
struct SimState {
    calls: Vec<SdkCall>,
    keys_set: bool,
    before_cursor: usize,
    after_cursor: usize,
}

/// Implements every SDK port in memory.
#[derive(Debug)]
pub struct SimulatedSdk {
    config: SimulatedSdkConfig,
    state: Mutex<SimState>,
}

impl SimulatedSdk {
    pub fn new(config: SimulatedSdkConfig) -> Self {
        Self {
            config,
            state: Mutex::new(SimState::default()),
        }
    }

    pub fn config(&self) -> &SimulatedSdkConfig {
        &self.config
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<SdkCall> {
        self.lock_state().calls.clone()
    }

    pub fn session_queries(&self) -> usize {
        self.lock_state()
            .calls
            .iter()
            .filter(|call| matches!(call, SdkCall::GetOnboardingSession(_)))
            .count()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: SdkCall) {
        debug!(?call, "simulated sdk call");
        self.lock_state().calls.push(call);
    }

    async fn delay(&self) {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
    }

    fn next_step(&self) -> SessionStep {
        let mut state = self.lock_state();
        let script = &self.config.script;
        let (steps, cursor) = if state.keys_set && !script.after_keys.is_empty() {
            (&script.after_keys, state.after_cursor)
        } else {
            (&script.before_keys, state.before_cursor)
        };
        let Some(last) = steps.len().checked_sub(1) else {
            return SessionStep::Snapshot(OnboardingSession::with_status("Connecting"));
        };
        let step = steps[cursor.min(last)].clone();
        if state.keys_set && !script.after_keys.is_empty() {
            state.after_cursor += 1;
        } else {
            state.before_cursor += 1;
        }
        step
    }
}

#[async_trait]
impl DeviceRegistryPort for SimulatedSdk {
    async fn get_device_by_id(&self, id: &DeviceId) -> Result<DeviceRecord, DeviceRegistryError> {
        self.record(SdkCall::GetDeviceById(id.clone()));
        self.delay().await;
        if !id.is_valid() {
            return Err(DeviceRegistryError::NotFound);
        }
        Ok(DeviceRecord::new(id.clone(), self.config.profile))
    }

    async fn is_device_online(&self, id: &DeviceId) -> Result<bool> {
        self.record(SdkCall::IsDeviceOnline(id.clone()));
        self.delay().await;
        Ok(self.config.online)
    }

    async fn pair_device(&self, id: &DeviceId) -> Result<()> {
        self.record(SdkCall::PairDevice(id.clone()));
        self.delay().await;
        info!(device_id = %id, "simulated device linked to account");
        Ok(())
    }
}

#[async_trait]
impl ProvisioningPort for SimulatedSdk {
    async fn provision_device(
        &self,
        id: &DeviceId,
        stages: mpsc::UnboundedSender<ConnectionStage>,
    ) -> Result<DeviceHandle> {
        self.record(SdkCall::ProvisionDevice(id.clone()));
        for stage in PROVISIONING_STAGES {
            // The receiver may already be gone; provisioning carries on.
            let _ = stages.send(stage);
            self.delay().await;
        }
        Ok(DeviceHandle {
            device_id: id.clone(),
            transport_name: format!("PROV_{id}"),
        })
    }
}

#[async_trait]
impl WifiPort for SimulatedSdk {
    async fn list_access_points(&self, device: &DeviceHandle) -> Result<Vec<AccessPoint>> {
        self.record(SdkCall::ListAccessPoints(device.device_id.clone()));
        self.delay().await;
        Ok(self.config.access_points.clone())
    }

    async fn connect_to_wifi(
        &self,
        _device: &DeviceHandle,
        ssid: &str,
        credential: &SecretString,
    ) -> Result<()> {
        self.record(SdkCall::ConnectWifi {
            ssid: ssid.to_string(),
        });
        self.delay().await;
        let access_point = self
            .config
            .access_points
            .iter()
            .find(|ap| ap.ssid == ssid)
            .ok_or_else(|| anyhow!("access point {ssid:?} is out of range"))?;
        if access_point.requires_credential() && credential.is_empty() {
            bail!("access point {ssid:?} rejected an empty credential");
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceConfigPort for SimulatedSdk {
    async fn set_blinks_per_kwh(&self, _id: &DeviceId, blinks_per_kwh: u32) -> Result<()> {
        self.record(SdkCall::SetBlinksPerKwh(blinks_per_kwh));
        self.delay().await;
        Ok(())
    }

    async fn set_encryption_key(&self, id: &DeviceId, _keys: &EncryptionKeys) -> Result<()> {
        self.record(SdkCall::SetEncryptionKey(id.clone()));
        self.delay().await;
        let mut state = self.lock_state();
        state.keys_set = true;
        state.after_cursor = 0;
        Ok(())
    }
}

#[async_trait]
impl OnboardingSessionPort for SimulatedSdk {
    async fn get_onboarding_session(&self, id: &DeviceId) -> Result<OnboardingSession> {
        self.record(SdkCall::GetOnboardingSession(id.clone()));
        self.delay().await;
        match self.next_step() {
            SessionStep::Snapshot(session) => Ok(session),
            SessionStep::Fail { fail } => Err(anyhow!(fail)),
        }
    }
}
