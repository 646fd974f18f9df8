//! Onboarding orchestrator.
//!
//! This module drives the onboarding state machine and executes its side
//! effects through the SDK, navigation and prompt ports.
//!
//! 引导编排器：驱动状态机并执行副作用。

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use se_core::{
    config::OnboardingSettings,
    device::ConnectionStage,
    ids::DeviceId,
    onboarding::{
        KeyField, OnboardingAction, OnboardingEvent, OnboardingPolicy, OnboardingSession,
        OnboardingState, OnboardingStateMachine,
    },
    ports::{
        ClockPort, CredentialPromptPort, DeviceConfigPort, DeviceRegistryPort, NavigationPort,
        OnboardingEventPort, OnboardingSessionPort, ProvisioningPort, WifiPort,
    },
};

use super::context::OnboardingContext;
use super::poller::{PollControl, PollHandle, SessionPoller, SessionSnapshotSink};

/// Errors produced by the onboarding orchestrator.
///
/// SDK failures never surface here; they become events and end up in the
/// state as user-facing messages.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingOrchestratorError {
    #[error("navigation failed: {0}")]
    Navigation(#[source] anyhow::Error),
    #[error("invalid device id: {0:?}")]
    InvalidDeviceId(String),
}

/// Ports the orchestrator depends on.
#[derive(Clone)]
pub struct OnboardingPorts {
    pub registry: Arc<dyn DeviceRegistryPort>,
    pub provisioning: Arc<dyn ProvisioningPort>,
    pub wifi: Arc<dyn WifiPort>,
    pub device_config: Arc<dyn DeviceConfigPort>,
    pub session: Arc<dyn OnboardingSessionPort>,
    pub navigation: Arc<dyn NavigationPort>,
    pub credential_prompt: Arc<dyn CredentialPromptPort>,
    pub events: Arc<dyn OnboardingEventPort>,
    pub clock: Arc<dyn ClockPort>,
}

struct ActivePoll {
    generation: u64,
    _handle: PollHandle,
}

struct OrchestratorInner {
    context: OnboardingContext,
    machine: OnboardingStateMachine,
    ports: OnboardingPorts,
    poller: SessionPoller,
    active_poll: StdMutex<Option<ActivePoll>>,
    poll_generation: AtomicU64,
}

/// Orchestrator that drives onboarding state and side effects.
///
/// Cheap to clone; clones share the same flow.
#[derive(Clone)]
pub struct OnboardingOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl OnboardingOrchestrator {
    pub fn new(ports: OnboardingPorts, settings: &OnboardingSettings) -> Self {
        let poller = SessionPoller::new(
            ports.session.clone(),
            Duration::from_millis(settings.poll_interval_ms),
        );
        Self {
            inner: Arc::new(OrchestratorInner {
                context: OnboardingContext::default(),
                machine: OnboardingStateMachine::new(OnboardingPolicy::from(settings)),
                ports,
                poller,
                active_poll: StdMutex::new(None),
                poll_generation: AtomicU64::new(0),
            }),
        }
    }

    /// A device code was scanned.
    pub async fn scan_device(
        &self,
        device_id: DeviceId,
    ) -> Result<OnboardingState, OnboardingOrchestratorError> {
        if !device_id.is_valid() {
            return Err(OnboardingOrchestratorError::InvalidDeviceId(
                device_id.into_inner(),
            ));
        }
        self.dispatch(OnboardingEvent::DeviceScanned { device_id })
            .await
    }

    pub async fn start_pairing(
        &self,
        device_id: DeviceId,
    ) -> Result<OnboardingState, OnboardingOrchestratorError> {
        if !device_id.is_valid() {
            return Err(OnboardingOrchestratorError::InvalidDeviceId(
                device_id.into_inner(),
            ));
        }
        self.dispatch(OnboardingEvent::StartPairing { device_id })
            .await
    }

    pub async fn retry_pairing(&self) -> Result<OnboardingState, OnboardingOrchestratorError> {
        self.dispatch(OnboardingEvent::RetryPairing).await
    }

    pub async fn refresh_access_points(
        &self,
    ) -> Result<OnboardingState, OnboardingOrchestratorError> {
        self.dispatch(OnboardingEvent::RefreshAccessPoints).await
    }

    pub async fn select_access_point(
        &self,
        ssid: String,
    ) -> Result<OnboardingState, OnboardingOrchestratorError> {
        self.dispatch(OnboardingEvent::SelectAccessPoint { ssid })
            .await
    }

    pub async fn retry_profile_lookup(
        &self,
    ) -> Result<OnboardingState, OnboardingOrchestratorError> {
        self.dispatch(OnboardingEvent::RetryProfileLookup).await
    }

    pub async fn edit_blinks_per_kwh(
        &self,
        value: String,
    ) -> Result<OnboardingState, OnboardingOrchestratorError> {
        self.dispatch(OnboardingEvent::EditBlinksPerKwh { value })
            .await
    }

    pub async fn submit_blinks_per_kwh(
        &self,
    ) -> Result<OnboardingState, OnboardingOrchestratorError> {
        self.dispatch(OnboardingEvent::SubmitBlinksPerKwh).await
    }

    pub async fn edit_encryption_key(
        &self,
        field: KeyField,
        value: String,
    ) -> Result<OnboardingState, OnboardingOrchestratorError> {
        self.dispatch(OnboardingEvent::EditEncryptionKey { field, value })
            .await
    }

    pub async fn blur_encryption_key(
        &self,
        field: KeyField,
    ) -> Result<OnboardingState, OnboardingOrchestratorError> {
        self.dispatch(OnboardingEvent::BlurEncryptionKey { field })
            .await
    }

    pub async fn submit_encryption_keys(
        &self,
    ) -> Result<OnboardingState, OnboardingOrchestratorError> {
        self.dispatch(OnboardingEvent::SubmitEncryptionKeys).await
    }

    /// The user left the flow.
    ///
    /// Invalidates the current attempt and resets the state without waiting
    /// for the dispatch lock, so an SDK call in flight is abandoned instead of
    /// finishing the flow. Safe to call from inside a port callback.
    pub async fn cancel(&self) -> Result<OnboardingState, OnboardingOrchestratorError> {
        let inner = &self.inner;
        let (state, actions) = inner
            .context
            .invalidate_attempt(|state| {
                let (next, actions) = inner.machine.transition(state.clone(), OnboardingEvent::Cancel);
                *state = next.clone();
                (next, actions)
            })
            .await;
        inner.stop_polling();
        info!(to = state.name(), "onboarding cancelled");
        inner.ports.events.emit_state_changed(&state).await;

        let attempt = inner.context.attempt();
        inner.execute_actions(actions, &attempt).await?;
        Ok(state)
    }

    pub async fn get_state(&self) -> OnboardingState {
        self.inner.context.get_state().await
    }

    /// Whether a session poll loop is currently running.
    pub fn is_polling(&self) -> bool {
        self.inner
            .active_poll
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    pub async fn dispatch(
        &self,
        event: OnboardingEvent,
    ) -> Result<OnboardingState, OnboardingOrchestratorError> {
        let _dispatch_guard = self.inner.context.acquire_dispatch_lock().await;
        self.inner.dispatch_locked(event).await
    }
}

impl OrchestratorInner {
    /// Apply `event` and every follow-up event it produces, FIFO.
    ///
    /// Must be called with the dispatch lock held.
    async fn dispatch_locked(
        self: &Arc<Self>,
        event: OnboardingEvent,
    ) -> Result<OnboardingState, OnboardingOrchestratorError> {
        let attempt = self.context.attempt();
        let span = info_span!("usecase.onboarding_orchestrator.dispatch", event = event.name());
        async {
            let mut current = self.context.get_state().await;
            let mut pending_events = VecDeque::from([event]);

            while let Some(event) = pending_events.pop_front() {
                let event_name = event.name();
                let from = current.name();
                debug!(state = ?current, event = %event_name, "onboarding applying event");
                let (next, actions) = self.machine.transition(current, event);
                info!(from, to = next.name(), event = %event_name, "onboarding state transition");
                debug!(state = ?next, "onboarding state after transition");

                {
                    let Some(mut state) = self.context.lock_current(&attempt).await else {
                        debug!(event = %event_name, "attempt invalidated; dropping transition");
                        return Ok(self.context.get_state().await);
                    };
                    *state = next.clone();
                }
                if self.context.is_current(&attempt) {
                    self.ports.events.emit_state_changed(&next).await;
                }

                let follow_up_events = self.execute_actions(actions, &attempt).await?;
                if !self.context.is_current(&attempt) {
                    debug!(event = %event_name, "attempt invalidated during actions");
                    return Ok(self.context.get_state().await);
                }
                current = next;
                pending_events.extend(follow_up_events);
            }

            Ok(current)
        }
        .instrument(span)
        .await
    }

    async fn execute_actions(
        self: &Arc<Self>,
        actions: Vec<OnboardingAction>,
        attempt: &CancellationToken,
    ) -> Result<Vec<OnboardingEvent>, OnboardingOrchestratorError> {
        let mut follow_up_events = Vec::new();
        for action in actions {
            if attempt.is_cancelled() {
                debug!("attempt invalidated; skipping remaining actions");
                break;
            }
            debug!(?action, "onboarding executing action");
            let follow_up = match action {
                OnboardingAction::CheckDeviceOnline { device_id } => {
                    guarded(attempt, self.ports.registry.is_device_online(&device_id))
                        .await
                        .map(|result| {
                            let online = result.unwrap_or_else(|err| {
                                warn!(
                                    device_id = %device_id,
                                    error = %err,
                                    "online check failed; falling back to pairing"
                                );
                                false
                            });
                            OnboardingEvent::DeviceOnlineChecked { online }
                        })
                }
                OnboardingAction::LinkDevice { device_id } => {
                    guarded(attempt, self.ports.registry.pair_device(&device_id))
                        .await
                        .map(|result| match result {
                            Ok(()) => OnboardingEvent::DeviceLinked,
                            Err(err) => {
                                error!(device_id = %device_id, error = %err, "link device failed");
                                OnboardingEvent::DeviceLinkFailed
                            }
                        })
                }
                OnboardingAction::ProvisionDevice { device_id } => {
                    let (stages_tx, stages_rx) = mpsc::unbounded_channel();
                    self.spawn_stage_forwarder(stages_rx);
                    guarded(
                        attempt,
                        self.ports.provisioning.provision_device(&device_id, stages_tx),
                    )
                    .await
                    .map(|result| match result {
                        Ok(device) => OnboardingEvent::ProvisioningSucceeded { device },
                        Err(err) => {
                            error!(device_id = %device_id, error = %err, "provisioning failed");
                            OnboardingEvent::ProvisioningFailed
                        }
                    })
                }
                OnboardingAction::ListAccessPoints { device } => {
                    guarded(attempt, self.ports.wifi.list_access_points(&device))
                        .await
                        .map(|result| match result {
                            Ok(access_points) => {
                                OnboardingEvent::AccessPointsListed { access_points }
                            }
                            Err(err) => {
                                warn!(error = %err, "list access points failed");
                                OnboardingEvent::AccessPointsUnavailable
                            }
                        })
                }
                OnboardingAction::RequestCredential { ssid } => {
                    guarded(attempt, self.ports.credential_prompt.request_credential(&ssid))
                        .await
                        .map(|result| match result {
                            Ok(Some(credential)) => {
                                OnboardingEvent::CredentialProvided { credential }
                            }
                            Ok(None) => OnboardingEvent::CredentialDismissed,
                            Err(err) => {
                                warn!(ssid = %ssid, error = %err, "credential prompt failed");
                                OnboardingEvent::CredentialDismissed
                            }
                        })
                }
                OnboardingAction::ConnectWifi {
                    device,
                    ssid,
                    credential,
                } => guarded(
                    attempt,
                    self.ports.wifi.connect_to_wifi(&device, &ssid, &credential),
                )
                .await
                .map(|result| match result {
                    Ok(()) => OnboardingEvent::WifiConnected,
                    Err(err) => {
                        error!(ssid = %ssid, error = %err, "wifi connect failed");
                        OnboardingEvent::WifiConnectFailed
                    }
                }),
                OnboardingAction::LookupDeviceProfile { device_id } => {
                    guarded(attempt, self.ports.registry.get_device_by_id(&device_id))
                        .await
                        .map(|result| match result {
                            Ok(record) => OnboardingEvent::DeviceProfileResolved {
                                profile: record.profile(),
                            },
                            Err(err) => {
                                error!(device_id = %device_id, error = %err, "device lookup failed");
                                OnboardingEvent::DeviceProfileLookupFailed
                            }
                        })
                }
                OnboardingAction::SetBlinksPerKwh { device_id, value } => guarded(
                    attempt,
                    self.ports.device_config.set_blinks_per_kwh(&device_id, value),
                )
                .await
                .map(|result| match result {
                    Ok(()) => OnboardingEvent::BlinksPerKwhSaved,
                    Err(err) => {
                        error!(device_id = %device_id, error = %err, "set blinks per kWh failed");
                        OnboardingEvent::BlinksPerKwhSaveFailed
                    }
                }),
                OnboardingAction::SetEncryptionKey { device_id, keys } => guarded(
                    attempt,
                    self.ports.device_config.set_encryption_key(&device_id, &keys),
                )
                .await
                .map(|result| match result {
                    Ok(()) => OnboardingEvent::EncryptionKeysSaved,
                    Err(err) => {
                        error!(device_id = %device_id, error = %err, "set encryption key failed");
                        OnboardingEvent::EncryptionKeysSaveFailed
                    }
                }),
                OnboardingAction::StartSessionPolling { device_id } => {
                    self.start_polling(device_id);
                    continue;
                }
                OnboardingAction::StopSessionPolling => {
                    self.stop_polling();
                    continue;
                }
                OnboardingAction::Navigate(request) => {
                    if !self.context.is_current(attempt) {
                        break;
                    }
                    info!(screen = %request.screen, "onboarding navigate");
                    self.ports
                        .navigation
                        .navigate(request)
                        .await
                        .map_err(OnboardingOrchestratorError::Navigation)?;
                    continue;
                }
            };

            match follow_up {
                Some(event) => follow_up_events.push(event),
                None => {
                    debug!("attempt invalidated while waiting on SDK; result discarded");
                    break;
                }
            }
        }

        Ok(follow_up_events)
    }

    /// Forward provisioning stages to the UI until the sender is dropped.
    fn spawn_stage_forwarder(&self, mut stages: mpsc::UnboundedReceiver<ConnectionStage>) {
        let events = self.ports.events.clone();
        tokio::spawn(async move {
            while let Some(stage) = stages.recv().await {
                debug!(?stage, "connection stage");
                events.emit_connection_stage(stage).await;
            }
        });
    }

    /// Start polling `device_id`, replacing any loop already running.
    fn start_polling(self: &Arc<Self>, device_id: DeviceId) {
        let generation = self.poll_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let sink = Arc::new(PollSink {
            inner: Arc::downgrade(self),
            generation,
        });
        let handle = self.poller.start(device_id, sink);
        let previous = self
            .active_poll
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(ActivePoll {
                generation,
                _handle: handle,
            });
        if previous.is_some() {
            debug!("replaced running session poll loop");
        }
    }

    fn stop_polling(&self) {
        let stopped = self
            .active_poll
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(active) = stopped {
            debug!(generation = active.generation, "session polling stopped");
        }
    }

    fn is_active_poll(&self, generation: u64) -> bool {
        self.active_poll
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_some_and(|active| active.generation == generation)
    }

    async fn dispatch_polled(self: &Arc<Self>, generation: u64, session: OnboardingSession) -> PollControl {
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;
        if !self.is_active_poll(generation) {
            debug!(generation, "discarding snapshot from stopped poll loop");
            return PollControl::Stop;
        }

        let event = OnboardingEvent::SessionPolled {
            session,
            observed_at_ms: self.ports.clock.now_ms(),
        };
        match self.dispatch_locked(event).await {
            Ok(state) if state.is_waiting() && self.is_active_poll(generation) => {
                PollControl::Continue
            }
            Ok(_) => PollControl::Stop,
            Err(err) => {
                error!(error = %err, "handling session snapshot failed");
                PollControl::Stop
            }
        }
    }
}

/// Race an SDK call against the attempt token. `None` when the attempt was
/// invalidated first.
async fn guarded<T>(attempt: &CancellationToken, call: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        biased;
        _ = attempt.cancelled() => None,
        output = call => Some(output),
    }
}

struct PollSink {
    inner: Weak<OrchestratorInner>,
    generation: u64,
}

#[async_trait]
impl SessionSnapshotSink for PollSink {
    async fn on_snapshot(&self, _device_id: &DeviceId, session: OnboardingSession) -> PollControl {
        let Some(inner) = self.inner.upgrade() else {
            return PollControl::Stop;
        };
        inner.dispatch_polled(self.generation, session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use anyhow::anyhow;
    use se_core::device::{AccessPoint, DeviceHandle, DeviceProfile, DeviceRecord, WifiAuthMode};
    use se_core::navigation::{NavigationRequest, Screen};
    use se_core::onboarding::{EncryptionKeys, OnboardingError};
    use se_core::ports::DeviceRegistryError;
    use se_core::security::SecretString;

    struct MockRegistry {
        profile: DeviceProfile,
        online: bool,
        pair_calls: AtomicUsize,
    }

    #[async_trait]
    impl DeviceRegistryPort for MockRegistry {
        async fn get_device_by_id(&self, id: &DeviceId) -> Result<DeviceRecord, DeviceRegistryError> {
            Ok(DeviceRecord::new(id.clone(), self.profile))
        }

        async fn is_device_online(&self, _id: &DeviceId) -> anyhow::Result<bool> {
            Ok(self.online)
        }

        async fn pair_device(&self, _id: &DeviceId) -> anyhow::Result<()> {
            self.pair_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Provisioning that takes `delay` and reports two stages.
    struct MockProvisioning {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProvisioningPort for MockProvisioning {
        async fn provision_device(
            &self,
            id: &DeviceId,
            stages: mpsc::UnboundedSender<ConnectionStage>,
        ) -> anyhow::Result<DeviceHandle> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _ = stages.send(ConnectionStage::Searching);
            tokio::time::sleep(self.delay).await;
            let _ = stages.send(ConnectionStage::Connected);
            Ok(DeviceHandle {
                device_id: id.clone(),
                transport_name: format!("PROV_{id}"),
            })
        }
    }

    #[derive(Default)]
    struct MockWifi {
        connected: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl WifiPort for MockWifi {
        async fn list_access_points(&self, _device: &DeviceHandle) -> anyhow::Result<Vec<AccessPoint>> {
            Ok(vec![
                AccessPoint::new("Home", WifiAuthMode::Wpa2Psk),
                AccessPoint::new("Cafe", WifiAuthMode::Open),
            ])
        }

        async fn connect_to_wifi(
            &self,
            _device: &DeviceHandle,
            ssid: &str,
            credential: &SecretString,
        ) -> anyhow::Result<()> {
            self.connected
                .lock()
                .unwrap()
                .push((ssid.to_string(), credential.expose().to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockDeviceConfig {
        blinks: Mutex<Vec<u32>>,
        fail_keys: bool,
    }

    #[async_trait]
    impl DeviceConfigPort for MockDeviceConfig {
        async fn set_blinks_per_kwh(&self, _id: &DeviceId, blinks_per_kwh: u32) -> anyhow::Result<()> {
            self.blinks.lock().unwrap().push(blinks_per_kwh);
            Ok(())
        }

        async fn set_encryption_key(&self, _id: &DeviceId, _keys: &EncryptionKeys) -> anyhow::Result<()> {
            if self.fail_keys {
                return Err(anyhow!("meter rejected request"));
            }
            Ok(())
        }
    }

    /// Returns scripted snapshots; the last one repeats.
    struct ScriptedSession {
        script: Mutex<VecDeque<OnboardingSession>>,
        calls: AtomicUsize,
    }

    impl ScriptedSession {
        fn new(script: Vec<OnboardingSession>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl OnboardingSessionPort for ScriptedSession {
        async fn get_onboarding_session(&self, _id: &DeviceId) -> anyhow::Result<OnboardingSession> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let next = if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            };
            next.ok_or_else(|| anyhow!("no session"))
        }
    }

    #[derive(Default)]
    struct MockNavigation {
        requests: Mutex<Vec<NavigationRequest>>,
    }

    impl MockNavigation {
        fn screens(&self) -> Vec<Screen> {
            self.requests.lock().unwrap().iter().map(|r| r.screen).collect()
        }
    }

    #[async_trait]
    impl NavigationPort for MockNavigation {
        async fn navigate(&self, request: NavigationRequest) -> anyhow::Result<()> {
            self.requests.lock().unwrap().push(request);
            Ok(())
        }
    }

    struct MockPrompt {
        answer: Option<&'static str>,
    }

    #[async_trait]
    impl CredentialPromptPort for MockPrompt {
        async fn request_credential(&self, _ssid: &str) -> anyhow::Result<Option<SecretString>> {
            Ok(self.answer.map(SecretString::from))
        }
    }

    #[derive(Default)]
    struct MockEvents {
        states: Mutex<Vec<OnboardingState>>,
        stages: Mutex<Vec<ConnectionStage>>,
    }

    #[async_trait]
    impl OnboardingEventPort for MockEvents {
        async fn emit_state_changed(&self, state: &OnboardingState) {
            self.states.lock().unwrap().push(state.clone());
        }

        async fn emit_connection_stage(&self, stage: ConnectionStage) {
            self.stages.lock().unwrap().push(stage);
        }
    }

    /// Follows tokio's (paused) clock.
    struct TokioClock {
        origin: tokio::time::Instant,
    }

    impl ClockPort for TokioClock {
        fn now_ms(&self) -> i64 {
            self.origin.elapsed().as_millis() as i64
        }
    }

    struct Harness {
        orchestrator: OnboardingOrchestrator,
        registry: Arc<MockRegistry>,
        provisioning: Arc<MockProvisioning>,
        wifi: Arc<MockWifi>,
        config: Arc<MockDeviceConfig>,
        session: Arc<ScriptedSession>,
        navigation: Arc<MockNavigation>,
        events: Arc<MockEvents>,
    }

    struct HarnessOptions {
        profile: u8,
        online: bool,
        provision_delay: Duration,
        script: Vec<OnboardingSession>,
        fail_keys: bool,
    }

    impl Default for HarnessOptions {
        fn default() -> Self {
            Self {
                profile: 1,
                online: false,
                provision_delay: Duration::from_millis(10),
                script: vec![OnboardingSession::done()],
                fail_keys: false,
            }
        }
    }

    fn harness(options: HarnessOptions) -> Harness {
        harness_with_navigation(options, None)
    }

    /// Like `harness`, but routes navigation to `navigation_port` when given.
    fn harness_with_navigation(
        options: HarnessOptions,
        navigation_port: Option<Arc<dyn NavigationPort>>,
    ) -> Harness {
        let registry = Arc::new(MockRegistry {
            profile: DeviceProfile::new(options.profile),
            online: options.online,
            pair_calls: AtomicUsize::new(0),
        });
        let provisioning = Arc::new(MockProvisioning {
            delay: options.provision_delay,
            calls: AtomicUsize::new(0),
        });
        let wifi = Arc::new(MockWifi::default());
        let config = Arc::new(MockDeviceConfig {
            fail_keys: options.fail_keys,
            ..Default::default()
        });
        let session = Arc::new(ScriptedSession::new(options.script));
        let navigation = Arc::new(MockNavigation::default());
        let events = Arc::new(MockEvents::default());

        let ports = OnboardingPorts {
            registry: registry.clone(),
            provisioning: provisioning.clone(),
            wifi: wifi.clone(),
            device_config: config.clone(),
            session: session.clone(),
            navigation: navigation_port.unwrap_or_else(|| navigation.clone()),
            credential_prompt: Arc::new(MockPrompt {
                answer: Some("hunter22"),
            }),
            events: events.clone(),
            clock: Arc::new(TokioClock {
                origin: tokio::time::Instant::now(),
            }),
        };
        Harness {
            orchestrator: OnboardingOrchestrator::new(ports, &OnboardingSettings::default()),
            registry,
            provisioning,
            wifi,
            config,
            session,
            navigation,
            events,
        }
    }

    fn id() -> DeviceId {
        DeviceId::from("SE-1")
    }

    async fn pair_and_connect(h: &Harness) -> OnboardingState {
        let state = h.orchestrator.start_pairing(id()).await.unwrap();
        assert!(matches!(state, OnboardingState::WifiConnecting { .. }), "{state:?}");
        h.orchestrator
            .select_access_point("Home".to_string())
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn pulse_meter_flow_reaches_main_once() {
        let h = harness(HarnessOptions::default());

        let state = pair_and_connect(&h).await;
        assert!(matches!(&state, OnboardingState::BlinksPerKwhEntry { value, .. } if value == "1000"));
        assert_eq!(
            h.wifi.connected.lock().unwrap().as_slice(),
            &[("Home".to_string(), "hunter22".to_string())]
        );

        let state = h.orchestrator.submit_blinks_per_kwh().await.unwrap();
        assert!(state.is_waiting());
        assert_eq!(h.config.blinks.lock().unwrap().as_slice(), &[1000]);

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(h.orchestrator.get_state().await, OnboardingState::Done);
        assert_eq!(
            h.navigation.screens(),
            vec![
                Screen::Pair,
                Screen::ConnectWifi,
                Screen::BlinksPerKwh,
                Screen::OnboardingWait,
                Screen::Main
            ]
        );
        assert_eq!(h.session.calls.load(Ordering::SeqCst), 1);
        assert!(!h.orchestrator.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn gpk_meter_waits_directly_and_polls_until_done() {
        let h = harness(HarnessOptions {
            profile: 6,
            script: vec![
                OnboardingSession::with_status("Connecting"),
                OnboardingSession::error("CRCError"),
                OnboardingSession::firmware_update(Some(50)),
                OnboardingSession::done(),
            ],
            ..Default::default()
        });

        let state = pair_and_connect(&h).await;
        assert!(matches!(state, OnboardingState::OnboardingWait { .. }));

        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(h.orchestrator.get_state().await, OnboardingState::Done);
        assert_eq!(h.session.calls.load(Ordering::SeqCst), 4);
        let main_navs = h
            .navigation
            .screens()
            .into_iter()
            .filter(|s| *s == Screen::Main)
            .count();
        assert_eq!(main_navs, 1);

        let states = h.events.states.lock().unwrap().clone();
        assert!(states.iter().any(|s| matches!(s, OnboardingState::FirmwareUpdating { .. })));
        assert!(states.iter().any(|s| s.status_message().as_deref()
            == Some("Invalid data received from meter. Try removing the splitter if you're using one.")));
    }

    #[tokio::test(start_paused = true)]
    async fn provisioning_stages_reach_the_event_port() {
        let h = harness(HarnessOptions::default());
        h.orchestrator.start_pairing(id()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        let stages = h.events.stages.lock().unwrap().clone();
        assert_eq!(stages, vec![ConnectionStage::Searching, ConnectionStage::Connected]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_provisioning_discards_the_late_result() {
        let h = harness(HarnessOptions {
            provision_delay: Duration::from_secs(30),
            ..Default::default()
        });

        let flow = {
            let orchestrator = h.orchestrator.clone();
            tokio::spawn(async move { orchestrator.start_pairing(id()).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        let state = h.orchestrator.cancel().await.unwrap();
        assert_eq!(state, OnboardingState::Idle);
        flow.await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(h.orchestrator.get_state().await, OnboardingState::Idle);
        assert_eq!(h.navigation.screens(), vec![Screen::Pair]);
        assert_eq!(h.provisioning.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_while_waiting_stops_polling() {
        let h = harness(HarnessOptions {
            profile: 6,
            script: vec![OnboardingSession::with_status("Connecting")],
            ..Default::default()
        });
        pair_and_connect(&h).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        let calls_before = h.session.calls.load(Ordering::SeqCst);
        assert!(calls_before >= 2);

        h.orchestrator.cancel().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(h.session.calls.load(Ordering::SeqCst), calls_before);
        assert_eq!(h.orchestrator.get_state().await, OnboardingState::Idle);
        assert!(!h.orchestrator.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn online_device_is_linked_without_pairing() {
        let h = harness(HarnessOptions {
            online: true,
            ..Default::default()
        });

        let state = h.orchestrator.scan_device(id()).await.unwrap();

        assert_eq!(state, OnboardingState::Done);
        assert_eq!(h.registry.pair_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.provisioning.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.navigation.screens(), vec![Screen::Main]);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_scan_is_rejected() {
        let h = harness(HarnessOptions::default());
        let err = h.orchestrator.scan_device(DeviceId::from("  ")).await.unwrap_err();
        assert!(matches!(err, OnboardingOrchestratorError::InvalidDeviceId(_)));
        assert_eq!(h.orchestrator.get_state().await, OnboardingState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn key_save_failure_stays_on_key_form() {
        let h = harness(HarnessOptions {
            profile: 5,
            script: vec![OnboardingSession::error("AuthenticationFailure")],
            fail_keys: true,
            ..Default::default()
        });
        pair_and_connect(&h).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let state = h.orchestrator.get_state().await;
        assert!(matches!(state, OnboardingState::EncryptionKeyEntry { form: Some(_), .. }), "{state:?}");
        assert!(!h.orchestrator.is_polling());

        h.orchestrator
            .edit_encryption_key(KeyField::Mep, "k".repeat(20))
            .await
            .unwrap();
        let state = h.orchestrator.submit_encryption_keys().await.unwrap();
        assert!(matches!(
            state,
            OnboardingState::EncryptionKeyEntry {
                saving: false,
                error: Some(OnboardingError::EncryptionKeySaveFailed),
                ..
            }
        ));
    }

    /// Navigation sink that reads the flow state back, and leaves the flow
    /// when asked to show the Wi-Fi screen.
    #[derive(Default)]
    struct CallbackNavigation {
        orchestrator: std::sync::OnceLock<OnboardingOrchestrator>,
        seen: Mutex<Vec<(Screen, &'static str)>>,
    }

    #[async_trait]
    impl NavigationPort for CallbackNavigation {
        async fn navigate(&self, request: NavigationRequest) -> anyhow::Result<()> {
            let orchestrator = self
                .orchestrator
                .get()
                .ok_or_else(|| anyhow!("orchestrator not attached"))?;
            let state = orchestrator.get_state().await;
            self.seen.lock().unwrap().push((request.screen, state.name()));
            if request.screen == Screen::ConnectWifi {
                orchestrator.cancel().await?;
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_sink_may_call_back_into_the_orchestrator() {
        let navigation = Arc::new(CallbackNavigation::default());
        let h = harness_with_navigation(HarnessOptions::default(), Some(navigation.clone()));
        navigation
            .orchestrator
            .set(h.orchestrator.clone())
            .unwrap_or_else(|_| panic!("orchestrator attached twice"));

        let state = tokio::time::timeout(Duration::from_secs(5), h.orchestrator.start_pairing(id()))
            .await
            .expect("navigation callback deadlocked the dispatch")
            .unwrap();

        assert_eq!(state, OnboardingState::Idle);
        assert_eq!(
            navigation.seen.lock().unwrap().as_slice(),
            &[(Screen::Pair, "Pairing"), (Screen::ConnectWifi, "WifiConnecting")]
        );
        assert_eq!(h.orchestrator.get_state().await, OnboardingState::Idle);
        assert!(!h.orchestrator.is_polling());

        // A fresh attempt still runs normally after the re-entrant cancel.
        let state = tokio::time::timeout(Duration::from_secs(5), h.orchestrator.start_pairing(id()))
            .await
            .expect("second attempt deadlocked")
            .unwrap();
        assert_eq!(state, OnboardingState::Idle);
        assert_eq!(navigation.seen.lock().unwrap().len(), 4);
    }
}
