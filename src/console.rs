//! Terminal adapters: navigation and event sinks, credential prompts and the
//! interactive driver that answers each onboarding screen.
//!
//! 终端适配器：把每个引导界面映射为命令行交互。

use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use se_app::OnboardingOrchestrator;
use se_core::device::{AccessPoint, ConnectionStage};
use se_core::navigation::NavigationRequest;
use se_core::onboarding::{KeyField, OnboardingState};
use se_core::ports::{NavigationPort, OnboardingEventPort};
use se_core::security::SecretString;
use se_platform::{CredentialRequest, SystemDialog};

/// Answers given on the command line. Each one is used once.
#[derive(Debug, Default)]
pub struct Presets {
    pub ssid: Option<String>,
    pub password: Option<String>,
    pub blinks: Option<String>,
    pub keys: Vec<(KeyField, String)>,
}

/// What the user picked on the Wi-Fi screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPointChoice {
    Select(String),
    Refresh,
    Quit,
}

/// Asks the person at the terminal, preferring presets.
pub struct ConsoleOperator {
    presets: Mutex<Presets>,
    interactive: bool,
}

impl ConsoleOperator {
    pub fn new(presets: Presets, interactive: bool) -> Self {
        Self {
            presets: Mutex::new(presets),
            interactive,
        }
    }

    fn presets(&self) -> std::sync::MutexGuard<'_, Presets> {
        self.presets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read one line from stdin. `Ok(None)` on end of input.
    fn ask_blocking(&self, prompt: &str) -> Result<Option<String>> {
        if !self.interactive {
            return Err(anyhow!("no answer for {prompt:?} in non-interactive mode"));
        }
        let mut stdout = io::stdout();
        write!(stdout, "{prompt} ")?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    async fn ask(self: &Arc<Self>, prompt: String) -> Result<Option<String>> {
        let operator = self.clone();
        tokio::task::spawn_blocking(move || operator.ask_blocking(&prompt)).await?
    }

    pub async fn choose_access_point(
        self: &Arc<Self>,
        access_points: &[AccessPoint],
    ) -> Result<AccessPointChoice> {
        if let Some(ssid) = self.presets().ssid.take() {
            return Ok(AccessPointChoice::Select(ssid));
        }

        println!("Available networks:");
        for (index, ap) in access_points.iter().enumerate() {
            let lock = if ap.requires_credential() { "🔒" } else { "  " };
            let rssi = ap.rssi.map(|r| format!(" ({r} dBm)")).unwrap_or_default();
            println!("  {:>2}. {lock} {}{rssi}", index + 1, ap.ssid);
        }

        let Some(answer) = self
            .ask("Network number or SSID ([r]efresh, [q]uit):".to_string())
            .await?
        else {
            return Ok(AccessPointChoice::Quit);
        };
        let answer = answer.trim();
        Ok(match answer {
            "" | "r" => AccessPointChoice::Refresh,
            "q" => AccessPointChoice::Quit,
            _ => match answer.parse::<usize>() {
                Ok(n) if (1..=access_points.len()).contains(&n) => {
                    AccessPointChoice::Select(access_points[n - 1].ssid.clone())
                }
                _ => AccessPointChoice::Select(answer.to_string()),
            },
        })
    }

    /// Blinks per kWh; an empty answer keeps `current`.
    pub async fn blinks_per_kwh(self: &Arc<Self>, current: &str) -> Result<Option<String>> {
        if let Some(value) = self.presets().blinks.take() {
            return Ok(Some(value));
        }
        let answer = self.ask(format!("Blinks per kWh [{current}]:")).await?;
        Ok(answer.map(|value| {
            if value.trim().is_empty() {
                current.to_string()
            } else {
                value
            }
        }))
    }

    pub async fn encryption_key(self: &Arc<Self>, field: KeyField) -> Result<Option<String>> {
        let preset = {
            let mut presets = self.presets();
            presets
                .keys
                .iter()
                .position(|(f, _)| *f == field)
                .map(|index| presets.keys.remove(index).1)
        };
        if preset.is_some() {
            return Ok(preset);
        }
        self.ask(format!("{} key:", key_label(field))).await
    }

    /// Yes/no question. Non-interactive runs answer no.
    pub async fn confirm(self: &Arc<Self>, question: &str) -> Result<bool> {
        if !self.interactive {
            return Ok(false);
        }
        let answer = self.ask(format!("{question} [y/N]")).await?;
        Ok(matches!(
            answer.as_deref().map(str::trim),
            Some("y" | "Y" | "yes")
        ))
    }

    /// Wi-Fi credential; `Ok(None)` when the user gave up.
    fn credential_blocking(&self, prompt: &str) -> Result<Option<String>> {
        if let Some(password) = self.presets().password.take() {
            return Ok(Some(password));
        }
        self.ask_blocking(prompt)
    }
}

fn key_label(field: KeyField) -> &'static str {
    match field {
        KeyField::Optical => "Optical",
        KeyField::Mep => "MEP",
        KeyField::Gpk60 => "GPK60",
        KeyField::Gpk61 => "GPK61",
    }
}

/// Native-dialog stand-in: a blocking terminal question.
pub struct ConsoleDialog {
    operator: Arc<ConsoleOperator>,
}

impl ConsoleDialog {
    pub fn new(operator: Arc<ConsoleOperator>) -> Self {
        Self { operator }
    }
}

impl SystemDialog for ConsoleDialog {
    fn prompt_secret(&self, title: &str, message: &str) -> Result<Option<String>> {
        self.operator.credential_blocking(&format!("[{title}] {message}:"))
    }
}

/// Answer inline-form credential requests from the terminal until the
/// prompt is dropped.
pub async fn serve_inline_form(
    mut requests: mpsc::Receiver<CredentialRequest>,
    operator: Arc<ConsoleOperator>,
) {
    while let Some(request) = requests.recv().await {
        let prompt = format!("Password for {}:", request.ssid);
        let operator = operator.clone();
        let answer =
            tokio::task::spawn_blocking(move || operator.credential_blocking(&prompt)).await;
        match answer {
            Ok(Ok(Some(password))) => request.submit(SecretString::new(password)),
            Ok(Ok(None)) => request.dismiss(),
            Ok(Err(err)) => {
                debug!(error = %err, "credential form unanswered");
                request.dismiss();
            }
            Err(err) => {
                debug!(error = %err, "credential form task failed");
                request.dismiss();
            }
        }
    }
}

/// Prints navigation requests.
pub struct ConsoleNavigation;

#[async_trait]
impl NavigationPort for ConsoleNavigation {
    async fn navigate(&self, request: NavigationRequest) -> Result<()> {
        match &request.device_id {
            Some(device_id) => println!("→ {} ({device_id})", request.screen),
            None => println!("→ {}", request.screen),
        }
        Ok(())
    }
}

/// Prints status lines and publishes every state for the driver.
pub struct ConsoleEvents {
    changes: watch::Sender<OnboardingState>,
}

impl ConsoleEvents {
    pub fn new() -> (Self, watch::Receiver<OnboardingState>) {
        let (changes, rx) = watch::channel(OnboardingState::default());
        (Self { changes }, rx)
    }
}

#[async_trait]
impl OnboardingEventPort for ConsoleEvents {
    async fn emit_state_changed(&self, state: &OnboardingState) {
        let previous_message = self.changes.borrow().status_message();
        if let Some(message) = state.status_message() {
            if previous_message.as_ref() != Some(&message) {
                println!("  ! {message}");
            }
        }
        if let OnboardingState::FirmwareUpdating { wait } = state {
            if let Some(progress) = wait.firmware_progress {
                println!("  firmware update {progress}%");
            }
        }
        self.changes.send_replace(state.clone());
    }

    async fn emit_connection_stage(&self, stage: ConnectionStage) {
        println!("  {}", stage.status_message());
    }
}

/// How an onboarding run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    Done,
    Failed(String),
    Cancelled,
}

/// Walks the flow: answers every screen that needs input and waits while the
/// device works.
pub struct ConsoleDriver {
    orchestrator: OnboardingOrchestrator,
    operator: Arc<ConsoleOperator>,
    changes: watch::Receiver<OnboardingState>,
}

impl ConsoleDriver {
    pub fn new(
        orchestrator: OnboardingOrchestrator,
        operator: Arc<ConsoleOperator>,
        changes: watch::Receiver<OnboardingState>,
    ) -> Self {
        Self {
            orchestrator,
            operator,
            changes,
        }
    }

    pub async fn run(mut self) -> Result<FlowOutcome> {
        loop {
            let _ = self.changes.borrow_and_update();
            let state = self.orchestrator.get_state().await;
            debug!(screen = %state.screen(), "driver observed state");

            match state {
                OnboardingState::Done => return Ok(FlowOutcome::Done),
                OnboardingState::Idle => return Ok(FlowOutcome::Cancelled),
                OnboardingState::Error { disposition, .. } => {
                    return Ok(FlowOutcome::Failed(disposition.user_message))
                }
                OnboardingState::Linking {
                    error: Some(error), ..
                } => return Ok(FlowOutcome::Failed(error.user_message())),
                OnboardingState::Pairing {
                    in_progress: false,
                    error: Some(_),
                    ..
                } => {
                    if self.operator.confirm("Retry pairing?").await? {
                        self.orchestrator.retry_pairing().await?;
                    } else {
                        return self.cancel().await;
                    }
                }
                OnboardingState::WifiConnecting {
                    access_points,
                    connecting: false,
                    ..
                } => match self.operator.choose_access_point(&access_points).await? {
                    AccessPointChoice::Select(ssid) => {
                        info!(ssid = %ssid, "joining access point");
                        self.orchestrator.select_access_point(ssid).await?;
                    }
                    AccessPointChoice::Refresh => {
                        self.orchestrator.refresh_access_points().await?;
                    }
                    AccessPointChoice::Quit => return self.cancel().await,
                },
                OnboardingState::ProfileBranch {
                    error: Some(_), ..
                }
                | OnboardingState::EncryptionKeyEntry {
                    form: None,
                    error: Some(_),
                    ..
                } => {
                    if self.operator.confirm("Retry reading device information?").await? {
                        self.orchestrator.retry_profile_lookup().await?;
                    } else {
                        return self.cancel().await;
                    }
                }
                OnboardingState::BlinksPerKwhEntry {
                    value,
                    saving: false,
                    ..
                } => {
                    let Some(value) = self.operator.blinks_per_kwh(&value).await? else {
                        return self.cancel().await;
                    };
                    self.orchestrator.edit_blinks_per_kwh(value).await?;
                    self.orchestrator.submit_blinks_per_kwh().await?;
                }
                OnboardingState::EncryptionKeyEntry {
                    form: Some(form),
                    saving: false,
                    ..
                } => {
                    for &field in form.fields() {
                        let Some(value) = self.operator.encryption_key(field).await? else {
                            return self.cancel().await;
                        };
                        self.orchestrator.edit_encryption_key(field, value).await?;
                        let state = self.orchestrator.blur_encryption_key(field).await?;
                        if let OnboardingState::EncryptionKeyEntry {
                            form: Some(form), ..
                        } = &state
                        {
                            if let Some(error) = form.error(field) {
                                println!("  ! {error}");
                            }
                        }
                    }
                    self.orchestrator.submit_encryption_keys().await?;
                }
                _ => {
                    // Device or SDK is working; wait for the next state.
                    if self.changes.changed().await.is_err() {
                        return Ok(FlowOutcome::Cancelled);
                    }
                }
            }
        }
    }

    async fn cancel(&self) -> Result<FlowOutcome> {
        self.orchestrator.cancel().await?;
        Ok(FlowOutcome::Cancelled)
    }
}
