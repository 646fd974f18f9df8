//! # Dependency wiring / 依赖装配
//!
//! Builds the onboarding orchestrator and every adapter behind its ports.
//! This is the only place that knows which concrete adapter serves which
//! port.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use se_app::{OnboardingOrchestrator, OnboardingPorts};
use se_core::config::AppConfig;
use se_core::onboarding::OnboardingState;
use se_core::ports::CredentialPromptPort;
use se_infra::{SessionScript, SimulatedSdk, SimulatedSdkConfig, SystemClock};
use se_platform::{InlineFormPrompt, PromptCapability, SystemDialogPrompt};

use crate::console::{serve_inline_form, ConsoleDialog, ConsoleEvents, ConsoleNavigation, ConsoleOperator};

/// Everything a console onboarding run needs.
pub struct OnboardingWiring {
    pub orchestrator: OnboardingOrchestrator,
    pub sdk: Arc<SimulatedSdk>,
    pub changes: watch::Receiver<OnboardingState>,
    /// Serves the inline credential form; `None` with the dialog prompt.
    pub prompt_task: Option<JoinHandle<()>>,
}

/// Build the simulated SDK from the `[sdk]` section, loading a script file
/// when one is configured.
pub async fn build_sdk(config: &AppConfig) -> anyhow::Result<SimulatedSdk> {
    let mut sdk_config = SimulatedSdkConfig::from_settings(&config.sdk)?;
    if let Some(path) = &config.sdk.script {
        sdk_config.script = SessionScript::load(path)
            .await
            .with_context(|| format!("Failed to load session script {}", path.display()))?;
    }
    tracing::debug!(
        profile = %sdk_config.profile,
        online = sdk_config.online,
        latency_ms = sdk_config.latency.as_millis() as u64,
        "simulated sdk configured"
    );
    Ok(SimulatedSdk::new(sdk_config))
}

fn build_credential_prompt(
    capability: PromptCapability,
    operator: Arc<ConsoleOperator>,
) -> (Arc<dyn CredentialPromptPort>, Option<JoinHandle<()>>) {
    match capability {
        PromptCapability::SystemDialog => (
            Arc::new(SystemDialogPrompt::new(ConsoleDialog::new(operator))),
            None,
        ),
        PromptCapability::InlineForm => {
            let (prompt, requests) = InlineFormPrompt::channel(1);
            let task = tokio::spawn(serve_inline_form(requests, operator));
            (Arc::new(prompt), Some(task))
        }
    }
}

pub async fn wire_onboarding(
    config: &AppConfig,
    operator: Arc<ConsoleOperator>,
    capability: PromptCapability,
) -> anyhow::Result<OnboardingWiring> {
    let sdk = Arc::new(build_sdk(config).await?);
    let (events, changes) = ConsoleEvents::new();
    let (credential_prompt, prompt_task) = build_credential_prompt(capability, operator);

    let ports = OnboardingPorts {
        registry: sdk.clone(),
        provisioning: sdk.clone(),
        wifi: sdk.clone(),
        device_config: sdk.clone(),
        session: sdk.clone(),
        navigation: Arc::new(ConsoleNavigation),
        credential_prompt,
        events: Arc::new(events),
        clock: Arc::new(SystemClock::new()),
    };

    Ok(OnboardingWiring {
        orchestrator: OnboardingOrchestrator::new(ports, &config.onboarding),
        sdk,
        changes,
        prompt_task,
    })
}
