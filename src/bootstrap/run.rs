//! Command execution.

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use se_app::OnboardingOrchestrator;
use se_core::config::AppConfig;
use se_core::ids::DeviceId;
use se_core::onboarding::{classify, error_table::known_error_codes, ErrorDisposition};
use se_platform::detect_prompt_capability;
use tracing::{info, info_span, warn, Instrument};

use crate::cli::{Cli, Command, OnboardArgs};
use crate::console::{ConsoleDriver, ConsoleOperator, FlowOutcome, Presets};

use super::wiring::{wire_onboarding, OnboardingWiring};

pub async fn run(cli: Cli, mut config: AppConfig) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Onboard(args) => {
            args.apply_to(&mut config.sdk);
            run_onboarding(&config, args).await
        }
        Command::Classify { code, json } => {
            print_disposition(&classify(&code), json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Errors => {
            for code in known_error_codes() {
                print_disposition(&classify(code), false)?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_onboarding(config: &AppConfig, args: OnboardArgs) -> anyhow::Result<ExitCode> {
    let device_id = DeviceId::new(args.device_id.trim().to_string());
    let operator = Arc::new(ConsoleOperator::new(
        Presets {
            ssid: args.ssid,
            password: args.password,
            blinks: args.blinks,
            keys: args.keys,
        },
        !args.non_interactive,
    ));
    let OnboardingWiring {
        orchestrator,
        sdk,
        changes,
        prompt_task,
    } = wire_onboarding(config, operator.clone(), detect_prompt_capability()).await?;

    let span = info_span!("onboarding.run", device_id = %device_id);
    let driver = ConsoleDriver::new(orchestrator.clone(), operator, changes);
    let outcome = drive_flow(&orchestrator, device_id, driver, ctrl_c())
        .instrument(span)
        .await?;

    if let Some(task) = prompt_task {
        task.abort();
    }
    info!(sdk_calls = sdk.calls().len(), outcome = ?outcome, "onboarding finished");

    Ok(match outcome {
        FlowOutcome::Done => {
            println!("Device onboarded.");
            ExitCode::SUCCESS
        }
        FlowOutcome::Failed(message) => {
            eprintln!("Onboarding failed: {message}");
            ExitCode::FAILURE
        }
        FlowOutcome::Cancelled => {
            eprintln!("Onboarding cancelled.");
            ExitCode::from(2)
        }
    })
}

/// Scan `device_id` and walk the flow until it ends or `interrupt` resolves.
/// An interrupt at any point, the scan included, cancels the flow.
async fn drive_flow(
    orchestrator: &OnboardingOrchestrator,
    device_id: DeviceId,
    driver: ConsoleDriver,
    interrupt: impl Future<Output = ()>,
) -> anyhow::Result<FlowOutcome> {
    let flow = async {
        orchestrator.scan_device(device_id).await?;
        driver.run().await
    };
    tokio::select! {
        outcome = flow => outcome,
        _ = interrupt => {
            warn!("interrupted; cancelling onboarding");
            orchestrator.cancel().await?;
            Ok(FlowOutcome::Cancelled)
        }
    }
}

/// Resolves on Ctrl-C. Never resolves when the signal cannot be watched.
async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn print_disposition(disposition: &ErrorDisposition, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(disposition)?);
        return Ok(());
    }
    let next = match (disposition.redirect_target, disposition.can_continue) {
        (Some(screen), _) => format!("redirect to {screen}"),
        (None, true) => "keep waiting".to_string(),
        (None, false) => "stop".to_string(),
    };
    let message = if disposition.user_message.is_empty() {
        "-"
    } else {
        disposition.user_message.as_str()
    };
    println!("{:<22} {:<24} {message}", disposition.error_code, next);
    Ok(())
}
