//! Tracing configuration for the Saveeye companion
//!
//! ## Architecture / 架构
//!
//! - **Single subscriber**: library crates log with `tracing`; `log` records
//!   from the platform crate are bridged by the subscriber's log adapter
//! - **Environment-aware**: debug builds default to `debug`, release to `info`
//! - **Optional file sink**: non-blocking file writer when `[logging].log_dir` is set

use std::{fs, io, path::Path, sync::OnceLock};

use se_core::config::LoggingSettings;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, prelude::*, registry};

const LOG_FILE_NAME: &str = "saveeye-companion.log";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Check if running in development environment
fn is_development() -> bool {
    cfg!(debug_assertions)
}

/// Build the default filter directives for tracing
///
/// ## Behavior / 行为
/// - **Development**: debug level for everything ours
/// - **Production**: info level
/// - The session poller is chatty at debug; keep it at info unless asked
fn build_filter_directives(is_dev: bool) -> Vec<String> {
    let level = if is_dev { "debug" } else { "info" };
    vec![
        level.to_string(),
        format!("se_app={level}"),
        "se_app::usecases::onboarding::poller=info".to_string(),
        format!("se_infra={level}"),
        format!("se_platform={level}"),
    ]
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over `[logging].filter`, which wins over the built-in
/// defaults. Call once, before the runtime starts doing work.
///
/// ## Errors / 错误
///
/// Returns `Err` if a subscriber is already registered.
pub fn init_tracing_subscriber(settings: &LoggingSettings) -> anyhow::Result<()> {
    let is_dev = is_development();

    // Step 1: Build environment filter
    let default_directives = settings
        .filter
        .clone()
        .unwrap_or_else(|| build_filter_directives(is_dev).join(","));
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directives));

    // Step 2: Create writers
    // Logs go to stderr so state output on stdout stays readable.
    let console_writer: BoxMakeWriter = BoxMakeWriter::new(io::stderr);
    let file_writer = match settings.log_dir.as_deref().map(build_file_writer) {
        Some(Ok(writer)) => Some(writer),
        Some(Err(err)) => {
            eprintln!("Failed to initialize file logging, falling back to stderr: {err}");
            None
        }
        None => None,
    };

    // Step 3: Create fmt layers
    // "2025-01-15 10:30:45.123 INFO [file.rs:42] [target] message"
    let console_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_ansi(cfg!(not(test)))
        .with_writer(console_writer);

    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_timer(fmt::time::ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_ansi(false) // No ANSI colors in file logs
            .with_writer(writer)
    });

    // Step 4: Register the global subscriber
    // try_init also installs the `log` bridge, so se-platform records land here.
    let subscriber = registry().with(env_filter).with(console_layer);
    if let Some(layer) = file_layer {
        subscriber.with(layer).try_init()?;
    } else {
        subscriber.try_init()?;
    }

    Ok(())
}

fn build_file_writer(log_dir: &Path) -> anyhow::Result<NonBlocking> {
    fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    LOG_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Tracing log guard already initialized"))?;

    Ok(non_blocking)
}
