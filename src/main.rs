use std::process::ExitCode;

use clap::Parser;
use saveeye_companion_lib::bootstrap::{self, tracing::init_tracing_subscriber};
use saveeye_companion_lib::cli::Cli;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = bootstrap::resolve_config_path(cli.config.clone());
    let config = bootstrap::load_config(&config_path)?;

    // Initialize tracing subscriber FIRST, before any logging occurs
    init_tracing_subscriber(&config.logging)?;
    tracing::info!(config = %config_path.display(), "saveeye companion starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(bootstrap::run(cli, config))
}
