//! Command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use se_core::config::SdkSettings;
use se_core::onboarding::KeyField;

#[derive(Debug, Parser)]
#[command(
    name = "saveeye-companion",
    version,
    about = "Onboard Saveeye energy monitors against the simulated device SDK"
)]
pub struct Cli {
    /// Configuration file (defaults to $SAVEEYE_CONFIG, then ./saveeye.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the onboarding flow for a scanned device
    Onboard(OnboardArgs),

    /// Show how a session error code is handled
    Classify {
        code: String,
        /// Print the disposition as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every known session error code
    Errors,
}

#[derive(Debug, Clone, Default, Args)]
pub struct OnboardArgs {
    /// Device id as printed on the label / QR code
    pub device_id: String,

    /// Device profile reported by the simulated registry
    #[arg(long)]
    pub profile: Option<u8>,

    /// Built-in session scenario (happy, firmware, decryption, wrong-key, fatal, flaky)
    #[arg(long)]
    pub scenario: Option<String>,

    /// JSON session script, overrides --scenario
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Pretend the device already reports in (link without pairing)
    #[arg(long)]
    pub online: bool,

    /// Simulated SDK latency per call
    #[arg(long, value_name = "MS")]
    pub latency_ms: Option<u64>,

    /// Access point to join without asking
    #[arg(long)]
    pub ssid: Option<String>,

    /// Credential for --ssid
    #[arg(long)]
    pub password: Option<String>,

    /// Blinks per kWh for pulse meters
    #[arg(long)]
    pub blinks: Option<String>,

    /// Encryption key, e.g. `--key mep=0123456789ABCDEFGHIJ` (repeatable)
    #[arg(long = "key", value_name = "FIELD=VALUE", value_parser = parse_key_arg)]
    pub keys: Vec<(KeyField, String)>,

    /// Fail instead of reading from stdin when an answer is missing
    #[arg(long)]
    pub non_interactive: bool,
}

impl OnboardArgs {
    /// Layer the command-line overrides on top of the `[sdk]` section.
    pub fn apply_to(&self, sdk: &mut SdkSettings) {
        if let Some(profile) = self.profile {
            sdk.device_profile = Some(profile);
        }
        if let Some(scenario) = &self.scenario {
            sdk.scenario = scenario.clone();
        }
        if let Some(script) = &self.script {
            sdk.script = Some(script.clone());
        }
        if let Some(latency_ms) = self.latency_ms {
            sdk.latency_ms = latency_ms;
        }
        if self.online {
            sdk.device_online = true;
        }
    }
}

pub fn parse_key_field(raw: &str) -> Option<KeyField> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "optical" => Some(KeyField::Optical),
        "mep" => Some(KeyField::Mep),
        "gpk60" => Some(KeyField::Gpk60),
        "gpk61" => Some(KeyField::Gpk61),
        _ => None,
    }
}

fn parse_key_arg(raw: &str) -> Result<(KeyField, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got {raw:?}"))?;
    let field = parse_key_field(field)
        .ok_or_else(|| format!("unknown key field {field:?} (optical, mep, gpk60, gpk61)"))?;
    Ok((field, value.to_string()))
}
