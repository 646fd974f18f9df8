use serde::{Deserialize, Serialize};

/// `[onboarding]` section.
///
/// 设备引导相关配置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingSettings {
    /// Delay between session polls.
    pub poll_interval_ms: u64,
    /// How long a `DecryptionError` may persist after new keys were sent.
    pub decryption_retry_timeout_secs: u64,
    /// Pre-filled value of the blinks-per-kWh form.
    pub default_blinks_per_kwh: u32,
}

impl Default for OnboardingSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            decryption_retry_timeout_secs: 180,
            default_blinks_per_kwh: 1000,
        }
    }
}

/// `[sdk]` section: how the device SDK adapter behaves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkSettings {
    /// Scripted session scenario for the simulated SDK (`happy`, `firmware`,
    /// `decryption`, `wrong-key`, `fatal`, `flaky`). Empty means the
    /// adapter's own default.
    pub scenario: String,
    /// JSON session script; takes precedence over `scenario`.
    pub script: Option<std::path::PathBuf>,
    /// Artificial latency added to every simulated SDK call.
    pub latency_ms: u64,
    /// Device profile reported by the simulated registry.
    pub device_profile: Option<u8>,
    /// Whether scanned devices already report in (skips pairing).
    pub device_online: bool,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Directory for the rolling log file. No file logging when unset.
    pub log_dir: Option<std::path::PathBuf>,
    /// Filter directive used when `RUST_LOG` is not set.
    pub filter: Option<String>,
}
