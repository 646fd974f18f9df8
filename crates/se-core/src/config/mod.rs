//! # Pure Data Module / 纯数据模块
//!
//! Configuration data structures and the TOML → DTO mapping. Missing
//! sections and keys fall back to the serde defaults of each section; nothing
//! here validates values.
//!
//! 此模块只包含配置数据结构，不包含业务逻辑或校验。

mod onboarding;

pub use onboarding::{LoggingSettings, OnboardingSettings, SdkSettings};

use anyhow::Context;
use serde::de::DeserializeOwned;

/// Application configuration DTO.
/// 应用配置 DTO。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub onboarding: OnboardingSettings,
    pub sdk: SdkSettings,
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Create AppConfig from a parsed TOML document.
    /// 从 TOML 值创建 AppConfig。
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        Ok(Self {
            onboarding: section(toml_value, "onboarding")?,
            sdk: section(toml_value, "sdk")?,
            logging: section(toml_value, "logging")?,
        })
    }
}

fn section<T>(toml_value: &toml::Value, name: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned + Default,
{
    match toml_value.get(name) {
        Some(value) => value
            .clone()
            .try_into()
            .with_context(|| format!("invalid [{name}] section")),
        None => Ok(T::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toml::Value;

    #[test]
    fn missing_sections_use_defaults() {
        let toml_value: Value = toml::from_str("").unwrap();
        let config = AppConfig::from_toml(&toml_value).unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.onboarding.poll_interval_ms, 2000);
        assert_eq!(config.onboarding.decryption_retry_timeout_secs, 180);
        assert_eq!(config.onboarding.default_blinks_per_kwh, 1000);
    }

    #[test]
    fn partial_section_keeps_remaining_defaults() {
        let toml_str = r#"
            [onboarding]
            poll_interval_ms = 500

            [sdk]
            scenario = "firmware"
            device_profile = 6
        "#;
        let toml_value: Value = toml::from_str(toml_str).unwrap();
        let config = AppConfig::from_toml(&toml_value).unwrap();

        assert_eq!(config.onboarding.poll_interval_ms, 500);
        assert_eq!(config.onboarding.default_blinks_per_kwh, 1000);
        assert_eq!(config.sdk.scenario, "firmware");
        assert_eq!(config.sdk.device_profile, Some(6));
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn wrong_value_type_is_reported_with_section_name() {
        let toml_value: Value = toml::from_str(
            r#"
            [onboarding]
            poll_interval_ms = "fast"
        "#,
        )
        .unwrap();
        let err = AppConfig::from_toml(&toml_value).unwrap_err();
        assert!(err.to_string().contains("[onboarding]"));
    }
}
