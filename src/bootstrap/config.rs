//! # Configuration Loader / 配置加载器
//!
//! ## Responsibilities / 职责
//!
//! - Locate the TOML configuration file / 定位配置文件
//! - Parse TOML into the AppConfig DTO / 将 TOML 解析为 AppConfig DTO
//! - Report I/O and parsing errors with context / 报告带上下文的错误
//!
//! No validation happens here; section defaults come from the DTO.
//! 此处不做校验。

use anyhow::Context;
use std::path::{Path, PathBuf};
use se_core::config::AppConfig;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "SAVEEYE_CONFIG";

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "saveeye.toml";

/// Pick the configuration file: explicit path, then `SAVEEYE_CONFIG`, then
/// `saveeye.toml`. A `.env` file is honoured for the environment lookup.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    // Missing .env is the normal case.
    let _ = dotenvy::dotenv();
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load configuration from a TOML file
/// 从 TOML 文件加载配置
///
/// A missing file yields the defaults of every section.
///
/// # Errors / 错误
///
/// Returns error if:
/// - File exists but cannot be read (I/O error)
/// - Content is not valid TOML (parse error)
/// - A section has the wrong shape (mapping error)
pub fn load_config(config_path: &Path) -> anyhow::Result<AppConfig> {
    if !config_path.exists() {
        return Ok(AppConfig::default());
    }
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    AppConfig::from_toml(&toml_value)
}
