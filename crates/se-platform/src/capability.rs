//! Platform capability detection for credential prompts.
//!
//! Decides whether Wi-Fi credentials are collected through a native system
//! dialog or an inline form rendered by the flow itself.

/// Environment variable that forces a prompt style (`inline` or `dialog`).
pub const PROMPT_OVERRIDE_ENV: &str = "SAVEEYE_PROMPT";

/// How the current platform collects a Wi-Fi credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptCapability {
    /// Native secure-text dialog (iOS alert prompt and friends)
    SystemDialog,
    /// Password field rendered inline on the Wi-Fi screen
    InlineForm,
}

/// Detect the credential prompt capability of the current platform.
///
/// # Detection Logic
///
/// - `SAVEEYE_PROMPT=dialog|inline` wins when set
/// - **iOS / macOS**: `SystemDialog`
/// - **Everything else** (Android, desktop Linux/Windows): `InlineForm`
pub fn detect_prompt_capability() -> PromptCapability {
    let forced = std::env::var(PROMPT_OVERRIDE_ENV).ok();
    let capability = capability_for(std::env::consts::OS, forced.as_deref());
    log::info!(
        "Credential prompt: {:?} (os={}, override={:?})",
        capability,
        std::env::consts::OS,
        forced
    );
    capability
}

fn capability_for(os: &str, forced: Option<&str>) -> PromptCapability {
    match forced.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
        Some("dialog") => return PromptCapability::SystemDialog,
        Some("inline") => return PromptCapability::InlineForm,
        Some(other) => log::warn!("Ignoring unknown {PROMPT_OVERRIDE_ENV} value {other:?}"),
        None => {}
    }

    match os {
        "ios" | "macos" => PromptCapability::SystemDialog,
        _ => PromptCapability::InlineForm,
    }
}
