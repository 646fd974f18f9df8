use std::sync::Arc;

use async_trait::async_trait;
use se_core::ports::CredentialPromptPort;
use se_core::security::SecretString;

/// Blocking native secure-text dialog.
pub trait SystemDialog: Send + Sync + 'static {
    /// Show the dialog and block until the user answers. `Ok(None)` on cancel.
    fn prompt_secret(&self, title: &str, message: &str) -> anyhow::Result<Option<String>>;
}

/// Prompt backed by a native dialog. The dialog runs on the blocking pool so
/// the async runtime keeps polling while it is open.
pub struct SystemDialogPrompt<D: SystemDialog> {
    dialog: Arc<D>,
}

impl<D: SystemDialog> SystemDialogPrompt<D> {
    pub fn new(dialog: D) -> Self {
        Self {
            dialog: Arc::new(dialog),
        }
    }
}

#[async_trait]
impl<D: SystemDialog> CredentialPromptPort for SystemDialogPrompt<D> {
    async fn request_credential(&self, ssid: &str) -> anyhow::Result<Option<SecretString>> {
        let dialog = self.dialog.clone();
        let message = format!("Enter the password for {ssid}");
        let answer = tokio::task::spawn_blocking(move || {
            dialog.prompt_secret("Wi-Fi password", &message)
        })
        .await
        .map_err(|e| anyhow::anyhow!("system dialog task failed: {e}"))??;

        Ok(answer.map(SecretString::new))
    }
}
