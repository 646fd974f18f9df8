use async_trait::async_trait;
use se_core::ports::CredentialPromptPort;
use se_core::security::SecretString;
use tokio::sync::{mpsc, oneshot};

/// A pending request for the inline password field.
///
/// Dropping the request without answering counts as a dismissal.
#[derive(Debug)]
pub struct CredentialRequest {
    pub ssid: String,
    reply: oneshot::Sender<Option<SecretString>>,
}

impl CredentialRequest {
    pub fn submit(self, credential: SecretString) {
        // The flow may have been cancelled meanwhile; nothing to deliver to.
        let _ = self.reply.send(Some(credential));
    }

    pub fn dismiss(self) {
        let _ = self.reply.send(None);
    }
}

/// Prompt that asks the UI to show its inline password form.
///
/// Requests are delivered over a channel; the UI answers each one through
/// [`CredentialRequest::submit`] or [`CredentialRequest::dismiss`].
#[derive(Clone)]
pub struct InlineFormPrompt {
    requests: mpsc::Sender<CredentialRequest>,
}

impl InlineFormPrompt {
    /// Create the prompt and the receiving end for the UI.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<CredentialRequest>) {
        let (requests, rx) = mpsc::channel(buffer);
        (Self { requests }, rx)
    }
}

#[async_trait]
impl CredentialPromptPort for InlineFormPrompt {
    async fn request_credential(&self, ssid: &str) -> anyhow::Result<Option<SecretString>> {
        let (reply, answer) = oneshot::channel();
        self.requests
            .send(CredentialRequest {
                ssid: ssid.to_string(),
                reply,
            })
            .await
            .map_err(|_| anyhow::anyhow!("inline credential form is not available"))?;

        match answer.await {
            Ok(credential) => Ok(credential),
            Err(_) => {
                log::debug!("Inline credential form dropped the request for {ssid}");
                Ok(None)
            }
        }
    }
}
