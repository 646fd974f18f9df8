use crate::security::SecretString;
use anyhow::Result;
use async_trait::async_trait;

/// Asks the user for a Wi-Fi credential.
///
/// Inline form and native dialog implementations share this contract.
///
/// 获取 Wi-Fi 密码：内联表单或系统对话框。
#[async_trait]
pub trait CredentialPromptPort: Send + Sync {
    /// `Ok(None)` when the user dismissed the prompt.
    async fn request_credential(&self, ssid: &str) -> Result<Option<SecretString>>;
}
