use crate::{ids::DeviceId, onboarding::OnboardingSession};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait OnboardingSessionPort: Send + Sync {
    /// Fetch a fresh snapshot. Errors are transient from the caller's view.
    async fn get_onboarding_session(&self, id: &DeviceId) -> Result<OnboardingSession>;
}
