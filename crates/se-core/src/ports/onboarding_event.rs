use crate::{device::ConnectionStage, onboarding::OnboardingState};

/// UI-facing notifications from the onboarding flow.
#[async_trait::async_trait]
pub trait OnboardingEventPort: Send + Sync {
    async fn emit_state_changed(&self, state: &OnboardingState);

    async fn emit_connection_stage(&self, stage: ConnectionStage);
}
