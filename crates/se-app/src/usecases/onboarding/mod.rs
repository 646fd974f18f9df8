mod context;
mod orchestrator;
mod poller;

pub use context::OnboardingContext;
pub use orchestrator::{OnboardingOrchestrator, OnboardingOrchestratorError, OnboardingPorts};
pub use poller::{PollControl, PollHandle, SessionPoller, SessionSnapshotSink, MIN_POLL_INTERVAL};
