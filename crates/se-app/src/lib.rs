//! Saveeye companion application layer
//!
//! This crate contains the onboarding use cases: the session poller and the
//! orchestrator that drives the onboarding state machine through the ports
//! defined in `se-core`.

pub mod usecases;

pub use usecases::onboarding::{
    OnboardingOrchestrator, OnboardingOrchestratorError, OnboardingPorts, PollControl,
    PollHandle, SessionPoller, SessionSnapshotSink, MIN_POLL_INTERVAL,
};
