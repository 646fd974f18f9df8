//! # se-core
//!
//! Core domain models and onboarding logic for the Saveeye companion.
//!
//! This crate contains pure business logic without any infrastructure dependencies.
//! Device SDK access, navigation and user prompts are reached through [`ports`].

// Public module exports
pub mod config;
pub mod device;
pub mod ids;
pub mod navigation;
pub mod onboarding;
pub mod ports;
pub mod security;

// Re-export commonly used types at the crate root
pub use config::{AppConfig, OnboardingSettings};
pub use device::{AccessPoint, ConnectionStage, DeviceHandle, DeviceProfile, DeviceRecord, WifiAuthMode};
pub use ids::DeviceId;
pub use navigation::{NavigationRequest, Screen};
pub use onboarding::{
    classify, DecryptionRetryWindow, ErrorDisposition, OnboardingAction, OnboardingError,
    OnboardingEvent, OnboardingSession, OnboardingSessionStatus, OnboardingState,
    OnboardingStateMachine,
};
pub use security::SecretString;
