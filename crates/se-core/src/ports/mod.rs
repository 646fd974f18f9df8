//! Port interfaces for the application layer
//!
//! Ports define the contract between the onboarding use cases and the
//! device SDK, the UI shell and the platform. Infrastructure and platform
//! crates provide the implementations.

mod clock;
mod credential_prompt;
mod device_config;
mod device_registry;
pub mod errors;
mod navigation;
mod onboarding_event;
mod onboarding_session;
mod provisioning;
mod wifi;

pub use clock::*;
pub use credential_prompt::CredentialPromptPort;
pub use device_config::DeviceConfigPort;
pub use device_registry::DeviceRegistryPort;
pub use errors::DeviceRegistryError;
pub use navigation::NavigationPort;
pub use onboarding_event::OnboardingEventPort;
pub use onboarding_session::OnboardingSessionPort;
pub use provisioning::ProvisioningPort;
pub use wifi::WifiPort;
