//! Device domain models.
//!
//! Records are owned by the Saveeye SDK. These types mirror the subset of the
//! SDK model the onboarding flow reads.

pub mod connection_stage;
pub mod device;
pub mod profile;
pub mod wifi;

pub use connection_stage::ConnectionStage;
pub use device::{DeviceHandle, DeviceRecord, DeviceType};
pub use profile::{DeviceProfile, KeyFormKind};
pub use wifi::{AccessPoint, WifiAuthMode};
