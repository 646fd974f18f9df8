//! In-process stand-in for the Saveeye device SDK.
//!
//! Used by the command-line companion and by integration tests. It answers
//! every SDK port with configurable latency and replays a session script so
//! the whole onboarding flow can run without hardware.
//!
//! 模拟 SDK：无需真实设备即可跑通引导流程。

mod scenario;
mod script;
mod sdk;

pub use scenario::{Scenario, UnknownScenario};
pub use script::{ScriptError, SessionScript, SessionStep};
pub use sdk::{SdkCall, SimulatedSdk, SimulatedSdkConfig};
