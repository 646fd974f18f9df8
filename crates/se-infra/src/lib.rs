pub mod sim;
pub mod time;

pub use sim::{Scenario, SdkCall, SessionScript, SimulatedSdk, SimulatedSdkConfig};
pub use time::SystemClock;
