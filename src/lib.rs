//! Saveeye companion: drives device onboarding from the terminal against the
//! simulated device SDK.

pub mod bootstrap;
pub mod cli;
pub mod console;
