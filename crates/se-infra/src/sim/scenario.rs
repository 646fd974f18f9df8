use std::fmt;
use std::str::FromStr;

use se_core::onboarding::OnboardingSession;

use super::script::{SessionScript, SessionStep};

/// Built-in session scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scenario {
    /// A few intermediate statuses, then `Done`.
    #[default]
    Happy,
    /// Reports a firmware update with rising progress before finishing.
    Firmware,
    /// Asks for keys, keeps reporting `DecryptionError` briefly after they
    /// are sent, then finishes.
    Decryption,
    /// Asks for keys and rejects every key that is sent.
    WrongKey,
    /// Ends in a non-recoverable device error.
    Fatal,
    /// First query fails, then a recoverable error, then `Done`.
    Flaky,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown scenario {0:?} (expected one of: happy, firmware, decryption, wrong-key, fatal, flaky)")]
pub struct UnknownScenario(pub String);

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::Happy,
        Scenario::Firmware,
        Scenario::Decryption,
        Scenario::WrongKey,
        Scenario::Fatal,
        Scenario::Flaky,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::Happy => "happy",
            Scenario::Firmware => "firmware",
            Scenario::Decryption => "decryption",
            Scenario::WrongKey => "wrong-key",
            Scenario::Fatal => "fatal",
            Scenario::Flaky => "flaky",
        }
    }

    pub fn script(self) -> SessionScript {
        let connecting = || SessionStep::Snapshot(OnboardingSession::with_status("Connecting"));
        let error = |code: &str| SessionStep::Snapshot(OnboardingSession::error(code));
        let done = || SessionStep::Snapshot(OnboardingSession::done());

        match self {
            Scenario::Happy => SessionScript::new(vec![connecting(), connecting(), done()]),
            Scenario::Firmware => SessionScript::new(vec![
                connecting(),
                SessionStep::Snapshot(OnboardingSession::firmware_update(Some(10))),
                SessionStep::Snapshot(OnboardingSession::firmware_update(Some(55))),
                SessionStep::Snapshot(OnboardingSession::firmware_update(Some(90))),
                done(),
            ]),
            Scenario::Decryption => {
                SessionScript::new(vec![connecting(), error("DecryptionError")])
                    .then_after_keys(vec![error("DecryptionError"), error("DecryptionError"), done()])
            }
            Scenario::WrongKey => SessionScript::new(vec![error("AuthenticationFailure")])
                .then_after_keys(vec![connecting(), error("AuthenticationFailure")]),
            Scenario::Fatal => SessionScript::new(vec![connecting(), error("AssociationError")]),
            Scenario::Flaky => SessionScript::new(vec![
                SessionStep::Fail {
                    fail: "gateway timeout".to_string(),
                },
                connecting(),
                error("CRCError"),
                done(),
            ]),
        }
    }
}

impl FromStr for Scenario {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        if normalized.is_empty() {
            return Ok(Scenario::default());
        }
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == normalized)
            .ok_or_else(|| UnknownScenario(s.to_string()))
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
