use std::path::{Path, PathBuf};

use serde::Deserialize;
use se_core::onboarding::OnboardingSession;

/// One answer of the session query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SessionStep {
    /// The query itself fails with this message.
    Fail { fail: String },
    Snapshot(OnboardingSession),
}

/// Answers replayed by the simulated session query, in order. The last step
/// of a list repeats once the list is exhausted.
///
/// ```json
/// {
///   "beforeKeys": [{ "status": "Connecting" }, { "status": "ErrorMessages", "errorCode": "DecryptionError" }],
///   "afterKeys":  [{ "status": "Done" }]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionScript {
    pub before_keys: Vec<SessionStep>,
    /// Replayed from the start each time encryption keys are set. Empty
    /// means keep replaying `before_keys`.
    #[serde(default)]
    pub after_keys: Vec<SessionStep>,
}

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("failed to read session script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid session script: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("session script has no steps")]
    Empty,
}

impl SessionScript {
    pub fn new(before_keys: Vec<SessionStep>) -> Self {
        Self {
            before_keys,
            after_keys: Vec::new(),
        }
    }

    pub fn then_after_keys(mut self, after_keys: Vec<SessionStep>) -> Self {
        self.after_keys = after_keys;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        let script: SessionScript = serde_json::from_str(json)?;
        if script.before_keys.is_empty() {
            return Err(ScriptError::Empty);
        }
        Ok(script)
    }

    /// Read a script file.
    pub async fn load(path: &Path) -> Result<Self, ScriptError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ScriptError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&content)
    }
}
