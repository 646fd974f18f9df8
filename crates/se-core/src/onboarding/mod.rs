//! Onboarding domain module.
//!
//! Everything that decides how a freshly paired device moves from Wi-Fi
//! provisioning to a finished onboarding session:
//!
//! ```text
//! session snapshot ──▶ error_table::classify ──▶ wait::WaitStep
//!                                                   │
//! user / SDK events ──▶ OnboardingStateMachine ◀────┘
//!                             │
//!                             └──▶ OnboardingAction (executed by se-app)
//! ```

pub mod action;
pub mod error;
pub mod error_table;
pub mod event;
pub mod key_form;
pub mod retry_window;
pub mod session;
pub mod state;
pub mod state_machine;
pub mod validation;
pub mod wait;

pub use action::OnboardingAction;
pub use error::OnboardingError;
pub use error_table::{classify, ErrorDisposition, DECRYPTION_ERROR_CODE, GENERIC_ERROR_CODE};
pub use event::OnboardingEvent;
pub use key_form::{EncryptionKeyForm, EncryptionKeys, KeyField};
pub use retry_window::{DecryptionRetryWindow, RetryWindowVerdict};
pub use session::{OnboardingSession, OnboardingSessionStatus};
pub use state::OnboardingState;
pub use state_machine::{OnboardingPolicy, OnboardingStateMachine};
pub use validation::{GpkSlot, ValidationError};
pub use wait::{WaitContext, WaitDecision, WaitMode, WaitPhase, WaitStep};
