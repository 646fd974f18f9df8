//! Credential prompt adapters.
//!
//! Both implementations honour the same contract: `Ok(Some(_))` with what
//! the user typed, `Ok(None)` when the prompt was dismissed. Emptiness is
//! checked by the onboarding flow, not here.
//!
//! 两种实现共享同一契约。

mod inline_form;
mod system_dialog;

pub use inline_form::{CredentialRequest, InlineFormPrompt};
pub use system_dialog::{SystemDialog, SystemDialogPrompt};
