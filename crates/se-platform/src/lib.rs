//! # se-platform
//!
//! Platform-specific implementations for the Saveeye companion.
//!
//! This crate contains the adapters that talk to the user through the
//! host platform: the inline credential form and the native system dialog.

pub mod capability;
pub mod credential_prompt;

pub use capability::{detect_prompt_capability, PromptCapability};
pub use credential_prompt::{
    CredentialRequest, InlineFormPrompt, SystemDialog, SystemDialogPrompt,
};
