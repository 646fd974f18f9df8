//! Wait-for-completion step.
//!
//! A pure transition `(wait context, snapshot, now) -> (wait context, decision)`.
//! All state that must survive between polls (the decryption retry window, the
//! last non-fatal notice) lives in [`WaitContext`] and is passed in explicitly.
//!
//! Per snapshot precedence: `Done` > error code > firmware progress > anything else.

use serde::Serialize;
use std::time::Duration;

use super::error_table::{classify, ErrorDisposition, DECRYPTION_ERROR_CODE};
use super::retry_window::{DecryptionRetryWindow, RetryWindowVerdict};
use super::session::{OnboardingSession, OnboardingSessionStatus};
use crate::ids::DeviceId;
use crate::navigation::Screen;

/// Where the wait is hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WaitMode {
    /// Finishing setup after Wi-Fi (and blinks-per-kWh) configuration.
    Onboarding,
    /// Verifying freshly submitted encryption keys on the key entry screen.
    KeyVerification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WaitPhase {
    Waiting,
    FirmwareUpdating,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitContext {
    pub device_id: DeviceId,
    pub mode: WaitMode,
    pub phase: WaitPhase,
    pub window: DecryptionRetryWindow,
    pub last_status: Option<OnboardingSessionStatus>,
    pub firmware_progress: Option<u8>,
    /// Continuable device issue currently shown as status text.
    pub notice: Option<ErrorDisposition>,
}

impl WaitContext {
    pub fn new(device_id: DeviceId, mode: WaitMode) -> Self {
        Self {
            device_id,
            mode,
            phase: WaitPhase::Waiting,
            window: DecryptionRetryWindow::new(),
            last_status: None,
            firmware_progress: None,
            notice: None,
        }
    }
}

/// What the flow should do after one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitDecision {
    KeepPolling,
    Completed,
    /// Credential re-entry needed; leave the wait for `target`.
    Redirect { target: Screen },
    /// Key verification: the device refused the submitted keys.
    KeyRejected { disposition: ErrorDisposition },
    /// Key verification: `DecryptionError` outlived the retry window.
    DecryptionTimedOut { elapsed_ms: i64 },
    Fatal { disposition: ErrorDisposition },
}

#[derive(Debug, Clone, Copy)]
pub struct WaitStep {
    decryption_timeout: Duration,
}

impl WaitStep {
    pub fn new(decryption_timeout: Duration) -> Self {
        Self { decryption_timeout }
    }

    pub fn apply(
        &self,
        mut ctx: WaitContext,
        session: &OnboardingSession,
        now_ms: i64,
    ) -> (WaitContext, WaitDecision) {
        ctx.last_status = Some(session.status.clone());

        if session.is_done() {
            ctx.window.reset();
            return (ctx, WaitDecision::Completed);
        }

        if let Some(code) = session.reported_error() {
            return self.apply_error(ctx, code, now_ms);
        }

        ctx.window.reset();
        ctx.notice = None;
        if session.is_firmware_updating() {
            ctx.phase = WaitPhase::FirmwareUpdating;
            ctx.firmware_progress = session.firmware_progress;
        } else {
            ctx.phase = WaitPhase::Waiting;
            ctx.firmware_progress = None;
        }
        (ctx, WaitDecision::KeepPolling)
    }

    fn apply_error(
        &self,
        mut ctx: WaitContext,
        code: &str,
        now_ms: i64,
    ) -> (WaitContext, WaitDecision) {
        let disposition = classify(code);
        let is_decryption = code == DECRYPTION_ERROR_CODE;
        if !is_decryption {
            ctx.window.reset();
        }

        // A redirect to the key screen is moot while already verifying keys there.
        let redirect = match ctx.mode {
            WaitMode::Onboarding => disposition.redirect_target,
            WaitMode::KeyVerification => None,
        };
        if let Some(target) = redirect {
            return (ctx, WaitDecision::Redirect { target });
        }

        if is_decryption {
            ctx.phase = WaitPhase::Waiting;
            return match ctx.window.observe(now_ms, self.decryption_timeout) {
                RetryWindowVerdict::TimedOut { elapsed_ms } => {
                    ctx.window.reset();
                    (ctx, WaitDecision::DecryptionTimedOut { elapsed_ms })
                }
                RetryWindowVerdict::Started | RetryWindowVerdict::Waiting { .. } => {
                    (ctx, WaitDecision::KeepPolling)
                }
            };
        }

        if disposition.redirect_target.is_some() {
            return (ctx, WaitDecision::KeyRejected { disposition });
        }

        if disposition.can_continue {
            ctx.phase = WaitPhase::Waiting;
            ctx.notice = Some(disposition);
            return (ctx, WaitDecision::KeepPolling);
        }

        (ctx, WaitDecision::Fatal { disposition })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step() -> WaitStep {
        WaitStep::new(Duration::from_secs(180))
    }

    fn ctx(mode: WaitMode) -> WaitContext {
        WaitContext::new(DeviceId::from("SE-1"), mode)
    }

    #[test]
    fn done_completes() {
        let (_, decision) = step().apply(ctx(WaitMode::Onboarding), &OnboardingSession::done(), 0);
        assert_eq!(decision, WaitDecision::Completed);
    }

    #[test]
    fn firmware_update_keeps_polling_and_switches_phase() {
        let (next, decision) = step().apply(
            ctx(WaitMode::Onboarding),
            &OnboardingSession::firmware_update(Some(40)),
            0,
        );
        assert_eq!(decision, WaitDecision::KeepPolling);
        assert_eq!(next.phase, WaitPhase::FirmwareUpdating);
        assert_eq!(next.firmware_progress, Some(40));
    }

    #[test]
    fn credential_errors_redirect_during_onboarding() {
        for code in ["DecryptionError", "AuthenticationFailure", "SecurityError"] {
            let (_, decision) =
                step().apply(ctx(WaitMode::Onboarding), &OnboardingSession::error(code), 0);
            assert_eq!(
                decision,
                WaitDecision::Redirect {
                    target: Screen::EncryptionKey
                },
                "{code}"
            );
        }
    }

    #[test]
    fn continuable_error_keeps_polling_with_notice() {
        let (next, decision) = step().apply(
            ctx(WaitMode::Onboarding),
            &OnboardingSession::error("CRCError"),
            0,
        );
        assert_eq!(decision, WaitDecision::KeepPolling);
        assert_eq!(next.notice.as_ref().map(|d| d.error_code.as_str()), Some("CRCError"));

        let (next, _) = step().apply(
            next,
            &OnboardingSession::with_status("WaitingForMeterData"),
            2_000,
        );
        assert!(next.notice.is_none());
    }

    #[test]
    fn fatal_and_unknown_errors_stop() {
        let (_, decision) = step().apply(
            ctx(WaitMode::Onboarding),
            &OnboardingSession::error("NegotiateError"),
            0,
        );
        assert!(matches!(decision, WaitDecision::Fatal { disposition } if disposition.error_code == "NegotiateError"));

        let (_, decision) = step().apply(
            ctx(WaitMode::Onboarding),
            &OnboardingSession::error("SomethingNew"),
            0,
        );
        assert!(matches!(decision, WaitDecision::Fatal { disposition } if disposition.error_code == "GenericError"));
    }

    #[test]
    fn decryption_error_times_out_after_window_during_key_verification() {
        let s = step();
        let decryption = OnboardingSession::error("DecryptionError");

        let (next, decision) = s.apply(ctx(WaitMode::KeyVerification), &decryption, 1_000);
        assert_eq!(decision, WaitDecision::KeepPolling);
        assert_eq!(next.window.started_at_ms(), Some(1_000));

        let (_, decision) = s.apply(next, &decryption, 182_000);
        assert_eq!(
            decision,
            WaitDecision::DecryptionTimedOut {
                elapsed_ms: 181_000
            }
        );
    }

    #[test]
    fn other_snapshot_between_decryption_errors_resets_window() {
        let s = step();
        let decryption = OnboardingSession::error("DecryptionError");

        let (next, _) = s.apply(ctx(WaitMode::KeyVerification), &decryption, 0);
        let (next, _) = s.apply(next, &OnboardingSession::with_status("Connecting"), 90_000);
        assert!(!next.window.is_open());

        let (next, decision) = s.apply(next, &decryption, 181_000);
        assert_eq!(decision, WaitDecision::KeepPolling);
        assert_eq!(next.window.started_at_ms(), Some(181_000));
    }

    #[test]
    fn continuable_error_also_resets_window() {
        let s = step();
        let (next, _) = s.apply(
            ctx(WaitMode::KeyVerification),
            &OnboardingSession::error("DecryptionError"),
            0,
        );
        let (next, _) = s.apply(next, &OnboardingSession::error("ReadError"), 2_000);
        assert!(!next.window.is_open());
    }

    #[test]
    fn other_credential_errors_reject_keys_during_key_verification() {
        let (_, decision) = step().apply(
            ctx(WaitMode::KeyVerification),
            &OnboardingSession::error("AuthenticationFailure"),
            0,
        );
        assert!(matches!(decision, WaitDecision::KeyRejected { .. }));
    }

    #[test]
    fn done_takes_precedence_over_firmware_progress() {
        let session = OnboardingSession {
            status: OnboardingSessionStatus::Done,
            error_code: None,
            firmware_progress: Some(99),
        };
        let (_, decision) = step().apply(ctx(WaitMode::Onboarding), &session, 0);
        assert_eq!(decision, WaitDecision::Completed);
    }
}
