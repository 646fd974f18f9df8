use std::sync::Mutex as StdMutex;

use se_core::onboarding::OnboardingState;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Shared onboarding context containing state, dispatch lock and the token of
/// the current attempt.
///
/// ## Lock Ordering
/// When acquiring both locks, acquire `dispatch_lock` first, then `state`.
/// - `dispatch_lock`: serializes dispatches so each event is applied exactly once.
/// - `state`: read by `get_state`, written during dispatch and by invalidation.
///
/// ## Attempts
/// Every flow runs under an attempt token. Leaving the flow cancels the token
/// and installs a fresh one; work started under the old token may no longer
/// write state or navigate.
pub struct OnboardingContext {
    state: Mutex<OnboardingState>,
    dispatch_lock: Mutex<()>,
    attempt: StdMutex<CancellationToken>,
}

impl OnboardingContext {
    pub fn new(initial_state: OnboardingState) -> Self {
        Self {
            state: Mutex::new(initial_state),
            dispatch_lock: Mutex::new(()),
            attempt: StdMutex::new(CancellationToken::new()),
        }
    }

    /// Current state. Does NOT acquire `dispatch_lock`.
    pub async fn get_state(&self) -> OnboardingState {
        self.state.lock().await.clone()
    }

    pub async fn acquire_dispatch_lock(&self) -> MutexGuard<'_, ()> {
        self.dispatch_lock.lock().await
    }

    /// Token of the attempt in progress.
    pub fn attempt(&self) -> CancellationToken {
        self.attempt
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Lock the state for a write on behalf of `attempt`.
    ///
    /// Returns `None` once the attempt was invalidated. Holding the guard keeps
    /// invalidation out until the write is done. Never hold it across a port
    /// call: ports may call back into `get_state`.
    pub async fn lock_current(
        &self,
        attempt: &CancellationToken,
    ) -> Option<MutexGuard<'_, OnboardingState>> {
        let guard = self.state.lock().await;
        if attempt.is_cancelled() {
            return None;
        }
        Some(guard)
    }

    /// Whether `attempt` may still navigate or emit.
    pub fn is_current(&self, attempt: &CancellationToken) -> bool {
        !attempt.is_cancelled()
    }

    /// Cancel the current attempt, start a new one and apply `reset` to the
    /// state in the same critical section.
    ///
    /// Does not wait for `dispatch_lock`; a dispatch still running under the
    /// old attempt can no longer write.
    pub async fn invalidate_attempt<R>(&self, reset: impl FnOnce(&mut OnboardingState) -> R) -> R {
        let mut state = self.state.lock().await;
        {
            let mut attempt = self
                .attempt
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            attempt.cancel();
            *attempt = CancellationToken::new();
        }
        reset(&mut state)
    }
}

impl Default for OnboardingContext {
    fn default() -> Self {
        Self::new(OnboardingState::Idle)
    }
}
