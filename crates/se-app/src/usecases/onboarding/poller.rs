//! Session poller.
//!
//! Repeatedly queries the onboarding session of one device until the caller
//! says stop or the loop is cancelled. The poller never navigates and never
//! shows messages; it only forwards snapshots.
//!
//! 会话轮询：只负责拉取快照并转交给调用方。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use se_core::ids::DeviceId;
use se_core::onboarding::OnboardingSession;
use se_core::ports::OnboardingSessionPort;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

/// Answer of a sink after handling one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    Continue,
    Stop,
}

/// Receives snapshots in request order. The next poll is armed only after
/// `on_snapshot` returns.
#[async_trait]
pub trait SessionSnapshotSink: Send + Sync {
    async fn on_snapshot(&self, device_id: &DeviceId, session: OnboardingSession) -> PollControl;
}

/// Shortest accepted delay between polls. Shorter configured values are
/// raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct SessionPoller {
    port: Arc<dyn OnboardingSessionPort>,
    interval: Duration,
}

impl SessionPoller {
    pub fn new(port: Arc<dyn OnboardingSessionPort>, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            warn!(
                requested_ms = interval.as_millis() as u64,
                min_ms = MIN_POLL_INTERVAL.as_millis() as u64,
                "poll interval too short; using minimum"
            );
        }
        Self {
            port,
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the poll loop. The first query fires immediately.
    pub fn start(&self, device_id: DeviceId, sink: Arc<dyn SessionSnapshotSink>) -> PollHandle {
        let token = CancellationToken::new();
        let span = info_span!("usecase.session_poller", device_id = %device_id);
        let task = tokio::spawn(
            poll_loop(
                self.port.clone(),
                self.interval,
                device_id,
                sink,
                token.clone(),
            )
            .instrument(span),
        );
        PollHandle {
            token,
            task: Some(task),
        }
    }
}

async fn poll_loop(
    port: Arc<dyn OnboardingSessionPort>,
    interval: Duration,
    device_id: DeviceId,
    sink: Arc<dyn SessionSnapshotSink>,
    token: CancellationToken,
) {
    loop {
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = port.get_onboarding_session(&device_id) => result,
        };
        // A response that raced with cancellation is dropped.
        if token.is_cancelled() {
            break;
        }

        match result {
            Ok(session) => {
                debug!(status = %session.status, error_code = ?session.error_code, "session snapshot");
                if sink.on_snapshot(&device_id, session).await == PollControl::Stop {
                    break;
                }
            }
            Err(err) => {
                warn!(error = %err, "session query failed; retrying after interval");
            }
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    debug!("session poll loop stopped");
}

/// Owner of a running poll loop. Dropping the handle cancels the loop.
pub struct PollHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait until the loop has exited, without cancelling it.
    pub async fn join(mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        if let Err(err) = task.await {
            warn!(error = %err, "session poll task ended abnormally");
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
