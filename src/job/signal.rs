//! Per-job cancel signal that remembers why it fired.

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

/// Why a job was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Explicit cancel request.
    User,
    /// The job exceeded its wall-clock ceiling.
    TimedOut,
    /// A newer submission replaced the job.
    Superseded,
    /// The controller was disposed.
    Disposed,
}

/// Cancellation token plus the first recorded reason.
#[derive(Debug, Clone, Default)]
pub struct JobSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
}

impl JobSignal {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal. Returns false when it had already fired; the first
    /// reason is kept.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        self.token.cancel();
        first
    }

    /// Reason recorded by the first [`cancel`](Self::cancel), if any.
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        self.reason.get().copied()
    }

    /// Returns true once fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.reason.get().is_some()
    }

    /// Token shared with in-flight requests.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
