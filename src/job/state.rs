//! Job snapshot, lifecycle states and the errors observers see.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::kind::ConversionKind;
use crate::resolve::{ConversionResult, DownloadTarget};

/// Lifecycle of one conversion job.
///
/// ```text
/// Idle → Validating → Uploading → Polling → Completed | Failed | Cancelled
/// ```
/// `Polling` only occurs for asynchronous kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Nothing submitted yet.
    Idle,
    /// Accepted by validation, waiting for its task to start.
    Validating,
    /// Multipart upload in flight.
    Uploading,
    /// Waiting for an asynchronous conversion to finish.
    Polling,
    /// Result available.
    Completed,
    /// Conversion failed.
    Failed,
    /// Stopped by the user, a newer submission, disposal or the timeout.
    Cancelled,
}

impl JobState {
    /// Returns true for `Completed`, `Failed` and `Cancelled`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Uploading => "uploading",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a job error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The file set was refused before upload.
    Validation,
    /// Upload or status check failed (network or non-2xx).
    Upload,
    /// The job exceeded its wall-clock ceiling.
    TimedOut,
    /// Stopped on request; never reported as a failure.
    Cancelled,
    /// The server reported the conversion as failed.
    Remote,
    /// The server answered with something that is not a usable result.
    MalformedResult,
    /// Fetching the converted file failed.
    Download,
}

/// Error attached to a failed or cancelled job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct JobError {
    /// Category.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl JobError {
    /// Creates an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Upload or status-check failure.
    #[must_use]
    pub fn upload(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upload, message)
    }

    /// Conversion failed on the server.
    #[must_use]
    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Remote, message)
    }

    /// Unusable server answer.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedResult, message)
    }

    /// Job stopped on request.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "Conversion cancelled")
    }

    /// Job exceeded `limit`.
    #[must_use]
    pub fn timed_out(limit: Duration) -> Self {
        Self::new(
            ErrorKind::TimedOut,
            format!("Conversion timed out after {}s", limit.as_secs()),
        )
    }

    /// Returns true for errors that should be reported to the user.
    ///
    /// Only plain cancellation is silent.
    #[must_use]
    pub fn is_reportable(&self) -> bool {
        self.kind != ErrorKind::Cancelled
    }
}

/// Snapshot of one job.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Local submission number, increasing per controller.
    pub seq: u64,
    /// What is being converted.
    pub kind: ConversionKind,
    /// Server task id, asynchronous kinds only.
    pub task_id: Option<String>,
    /// Current state.
    pub state: JobState,
    /// Set on `Completed`.
    pub result: Option<ConversionResult>,
    /// Set on `Completed`.
    pub target: Option<DownloadTarget>,
    /// Set on `Failed`, and on `Cancelled` with kind `Cancelled` or `TimedOut`.
    pub error: Option<JobError>,
}

impl Job {
    pub(crate) fn new(seq: u64, kind: ConversionKind) -> Self {
        Self {
            seq,
            kind,
            task_id: None,
            state: JobState::Validating,
            result: None,
            target: None,
            error: None,
        }
    }

    /// Returns true once the job reached a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
