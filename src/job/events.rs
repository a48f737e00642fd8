//! Events published by the job controller.

use crate::resolve::{ConversionResult, DownloadTarget};

use super::state::{JobError, JobState};

/// Notification sent to every subscriber of a controller.
///
/// Every event carries the job's `seq`, so a subscriber can ignore events of
/// a job that has since been superseded.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// The job moved to a new state.
    StateChanged {
        /// Job number.
        seq: u64,
        /// New state.
        state: JobState,
    },

    /// The job completed; follows `StateChanged(Completed)`.
    Completed {
        /// Job number.
        seq: u64,
        /// Normalized result.
        result: ConversionResult,
        /// Where to download it.
        target: DownloadTarget,
    },

    /// The job failed; follows `StateChanged(Failed)`.
    ///
    /// Never sent for cancelled or timed-out jobs.
    Failed {
        /// Job number.
        seq: u64,
        /// What went wrong.
        error: JobError,
    },
}

impl JobEvent {
    /// Job number the event belongs to.
    #[must_use]
    pub fn seq(&self) -> u64 {
        match self {
            Self::StateChanged { seq, .. }
            | Self::Completed { seq, .. }
            | Self::Failed { seq, .. } => *seq,
        }
    }
}
