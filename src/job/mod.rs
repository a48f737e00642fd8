//! Conversion job lifecycle.
//!
//! A [`JobController`] validates a file set, uploads it, and either reads the
//! result from the upload response (synchronous kinds) or polls the status
//! endpoint until the server reports a terminal status (asynchronous kinds).
//! The whole job runs under one wall-clock ceiling and one cancel signal.
//!
//! Observers follow progress through [`JobController::subscribe`] or through
//! the [`JobHandle`] returned by [`JobController::submit`].

mod controller;
mod events;
mod poller;
mod signal;
mod state;

#[cfg(test)]
mod test_transport;

pub use controller::{JobController, JobHandle, SubmitError};
pub use events::JobEvent;
pub use poller::Poller;
pub use signal::{CancelReason, JobSignal};
pub use state::{ErrorKind, Job, JobError, JobState};
