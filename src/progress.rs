//! Progress UI (spinner) driven by job events.

use std::time::Duration;

use converter_core::{JobEvent, JobState};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

/// Spawns the progress UI (spinner) when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `use_spinner` is false, returns (None, stop) with stop already cancelled.
pub(crate) fn spawn_progress_ui(
    use_spinner: bool,
    events: broadcast::Receiver<JobEvent>,
    label: String,
) -> (Option<tokio::task::JoinHandle<()>>, CancellationToken) {
    let stop = CancellationToken::new();
    if !use_spinner {
        stop.cancel();
        return (None, stop);
    }
    let handle = spawn_spinner_inner(events, label, stop.clone());
    (Some(handle), stop)
}

fn spawn_spinner_inner(
    mut events: broadcast::Receiver<JobEvent>,
    label: String,
    stop: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(format!("[{label}] Starting..."));

        loop {
            let event = tokio::select! {
                () = stop.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Ok(JobEvent::StateChanged { state, .. }) => {
                    if state.is_terminal() {
                        break;
                    }
                    if let Some(message) = state_message(state) {
                        spinner.set_message(format!("[{label}] {message}"));
                    }
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }

        spinner.finish_and_clear();
    })
}

/// Spinner text for a non-terminal state.
fn state_message(state: JobState) -> Option<&'static str> {
    match state {
        JobState::Validating => Some("Validating files..."),
        JobState::Uploading => Some("Uploading..."),
        JobState::Polling => Some("Converting..."),
        JobState::Idle | JobState::Completed | JobState::Failed | JobState::Cancelled => None,
    }
}
