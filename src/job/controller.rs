//! The job controller: one conversion at a time, last submission wins.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use super::events::JobEvent;
use super::poller::Poller;
use super::signal::{CancelReason, JobSignal};
use super::state::{ErrorKind, Job, JobError, JobState};
use crate::config::ClientConfig;
use crate::kind::ConversionKind;
use crate::resolve::{
    self, ConversionResult, DownloadTarget, ResolveError, StatusPayload, TaskStatus,
};
use crate::upload::{ConversionTransport, CsrfSource, RawResponse, TransportError, UploadRequest};
use crate::validate::{FileSet, Rejection, validate};

/// Events buffered per subscriber before the slowest one starts lagging.
const EVENT_BUFFER: usize = 64;

/// Message shown when a status query fails.
const STATUS_CHECK_FAILED: &str = "Failed to check conversion status";

/// Why [`JobController::submit`] refused a file set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The files do not fit the conversion kind.
    #[error("{0}")]
    Validation(#[source] Rejection),

    /// The controller has been disposed.
    #[error("controller has been disposed")]
    Disposed,
}

impl SubmitError {
    /// Category as seen by observers.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Disposed => ErrorKind::Cancelled,
        }
    }
}

/// Caller's view of one submitted job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    seq: u64,
    snapshot: watch::Receiver<Job>,
    signal: JobSignal,
}

impl JobHandle {
    /// Job number.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Job {
        self.snapshot.borrow().clone()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> JobState {
        self.snapshot.borrow().state
    }

    /// Requests cancellation. Returns false when the job had already ended
    /// or was already being stopped.
    pub fn cancel(&self) -> bool {
        if self.state().is_terminal() {
            return false;
        }
        self.signal.cancel(CancelReason::User)
    }

    /// Waits for a terminal state and returns the final snapshot.
    pub async fn wait(&self) -> Job {
        let mut rx = self.snapshot.clone();
        if let Ok(job) = rx.wait_for(Job::is_terminal).await {
            return job.clone();
        }
        // Task ended without a terminal snapshot (panicked).
        rx.borrow().clone()
    }
}

struct ActiveJob {
    seq: u64,
    signal: JobSignal,
    task: JoinHandle<()>,
    snapshot: watch::Receiver<Job>,
}

/// Drives conversions of one kind.
///
/// At most one job is live at a time: submitting while a job runs cancels
/// that job and waits for its task to finish before the new upload starts.
#[derive(Debug)]
pub struct JobController {
    kind: ConversionKind,
    transport: Arc<dyn ConversionTransport>,
    config: ClientConfig,
    csrf: CsrfSource,
    events: broadcast::Sender<JobEvent>,
    current: Mutex<Option<ActiveJob>>,
    next_seq: AtomicU64,
    disposed: AtomicBool,
}

impl std::fmt::Debug for ActiveJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveJob")
            .field("seq", &self.seq)
            .field("state", &self.snapshot.borrow().state)
            .finish_non_exhaustive()
    }
}

impl JobController {
    /// Creates a controller for `kind`.
    #[must_use]
    pub fn new(
        kind: ConversionKind,
        transport: Arc<dyn ConversionTransport>,
        config: ClientConfig,
        csrf: CsrfSource,
    ) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_BUFFER);
        Self {
            kind,
            transport,
            config,
            csrf,
            events,
            current: Mutex::new(None),
            next_seq: AtomicU64::new(1),
            disposed: AtomicBool::new(false),
        }
    }

    /// Conversion kind this controller handles.
    #[must_use]
    pub fn kind(&self) -> ConversionKind {
        self.kind
    }

    /// Subscribes to job events.
    ///
    /// Each subscriber receives every event sent after it subscribed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Validates `files` and starts a job for them.
    ///
    /// A rejected file set leaves any running job untouched.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Validation`] when the files do not fit the kind, and
    /// [`SubmitError::Disposed`] after [`dispose`](Self::dispose).
    pub async fn submit(&self, files: FileSet) -> Result<JobHandle, SubmitError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(SubmitError::Disposed);
        }
        validate(&files, &self.kind.profile()).map_err(|rejection| {
            debug!(kind = %self.kind, reason = %rejection, "file set rejected");
            SubmitError::Validation(rejection)
        })?;

        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            stop(previous, CancelReason::Superseded).await;
        }
        if self.disposed.load(Ordering::SeqCst) {
            return Err(SubmitError::Disposed);
        }

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let signal = JobSignal::new();
        let (snapshot_tx, snapshot_rx) = watch::channel(Job::new(seq, self.kind));
        let endpoint = self.endpoint();

        let run = JobRun {
            seq,
            kind: self.kind,
            request: UploadRequest {
                csrf_token: self.csrf.token_for(&endpoint),
                endpoint,
                fields: self.kind.form_fields(),
                files,
                file_field: self.kind.file_field(),
            },
            transport: Arc::clone(&self.transport),
            origin: self.config.origin.clone(),
            poll_interval: self.config.poll_interval,
            job_timeout: self.config.job_timeout,
            signal: signal.clone(),
            snapshot: snapshot_tx,
            events: self.events.clone(),
        };
        let span = info_span!("job", seq, kind = %self.kind);
        let task = tokio::spawn(run.execute().instrument(span));

        info!(seq, kind = %self.kind, "job submitted");
        *current = Some(ActiveJob {
            seq,
            signal: signal.clone(),
            task,
            snapshot: snapshot_rx.clone(),
        });

        Ok(JobHandle {
            seq,
            snapshot: snapshot_rx,
            signal,
        })
    }

    /// Cancels the running job, if any. Returns true when a job was
    /// signalled.
    pub async fn cancel(&self) -> bool {
        let current = self.current.lock().await;
        match current.as_ref() {
            Some(active) if !active.snapshot.borrow().state.is_terminal() => {
                debug!(seq = active.seq, "cancel requested");
                active.signal.cancel(CancelReason::User)
            }
            _ => false,
        }
    }

    /// Snapshot of the most recent job.
    pub async fn current(&self) -> Option<Job> {
        let current = self.current.lock().await;
        current.as_ref().map(|active| active.snapshot.borrow().clone())
    }

    /// State of the most recent job, `Idle` before the first submission.
    pub async fn state(&self) -> JobState {
        self.current().await.map_or(JobState::Idle, |job| job.state)
    }

    /// Cancels the running job, waits for it to stop and refuses further
    /// submissions.
    pub async fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        let mut current = self.current.lock().await;
        if let Some(active) = current.take() {
            stop(active, CancelReason::Disposed).await;
        }
        debug!(kind = %self.kind, "controller disposed");
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/api/{}/",
            self.config.origin.trim_end_matches('/'),
            self.kind.endpoint_slug()
        )
    }
}

/// Signals a job and waits for its task to wind down.
async fn stop(active: ActiveJob, reason: CancelReason) {
    if !active.snapshot.borrow().state.is_terminal() {
        debug!(seq = active.seq, ?reason, "stopping job");
        active.signal.cancel(reason);
    }
    if let Err(e) = active.task.await {
        warn!(seq = active.seq, error = %e, "job task ended abnormally");
    }
}

/// How a job stopped short of a result.
enum Interrupt {
    /// The signal fired; the recorded reason decides the outcome.
    Aborted,
    /// The job failed.
    Failed(JobError),
}

impl From<ResolveError> for Interrupt {
    fn from(error: ResolveError) -> Self {
        Self::Failed(JobError::malformed(error.to_string()))
    }
}

struct Completion {
    result: ConversionResult,
    target: DownloadTarget,
}

/// Everything one job task owns.
struct JobRun {
    seq: u64,
    kind: ConversionKind,
    request: UploadRequest,
    transport: Arc<dyn ConversionTransport>,
    origin: String,
    poll_interval: Duration,
    job_timeout: Duration,
    signal: JobSignal,
    snapshot: watch::Sender<Job>,
    events: broadcast::Sender<JobEvent>,
}

impl JobRun {
    async fn execute(self) {
        let outcome = match tokio::time::timeout(self.job_timeout, self.drive()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                self.signal.cancel(CancelReason::TimedOut);
                Err(Interrupt::Aborted)
            }
        };
        self.finish(outcome);
    }

    async fn drive(&self) -> Result<Completion, Interrupt> {
        self.transition(JobState::Uploading);
        let token = self.signal.token();

        let response = self
            .transport
            .send(&self.request, token)
            .await
            .map_err(|e| transport_interrupt(&e, e.to_string()))?;
        if !response.is_success() {
            return Err(Interrupt::Failed(JobError::upload(upload_failure_message(
                &response,
            ))));
        }
        let body = response
            .json
            .ok_or_else(|| ResolveError::malformed("upload response is not JSON"))?;

        if !self.kind.profile().is_async {
            let result = resolve::parse_sync_result(&body)?;
            let target = self.target_for(&result)?;
            return Ok(Completion { result, target });
        }

        let task_id = resolve::parse_task_id(&body)?;
        debug!(task_id = %task_id, "conversion accepted");
        let status_url = format!(
            "{}/api/conversion-status/{task_id}/",
            self.origin.trim_end_matches('/')
        );
        self.snapshot.send_modify(|job| job.task_id = Some(task_id));
        self.transition(JobState::Polling);

        let poller = Poller::new(self.poll_interval, token.clone());
        poller
            .run(|| self.check_status(&status_url))
            .await
            .unwrap_or(Err(Interrupt::Aborted))
    }

    async fn check_status(
        &self,
        status_url: &str,
    ) -> ControlFlow<Result<Completion, Interrupt>> {
        let response = match self.transport.status(status_url, self.signal.token()).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "status check failed");
                return ControlFlow::Break(Err(transport_interrupt(&e, STATUS_CHECK_FAILED)));
            }
        };
        let payload = match response.json {
            Some(payload) if response.is_success() => payload,
            _ => {
                warn!(status = response.status, "status check rejected");
                return ControlFlow::Break(Err(Interrupt::Failed(JobError::upload(
                    STATUS_CHECK_FAILED,
                ))));
            }
        };
        let status = match StatusPayload::parse(&payload) {
            Ok(status) => status,
            Err(e) => return ControlFlow::Break(Err(e.into())),
        };

        debug!(status = ?status.status, "conversion status");
        match &status.status {
            TaskStatus::Completed => ControlFlow::Break(
                resolve::completed_result(&status, &payload)
                    .and_then(|result| {
                        Ok(Completion {
                            target: self.target_for(&result)?,
                            result,
                        })
                    })
                    .map_err(Interrupt::from),
            ),
            TaskStatus::Failed => {
                let message = status.error.clone().unwrap_or_else(|| "Unknown error".to_string());
                ControlFlow::Break(Err(Interrupt::Failed(JobError::remote(message))))
            }
            TaskStatus::Pending | TaskStatus::Processing => ControlFlow::Continue(()),
            TaskStatus::Other(other) => {
                warn!(status = %other, "unknown conversion status, still polling");
                ControlFlow::Continue(())
            }
        }
    }

    fn target_for(&self, result: &ConversionResult) -> Result<DownloadTarget, ResolveError> {
        resolve::resolve_download_target(
            &result.raw_payload,
            &self.origin,
            self.kind.output_extension(),
        )
    }

    fn transition(&self, state: JobState) {
        self.snapshot.send_modify(|job| job.state = state);
        debug!(state = %state, "job state changed");
        self.emit(JobEvent::StateChanged {
            seq: self.seq,
            state,
        });
    }

    /// Records the single terminal transition.
    fn finish(&self, outcome: Result<Completion, Interrupt>) {
        // A fired signal outranks whatever the task was about to report.
        if let Some(reason) = self.signal.reason() {
            let error = match reason {
                CancelReason::TimedOut => JobError::timed_out(self.job_timeout),
                CancelReason::User | CancelReason::Superseded | CancelReason::Disposed => {
                    JobError::cancelled()
                }
            };
            info!(?reason, "job cancelled");
            self.snapshot.send_modify(|job| job.error = Some(error));
            self.transition(JobState::Cancelled);
            return;
        }

        match outcome {
            Ok(Completion { result, target }) => {
                info!(url = %target.url, filename = %target.filename, "conversion completed");
                self.snapshot.send_modify(|job| {
                    job.result = Some(result.clone());
                    job.target = Some(target.clone());
                });
                self.transition(JobState::Completed);
                self.emit(JobEvent::Completed {
                    seq: self.seq,
                    result,
                    target,
                });
            }
            Err(Interrupt::Failed(error)) => {
                warn!(kind = ?error.kind, error = %error.message, "conversion failed");
                self.snapshot.send_modify(|job| job.error = Some(error.clone()));
                self.transition(JobState::Failed);
                self.emit(JobEvent::Failed {
                    seq: self.seq,
                    error,
                });
            }
            Err(Interrupt::Aborted) => {
                // Aborted without a recorded reason: the token was cancelled
                // from outside the signal.
                self.snapshot.send_modify(|job| job.error = Some(JobError::cancelled()));
                self.transition(JobState::Cancelled);
            }
        }
    }

    fn emit(&self, event: JobEvent) {
        // No subscribers is fine.
        self.events.send(event).ok();
    }
}

fn transport_interrupt(error: &TransportError, message: impl Into<String>) -> Interrupt {
    if error.is_aborted() {
        Interrupt::Aborted
    } else {
        Interrupt::Failed(JobError::upload(message))
    }
}

/// Message for a non-2xx upload: body `error`, then `message`, then a
/// generic text naming the status.
fn upload_failure_message(response: &RawResponse) -> String {
    response
        .error_message()
        .unwrap_or_else(|| format!("Conversion failed with status {}", response.status))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::job::test_transport::{Reply, ScriptedTransport};
    use crate::validate::SelectedFile;
    use serde_json::json;

    fn config() -> ClientConfig {
        ClientConfig {
            origin: "http://conv.test".to_string(),
            ..ClientConfig::default()
        }
    }

    fn pdf() -> FileSet {
        FileSet::new(vec![
            SelectedFile::from_bytes("doc.pdf", b"%PDF-1.7".to_vec())
                .with_media_type(Some("application/pdf")),
        ])
    }

    fn controller(kind: ConversionKind, transport: &Arc<ScriptedTransport>) -> JobController {
        let transport: Arc<dyn ConversionTransport> = Arc::clone(transport) as _;
        JobController::new(kind, transport, config(), CsrfSource::Token("tok".to_string()))
    }

    fn html() -> ConversionKind {
        ConversionKind::PdfToHtml {
            mode: crate::kind::HtmlMode::Formatted,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_conversion_completes() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![Reply::json(200, json!({"converted_file": "/media/converted_files/42_doc.pdf"}))],
            vec![],
        ));
        let controller = controller(
            ConversionKind::PdfToImage {
                format: crate::kind::ImageFormat::Jpg,
            },
            &transport,
        );
        let mut events = controller.subscribe();

        let handle = controller.submit(pdf()).await.unwrap();
        let job = handle.wait().await;

        assert_eq!(job.state, JobState::Completed);
        let target = job.target.unwrap();
        assert_eq!(target.url, "http://conv.test/media/converted_files/42_doc.pdf");
        assert_eq!(target.filename, "doc.jpg");

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].endpoint, "http://conv.test/api/pdf-to-jpg/");
        assert_eq!(sent[0].csrf_token.as_deref(), Some("tok"));
        assert_eq!(sent[0].file_field, "file");

        assert_eq!(
            events.recv().await.unwrap(),
            JobEvent::StateChanged { seq: 1, state: JobState::Uploading }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            JobEvent::StateChanged { seq: 1, state: JobState::Completed }
        );
        assert!(matches!(events.recv().await.unwrap(), JobEvent::Completed { seq: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_failure_records_no_job() {
        let transport = Arc::new(ScriptedTransport::new(vec![], vec![]));
        let controller = controller(html(), &transport);

        let err = controller.submit(FileSet::default()).await.unwrap_err();
        assert_eq!(err, SubmitError::Validation(Rejection::Empty));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(controller.current().await.is_none());
        assert_eq!(controller.state().await, JobState::Idle);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_conversion_polls_until_completed() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![Reply::json(202, json!({"task_id": "t1", "status": "PENDING"}))],
            vec![
                Reply::json(200, json!({"status": "PENDING"})),
                Reply::json(200, json!({"status": "PROCESSING"})),
                Reply::json(
                    200,
                    json!({"status": "COMPLETED", "download_url": "/media/out/7_x.html"}),
                ),
            ],
        ));
        let controller = controller(html(), &transport);

        let started = tokio::time::Instant::now();
        let job = controller.submit(pdf()).await.unwrap().wait().await;

        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.task_id.as_deref(), Some("t1"));
        assert_eq!(job.target.unwrap().filename, "x.html");
        assert_eq!(transport.status_calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
        assert_eq!(
            transport.status_urls()[0],
            "http://conv.test/api/conversion-status/t1/"
        );
        assert_eq!(transport.max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_uses_server_message() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![Reply::json(202, json!({"task_id": "t1"}))],
            vec![Reply::json(200, json!({"status": "FAILED", "error": "corrupt PDF"}))],
        ));
        let controller = controller(html(), &transport);
        let mut events = controller.subscribe();

        let job = controller.submit(pdf()).await.unwrap().wait().await;
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error, Some(JobError::remote("corrupt PDF")));

        let mut saw_failed = false;
        while let Ok(event) = events.try_recv() {
            if let JobEvent::Failed { error, .. } = event {
                assert_eq!(error.message, "corrupt PDF");
                saw_failed = true;
            }
        }
        assert!(saw_failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_without_message() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![Reply::json(202, json!({"task_id": "t1"}))],
            vec![Reply::json(200, json!({"status": "FAILED"}))],
        ));
        let job = controller(html(), &transport).submit(pdf()).await.unwrap().wait().await;
        assert_eq!(job.error, Some(JobError::remote("Unknown error")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_without_download_url_is_malformed() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![Reply::json(202, json!({"task_id": "t1"}))],
            vec![Reply::json(200, json!({"status": "COMPLETED"}))],
        ));
        let job = controller(html(), &transport).submit(pdf()).await.unwrap().wait().await;
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error.unwrap().kind, ErrorKind::MalformedResult);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_error_message_priority() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![Reply::json(400, json!({"message": "bad input"}))],
            vec![],
        ));
        let job = controller(html(), &transport).submit(pdf()).await.unwrap().wait().await;
        assert_eq!(job.error, Some(JobError::upload("bad input")));

        let transport = Arc::new(ScriptedTransport::new(vec![Reply::empty(502)], vec![]));
        let job = controller(html(), &transport).submit(pdf()).await.unwrap().wait().await;
        assert_eq!(
            job.error,
            Some(JobError::upload("Conversion failed with status 502"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_upload_without_task_id_is_malformed() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![Reply::json(202, json!({"status": "PENDING"}))],
            vec![],
        ));
        let job = controller(html(), &transport).submit(pdf()).await.unwrap().wait().await;
        assert_eq!(job.error.unwrap().kind, ErrorKind::MalformedResult);
        assert_eq!(transport.status_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_check_failure() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![Reply::json(202, json!({"task_id": "t1"}))],
            vec![Reply::empty(500)],
        ));
        let job = controller(html(), &transport).submit(pdf()).await.unwrap().wait().await;
        assert_eq!(job.error, Some(JobError::upload(STATUS_CHECK_FAILED)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_upload_is_cancelled_not_failed() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![
                Reply::json(200, json!({"converted_file": "/a.pdf"}))
                    .delayed(Duration::from_secs(30)),
            ],
            vec![],
        ));
        let controller = controller(
            ConversionKind::PdfToWord {
                preserve_graphics: true,
            },
            &transport,
        );
        let mut events = controller.subscribe();

        let handle = controller.submit(pdf()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(handle.cancel());

        let job = handle.wait().await;
        assert_eq!(job.state, JobState::Cancelled);
        assert_eq!(job.error.unwrap().kind, ErrorKind::Cancelled);
        assert!(!handle.cancel());

        while let Ok(event) = events.try_recv() {
            assert!(!matches!(event, JobEvent::Failed { .. }), "cancelled job reported failure");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_during_upload_is_timed_out() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![
                Reply::json(200, json!({"converted_file": "/a.pdf"}))
                    .delayed(Duration::from_secs(120)),
            ],
            vec![],
        ));
        let controller = controller(
            ConversionKind::PdfToWord {
                preserve_graphics: true,
            },
            &transport,
        );
        let mut events = controller.subscribe();

        let started = tokio::time::Instant::now();
        let job = controller.submit(pdf()).await.unwrap().wait().await;

        let elapsed = started.elapsed();
        let limit = config().job_timeout;
        assert!(
            elapsed >= limit && elapsed < limit + Duration::from_secs(1),
            "timed out after {elapsed:?}"
        );
        assert_eq!(job.state, JobState::Cancelled);
        let error = job.error.unwrap();
        assert_eq!(error.kind, ErrorKind::TimedOut);
        assert_eq!(error.message, "Conversion timed out after 60s");
        assert!(job.target.is_none());
        assert_eq!(transport.status_calls(), 0);

        while let Ok(event) = events.try_recv() {
            assert!(!matches!(event, JobEvent::Failed { .. }), "timed-out job reported failure");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_terminal_job_times_out() {
        let statuses = (0..100)
            .map(|_| Reply::json(200, json!({"status": "PROCESSING"})))
            .collect();
        let transport = Arc::new(ScriptedTransport::new(
            vec![Reply::json(202, json!({"task_id": "slow"}))],
            statuses,
        ));
        let controller = controller(html(), &transport);

        let job = controller.submit(pdf()).await.unwrap().wait().await;
        assert_eq!(job.state, JobState::Cancelled);
        assert_eq!(job.error.unwrap().kind, ErrorKind::TimedOut);

        let calls = transport.status_calls();
        assert!(calls <= 30, "expected at most one poll per interval, got {calls}");
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.status_calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_supersede_cancels_previous_job_first() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![
                Reply::json(200, json!({"converted_file": "/1_first.pdf"}))
                    .delayed(Duration::from_secs(30)),
                Reply::json(200, json!({"converted_file": "/2_second.pdf"})),
            ],
            vec![],
        ));
        let controller = controller(
            ConversionKind::PdfToWord {
                preserve_graphics: false,
            },
            &transport,
        );

        let first = controller.submit(pdf()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let second = controller.submit(pdf()).await.unwrap();

        // The first task has fully wound down before submit returned.
        assert_eq!(first.state(), JobState::Cancelled);
        assert!(transport.first_aborted_before_second_started());

        let job = second.wait().await;
        assert_eq!(job.seq, 2);
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.target.unwrap().filename, "second.docx");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_and_rejects_submissions() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![Reply::json(202, json!({"task_id": "t"}))],
            (0..10).map(|_| Reply::json(200, json!({"status": "PENDING"}))).collect(),
        ));
        let controller = controller(html(), &transport);

        let handle = controller.submit(pdf()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        controller.dispose().await;

        assert_eq!(handle.state(), JobState::Cancelled);
        let calls = transport.status_calls();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(transport.status_calls(), calls);

        assert_eq!(controller.submit(pdf()).await.unwrap_err(), SubmitError::Disposed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_form_fields_reach_transport() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![Reply::json(202, json!({"task_id": "t"}))],
            vec![Reply::json(200, json!({"status": "COMPLETED", "download_url": "/o/1_a.html"}))],
        ));
        let controller = controller(
            ConversionKind::PdfToHtml {
                mode: crate::kind::HtmlMode::Clean,
            },
            &transport,
        );
        controller.submit(pdf()).await.unwrap().wait().await;
        let sent = transport.sent();
        assert_eq!(sent[0].fields, vec![("conversion_type", "clean".to_string())]);
        assert_eq!(sent[0].endpoint, "http://conv.test/api/pdf-to-html/");
    }
}
