//! Scripted transport for driving the controller without sockets.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::upload::{ConversionTransport, RawResponse, TransportError, UploadRequest};

/// One canned answer.
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    status: u16,
    body: Option<Value>,
    delay: Duration,
}

impl Reply {
    pub(crate) fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn empty(status: u16) -> Self {
        Self {
            status,
            body: None,
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Answers uploads and status checks from two queues, in order.
///
/// An exhausted queue answers 500 with no body.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    uploads: Mutex<VecDeque<Reply>>,
    statuses: Mutex<VecDeque<Reply>>,
    sent: Mutex<Vec<UploadRequest>>,
    status_urls: Mutex<Vec<String>>,
    log: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[allow(clippy::unwrap_used)]
impl ScriptedTransport {
    pub(crate) fn new(uploads: Vec<Reply>, statuses: Vec<Reply>) -> Self {
        Self {
            uploads: Mutex::new(uploads.into()),
            statuses: Mutex::new(statuses.into()),
            ..Self::default()
        }
    }

    pub(crate) fn sent(&self) -> Vec<UploadRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_urls.lock().unwrap().len()
    }

    pub(crate) fn status_urls(&self) -> Vec<String> {
        self.status_urls.lock().unwrap().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// True when upload 1 was aborted before upload 2 was issued.
    pub(crate) fn first_aborted_before_second_started(&self) -> bool {
        let log = self.log.lock().unwrap();
        let aborted = log.iter().position(|entry| entry == "send-abort 1");
        let started = log.iter().position(|entry| entry == "send-start 2");
        matches!((aborted, started), (Some(a), Some(s)) if a < s)
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    async fn respond(
        &self,
        reply: Option<Reply>,
        url: &str,
        abort_entry: &str,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, TransportError> {
        let reply = reply.unwrap_or_else(|| Reply::empty(500));
        let depth = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(depth, Ordering::SeqCst);

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                self.record(abort_entry.to_string());
                Err(TransportError::aborted(url))
            }
            () = tokio::time::sleep(reply.delay) => Ok(RawResponse {
                status: reply.status,
                json: reply.body,
            }),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

#[async_trait]
#[allow(clippy::unwrap_used)]
impl ConversionTransport for ScriptedTransport {
    async fn send(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, TransportError> {
        let number = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(request.clone());
            sent.len()
        };
        self.record(format!("send-start {number}"));
        let reply = self.uploads.lock().unwrap().pop_front();
        self.respond(reply, &request.endpoint, &format!("send-abort {number}"), cancel)
            .await
    }

    async fn status(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, TransportError> {
        self.status_urls.lock().unwrap().push(url.to_string());
        let reply = self.statuses.lock().unwrap().pop_front();
        self.respond(reply, url, "status-abort", cancel).await
    }
}
