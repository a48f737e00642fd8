//! Custom wiremock responders.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use wiremock::{Respond, ResponseTemplate};

/// Replies with `bodies` in order, repeating the last one once exhausted.
pub struct SequenceResponder {
    request_count: Arc<AtomicUsize>,
    bodies: Vec<Value>,
}

impl SequenceResponder {
    /// Returns the responder and a counter of requests it has served.
    pub fn new(bodies: Vec<Value>) -> (Self, Arc<AtomicUsize>) {
        let request_count = Arc::new(AtomicUsize::new(0));
        let responder = Self {
            request_count: Arc::clone(&request_count),
            bodies,
        };
        (responder, request_count)
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let n = self.request_count.fetch_add(1, Ordering::SeqCst);
        match self.bodies.get(n).or_else(|| self.bodies.last()) {
            Some(body) => ResponseTemplate::new(200).set_body_json(body.clone()),
            None => ResponseTemplate::new(500),
        }
    }
}

/// Status payload with the given status and optional extras merged in.
pub fn status_body(status: &str, extra: Value) -> Value {
    let mut body = serde_json::json!({ "status": status });
    if let (Some(target), Value::Object(fields)) = (body.as_object_mut(), extra) {
        target.extend(fields);
    }
    body
}
