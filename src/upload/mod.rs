//! Upload transport for the conversion service.
//!
//! One [`ConversionTransport::send`] call is one multipart `POST`; one
//! [`ConversionTransport::status`] call is one status `GET`. Both honor a
//! [`CancellationToken`]: once it fires, the request is dropped and the call
//! fails with [`TransportError::Aborted`].
//!
//! Non-2xx responses are handed back as a [`RawResponse`] instead of an
//! error, because "bad status with a JSON error body" and "bad status with
//! no body" lead to different messages upstream.

pub mod csrf;
mod error;
mod transport;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub use csrf::{CSRF_HEADER, CsrfSource, DEFAULT_CSRF_COOKIE};
pub use error::TransportError;
pub use transport::HttpTransport;

use crate::validate::FileSet;

/// Everything needed to issue one upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Absolute endpoint URL.
    pub endpoint: String,
    /// Scalar form fields (e.g. `conversion_type`).
    pub fields: Vec<(&'static str, String)>,
    /// Files, one part each.
    pub files: FileSet,
    /// Multipart field name used for every file part.
    pub file_field: &'static str,
    /// Anti-forgery token sent as a header when present.
    pub csrf_token: Option<String>,
}

/// Status code plus a best-effort JSON parse of the body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed body, `None` when empty or not JSON.
    pub json: Option<Value>,
}

impl RawResponse {
    /// Builds a response from a status and raw body bytes.
    #[must_use]
    pub fn from_body(status: u16, body: &[u8]) -> Self {
        let json = if body.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            serde_json::from_slice(body).ok()
        };
        Self { status, json }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Server-supplied error text from `error`, then `message`.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let body = self.json.as_ref()?;
        ["error", "message"].iter().find_map(|key| {
            body.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
    }
}

/// Network seam between the job controller and the conversion service.
#[async_trait]
pub trait ConversionTransport: Send + Sync + std::fmt::Debug {
    /// Uploads files to a conversion endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Aborted`] when `cancel` fires, or another
    /// [`TransportError`] when the request could not complete.
    async fn send(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, TransportError>;

    /// Queries a conversion status URL.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    async fn status(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, TransportError>;
}
