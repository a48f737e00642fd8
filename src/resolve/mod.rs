//! Result resolution.
//!
//! Turns what the conversion service answers into one result model:
//! - synchronous uploads return the result in the upload body;
//! - asynchronous uploads return `{task_id}` and later a status payload
//!   `{status, download_url?, error?}`.
//!
//! [`resolve_download_target`] then qualifies the stored path against the
//! configured origin and derives the filename a user should see.

mod error;
mod filename;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

pub use error::ResolveError;
pub use filename::derive_filename;

/// Path fields of a synchronous result, in priority order.
const PATH_FIELDS: [&str; 3] = ["converted_file", "converted_file_url", "download_url"];

/// Optional `scheme://host` prefix plus one leading slash.
#[allow(clippy::expect_used)]
static ORIGIN_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    // Static pattern, safe to panic
    Regex::new(r"^(?:[A-Za-z][A-Za-z0-9+.\-]*://[^/]+)?/?").expect("origin prefix regex is valid")
});

/// A completed conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    /// Server path (or URL) of the converted file.
    pub download_path: String,
    /// Pages produced, or files merged, when the server says.
    pub page_or_file_count: Option<u64>,
    /// The payload the result was read from.
    pub raw_payload: Value,
}

/// Where to fetch a result and what to call it locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadTarget {
    /// Absolute URL under the configured origin.
    pub url: String,
    /// Suggested filename; a `Content-Disposition` name takes precedence.
    pub filename: String,
}

/// Lifecycle of an asynchronous conversion on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Queued.
    Pending,
    /// Being converted.
    Processing,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// A status this client does not know.
    Other(String),
}

impl TaskStatus {
    /// Parses the status string (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "PROCESSING" | "STARTED" => Self::Processing,
            "COMPLETED" | "SUCCESS" => Self::Completed,
            "FAILED" | "FAILURE" => Self::Failed,
            _ => Self::Other(value.to_string()),
        }
    }

    /// Returns true for `Completed` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One answer from the status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusPayload {
    /// Server-side task state.
    pub status: TaskStatus,
    /// Result path, set once completed.
    pub download_url: Option<String>,
    /// Server error text, set on failure.
    pub error: Option<String>,
}

impl StatusPayload {
    /// Reads a status payload.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::MalformedResult`] when `status` is missing.
    pub fn parse(payload: &Value) -> Result<Self, ResolveError> {
        let status = non_empty_str(payload, "status")
            .map(TaskStatus::parse)
            .ok_or_else(|| ResolveError::malformed("status payload has no status"))?;
        Ok(Self {
            status,
            download_url: non_empty_str(payload, "download_url").map(str::to_string),
            error: non_empty_str(payload, "error").map(str::to_string),
        })
    }
}

/// Picks the result path from a payload.
///
/// Priority: `converted_file`, `converted_file_url`, `download_url`, then
/// the first entry of `images`.
#[must_use]
pub fn select_download_path(payload: &Value) -> Option<&str> {
    PATH_FIELDS
        .iter()
        .find_map(|field| non_empty_str(payload, field))
        .or_else(|| {
            payload
                .get("images")
                .and_then(Value::as_array)
                .and_then(|images| images.first())
                .and_then(|image| non_empty_str(image, "url"))
        })
}

/// Reads the page/file count: `page_count`, else the `original_files` length.
#[must_use]
pub fn select_count(payload: &Value) -> Option<u64> {
    payload.get("page_count").and_then(Value::as_u64).or_else(|| {
        payload
            .get("original_files")
            .and_then(Value::as_array)
            .map(|files| files.len() as u64)
    })
}

/// Normalizes a synchronous upload body.
///
/// # Errors
///
/// [`ResolveError::MalformedResult`] when the body is not an object and
/// [`ResolveError::NoFilePath`] when it carries no path.
pub fn parse_sync_result(payload: &Value) -> Result<ConversionResult, ResolveError> {
    if !payload.is_object() {
        return Err(ResolveError::malformed("result body is not a JSON object"));
    }
    let download_path = select_download_path(payload).ok_or(ResolveError::NoFilePath)?;
    Ok(ConversionResult {
        download_path: download_path.to_string(),
        page_or_file_count: select_count(payload),
        raw_payload: payload.clone(),
    })
}

/// Builds the result of a completed status payload.
///
/// # Errors
///
/// [`ResolveError::MalformedResult`] carrying any server error when
/// `download_url` is absent.
pub fn completed_result(
    status: &StatusPayload,
    payload: &Value,
) -> Result<ConversionResult, ResolveError> {
    let Some(path) = status.download_url.as_deref() else {
        let reason = status.error.as_deref().map_or_else(
            || "completed without download_url".to_string(),
            |e| format!("completed without download_url: {e}"),
        );
        return Err(ResolveError::malformed(reason));
    };
    Ok(ConversionResult {
        download_path: path.to_string(),
        page_or_file_count: select_count(payload),
        raw_payload: payload.clone(),
    })
}

/// Reads the task id of an accepted asynchronous upload.
///
/// Numeric ids are accepted and rendered in decimal.
///
/// # Errors
///
/// Returns [`ResolveError::MalformedResult`] when no id is present.
pub fn parse_task_id(payload: &Value) -> Result<String, ResolveError> {
    match payload.get("task_id") {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.trim().to_string()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(ResolveError::malformed("accepted upload has no task_id")),
    }
}

/// Qualifies a server path against `origin`.
///
/// Any existing `scheme://host` prefix and one leading slash are dropped.
#[must_use]
pub fn qualify_url(path: &str, origin: &str) -> String {
    let relative = ORIGIN_PREFIX.replace(path, "");
    format!("{}/{relative}", origin.trim_end_matches('/'))
}

/// Derives the download target of a result payload.
///
/// Pure and idempotent; the same inputs always give the same target.
///
/// # Errors
///
/// Returns [`ResolveError::NoFilePath`] when the payload carries no path.
pub fn resolve_download_target(
    payload: &Value,
    origin: &str,
    output_extension: &str,
) -> Result<DownloadTarget, ResolveError> {
    let path = select_download_path(payload).ok_or(ResolveError::NoFilePath)?;
    Ok(DownloadTarget {
        url: qualify_url(path, origin),
        filename: derive_filename(path, output_extension),
    })
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
