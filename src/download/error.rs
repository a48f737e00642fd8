//! Error types for result downloads.

use std::path::PathBuf;

use thiserror::Error;

use crate::job::ErrorKind;

/// Errors raised while fetching and saving a converted file.
///
/// All of them leave the conversion itself intact; the same target can be
/// downloaded again.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The request could not be completed (DNS, refused connection, TLS).
    #[error("Failed to download {url}: {source}")]
    Network {
        /// Download URL.
        url: String,
        /// Transport failure.
        #[source]
        source: reqwest::Error,
    },

    /// The client timeout elapsed.
    #[error("Timed out downloading {url}")]
    Timeout {
        /// Download URL.
        url: String,
    },

    /// Non-2xx response.
    #[error("Server responded with {status} for {url}")]
    Status {
        /// Download URL.
        url: String,
        /// Response status.
        status: u16,
    },

    /// File system error while staging or saving the file.
    #[error("Cannot write {path}: {source}")]
    Io {
        /// Staging or final path.
        path: PathBuf,
        /// Filesystem failure.
        #[source]
        source: std::io::Error,
    },

    /// The target URL is malformed.
    #[error("Not a valid download URL: {url}")]
    InvalidUrl {
        /// Rejected value.
        url: String,
    },

    /// The download was cancelled.
    #[error("Download of {url} was cancelled")]
    Aborted {
        /// Download URL.
        url: String,
    },
}

impl DownloadError {
    /// Creates a network error, promoting client timeouts to [`Self::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::Timeout { url: url.into() };
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Non-2xx answer.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Filesystem failure at `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Unparseable target URL.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Cancelled through the caller's token.
    pub fn aborted(url: impl Into<String>) -> Self {
        Self::Aborted { url: url.into() }
    }

    /// Category as seen by observers.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Aborted { .. } => ErrorKind::Cancelled,
            _ => ErrorKind::Download,
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// url or path the source errors lack.
