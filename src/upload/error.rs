//! Error types for the upload transport.

use thiserror::Error;

/// Errors raised by a [`ConversionTransport`](super::ConversionTransport).
///
/// Non-2xx responses are not errors at this layer; they come back as a
/// [`RawResponse`](super::RawResponse) so the caller can pick a message.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request was aborted through its cancellation token.
    #[error("request to {url} was aborted")]
    Aborted {
        /// The URL whose request was aborted.
        url: String,
    },

    /// Network-level failure (DNS, connection refused, TLS, reset).
    #[error("network error calling {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client gave up waiting for the server.
    #[error("timeout calling {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// A file could not be read while building the multipart body.
    #[error("could not read {name}: {source}")]
    FileRead {
        /// Display name of the file.
        name: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The endpoint URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl TransportError {
    /// Creates an aborted error.
    pub fn aborted(url: impl Into<String>) -> Self {
        Self::Aborted { url: url.into() }
    }

    /// Creates a network error, promoting client timeouts to [`Self::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates a file read error.
    pub fn file_read(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileRead {
            name: name.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns true when the failure came from the cancellation token.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}
