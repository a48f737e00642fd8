//! Shared HTTP client construction.
//!
//! Uploads, status checks and result downloads all go through clients built
//! here so they agree on timeouts, user-agent, compression and cookies.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::cookie::Jar;

use crate::user_agent;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes, conversions of large files are slow).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Connect/read timeouts applied to every request of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Connection establishment ceiling.
    pub connect: Duration,
    /// Whole-request ceiling enforced by the client itself.
    pub read: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }
}

/// Failure to construct an HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// The reqwest builder rejected the configuration.
    #[error("HTTP client construction failed: {0}")]
    Build(#[source] reqwest::Error),
}

/// Builds a client with the crate's timeouts, user-agent and gzip support.
///
/// When `cookie_jar` is given, the client sends its cookies and stores the
/// ones the service sets.
///
/// # Errors
///
/// Returns [`ClientBuildError::Build`] when reqwest rejects the settings.
pub fn build_http_client(
    timeouts: HttpTimeouts,
    cookie_jar: Option<Arc<Jar>>,
) -> Result<Client, ClientBuildError> {
    let mut builder = Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.read)
        .user_agent(user_agent::default_user_agent())
        .gzip(true);

    if let Some(jar) = cookie_jar {
        builder = builder.cookie_provider(jar);
    }

    builder.build().map_err(ClientBuildError::Build)
}
