//! Anti-forgery token lookup.
//!
//! The conversion service expects the value of its `csrftoken` cookie echoed
//! back in an `X-CSRFToken` header. The token is looked up by exact cookie
//! name; when no such cookie exists the header is simply left off and the
//! server decides whether that is acceptable.

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use tracing::debug;
use url::Url;

/// Header carrying the anti-forgery token.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Cookie name the service stores its token under.
pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";

/// Where the controller obtains the anti-forgery token for each upload.
#[derive(Debug, Clone, Default)]
pub enum CsrfSource {
    /// Send no token.
    #[default]
    None,
    /// A fixed token value.
    Token(String),
    /// Read the named cookie from a jar for the upload URL.
    Cookie {
        /// Jar shared with the HTTP client.
        jar: Arc<Jar>,
        /// Exact cookie name to look up.
        name: String,
    },
}

impl CsrfSource {
    /// Resolves the token to send to `url`, if any.
    #[must_use]
    pub fn token_for(&self, url: &str) -> Option<String> {
        match self {
            Self::None => None,
            Self::Token(token) => (!token.is_empty()).then(|| token.clone()),
            Self::Cookie { jar, name } => {
                let parsed = Url::parse(url).ok()?;
                token_from_jar(jar, &parsed, name)
            }
        }
    }
}

/// Reads a token from a `Cookie`-style header value (`a=1; csrftoken=xyz`).
///
/// The name must match exactly; the value is percent-decoded.
#[must_use]
pub fn token_from_cookie_header(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (cookie_name, value) = pair.trim().split_once('=')?;
        if cookie_name != name {
            return None;
        }
        let decoded = urlencoding::decode(value)
            .map(std::borrow::Cow::into_owned)
            .unwrap_or_else(|e| {
                debug!(cookie = %name, error = %e, "cookie value decoding failed, using raw value");
                value.to_string()
            });
        Some(decoded)
    })
}

/// Reads a token from the cookies a jar would send to `url`.
#[must_use]
pub fn token_from_jar(jar: &Jar, url: &Url, name: &str) -> Option<String> {
    let header = jar.cookies(url)?;
    let header = header.to_str().ok()?;
    token_from_cookie_header(header, name)
}
