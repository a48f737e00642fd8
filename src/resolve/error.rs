//! Error types for result resolution.

use thiserror::Error;

/// A server payload that could not be turned into a download.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// None of the known path fields is present.
    #[error("No file path available in conversion result")]
    NoFilePath,

    /// The payload is not shaped like any known result.
    #[error("Malformed conversion result: {reason}")]
    MalformedResult {
        /// What was wrong with the payload.
        reason: String,
    },
}

impl ResolveError {
    /// Creates a malformed-result error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResult {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_error_display() {
        assert_eq!(
            ResolveError::NoFilePath.to_string(),
            "No file path available in conversion result"
        );
        assert_eq!(
            ResolveError::malformed("body is not an object").to_string(),
            "Malformed conversion result: body is not an object"
        );
    }
}
