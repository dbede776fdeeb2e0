//! Transport-level error types for the Chirp SDK.
//!
//! # Error Handling
//!
//! - [`InvalidHttpRequestError`]: A request failed validation before sending
//! - [`TransportError`]: The request could not be delivered or answered
//!
//! Non-2xx responses are not transport errors: a [`Transport`] returns them
//! as ordinary responses and the session gateway classifies them.
//!
//! [`Transport`]: crate::clients::Transport

use thiserror::Error;

/// Error returned when an HTTP request fails validation.
///
/// # Example
///
/// ```rust
/// use chirp_sdk::clients::InvalidHttpRequestError;
///
/// let error = InvalidHttpRequestError::MissingBody {
///     method: "post".to_string(),
/// };
///
/// assert_eq!(error.to_string(), "Cannot use post without specifying data.");
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// A POST or PUT request was made without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },

    /// The request path is not absolute.
    #[error("Request path '{path}' must start with '/'.")]
    RelativePath {
        /// The offending path.
        path: String,
    },
}

/// Error returned when a request cannot be delivered or answered.
///
/// These errors are never retried by the SDK; they propagate to the caller
/// unchanged.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network, connection or timeout failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A header name or value could not be encoded.
    #[error("Invalid header '{name}'")]
    InvalidHeader {
        /// The header name.
        name: String,
    },

    /// The in-memory backend failed internally.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl TransportError {
    /// Returns `true` if the failure was a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_timeout())
    }
}

// Verify TransportError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TransportError>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_error_missing_body() {
        let error = InvalidHttpRequestError::MissingBody {
            method: "put".to_string(),
        };
        assert_eq!(error.to_string(), "Cannot use put without specifying data.");
    }

    #[test]
    fn test_invalid_request_error_relative_path() {
        let error = InvalidHttpRequestError::RelativePath {
            path: "tweets".to_string(),
        };
        assert!(error.to_string().contains("'tweets'"));
    }

    #[test]
    fn test_backend_error_is_not_timeout() {
        let error = TransportError::Backend("boom".to_string());
        assert!(!error.is_timeout());
        assert_eq!(error.to_string(), "Backend error: boom");
    }
}
