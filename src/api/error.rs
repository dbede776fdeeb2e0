//! Errors returned by [`ChirpClient`](crate::api::ChirpClient) operations.

use thiserror::Error;

use crate::auth::GatewayError;
use crate::clients::{InvalidHttpRequestError, TransportError};

/// Error type for resource client operations.
///
/// # Example
///
/// ```rust
/// use chirp_sdk::{ApiError, GatewayError};
///
/// let error = ApiError::from(GatewayError::SessionExpired);
/// assert!(error.is_session_expired());
/// assert_eq!(error.to_string(), "Session expired. Please log in again.");
/// ```
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request failed in the session gateway.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A request could not be built.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// A request body could not be encoded.
    #[error("Could not encode request body for {path}: {message}")]
    Encode {
        /// Request path.
        path: String,
        /// Encoder message.
        message: String,
    },

    /// A successful response did not match the expected body.
    #[error("Unexpected response body from {path}: {message}")]
    Deserialize {
        /// Request path.
        path: String,
        /// Parser message.
        message: String,
    },

    /// Login or registration was rejected.
    #[error("{message}")]
    AuthFailed {
        /// HTTP status code.
        code: u16,
        /// Message from the service, or a generic one.
        message: String,
    },
}

impl ApiError {
    /// Returns `true` if the user must log in again.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::Gateway(GatewayError::SessionExpired))
    }

    /// Returns the upstream status code, if this error carries one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Gateway(error) => error.status(),
            Self::AuthFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(error: TransportError) -> Self {
        Self::Gateway(GatewayError::Transport(error))
    }
}

// Verify ApiError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ApiError>();
};
