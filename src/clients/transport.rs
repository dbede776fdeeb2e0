//! The seam between the session gateway and the network.

use async_trait::async_trait;

use crate::clients::errors::TransportError;
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::HttpResponse;

/// Delivers a request to one of the Chirp services and returns its response.
///
/// Implementations exist for the real network ([`HttpTransport`]) and for an
/// in-process backend ([`MockBackend`]). The choice is made once, when the
/// client is composed; callers above the transport never branch on it.
///
/// A transport must return every HTTP status as an [`HttpResponse`],
/// including 4xx and 5xx. [`TransportError`] is reserved for failures where
/// no response exists.
///
/// [`HttpTransport`]: crate::clients::HttpTransport
/// [`MockBackend`]: crate::mock::MockBackend
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request`, attaching `bearer` as `Authorization: Bearer <token>`
    /// when present.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request could not be delivered.
    async fn dispatch(
        &self,
        request: &HttpRequest,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError>;
}
