//! The session gateway: authenticated dispatch with transparent renewal.
//!
//! Every resource request made by the SDK goes through
//! [`SessionGateway::send`], which:
//!
//! 1. Attaches the stored access token as a bearer credential, if any
//! 2. Dispatches through the configured [`Transport`]
//! 3. On `401`, renews the access token through the [`RefreshCoordinator`]
//!    and replays the request exactly once
//! 4. Classifies the final response into `Ok` or a [`GatewayError`]
//!
//! When renewal fails the stored session is cleared and the optional
//! session-expired hook fires; applications use it to return to their login
//! entry point.
//!
//! A renewal only writes back to the session it started from. If the session
//! is saved or cleared while the refresh is in flight (a logout, or a login
//! as someone else), the result is discarded and queued requests fail with
//! [`GatewayError::SessionExpired`] without firing the hook.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::auth::refresh::{RefreshCoordinator, RefreshOutcome};
use crate::auth::storage::StorageError;
use crate::auth::token_store::{SessionGeneration, TokenStore};
use crate::clients::{ApiService, HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
use crate::config::endpoints;

/// Callback invoked once per failed renewal, after the session is cleared.
pub type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

/// Errors returned by [`SessionGateway`].
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The resource requires credentials that were not (or no longer) accepted.
    #[error("Authentication required")]
    Unauthenticated,

    /// Renewal failed; the stored session has been cleared.
    #[error("Session expired. Please log in again.")]
    SessionExpired,

    /// The request could not be delivered.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service answered with a non-2xx status other than an
    /// authorization failure.
    #[error("Request failed with status {code}: {message}")]
    UpstreamRejected {
        /// HTTP status code.
        code: u16,
        /// Message from the response body, or a generic one.
        message: String,
    },

    /// The session could not be persisted.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl GatewayError {
    /// Returns `true` if the user must log in again.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns the upstream status code, if this error carries one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::UpstreamRejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

// Verify GatewayError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<GatewayError>();
};

/// Body returned by the refresh endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Authenticated request dispatch with single-flight token renewal.
///
/// One `SessionGateway` is shared by every caller of a session; share it
/// behind an [`Arc`] rather than creating one per request.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use chirp_sdk::{SessionGateway, TokenStore};
/// use chirp_sdk::mock::MockBackend;
///
/// let expired = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&expired);
///
/// let gateway = SessionGateway::new(Arc::new(MockBackend::new()), TokenStore::in_memory())
///     .with_session_expired_hook(Arc::new(move || flag.store(true, Ordering::SeqCst)));
///
/// assert!(!gateway.is_refreshing());
/// ```
pub struct SessionGateway {
    transport: Arc<dyn Transport>,
    store: TokenStore,
    coordinator: RefreshCoordinator,
    refresh_path: String,
    on_session_expired: Option<SessionExpiredHook>,
}

impl fmt::Debug for SessionGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGateway")
            .field("store", &self.store)
            .field("coordinator", &self.coordinator)
            .field("refresh_path", &self.refresh_path)
            .field("on_session_expired", &self.on_session_expired.is_some())
            .finish_non_exhaustive()
    }
}

// Verify SessionGateway is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SessionGateway>();
};

impl SessionGateway {
    /// Creates a gateway over `transport` whose session lives in `store`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, store: TokenStore) -> Self {
        Self {
            transport,
            coordinator: RefreshCoordinator::new(store.clone()),
            store,
            refresh_path: endpoints::REFRESH_TOKEN.to_string(),
            on_session_expired: None,
        }
    }

    /// Sets the hook invoked after a failed renewal clears the session.
    #[must_use]
    pub fn with_session_expired_hook(mut self, hook: SessionExpiredHook) -> Self {
        self.on_session_expired = Some(hook);
        self
    }

    /// Overrides the refresh endpoint path on the authentication service.
    #[must_use]
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Returns the token store holding this gateway's session.
    #[must_use]
    pub const fn token_store(&self) -> &TokenStore {
        &self.store
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Returns `true` while a token refresh is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.coordinator.is_refreshing()
    }

    /// Sends `request` with the stored credentials, renewing them once on
    /// `401`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Unauthenticated`] on `401` when no token was
    ///   attached, or when the replayed request is rejected again
    /// - [`GatewayError::SessionExpired`] when renewal fails
    /// - [`GatewayError::UpstreamRejected`] for any other non-2xx status
    /// - [`GatewayError::Transport`] when the request cannot be delivered
    pub async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, GatewayError> {
        self.send_with_fallback(request, None).await
    }

    /// Like [`SessionGateway::send`], but a rejection whose body carries no
    /// message reports `fallback` instead of a generic status message.
    ///
    /// # Errors
    ///
    /// As [`SessionGateway::send`].
    pub async fn send_with_fallback(
        &self,
        request: &HttpRequest,
        fallback: Option<&str>,
    ) -> Result<HttpResponse, GatewayError> {
        // Taken before the token so a renewal never outlives its session.
        let generation = self.store.generation();
        let token = self.store.access_token();
        tracing::debug!(
            method = %request.http_method,
            path = %request.path,
            authenticated = token.is_some(),
            "Dispatching request"
        );

        let response = self.transport.dispatch(request, token.as_deref()).await?;
        if !response.is_unauthorized() {
            return Self::classify(response, fallback);
        }

        let Some(used_token) = token else {
            return Err(GatewayError::Unauthenticated);
        };

        tracing::debug!(path = %request.path, "Access token rejected; renewing");
        let outcome = self
            .coordinator
            .renew(&used_token, || self.refresh_with_stored_token(generation))
            .await;

        match outcome {
            RefreshOutcome::Renewed(new_token) => {
                let retried = self.transport.dispatch(request, Some(&new_token)).await?;
                if retried.is_unauthorized() {
                    tracing::warn!(path = %request.path, "Renewed token rejected; not retrying again");
                    return Err(GatewayError::Unauthenticated);
                }
                Self::classify(retried, fallback)
            }
            RefreshOutcome::Expired => Err(GatewayError::SessionExpired),
        }
    }

    /// Sends `request` without credentials and without renewal.
    ///
    /// The response is returned whatever its status. Login and registration
    /// use this, since a `401` there is an ordinary rejection that the
    /// caller reports itself.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the request cannot be
    /// delivered.
    pub async fn send_anonymous(&self, request: &HttpRequest) -> Result<HttpResponse, GatewayError> {
        tracing::debug!(method = %request.http_method, path = %request.path, "Dispatching anonymous request");
        Ok(self.transport.dispatch(request, None).await?)
    }

    fn classify(response: HttpResponse, fallback: Option<&str>) -> Result<HttpResponse, GatewayError> {
        if response.is_ok() {
            return Ok(response);
        }
        let message = match response.upstream_message().or(fallback) {
            Some(message) => message.to_string(),
            None => format!("Request failed with status {}", response.code),
        };
        Err(GatewayError::UpstreamRejected {
            code: response.code,
            message,
        })
    }

    async fn refresh_with_stored_token(&self, generation: SessionGeneration) -> RefreshOutcome {
        let Some(refresh_token) = self.store.refresh_token() else {
            tracing::warn!("No refresh token stored; ending session");
            return self.expire(generation);
        };

        let request = match HttpRequest::builder(HttpMethod::Post, self.refresh_path.as_str())
            .service(ApiService::Auth)
            .body(serde_json::json!({ "refreshToken": refresh_token }))
            .build()
        {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid refresh request");
                return self.expire(generation);
            }
        };

        let response = match self.transport.dispatch(&request, None).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                return self.expire(generation);
            }
        };

        if !response.is_ok() {
            tracing::warn!(status = response.code, "Token refresh rejected");
            return self.expire(generation);
        }

        let tokens = match response.parse::<RefreshResponse>() {
            Ok(tokens) if !tokens.access_token.is_empty() => tokens,
            Ok(_) => {
                tracing::warn!("Token refresh returned an empty access token");
                return self.expire(generation);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh returned an unexpected body");
                return self.expire(generation);
            }
        };

        match self.store.update_tokens_if_current(
            generation,
            &tokens.access_token,
            tokens.refresh_token.as_deref(),
        ) {
            Ok(true) => {}
            Ok(false) => return Self::superseded(),
            Err(e) => tracing::warn!(error = %e, "Renewed token could not be persisted"),
        }

        tracing::info!(
            rotated = tokens.refresh_token.is_some(),
            "Access token refreshed"
        );
        RefreshOutcome::Renewed(tokens.access_token)
    }

    fn expire(&self, generation: SessionGeneration) -> RefreshOutcome {
        match self.store.clear_if_current(generation) {
            Ok(true) => {}
            Ok(false) => return Self::superseded(),
            Err(e) => tracing::warn!(error = %e, "Failed to clear expired session"),
        }
        tracing::warn!("Session expired");
        if let Some(hook) = &self.on_session_expired {
            hook();
        }
        RefreshOutcome::Expired
    }

    fn superseded() -> RefreshOutcome {
        tracing::info!("Session replaced while refreshing; discarding refresh result");
        RefreshOutcome::Expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::Credentials;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport that replays scripted responses and records bearer tokens.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<HttpResponse>>,
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    impl ScriptedTransport {
        fn with(responses: Vec<HttpResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                seen: Mutex::default(),
            })
        }

        fn seen(&self) -> Vec<(String, Option<String>)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn dispatch(
            &self,
            request: &HttpRequest,
            bearer: Option<&str>,
        ) -> Result<HttpResponse, TransportError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.path.clone(), bearer.map(String::from)));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| TransportError::Backend("script exhausted".to_string()))
        }
    }

    fn get(path: &str) -> HttpRequest {
        HttpRequest::builder(HttpMethod::Get, path).build().unwrap()
    }

    fn logged_in_store(refresh: Option<&str>) -> TokenStore {
        let store = TokenStore::in_memory();
        store
            .save(&Credentials::new("a1", refresh.map(String::from)), None)
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_success_passes_through_with_bearer() {
        let transport = ScriptedTransport::with(vec![HttpResponse::json(200, json!({"ok": true}))]);
        let gateway = SessionGateway::new(transport.clone(), logged_in_store(Some("r1")));

        let response = gateway.send(&get("/api/v1/tweets")).await.unwrap();

        assert_eq!(response.body, json!({"ok": true}));
        assert_eq!(
            transport.seen(),
            vec![("/api/v1/tweets".to_string(), Some("a1".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_unauthorized_without_token_is_unauthenticated() {
        let transport = ScriptedTransport::with(vec![HttpResponse::json(401, json!({}))]);
        let gateway = SessionGateway::new(transport.clone(), TokenStore::in_memory());

        let result = gateway.send(&get("/api/v1/tweets")).await;

        assert!(matches!(result, Err(GatewayError::Unauthenticated)));
        assert_eq!(transport.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_then_single_retry() {
        let transport = ScriptedTransport::with(vec![
            HttpResponse::json(401, json!({})),
            HttpResponse::json(200, json!({"accessToken": "a2"})),
            HttpResponse::json(200, json!({"tweets": []})),
        ]);
        let store = logged_in_store(Some("r1"));
        let gateway = SessionGateway::new(transport.clone(), store.clone());

        gateway.send(&get("/api/v1/tweets")).await.unwrap();

        let seen = transport.seen();
        assert_eq!(seen[1], ("/auth/refresh".to_string(), None));
        assert_eq!(seen[2], ("/api/v1/tweets".to_string(), Some("a2".to_string())));
        assert_eq!(store.access_token().as_deref(), Some("a2"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_second_unauthorized_is_not_retried() {
        let transport = ScriptedTransport::with(vec![
            HttpResponse::json(401, json!({})),
            HttpResponse::json(200, json!({"accessToken": "a2"})),
            HttpResponse::json(401, json!({})),
        ]);
        let gateway = SessionGateway::new(transport.clone(), logged_in_store(Some("r1")));

        let result = gateway.send(&get("/api/v1/tweets")).await;

        assert!(matches!(result, Err(GatewayError::Unauthenticated)));
        assert_eq!(transport.seen().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_expires_without_network() {
        let transport = ScriptedTransport::with(vec![HttpResponse::json(401, json!({}))]);
        let store = logged_in_store(None);
        let gateway = SessionGateway::new(transport.clone(), store.clone());

        let result = gateway.send(&get("/api/v1/tweets")).await;

        assert!(result.unwrap_err().is_session_expired());
        assert_eq!(transport.seen().len(), 1);
        assert!(!store.load().is_authenticated());
    }

    #[tokio::test]
    async fn test_unparsable_refresh_body_expires_session() {
        let transport = ScriptedTransport::with(vec![
            HttpResponse::json(401, json!({})),
            HttpResponse::json(200, json!({"unexpected": true})),
        ]);
        let store = logged_in_store(Some("r1"));
        let gateway = SessionGateway::new(transport, store.clone());

        let result = gateway.send(&get("/api/v1/tweets")).await;

        assert!(matches!(result, Err(GatewayError::SessionExpired)));
        assert!(!store.load().is_authenticated());
    }

    #[tokio::test]
    async fn test_refresh_transport_failure_expires_session_and_fires_hook() {
        let transport = ScriptedTransport::with(vec![HttpResponse::json(401, json!({}))]);
        let fired = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let gateway = SessionGateway::new(transport, logged_in_store(Some("r1")))
            .with_session_expired_hook(Arc::new(move || {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }));

        let result = gateway.send(&get("/api/v1/tweets")).await;

        assert!(matches!(result, Err(GatewayError::SessionExpired)));
        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_auth_failures_are_upstream_rejections() {
        let transport = ScriptedTransport::with(vec![
            HttpResponse::json(400, json!({"error": "Tweet text is required"})),
            HttpResponse::json(503, json!({})),
        ]);
        let gateway = SessionGateway::new(transport.clone(), logged_in_store(Some("r1")));

        let first = gateway.send(&get("/api/v1/tweets")).await.unwrap_err();
        assert!(matches!(
            &first,
            GatewayError::UpstreamRejected { code: 400, message } if message == "Tweet text is required"
        ));

        let second = gateway.send(&get("/api/v1/tweets")).await.unwrap_err();
        assert!(matches!(
            &second,
            GatewayError::UpstreamRejected { code: 503, message } if message == "Request failed with status 503"
        ));
        assert_eq!(second.status(), Some(503));
        assert_eq!(transport.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_transport_errors_propagate_unchanged() {
        let transport = ScriptedTransport::with(vec![]);
        let gateway = SessionGateway::new(transport, logged_in_store(Some("r1")));

        let result = gateway.send(&get("/api/v1/tweets")).await;

        assert!(matches!(
            result,
            Err(GatewayError::Transport(TransportError::Backend(_)))
        ));
    }

    #[tokio::test]
    async fn test_fallback_message_used_when_body_has_none() {
        let transport = ScriptedTransport::with(vec![
            HttpResponse::json(500, json!({})),
            HttpResponse::json(500, json!({"message": "Database unavailable"})),
        ]);
        let gateway = SessionGateway::new(transport, logged_in_store(Some("r1")));

        let first = gateway
            .send_with_fallback(&get("/api/v1/tweets"), Some("Failed to fetch tweets"))
            .await
            .unwrap_err();
        assert!(matches!(
            &first,
            GatewayError::UpstreamRejected { code: 500, message } if message == "Failed to fetch tweets"
        ));

        let second = gateway
            .send_with_fallback(&get("/api/v1/tweets"), Some("Failed to fetch tweets"))
            .await
            .unwrap_err();
        assert!(matches!(
            &second,
            GatewayError::UpstreamRejected { message, .. } if message == "Database unavailable"
        ));
    }

    #[tokio::test]
    async fn test_refresh_result_discarded_when_session_replaced() {
        /// Scripted transport that logs in as someone else while the refresh
        /// call is on the wire.
        struct ReplacingTransport {
            inner: Arc<ScriptedTransport>,
            store: TokenStore,
        }

        #[async_trait]
        impl Transport for ReplacingTransport {
            async fn dispatch(
                &self,
                request: &HttpRequest,
                bearer: Option<&str>,
            ) -> Result<HttpResponse, TransportError> {
                if request.path == "/auth/refresh" {
                    self.store
                        .save(&Credentials::new("b1", Some("rb".to_string())), None)
                        .unwrap();
                }
                self.inner.dispatch(request, bearer).await
            }
        }

        let store = logged_in_store(Some("r1"));
        let scripted = ScriptedTransport::with(vec![
            HttpResponse::json(401, json!({})),
            HttpResponse::json(200, json!({"accessToken": "a2", "refreshToken": "r2"})),
        ]);
        let fired = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let transport = Arc::new(ReplacingTransport {
            inner: scripted.clone(),
            store: store.clone(),
        });
        let gateway = SessionGateway::new(transport, store.clone())
            .with_session_expired_hook(Arc::new(move || {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }));

        let result = gateway.send(&get("/api/v1/tweets")).await;

        assert!(matches!(result, Err(GatewayError::SessionExpired)));
        assert_eq!(store.access_token().as_deref(), Some("b1"));
        assert_eq!(store.refresh_token().as_deref(), Some("rb"));
        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(scripted.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_send_anonymous_returns_rejections_without_refreshing() {
        let transport = ScriptedTransport::with(vec![HttpResponse::json(
            401,
            json!({"error": "Invalid credentials"}),
        )]);
        let gateway = SessionGateway::new(transport.clone(), logged_in_store(Some("r1")));

        let response = gateway.send_anonymous(&get("/auth/login")).await.unwrap();

        assert_eq!(response.code, 401);
        assert_eq!(response.upstream_message(), Some("Invalid credentials"));
        assert_eq!(transport.seen(), vec![("/auth/login".to_string(), None)]);
    }
}
