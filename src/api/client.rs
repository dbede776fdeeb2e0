//! The Chirp resource client.
//!
//! # Overview
//!
//! [`ChirpClient`] exposes the authentication and resource operations of the
//! Chirp services as typed async methods. Login and registration go to the
//! authentication service without credentials; every other call goes through
//! the [`SessionGateway`], which attaches the stored access token and renews
//! it when the service answers `401`.
//!
//! # Example
//!
//! ```rust
//! use chirp_sdk::{ChirpClient, ClientConfig};
//! use chirp_sdk::api::{LoginRequest, SearchType};
//!
//! # tokio_test::block_on(async {
//! let client = ChirpClient::mock(ClientConfig::builder().use_mock(true).build().unwrap());
//!
//! let tokens = client
//!     .login(&LoginRequest::new("demo@twitter.com", "demo123"))
//!     .await
//!     .unwrap();
//! assert_eq!(tokens.user.unwrap().username, "demouser");
//!
//! let results = client.search("jwt", SearchType::Tweets, 1, 20).await.unwrap();
//! assert_eq!(results.tweets.len(), 1);
//! # });
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::models::{
    AuthTokens, LoginRequest, MessageResponse, ProfileUpdate, RegisterRequest, RegisterResponse,
    SearchResults, SearchType, TokenVerification, Tweet, TweetPage, UserPage, UserProfile,
};
use crate::auth::{
    Credentials, GatewayError, MemoryStorage, Session, SessionGateway, SlotStorage, TokenStore,
};
use crate::clients::{
    ApiService, HttpMethod, HttpRequest, HttpRequestBuilder, HttpResponse, HttpTransport,
    Transport,
};
use crate::config::{endpoints, ClientConfig};
use crate::mock::MockBackend;

/// Typed client for the Chirp services.
///
/// `ChirpClient` is cheap to clone; clones share the same session gateway,
/// so concurrent calls across clones still trigger at most one token
/// refresh at a time.
#[derive(Clone, Debug)]
pub struct ChirpClient {
    config: ClientConfig,
    gateway: Arc<SessionGateway>,
}

// Verify ChirpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ChirpClient>();
};

impl ChirpClient {
    /// Creates a client dispatching through `transport` with its session in
    /// `store`.
    #[must_use]
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>, store: TokenStore) -> Self {
        Self::with_gateway(config, SessionGateway::new(transport, store))
    }

    /// Creates a client over a preconfigured gateway, for example one with a
    /// session-expired hook.
    #[must_use]
    pub fn with_gateway(config: ClientConfig, gateway: SessionGateway) -> Self {
        Self {
            config,
            gateway: Arc::new(gateway),
        }
    }

    /// Creates a client over a fresh [`MockBackend`] with an in-memory
    /// session under the configured namespace.
    #[must_use]
    pub fn mock(config: ClientConfig) -> Self {
        let store = memory_store(&config);
        Self::new(config, Arc::new(MockBackend::new()), store)
    }

    /// Creates a client over an [`HttpTransport`] built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Gateway`] if the transport cannot be built.
    pub fn http(config: ClientConfig, store: TokenStore) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(config, Arc::new(transport), store))
    }

    /// Creates a client whose transport is chosen by
    /// [`ClientConfig::use_mock`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Gateway`] if the HTTP transport cannot be built.
    pub fn from_config(config: ClientConfig, store: TokenStore) -> Result<Self, ApiError> {
        if config.use_mock() {
            tracing::debug!("Using in-memory mock backend");
            Ok(Self::new(config, Arc::new(MockBackend::new()), store))
        } else {
            Self::http(config, store)
        }
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the session gateway shared by this client and its clones.
    #[must_use]
    pub fn gateway(&self) -> &SessionGateway {
        &self.gateway
    }

    /// Returns the token store holding the session.
    #[must_use]
    pub fn token_store(&self) -> &TokenStore {
        self.gateway.token_store()
    }

    /// Returns the persisted session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.token_store().load()
    }

    /// Logs in and persists the returned session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AuthFailed`] with the service message, or
    /// "Login failed" when the service sent none.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthTokens, ApiError> {
        let body = encode(endpoints::LOGIN, credentials)?;
        let tokens: AuthTokens = self
            .authenticate(endpoints::LOGIN, body, "Login failed")
            .await?;

        self.token_store()
            .save(
                &Credentials::new(tokens.access_token.clone(), tokens.refresh_token.clone()),
                tokens.user.as_ref(),
            )
            .map_err(GatewayError::from)?;

        tracing::info!(
            user = tokens.user.as_ref().map_or("unknown", |u| u.username.as_str()),
            "Logged in"
        );
        Ok(tokens)
    }

    /// Creates an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AuthFailed`] with the service message, or
    /// "Registration failed" when the service sent none.
    pub async fn register(&self, account: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        let body = encode(endpoints::REGISTER, account)?;
        self.authenticate(endpoints::REGISTER, body, "Registration failed")
            .await
    }

    /// Ends the session.
    ///
    /// The stored refresh token, if any, is sent to the logout endpoint.
    /// Failures of that call are logged and ignored; the stored session is
    /// always cleared.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Gateway`] only if the stored session cannot be
    /// cleared.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let store = self.token_store();
        if let Some(refresh_token) = store.refresh_token() {
            if let Err(e) = self.revoke(&refresh_token).await {
                tracing::warn!(error = %e, "Logout request failed; clearing session anyway");
            }
        }

        store.clear().map_err(GatewayError::from)?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Checks the stored access token with the authentication service.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the call fails.
    pub async fn verify_token(&self) -> Result<TokenVerification, ApiError> {
        let request = get(endpoints::VERIFY_TOKEN)
            .service(ApiService::Auth)
            .build()?;
        self.fetch(&request, "Token verification failed").await
    }

    /// Fetches the logged-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the call fails.
    pub async fn user_profile(&self) -> Result<UserProfile, ApiError> {
        let request = get(endpoints::USER_PROFILE).build()?;
        self.fetch(&request, "Failed to fetch user profile").await
    }

    /// Updates the logged-in user's profile and the cached identity.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the call fails or the identity cannot be
    /// persisted.
    pub async fn update_user_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let request = HttpRequest::builder(HttpMethod::Put, endpoints::USER_PROFILE)
            .body(encode(endpoints::USER_PROFILE, update)?)
            .build()?;
        let generation = self.token_store().generation();
        let profile: UserProfile = self.fetch(&request, "Failed to update profile").await?;

        if !self
            .token_store()
            .update_identity_if_current(generation, &profile)
            .map_err(GatewayError::from)?
        {
            tracing::debug!("Session changed during profile update; cached identity left as is");
        }
        Ok(profile)
    }

    /// Lists tweets.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the call fails.
    pub async fn tweets(&self, page: u32, limit: u32) -> Result<TweetPage, ApiError> {
        let request = paged(endpoints::TWEETS, page, limit).build()?;
        self.fetch(&request, "Failed to fetch tweets").await
    }

    /// Posts a tweet as the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the call fails. An empty text is rejected by
    /// the service with `400`.
    pub async fn create_tweet(&self, text: &str) -> Result<Tweet, ApiError> {
        let request = HttpRequest::builder(HttpMethod::Post, endpoints::TWEETS)
            .body(json!({ "text": text }))
            .build()?;
        self.fetch(&request, "Failed to create tweet").await
    }

    /// Lists the tweets of user `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the call fails.
    pub async fn user_tweets(&self, user_id: u64, page: u32, limit: u32) -> Result<TweetPage, ApiError> {
        let path = endpoints::with_id(endpoints::USER_TWEETS, user_id);
        let request = paged(&path, page, limit).build()?;
        self.fetch(&request, "Failed to fetch user tweets").await
    }

    /// Fetches the public timeline.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the call fails.
    pub async fn timeline(&self, page: u32, limit: u32) -> Result<TweetPage, ApiError> {
        let request = paged(endpoints::TIMELINE, page, limit).build()?;
        self.fetch(&request, "Failed to fetch timeline").await
    }

    /// Fetches the logged-in user's home timeline.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the call fails.
    pub async fn home_timeline(&self, page: u32, limit: u32) -> Result<TweetPage, ApiError> {
        let request = paged(endpoints::HOME_TIMELINE, page, limit).build()?;
        self.fetch(&request, "Failed to fetch home timeline").await
    }

    /// Searches tweets or users.
    ///
    /// [`SearchType::Other`] yields an empty result without contacting the
    /// service.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the call fails.
    pub async fn search(
        &self,
        query: &str,
        search_type: SearchType,
        page: u32,
        limit: u32,
    ) -> Result<SearchResults, ApiError> {
        if let SearchType::Other(kind) = &search_type {
            tracing::debug!(search_type = %kind, "Unsupported search type; no results");
            return Ok(SearchResults::default());
        }

        let request = paged(endpoints::SEARCH, page, limit)
            .query_param("q", query)
            .query_param("type", search_type)
            .build()?;
        self.fetch(&request, "Search failed").await
    }

    /// Follows user `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the call fails.
    pub async fn follow_user(&self, user_id: u64) -> Result<MessageResponse, ApiError> {
        let request =
            HttpRequest::builder(HttpMethod::Post, endpoints::with_id(endpoints::FOLLOW, user_id))
                .body(json!({}))
                .build()?;
        self.fetch(&request, "Failed to follow user").await
    }

    /// Unfollows user `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the call fails.
    pub async fn unfollow_user(&self, user_id: u64) -> Result<MessageResponse, ApiError> {
        let request = HttpRequest::builder(
            HttpMethod::Delete,
            endpoints::with_id(endpoints::UNFOLLOW, user_id),
        )
        .build()?;
        self.fetch(&request, "Failed to unfollow user").await
    }

    /// Lists the followers of user `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the call fails.
    pub async fn followers(&self, user_id: u64, page: u32, limit: u32) -> Result<UserPage, ApiError> {
        let path = endpoints::with_id(endpoints::FOLLOWERS, user_id);
        let request = paged(&path, page, limit).build()?;
        self.fetch(&request, "Failed to fetch followers").await
    }

    /// Lists the users that user `user_id` follows.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the call fails.
    pub async fn following(&self, user_id: u64, page: u32, limit: u32) -> Result<UserPage, ApiError> {
        let path = endpoints::with_id(endpoints::FOLLOWING, user_id);
        let request = paged(&path, page, limit).build()?;
        self.fetch(&request, "Failed to fetch following").await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: &HttpRequest,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let response = self.gateway.send_with_fallback(request, Some(fallback)).await?;
        decode(&request.path, &response)
    }

    async fn authenticate<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let request = HttpRequest::builder(HttpMethod::Post, path)
            .service(ApiService::Auth)
            .body(body)
            .build()?;
        let response = self.gateway.send_anonymous(&request).await?;

        if !response.is_ok() {
            let message = response.upstream_message().unwrap_or(fallback).to_string();
            tracing::warn!(path, status = response.code, %message, "Authentication request rejected");
            return Err(ApiError::AuthFailed {
                code: response.code,
                message,
            });
        }
        decode(path, &response)
    }

    async fn revoke(&self, refresh_token: &str) -> Result<(), ApiError> {
        let request = HttpRequest::builder(HttpMethod::Post, endpoints::LOGOUT)
            .service(ApiService::Auth)
            .body(json!({ "refreshToken": refresh_token }))
            .build()?;
        let access_token = self.token_store().access_token();
        let response = self
            .gateway
            .transport()
            .dispatch(&request, access_token.as_deref())
            .await?;

        if response.is_ok() {
            Ok(())
        } else {
            Err(ApiError::AuthFailed {
                code: response.code,
                message: response
                    .upstream_message()
                    .unwrap_or("Logout failed")
                    .to_string(),
            })
        }
    }
}

fn memory_store(config: &ClientConfig) -> TokenStore {
    let storage: Arc<dyn SlotStorage> = Arc::new(MemoryStorage::new());
    TokenStore::new(storage, config.storage_namespace())
}

fn get(path: &str) -> HttpRequestBuilder {
    HttpRequest::builder(HttpMethod::Get, path)
}

fn paged(path: &str, page: u32, limit: u32) -> HttpRequestBuilder {
    get(path).query_param("page", page).query_param("limit", limit)
}

fn encode<T: Serialize>(path: &str, body: &T) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Encode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(path: &str, response: &HttpResponse) -> Result<T, ApiError> {
    response.parse().map_err(|e| ApiError::Deserialize {
        path: path.to_string(),
        message: e.to_string(),
    })
}
