//! # Chirp SDK
//!
//! A Rust SDK for the Chirp social network services, providing persisted
//! sessions, transparent access-token renewal, and typed access to the
//! authentication and resource APIs.
//!
//! ## Overview
//!
//! This SDK provides:
//! - Type-safe configuration via [`ClientConfig`] and [`ClientConfigBuilder`]
//! - Validated newtypes for URLs, gateway keys and storage namespaces
//! - A persisted [`TokenStore`] over pluggable slot storage
//! - A [`SessionGateway`] that renews an expired access token exactly once
//!   no matter how many requests observe the expiry at the same time
//! - API gateway header decoration via [`GatewayConfig`]
//! - A typed resource client, [`ChirpClient`]
//! - An in-memory backend, [`mock::MockBackend`], for development and tests
//!
//! ## Quick Start
//!
//! ```rust
//! use chirp_sdk::{ChirpClient, ClientConfig};
//! use chirp_sdk::api::LoginRequest;
//!
//! # tokio_test::block_on(async {
//! let config = ClientConfig::builder().use_mock(true).build().unwrap();
//! let client = ChirpClient::mock(config);
//!
//! client
//!     .login(&LoginRequest::new("demo@twitter.com", "demo123"))
//!     .await
//!     .unwrap();
//!
//! let profile = client.user_profile().await.unwrap();
//! assert_eq!(profile.username, "demouser");
//! # });
//! ```
//!
//! ## Connecting Through the Gateway
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chirp_sdk::{ApiKey, BaseUrl, ChirpClient, ClientConfig, GatewayConfig, TokenStore};
//! use chirp_sdk::auth::FileStorage;
//!
//! let gateway = GatewayConfig::new(
//!     BaseUrl::new("https://gateway.example.com/apiman")?,
//!     "twitter-org",
//!     "1.0",
//! )?
//! .with_api_key(ApiKey::new("your-api-key")?);
//!
//! let config = ClientConfig::builder().gateway(gateway).build()?;
//! let store = TokenStore::new(
//!     Arc::new(FileStorage::at_default_location()?),
//!     config.storage_namespace(),
//! );
//!
//! let client = ChirpClient::http(config, store)?;
//! ```
//!
//! ## Session Expiry
//!
//! When renewal fails the stored session is cleared and requests fail with
//! [`GatewayError::SessionExpired`]. Register a hook to return the user to
//! the login screen:
//!
//! ```rust
//! use std::sync::Arc;
//! use chirp_sdk::{ChirpClient, ClientConfig, SessionGateway, TokenStore};
//! use chirp_sdk::mock::MockBackend;
//!
//! let gateway = SessionGateway::new(Arc::new(MockBackend::new()), TokenStore::in_memory())
//!     .with_session_expired_hook(Arc::new(|| tracing::warn!("Back to login")));
//!
//! let client = ChirpClient::with_gateway(ClientConfig::default(), gateway);
//! assert!(!client.session().is_authenticated());
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: Configuration and sessions are instance-based
//! - **Fail-fast validation**: All newtypes validate on construction
//! - **Thread-safe**: All types are `Send + Sync`
//! - **Async-first**: Designed for use with Tokio async runtime
//! - **One refresh at a time**: Concurrent expiries share a single renewal

pub mod api;
pub mod auth;
pub mod clients;
pub mod config;
pub mod error;
pub mod mock;

// Re-export public types at crate root for convenience
pub use api::{ApiError, ChirpClient};
pub use auth::{Credentials, GatewayError, Session, SessionGateway, TokenStore, UserProfile};
pub use config::{
    ApiKey, BaseUrl, ClientConfig, ClientConfigBuilder, GatewayConfig, StorageNamespace,
};
pub use error::ConfigError;

// Re-export HTTP types
pub use clients::{
    ApiService, HttpMethod, HttpRequest, HttpRequestBuilder, HttpResponse, HttpTransport,
    InvalidHttpRequestError, Transport, TransportError,
};
