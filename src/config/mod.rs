//! Configuration types for the Chirp SDK.
//!
//! This module provides the configuration used to compose a client: where
//! the authentication and resource services live, whether traffic goes
//! through the API gateway, the per-call timeout, and the namespace under
//! which the session is persisted.
//!
//! # Overview
//!
//! - [`ClientConfig`]: The main configuration struct holding all SDK settings
//! - [`ClientConfigBuilder`]: A builder for constructing [`ClientConfig`] instances
//! - [`GatewayConfig`]: API gateway routing and identification headers
//! - [`BaseUrl`], [`ApiKey`], [`StorageNamespace`]: Validated newtypes
//! - [`endpoints`]: Endpoint path constants
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use chirp_sdk::{BaseUrl, ClientConfig};
//!
//! let config = ClientConfig::builder()
//!     .api_base_url(BaseUrl::new("http://localhost:3001").unwrap())
//!     .auth_base_url(BaseUrl::new("http://localhost:3001").unwrap())
//!     .timeout(Duration::from_secs(5))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.timeout(), Duration::from_secs(5));
//! ```

pub mod endpoints;
mod gateway;
mod newtypes;

pub use gateway::{
    GatewayConfig, API_KEY_HEADER, AUTH_API_NAME, ORGANIZATION_HEADER, RESOURCE_API_NAME,
    VERSION_HEADER,
};
pub use newtypes::{ApiKey, BaseUrl, StorageNamespace};

use std::time::Duration;

use crate::error::ConfigError;

/// Default resource service URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.twitter-clone.com";

/// Default authentication service URL.
pub const DEFAULT_AUTH_BASE_URL: &str = "https://auth.twitter-clone.com";

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Environment variable names read by [`ClientConfig::from_env`].
pub mod env {
    /// `true` selects the in-memory backend.
    pub const USE_MOCK_API: &str = "CHIRP_USE_MOCK_API";
    /// Resource service base URL.
    pub const API_GATEWAY_URL: &str = "CHIRP_API_GATEWAY_URL";
    /// Authentication service base URL.
    pub const AUTH_SERVER_URL: &str = "CHIRP_AUTH_SERVER_URL";
    /// Gateway management URL; setting it routes traffic through the gateway.
    pub const APIMAN_URL: &str = "CHIRP_APIMAN_URL";
    /// Gateway organization.
    pub const APIMAN_ORG: &str = "CHIRP_APIMAN_ORG";
    /// Gateway API version.
    pub const APIMAN_VERSION: &str = "CHIRP_APIMAN_VERSION";
    /// Gateway API key.
    pub const APIMAN_API_KEY: &str = "CHIRP_APIMAN_API_KEY";
    /// Per-call timeout in milliseconds.
    pub const TIMEOUT_MS: &str = "CHIRP_TIMEOUT_MS";
    /// Storage namespace for persisted sessions.
    pub const STORAGE_NAMESPACE: &str = "CHIRP_STORAGE_NAMESPACE";
}

/// Configuration for the Chirp SDK.
///
/// # Thread Safety
///
/// `ClientConfig` is `Clone`, `Send`, and `Sync`, making it safe to share
/// across threads and async tasks.
///
/// # Example
///
/// ```rust
/// use chirp_sdk::{BaseUrl, ClientConfig, GatewayConfig};
///
/// let gateway = GatewayConfig::new(
///     BaseUrl::new("https://apiman.example.com/apiman").unwrap(),
///     "twitter-clone-org",
///     "1.0",
/// )
/// .unwrap();
///
/// let config = ClientConfig::builder()
///     .gateway(gateway)
///     .build()
///     .unwrap();
///
/// assert!(config.gateway().is_some());
/// ```
#[derive(Clone, Debug)]
pub struct ClientConfig {
    api_base_url: BaseUrl,
    auth_base_url: BaseUrl,
    gateway: Option<GatewayConfig>,
    timeout: Duration,
    storage_namespace: StorageNamespace,
    user_agent_prefix: Option<String>,
    use_mock: bool,
}

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Builds a configuration from `CHIRP_*` environment variables.
    ///
    /// Unset variables fall back to the builder defaults. See [`env`] for the
    /// variable names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// This is the implementation behind [`ClientConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable holds an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder();

        if let Some(url) = non_empty(env::API_GATEWAY_URL) {
            builder = builder.api_base_url(BaseUrl::new(url)?);
        }
        if let Some(url) = non_empty(env::AUTH_SERVER_URL) {
            builder = builder.auth_base_url(BaseUrl::new(url)?);
        }

        if let Some(url) = non_empty(env::APIMAN_URL) {
            let organization = non_empty(env::APIMAN_ORG)
                .unwrap_or_else(|| GatewayConfig::DEFAULT_ORGANIZATION.to_string());
            let version = non_empty(env::APIMAN_VERSION)
                .unwrap_or_else(|| GatewayConfig::DEFAULT_VERSION.to_string());
            let mut gateway = GatewayConfig::new(BaseUrl::new(url)?, organization, version)?;
            if let Some(key) = non_empty(env::APIMAN_API_KEY) {
                gateway = gateway.with_api_key(ApiKey::new(key)?);
            }
            builder = builder.gateway(gateway);
        }

        if let Some(raw) = non_empty(env::TIMEOUT_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidEnvVar {
                name: env::TIMEOUT_MS,
                reason: format!("'{raw}' is not a whole number of milliseconds"),
            })?;
            builder = builder.timeout(Duration::from_millis(millis));
        }

        if let Some(namespace) = non_empty(env::STORAGE_NAMESPACE) {
            builder = builder.storage_namespace(StorageNamespace::new(namespace)?);
        }

        let use_mock = non_empty(env::USE_MOCK_API).is_some_and(|v| v.trim() == "true");

        builder.use_mock(use_mock).build()
    }

    /// Returns the resource service base URL.
    #[must_use]
    pub const fn api_base_url(&self) -> &BaseUrl {
        &self.api_base_url
    }

    /// Returns the authentication service base URL.
    #[must_use]
    pub const fn auth_base_url(&self) -> &BaseUrl {
        &self.auth_base_url
    }

    /// Returns the gateway configuration, if traffic is routed through one.
    #[must_use]
    pub const fn gateway(&self) -> Option<&GatewayConfig> {
        self.gateway.as_ref()
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the namespace under which the session is persisted.
    #[must_use]
    pub const fn storage_namespace(&self) -> &StorageNamespace {
        &self.storage_namespace
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns whether the in-memory backend should be used.
    #[must_use]
    pub const fn use_mock(&self) -> bool {
        self.use_mock
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_url(DEFAULT_API_BASE_URL),
            auth_base_url: default_url(DEFAULT_AUTH_BASE_URL),
            gateway: None,
            timeout: DEFAULT_TIMEOUT,
            storage_namespace: StorageNamespace::default(),
            user_agent_prefix: None,
            use_mock: false,
        }
    }
}

fn default_url(url: &'static str) -> BaseUrl {
    BaseUrl::new(url).expect("default service URLs are valid")
}

// Verify ClientConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientConfig>();
};

/// Builder for constructing [`ClientConfig`] instances.
///
/// # Defaults
///
/// - `api_base_url`: [`DEFAULT_API_BASE_URL`]
/// - `auth_base_url`: [`DEFAULT_AUTH_BASE_URL`]
/// - `gateway`: `None` (services are called directly)
/// - `timeout`: 10 seconds
/// - `storage_namespace`: `twitter`
/// - `user_agent_prefix`: `None`
/// - `use_mock`: `false`
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    api_base_url: Option<BaseUrl>,
    auth_base_url: Option<BaseUrl>,
    gateway: Option<GatewayConfig>,
    timeout: Option<Duration>,
    storage_namespace: Option<StorageNamespace>,
    user_agent_prefix: Option<String>,
    use_mock: Option<bool>,
}

impl ClientConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resource service base URL.
    #[must_use]
    pub fn api_base_url(mut self, url: BaseUrl) -> Self {
        self.api_base_url = Some(url);
        self
    }

    /// Sets the authentication service base URL.
    #[must_use]
    pub fn auth_base_url(mut self, url: BaseUrl) -> Self {
        self.auth_base_url = Some(url);
        self
    }

    /// Sets both service base URLs to the same value.
    #[must_use]
    pub fn base_url(self, url: BaseUrl) -> Self {
        self.api_base_url(url.clone()).auth_base_url(url)
    }

    /// Routes all traffic through the given gateway.
    #[must_use]
    pub fn gateway(mut self, gateway: GatewayConfig) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the storage namespace for persisted sessions.
    #[must_use]
    pub fn storage_namespace(mut self, namespace: StorageNamespace) -> Self {
        self.storage_namespace = Some(namespace);
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Selects the in-memory backend instead of the network.
    #[must_use]
    pub const fn use_mock(mut self, use_mock: bool) -> Self {
        self.use_mock = Some(use_mock);
        self
    }

    /// Builds the [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroTimeout`] if the timeout is zero.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let defaults = ClientConfig::default();
        let timeout = self.timeout.unwrap_or(defaults.timeout);
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(ClientConfig {
            api_base_url: self.api_base_url.unwrap_or(defaults.api_base_url),
            auth_base_url: self.auth_base_url.unwrap_or(defaults.auth_base_url),
            gateway: self.gateway,
            timeout,
            storage_namespace: self
                .storage_namespace
                .unwrap_or(defaults.storage_namespace),
            user_agent_prefix: self.user_agent_prefix,
            use_mock: self.use_mock.unwrap_or(defaults.use_mock),
        })
    }
}
