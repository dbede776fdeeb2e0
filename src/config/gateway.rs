//! API gateway settings and header decoration.
//!
//! Both upstream services (authentication and resources) can be reached
//! through an Apiman-style gateway. The gateway identifies callers by a fixed
//! set of headers and exposes each service under
//! `{gateway}/{organization}/{api-name}/{version}`.

use std::collections::HashMap;

use crate::clients::ApiService;
use crate::config::{ApiKey, BaseUrl};
use crate::error::ConfigError;

/// Header carrying the gateway API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Header carrying the gateway organization.
pub const ORGANIZATION_HEADER: &str = "X-Apiman-Organization";

/// Header carrying the gateway API version.
pub const VERSION_HEADER: &str = "X-Apiman-Version";

/// Gateway name of the authentication service.
pub const AUTH_API_NAME: &str = "twitter-auth";

/// Gateway name of the resource service.
pub const RESOURCE_API_NAME: &str = "twitter-api";

/// Path of the gateway status endpoint, relative to the management base URL.
const STATUS_PATH: &str = "/system/status";

/// Configuration for routing requests through the API gateway.
///
/// # Example
///
/// ```rust
/// use chirp_sdk::{ApiKey, BaseUrl, GatewayConfig};
/// use chirp_sdk::clients::ApiService;
///
/// let gateway = GatewayConfig::new(
///     BaseUrl::new("https://apiman.example.com/apiman").unwrap(),
///     "twitter-clone-org",
///     "1.0",
/// )
/// .unwrap()
/// .with_api_key(ApiKey::new("gw-key").unwrap());
///
/// assert_eq!(
///     gateway.service_url(ApiService::Auth, "/auth/login"),
///     "https://apiman.example.com/apiman-gateway/twitter-clone-org/twitter-auth/1.0/auth/login"
/// );
/// assert_eq!(gateway.headers().get("X-API-Key"), Some(&"gw-key".to_string()));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
    base_url: BaseUrl,
    organization: String,
    version: String,
    api_key: Option<ApiKey>,
}

impl GatewayConfig {
    /// Default organization name.
    pub const DEFAULT_ORGANIZATION: &'static str = "twitter-clone-org";

    /// Default API version.
    pub const DEFAULT_VERSION: &'static str = "1.0";

    /// Creates a gateway configuration without an API key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyGatewayField`] if `organization` or
    /// `version` is empty.
    pub fn new(
        base_url: BaseUrl,
        organization: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let organization = organization.into();
        let version = version.into();

        if organization.trim().is_empty() {
            return Err(ConfigError::EmptyGatewayField {
                field: "organization",
            });
        }
        if version.trim().is_empty() {
            return Err(ConfigError::EmptyGatewayField { field: "version" });
        }

        Ok(Self {
            base_url,
            organization,
            version,
            api_key: None,
        })
    }

    /// Sets the API key sent with every gateway request.
    #[must_use]
    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Returns the gateway management base URL.
    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Returns the organization.
    #[must_use]
    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Returns the API version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the API key, if configured.
    #[must_use]
    pub const fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    /// Returns the identification headers for gateway requests.
    ///
    /// `X-API-Key` is only present when a key is configured.
    #[must_use]
    pub fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        if let Some(key) = &self.api_key {
            headers.insert(API_KEY_HEADER.to_string(), key.as_ref().to_string());
        }
        headers.insert(ORGANIZATION_HEADER.to_string(), self.organization.clone());
        headers.insert(VERSION_HEADER.to_string(), self.version.clone());
        headers
    }

    /// Returns the root URL that proxied traffic is sent to.
    ///
    /// A management URL ending in `/apiman` is served by the gateway at
    /// `/apiman-gateway`.
    #[must_use]
    pub fn gateway_root(&self) -> String {
        let base = self.base_url.as_ref();
        base.strip_suffix("/apiman").map_or_else(
            || base.to_string(),
            |prefix| format!("{prefix}/apiman-gateway"),
        )
    }

    /// Builds the full gateway URL for a service endpoint.
    #[must_use]
    pub fn service_url(&self, service: ApiService, path: &str) -> String {
        let api_name = match service {
            ApiService::Auth => AUTH_API_NAME,
            ApiService::Api => RESOURCE_API_NAME,
        };
        let separator = if path.is_empty() || path.starts_with('/') {
            ""
        } else {
            "/"
        };
        format!(
            "{}/{}/{api_name}/{}{separator}{path}",
            self.gateway_root(),
            self.organization,
            self.version
        )
    }

    /// Returns the URL of the gateway status endpoint.
    #[must_use]
    pub fn status_url(&self) -> String {
        self.base_url.join(STATUS_PATH)
    }

    /// Checks whether the gateway answers its status endpoint.
    ///
    /// Returns `false` on any failure, including network errors.
    pub async fn check_connection(&self, client: &reqwest::Client) -> bool {
        let mut request = client.get(self.status_url());
        for (key, value) in self.headers() {
            request = request.header(key, value);
        }

        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "Gateway connection test failed");
                false
            }
        }
    }
}
