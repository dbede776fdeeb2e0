//! Networked transport for the Chirp services.
//!
//! This module provides [`HttpTransport`], the [`Transport`] implementation
//! that talks to the real authentication and resource services over HTTP,
//! either directly or through the API gateway.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};

use crate::clients::errors::TransportError;
use crate::clients::http_request::{ApiService, HttpMethod, HttpRequest};
use crate::clients::http_response::HttpResponse;
use crate::clients::transport::Transport;
use crate::config::{BaseUrl, ClientConfig, GatewayConfig};

/// SDK version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP transport for the Chirp services.
///
/// The transport handles:
/// - URL construction per service, direct or through the gateway
/// - Default headers including User-Agent and the gateway identification set
/// - The per-call timeout from [`ClientConfig::timeout`]
/// - Response parsing into [`HttpResponse`]
///
/// It never retries; refresh and retry decisions belong to the session
/// gateway.
///
/// # Thread Safety
///
/// `HttpTransport` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust
/// use chirp_sdk::{BaseUrl, ClientConfig};
/// use chirp_sdk::clients::{ApiService, HttpTransport};
///
/// let config = ClientConfig::builder()
///     .base_url(BaseUrl::new("http://localhost:3001").unwrap())
///     .build()
///     .unwrap();
///
/// let transport = HttpTransport::new(&config).unwrap();
/// assert_eq!(
///     transport.url_for(ApiService::Api, "/api/v1/tweets"),
///     "http://localhost:3001/api/v1/tweets"
/// );
/// ```
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_base_url: BaseUrl,
    auth_base_url: BaseUrl,
    gateway: Option<GatewayConfig>,
    default_headers: HashMap<String, String>,
}

// Verify HttpTransport is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpTransport>();
};

impl HttpTransport {
    /// Creates a transport for the services described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Network`] if the underlying reqwest client
    /// cannot be created (e.g., TLS initialization failure).
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        let user_agent = format!("{user_agent_prefix}Chirp SDK v{SDK_VERSION} | Rust {rust_version}");

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), user_agent);
        default_headers.insert("Accept".to_string(), "application/json".to_string());

        if let Some(gateway) = config.gateway() {
            if gateway.api_key().is_none() {
                tracing::warn!(
                    organization = gateway.organization(),
                    "Gateway configured without an API key; requests may be rejected"
                );
            }
            default_headers.extend(gateway.headers());
        }

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url().clone(),
            auth_base_url: config.auth_base_url().clone(),
            gateway: config.gateway().cloned(),
            default_headers,
        })
    }

    /// Returns the default headers sent with every request.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Resolves the full URL of `path` on `service`.
    #[must_use]
    pub fn url_for(&self, service: ApiService, path: &str) -> String {
        match &self.gateway {
            Some(gateway) => gateway.service_url(service, path),
            None => match service {
                ApiService::Auth => self.auth_base_url.join(path),
                ApiService::Api => self.api_base_url.join(path),
            },
        }
    }

    /// Checks that the configured gateway answers its status endpoint.
    ///
    /// Returns `false` when no gateway is configured.
    pub async fn check_gateway(&self) -> bool {
        match &self.gateway {
            Some(gateway) => gateway.check_connection(&self.client).await,
            None => false,
        }
    }

    fn build_headers(
        &self,
        request: &HttpRequest,
        bearer: Option<&str>,
    ) -> Result<HeaderMap, TransportError> {
        let mut merged = self.default_headers.clone();
        if request.body.is_some() {
            merged.insert("Content-Type".to_string(), "application/json".to_string());
        }
        if let Some(extra) = &request.extra_headers {
            for (key, value) in extra {
                merged.insert(key.clone(), value.clone());
            }
        }

        let mut headers = HeaderMap::new();
        for (key, value) in &merged {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| TransportError::InvalidHeader { name: key.clone() })?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| TransportError::InvalidHeader { name: key.clone() })?;
            headers.insert(name, value);
        }

        if let Some(token) = bearer {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                TransportError::InvalidHeader {
                    name: AUTHORIZATION.to_string(),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Parses response headers into a `HashMap`.
    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }

    fn parse_body(code: u16, body_text: String) -> serde_json::Value {
        if body_text.is_empty() {
            return serde_json::json!({});
        }
        serde_json::from_str(&body_text).unwrap_or_else(|_| {
            // Keep unparsable 5xx bodies for diagnostics
            if code >= 500 {
                serde_json::json!({ "raw_body": body_text })
            } else {
                serde_json::json!({})
            }
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn dispatch(
        &self,
        request: &HttpRequest,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(request.service, &request.path);
        let headers = self.build_headers(request, bearer)?;

        let mut req_builder = match request.http_method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Delete => self.client.delete(&url),
        }
        .headers(headers);

        if let Some(query) = &request.query {
            req_builder = req_builder.query(query);
        }
        if let Some(body) = &request.body {
            req_builder = req_builder.body(body.to_string());
        }

        tracing::debug!(method = %request.http_method, url = %url, "Sending request");

        let res = req_builder.send().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, timeout = e.is_timeout(), "Request failed");
            TransportError::Network(e)
        })?;

        let code = res.status().as_u16();
        let res_headers = Self::parse_response_headers(res.headers());
        let body_text = res.text().await.unwrap_or_default();
        let body = Self::parse_body(code, body_text);

        tracing::debug!(url = %url, status = code, "Received response");

        Ok(HttpResponse::new(code, res_headers, body))
    }
}
