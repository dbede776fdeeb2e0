//! HTTP response types for the Chirp SDK.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

/// Status code that signals an authorization failure.
pub const UNAUTHORIZED: u16 = 401;

/// An HTTP response from one of the Chirp services.
///
/// Any status code can be represented; classification into success or
/// failure happens in the session gateway.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers, lowercased (headers may have multiple values).
    pub headers: HashMap<String, Vec<String>>,
    /// The parsed response body (`{}` when empty).
    pub body: serde_json::Value,
}

impl HttpResponse {
    /// Creates a new `HttpResponse`.
    #[must_use]
    pub const fn new(
        code: u16,
        headers: HashMap<String, Vec<String>>,
        body: serde_json::Value,
    ) -> Self {
        Self {
            code,
            headers,
            body,
        }
    }

    /// Creates a response with no headers.
    #[must_use]
    pub fn json(code: u16, body: serde_json::Value) -> Self {
        Self::new(code, HashMap::new(), body)
    }

    /// Returns `true` if the response has a 2xx status.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns `true` if the resource rejected the presented credentials.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        self.code == UNAUTHORIZED
    }

    /// Returns the first value of a header (name is case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the upstream error message carried by the body, if any.
    ///
    /// Looks at `message` first, then `error`.
    #[must_use]
    pub fn upstream_message(&self) -> Option<&str> {
        ["message", "error"]
            .iter()
            .find_map(|key| self.body.get(*key).and_then(serde_json::Value::as_str))
            .filter(|message| !message.is_empty())
    }

    /// Deserializes the body into `T`.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the body does not match `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }
}
