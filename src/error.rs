//! Error types for the Chirp SDK.
//!
//! This module contains error types used throughout the SDK for configuration
//! and validation errors.
//!
//! # Error Handling
//!
//! All configuration constructors return `Result<T, ConfigError>` to enable
//! fail-fast validation. Error messages are designed to be clear and actionable.
//!
//! # Example
//!
//! ```rust
//! use chirp_sdk::{BaseUrl, ConfigError};
//!
//! let result = BaseUrl::new("not-a-url");
//! assert!(matches!(result, Err(ConfigError::InvalidBaseUrl { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur during SDK configuration.
///
/// This enum represents all possible errors that can occur when creating
/// or validating configuration types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Gateway API key cannot be empty when provided.
    #[error("Gateway API key cannot be empty. Omit it or provide a valid key.")]
    EmptyApiKey,

    /// Base URL is invalid.
    #[error("Invalid base URL '{url}'. Please provide a valid URL with scheme (e.g., 'https://api.example.com').")]
    InvalidBaseUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A gateway field that must be non-empty was empty.
    #[error("Gateway {field} cannot be empty.")]
    EmptyGatewayField {
        /// The name of the empty field.
        field: &'static str,
    },

    /// Storage namespace is invalid.
    #[error("Invalid storage namespace '{namespace}'. Use ASCII letters, digits, '-' or '_'.")]
    InvalidNamespace {
        /// The invalid namespace that was provided.
        namespace: String,
    },

    /// Request timeout must be non-zero.
    #[error("Request timeout must be greater than zero.")]
    ZeroTimeout,

    /// An environment variable held a value that could not be used.
    #[error("Invalid value for environment variable {name}: {reason}")]
    InvalidEnvVar {
        /// The variable name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}
