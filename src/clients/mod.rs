//! HTTP transport types for the Chirp services.
//!
//! This module provides the foundational request/response layer. It does not
//! know about sessions or tokens beyond attaching a bearer value it is
//! handed; refresh and retry live in [`crate::auth`].
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`Transport`]: The delivery seam shared by the network and in-memory backends
//! - [`HttpTransport`]: The reqwest-backed implementation
//! - [`HttpRequest`]: A request addressed to one [`ApiService`]
//! - [`HttpResponse`]: A parsed response from a service
//! - [`HttpMethod`]: Supported HTTP methods (GET, POST, PUT, DELETE)
//!
//! # Example
//!
//! ```rust,ignore
//! use chirp_sdk::clients::{HttpMethod, HttpRequest, HttpTransport, Transport};
//! use chirp_sdk::ClientConfig;
//!
//! let transport = HttpTransport::new(&ClientConfig::default())?;
//!
//! let request = HttpRequest::builder(HttpMethod::Get, "/api/v1/timeline")
//!     .build()
//!     .unwrap();
//!
//! let response = transport.dispatch(&request, Some("access-token")).await?;
//! ```

mod errors;
mod http_request;
mod http_response;
mod http_transport;
mod transport;

pub use errors::{InvalidHttpRequestError, TransportError};
pub use http_request::{ApiService, HttpMethod, HttpRequest, HttpRequestBuilder};
pub use http_response::{HttpResponse, UNAUTHORIZED};
pub use http_transport::{HttpTransport, SDK_VERSION};
pub use transport::Transport;
