//! In-memory implementation of the Chirp services.
//!
//! [`MockBackend`] is a [`Transport`] that serves the authentication and
//! resource routes from seeded data, for development and tests. Select it
//! at composition time with [`ChirpClient::mock`] or
//! `CHIRP_USE_MOCK_API=true`.
//!
//! [`Transport`]: crate::clients::Transport
//! [`ChirpClient::mock`]: crate::ChirpClient::mock

mod backend;
mod fixtures;
mod tokens;

pub use backend::MockBackend;
pub use tokens::{TokenClaims, TokenIssuer, ACCESS_TOKEN_TTL_MINUTES, REFRESH_TOKEN_TTL_DAYS};
