//! Typed access to the Chirp authentication and resource services.
//!
//! [`ChirpClient`] is the entry point. Request and response bodies live in
//! [`models`].

mod client;
mod error;
pub mod models;

pub use client::ChirpClient;
pub use error::ApiError;
pub use models::{
    AuthTokens, LoginRequest, MessageResponse, Pagination, ProfileUpdate, RegisterRequest,
    RegisterResponse, SearchResults, SearchType, TokenVerification, Tweet, TweetPage, UserPage,
    VerifiedUser, DEFAULT_PAGE_LIMIT,
};
