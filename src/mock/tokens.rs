//! Token issuance for the in-memory backend.
//!
//! Tokens are HS256 JWTs carrying the user id and email, the same claims the
//! development server signs. Every token gets a random `jti` so that two
//! tokens issued in the same second still differ.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Lifetime of an access token.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

/// Lifetime of a refresh token.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Default signing secret.
const DEFAULT_SECRET: &str = "chirp-mock-backend-secret";

/// Length of the random token identifier.
const JTI_LENGTH: usize = 16;

/// Claims carried by a backend token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    /// Subject user id.
    pub user_id: u64,
    /// Subject email.
    pub email: String,
    /// Issued at (seconds since the epoch).
    pub iat: i64,
    /// Expiry (seconds since the epoch).
    pub exp: i64,
    /// Random token identifier.
    pub jti: String,
}

/// Signs and verifies backend tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

impl Default for TokenIssuer {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET)
    }
}

impl TokenIssuer {
    /// Creates an issuer signing with `secret`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issues a token for the user valid for `ttl` from now.
    ///
    /// A negative `ttl` yields a token that is already expired.
    ///
    /// # Errors
    ///
    /// Returns the `jsonwebtoken` error if signing fails.
    pub fn issue(
        &self,
        user_id: u64,
        email: &str,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let jti: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(JTI_LENGTH)
            .map(char::from)
            .collect();

        let claims = TokenClaims {
            user_id,
            email: email.to_string(),
            iat: now,
            exp: now + ttl.num_seconds(),
            jti,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Issues an access token.
    ///
    /// # Errors
    ///
    /// Returns the `jsonwebtoken` error if signing fails.
    pub fn issue_access(
        &self,
        user_id: u64,
        email: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(user_id, email, Duration::minutes(ACCESS_TOKEN_TTL_MINUTES))
    }

    /// Issues a refresh token.
    ///
    /// # Errors
    ///
    /// Returns the `jsonwebtoken` error if signing fails.
    pub fn issue_refresh(
        &self,
        user_id: u64,
        email: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(user_id, email, Duration::days(REFRESH_TOKEN_TTL_DAYS))
    }

    /// Verifies a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns the `jsonwebtoken` error if the token is malformed, forged, or
    /// expired.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        let data = decode::<TokenClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}
