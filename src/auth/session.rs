//! Session types for the Chirp SDK.
//!
//! This module provides the [`Session`] type, the [`Credentials`] pair
//! issued at login, and the cached [`UserProfile`] identity.

use serde::{Deserialize, Serialize};

/// Access and refresh tokens issued by the authorization server.
///
/// Both values are opaque bearer strings; the SDK never inspects them. The
/// refresh token is optional so that a session holding only an access token
/// stays representable.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Short-lived token attached to resource requests.
    pub access_token: String,

    /// Long-lived token used to obtain a new access token.
    pub refresh_token: Option<String>,
}

impl Credentials {
    /// Creates credentials from an access token and optional refresh token.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"*****")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "*****"),
            )
            .finish()
    }
}

/// A user of the Chirp network.
///
/// This is both the identity cached alongside a session and the user shape
/// returned by the resource API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Numeric user id.
    pub id: u64,

    /// Display name.
    pub name: String,

    /// Unique handle.
    pub username: String,

    /// Email address.
    #[serde(default)]
    pub email: String,

    /// Avatar image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Number of followers.
    #[serde(default)]
    pub followers: u64,

    /// Number of followed users.
    #[serde(default)]
    pub following: u64,

    /// When the account was created, as sent by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined: Option<String>,
}

/// The persisted authentication state of one client.
///
/// # Thread Safety
///
/// `Session` is `Send + Sync`, making it safe to share across threads.
///
/// # Example
///
/// ```rust
/// use chirp_sdk::{Credentials, Session};
///
/// let empty = Session::empty();
/// assert!(!empty.is_authenticated());
///
/// let session = Session::new(Credentials::new("access", Some("refresh".into())), None);
/// assert!(session.is_authenticated());
/// assert_eq!(session.access_token(), Some("access"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    /// The stored tokens, if logged in.
    pub credentials: Option<Credentials>,

    /// The cached identity of the logged-in user.
    pub identity: Option<UserProfile>,
}

impl Session {
    /// Creates a logged-in session.
    #[must_use]
    pub const fn new(credentials: Credentials, identity: Option<UserProfile>) -> Self {
        Self {
            credentials: Some(credentials),
            identity,
        }
    }

    /// The logged-out session.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            credentials: None,
            identity: None,
        }
    }

    /// Returns `true` if an access token is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// Returns the access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.access_token.as_str())
    }

    /// Returns the refresh token, if any.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.credentials
            .as_ref()
            .and_then(|c| c.refresh_token.as_deref())
    }
}

// Verify Session is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Session>();
};
