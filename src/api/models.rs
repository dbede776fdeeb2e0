//! Request and response bodies of the Chirp services.
//!
//! All types use the services' camelCase JSON field names.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::auth::UserProfile;

/// Default page size used by the services.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// A short post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    /// Numeric tweet id.
    pub id: u64,
    /// Tweet text.
    pub text: String,
    /// The author, when embedded by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserProfile>,
    /// The author id, when sent by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<u64>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Like count.
    #[serde(default)]
    pub likes: u64,
    /// Retweet count.
    #[serde(default)]
    pub retweets: u64,
    /// Reply count.
    #[serde(default)]
    pub replies: u64,
}

/// Page metadata attached to list responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Number of pages.
    pub total_pages: u32,
    /// Number of items across all pages.
    pub total_items: u32,
    /// Whether a later page exists.
    pub has_more: bool,
}

impl Pagination {
    /// Computes page metadata for `total_items` items.
    #[must_use]
    pub fn for_items(page: u32, limit: u32, total_items: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            (u64::from(total_items) + u64::from(limit) - 1) / u64::from(limit)
        };
        Self {
            page,
            limit,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            total_items,
            has_more: u64::from(page) * u64::from(limit) < u64::from(total_items),
        }
    }
}

/// A page of tweets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetPage {
    /// The tweets on this page.
    pub tweets: Vec<Tweet>,
    /// Page metadata.
    pub pagination: Pagination,
}

/// A page of users.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPage {
    /// The users on this page.
    pub users: Vec<UserProfile>,
    /// Page metadata.
    pub pagination: Pagination,
}

/// Search results. Only the list matching the search type is populated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Matching tweets.
    #[serde(default)]
    pub tweets: Vec<Tweet>,
    /// Matching users.
    #[serde(default)]
    pub users: Vec<UserProfile>,
    /// Page metadata, absent for empty results of unknown types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl SearchResults {
    /// Returns `true` if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tweets.is_empty() && self.users.is_empty()
    }
}

/// What a search looks for.
///
/// # Example
///
/// ```rust
/// use chirp_sdk::api::SearchType;
///
/// assert_eq!("users".parse::<SearchType>().unwrap(), SearchType::Users);
/// assert_eq!(SearchType::Other("hashtags".into()).to_string(), "hashtags");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum SearchType {
    /// Tweet text search.
    #[default]
    Tweets,
    /// User name and handle search.
    Users,
    /// Any other type; the services return no results for it.
    Other(String),
}

impl SearchType {
    /// Returns the wire value of this type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tweets => "tweets",
            Self::Users => "users",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "tweets" => Self::Tweets,
            "users" => Self::Users,
            other => Self::Other(other.to_string()),
        })
    }
}

/// Login body.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl LoginRequest {
    /// Creates a login body.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"*****")
            .finish()
    }
}

/// Registration body.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Unique handle.
    pub username: String,
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"*****")
            .finish()
    }
}

/// Tokens and identity returned by a successful login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// The logged-in user.
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// Body returned by a successful registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Confirmation message.
    pub message: String,
    /// The created user.
    pub user: UserProfile,
}

/// The subject of a verified access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedUser {
    /// User id carried by the token.
    pub user_id: u64,
    /// Email carried by the token.
    pub email: String,
}

/// Body returned by token verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenVerification {
    /// Whether the token is valid.
    pub valid: bool,
    /// The token subject, when sent.
    #[serde(default)]
    pub user: Option<VerifiedUser>,
}

/// A bare confirmation message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// The message.
    pub message: String,
}

/// A partial profile update. Absent fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// New email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    /// Applies this update to `profile`.
    pub fn apply_to(&self, profile: &mut UserProfile) {
        if let Some(name) = &self.name {
            profile.name.clone_from(name);
        }
        if let Some(username) = &self.username {
            profile.username.clone_from(username);
        }
        if let Some(email) = &self.email {
            profile.email.clone_from(email);
        }
        if let Some(avatar) = &self.avatar {
            profile.avatar = Some(avatar.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pagination_for_items() {
        let p = Pagination::for_items(1, 20, 5);
        assert_eq!(p.total_pages, 1);
        assert!(!p.has_more);

        let p = Pagination::for_items(1, 2, 5);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_more);

        let p = Pagination::for_items(3, 2, 5);
        assert!(!p.has_more);
    }

    #[test]
    fn test_pagination_uses_camel_case() {
        let value = serde_json::to_value(Pagination::for_items(1, 20, 2)).unwrap();
        assert_eq!(
            value,
            json!({"page": 1, "limit": 20, "totalPages": 1, "totalItems": 2, "hasMore": false})
        );
    }

    #[test]
    fn test_search_type_parsing() {
        assert_eq!("tweets".parse::<SearchType>().unwrap(), SearchType::Tweets);
        assert_eq!(
            "hashtags".parse::<SearchType>().unwrap(),
            SearchType::Other("hashtags".to_string())
        );
        assert_eq!(SearchType::default().as_str(), "tweets");
    }

    #[test]
    fn test_search_results_default_when_fields_missing() {
        let results: SearchResults = serde_json::from_value(json!({"tweets": []})).unwrap();
        assert!(results.is_empty());
        assert!(results.pagination.is_none());
    }

    #[test]
    fn test_auth_tokens_deserialize() {
        let tokens: AuthTokens = serde_json::from_value(json!({
            "accessToken": "a",
            "refreshToken": "r",
            "user": {"id": 2, "name": "Demo User", "username": "demouser"}
        }))
        .unwrap();
        assert_eq!(tokens.refresh_token.as_deref(), Some("r"));
        assert_eq!(tokens.user.unwrap().username, "demouser");
    }

    #[test]
    fn test_tweet_deserializes_server_shape() {
        let tweet: Tweet = serde_json::from_value(json!({
            "id": 1,
            "text": "hello",
            "authorId": 1,
            "createdAt": "2024-01-01T00:00:00Z",
            "likes": 3,
            "retweets": 0,
            "replies": 1
        }))
        .unwrap();
        assert_eq!(tweet.author_id, Some(1));
        assert!(tweet.author.is_none());
    }

    #[test]
    fn test_profile_update_applies_only_present_fields() {
        let mut profile: UserProfile =
            serde_json::from_value(json!({"id": 1, "name": "Old", "username": "old"})).unwrap();
        ProfileUpdate {
            name: Some("New".to_string()),
            ..ProfileUpdate::default()
        }
        .apply_to(&mut profile);

        assert_eq!(profile.name, "New");
        assert_eq!(profile.username, "old");
    }

    #[test]
    fn test_login_request_debug_masks_password() {
        let debug = format!("{:?}", LoginRequest::new("demo@twitter.com", "demo123"));
        assert!(!debug.contains("demo123"));
    }
}
