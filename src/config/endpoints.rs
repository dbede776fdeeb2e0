//! Endpoint paths of the Chirp services.
//!
//! Paths are relative to the service base URL (or to the service root on the
//! gateway). Paths that take an identifier are joined with `/{id}`.

/// Authentication: exchange email and password for tokens.
pub const LOGIN: &str = "/auth/login";
/// Authentication: create an account.
pub const REGISTER: &str = "/auth/register";
/// Authentication: exchange a refresh token for a new access token.
pub const REFRESH_TOKEN: &str = "/auth/refresh";
/// Authentication: revoke the refresh token.
pub const LOGOUT: &str = "/auth/logout";
/// Authentication: check the current access token.
pub const VERIFY_TOKEN: &str = "/auth/verify";

/// Current user's profile (GET and PUT).
pub const USER_PROFILE: &str = "/api/v1/users/profile";

/// Tweet collection (GET to list, POST to create).
pub const TWEETS: &str = "/api/v1/tweets";
/// Tweets authored by a given user.
pub const USER_TWEETS: &str = "/api/v1/tweets/user";

/// Global timeline.
pub const TIMELINE: &str = "/api/v1/timeline";
/// Home timeline of the current user.
pub const HOME_TIMELINE: &str = "/api/v1/timeline/home";

/// Tweet and user search.
pub const SEARCH: &str = "/api/v1/search";

/// Follow a user.
pub const FOLLOW: &str = "/api/v1/follow";
/// Unfollow a user.
pub const UNFOLLOW: &str = "/api/v1/unfollow";
/// Followers of a user.
pub const FOLLOWERS: &str = "/api/v1/followers";
/// Users followed by a user.
pub const FOLLOWING: &str = "/api/v1/following";

/// Service health check.
pub const HEALTH: &str = "/health";

/// Joins an endpoint with an identifier segment.
#[must_use]
pub fn with_id(endpoint: &str, id: u64) -> String {
    format!("{endpoint}/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_id_appends_segment() {
        assert_eq!(with_id(FOLLOW, 7), "/api/v1/follow/7");
        assert_eq!(with_id(USER_TWEETS, 42), "/api/v1/tweets/user/42");
    }
}
