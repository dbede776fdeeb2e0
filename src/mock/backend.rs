//! The in-memory backend.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::models::{
    Pagination, ProfileUpdate, SearchType, UserProfile, DEFAULT_PAGE_LIMIT,
};
use crate::clients::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
use crate::mock::fixtures::{avatar_for, seed_tweets, seed_users, StoredTweet};
use crate::mock::tokens::{TokenClaims, TokenIssuer};

#[derive(Debug)]
struct BackendState {
    users: Vec<UserProfile>,
    tweets: Vec<StoredTweet>,
    revoked_refresh_tokens: HashSet<String>,
}

/// An in-process implementation of the Chirp services.
///
/// `MockBackend` answers the same routes as the development server from
/// seeded data held in memory, issuing and verifying real HS256 JWTs. Missing,
/// invalid and expired access tokens are all rejected with `401`.
///
/// The seeded accounts accept any non-empty password; the demo account is
/// `demo@twitter.com`.
///
/// # Example
///
/// ```rust
/// use chirp_sdk::clients::{ApiService, HttpMethod, HttpRequest, Transport};
/// use chirp_sdk::mock::MockBackend;
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let backend = MockBackend::new();
/// let login = HttpRequest::builder(HttpMethod::Post, "/auth/login")
///     .service(ApiService::Auth)
///     .body(json!({"email": "demo@twitter.com", "password": "demo123"}))
///     .build()
///     .unwrap();
///
/// let response = backend.dispatch(&login, None).await.unwrap();
/// assert_eq!(response.code, 200);
/// assert_eq!(response.body["user"]["username"], "demouser");
/// assert_eq!(backend.request_count("/auth/login"), 1);
/// # });
/// ```
#[derive(Debug)]
pub struct MockBackend {
    state: Mutex<BackendState>,
    tokens: TokenIssuer,
    latency: Option<Duration>,
    hits: Mutex<HashMap<String, usize>>,
}

// Verify MockBackend is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MockBackend>();
};

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the `Ok` value of an authentication check, or returns the
/// rejection response from the enclosing handler.
macro_rules! authenticated {
    ($backend:expr, $bearer:expr) => {
        match $backend.authenticate($bearer) {
            Ok(claims) => claims,
            Err(response) => return Ok(response),
        }
    };
}

impl MockBackend {
    /// Creates a backend with the seeded users and tweets.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BackendState {
                users: seed_users(),
                tweets: seed_tweets(Utc::now()),
                revoked_refresh_tokens: HashSet::new(),
            }),
            tokens: TokenIssuer::default(),
            latency: None,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Delays every response by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns the issuer that signs this backend's tokens.
    #[must_use]
    pub const fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Returns the seeded or registered user with `email`.
    #[must_use]
    pub fn user_by_email(&self, email: &str) -> Option<UserProfile> {
        self.lock_state()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
    }

    /// Returns how many requests were dispatched to `path`.
    #[must_use]
    pub fn request_count(&self, path: &str) -> usize {
        self.lock_hits().get(path).copied().unwrap_or(0)
    }

    /// Returns how many requests were dispatched in total.
    #[must_use]
    pub fn total_requests(&self) -> usize {
        self.lock_hits().values().sum()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_hits(&self) -> std::sync::MutexGuard<'_, HashMap<String, usize>> {
        self.hits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn authenticate(&self, bearer: Option<&str>) -> Result<TokenClaims, HttpResponse> {
        let Some(token) = bearer else {
            return Err(error(401, "Access token required"));
        };
        self.tokens
            .verify(token)
            .map_err(|_| error(401, "Invalid or expired token"))
    }

    fn route(
        &self,
        request: &HttpRequest,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let segments: Vec<&str> = request
            .path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match (request.http_method, segments.as_slice()) {
            (HttpMethod::Get, ["health"]) => Ok(ok(json!({
                "status": "healthy",
                "timestamp": Utc::now().to_rfc3339(),
                "service": "twitter-mock-api",
                "version": "1.0.0",
            }))),
            (HttpMethod::Post, ["auth", "login"]) => self.login(request),
            (HttpMethod::Post, ["auth", "register"]) => Ok(self.register(request)),
            (HttpMethod::Post, ["auth", "refresh"]) => self.refresh(request),
            (HttpMethod::Post, ["auth", "logout"]) => Ok(self.logout(request)),
            (HttpMethod::Get, ["auth", "verify"]) => {
                let claims = authenticated!(self, bearer);
                Ok(ok(json!({ "valid": true, "user": claims })))
            }
            (method, ["api", "v1", rest @ ..]) => self.route_resource(method, rest, request, bearer),
            _ => Ok(not_found()),
        }
    }

    fn route_resource(
        &self,
        method: HttpMethod,
        segments: &[&str],
        request: &HttpRequest,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let (page, limit) = page_params(request);

        match (method, segments) {
            (HttpMethod::Get, ["users", "profile"]) => {
                let claims = authenticated!(self, bearer);
                let state = self.lock_state();
                let response = state
                    .users
                    .iter()
                    .find(|u| u.id == claims.user_id)
                    .map_or_else(|| error(404, "User not found"), |user| to_response(200, user));
                Ok(response)
            }
            (HttpMethod::Put, ["users", "profile"]) => {
                let claims = authenticated!(self, bearer);
                Ok(self.update_profile(&claims, request))
            }
            (HttpMethod::Get, ["tweets"] | ["timeline"] | ["timeline", "home"]) => {
                authenticated!(self, bearer);
                let state = self.lock_state();
                let tweets: Vec<&StoredTweet> = state.tweets.iter().collect();
                Ok(tweet_page(&tweets, &state.users, page, limit))
            }
            (HttpMethod::Post, ["tweets"]) => {
                let claims = authenticated!(self, bearer);
                Ok(self.create_tweet(&claims, request))
            }
            (HttpMethod::Get, ["tweets", "user", id]) => {
                authenticated!(self, bearer);
                let Some(user_id) = parse_id(id) else {
                    return Ok(error(400, "Invalid user id"));
                };
                let state = self.lock_state();
                let tweets: Vec<&StoredTweet> = state
                    .tweets
                    .iter()
                    .filter(|t| t.author_id == user_id)
                    .collect();
                Ok(tweet_page(&tweets, &state.users, page, limit))
            }
            (HttpMethod::Get, ["search"]) => {
                authenticated!(self, bearer);
                Ok(self.search(request))
            }
            (HttpMethod::Post, ["follow", id]) => {
                authenticated!(self, bearer);
                Ok(self.with_known_user(id, || message(200, "User followed successfully")))
            }
            (HttpMethod::Delete, ["unfollow", id]) => {
                authenticated!(self, bearer);
                Ok(self.with_known_user(id, || message(200, "User unfollowed successfully")))
            }
            (HttpMethod::Get, ["followers", id]) => {
                authenticated!(self, bearer);
                Ok(self.with_known_user(id, || self.user_slice(0..2, page, limit)))
            }
            (HttpMethod::Get, ["following", id]) => {
                authenticated!(self, bearer);
                Ok(self.with_known_user(id, || self.user_slice(1..3, page, limit)))
            }
            _ => Ok(not_found()),
        }
    }

    fn login(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let email = body_str(request, "email").unwrap_or_default();
        let password = body_str(request, "password").unwrap_or_default();

        let Some(user) = self.user_by_email(email) else {
            return Ok(error(401, "Invalid credentials"));
        };
        // Any non-empty password is accepted
        if password.is_empty() {
            return Ok(error(401, "Invalid credentials"));
        }

        let access_token = self.tokens.issue_access(user.id, &user.email).map_err(backend_fault)?;
        let refresh_token = self
            .tokens
            .issue_refresh(user.id, &user.email)
            .map_err(backend_fault)?;

        Ok(ok(json!({
            "accessToken": access_token,
            "refreshToken": refresh_token,
            "user": user,
        })))
    }

    fn register(&self, request: &HttpRequest) -> HttpResponse {
        let fields = ["name", "username", "email", "password"].map(|key| {
            body_str(request, key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
        });
        let [Some(name), Some(username), Some(email), Some(_password)] = fields else {
            return error(400, "Name, username, email and password are required");
        };

        let mut state = self.lock_state();
        if state
            .users
            .iter()
            .any(|u| u.email == email || u.username == username)
        {
            return error(400, "User already exists");
        }

        let user = UserProfile {
            id: state.users.iter().map(|u| u.id).max().unwrap_or(0) + 1,
            name: name.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            avatar: Some(avatar_for(name, "1DA1F2")),
            followers: 0,
            following: 0,
            joined: Some(Utc::now().to_rfc3339()),
        };
        state.users.push(user.clone());
        drop(state);

        to_response(
            201,
            &json!({ "message": "User created successfully", "user": user }),
        )
    }

    fn refresh(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let Some(refresh_token) = body_str(request, "refreshToken").filter(|t| !t.is_empty()) else {
            return Ok(error(401, "Refresh token required"));
        };

        if self
            .lock_state()
            .revoked_refresh_tokens
            .contains(refresh_token)
        {
            return Ok(error(401, "Invalid refresh token"));
        }

        let Ok(claims) = self.tokens.verify(refresh_token) else {
            return Ok(error(401, "Invalid refresh token"));
        };

        let access_token = self
            .tokens
            .issue_access(claims.user_id, &claims.email)
            .map_err(backend_fault)?;
        Ok(ok(json!({ "accessToken": access_token })))
    }

    fn logout(&self, request: &HttpRequest) -> HttpResponse {
        if let Some(refresh_token) = body_str(request, "refreshToken") {
            self.lock_state()
                .revoked_refresh_tokens
                .insert(refresh_token.to_string());
        }
        message(200, "Logged out successfully")
    }

    fn update_profile(&self, claims: &TokenClaims, request: &HttpRequest) -> HttpResponse {
        let update: ProfileUpdate = match request.body.clone().map(serde_json::from_value) {
            Some(Ok(update)) => update,
            _ => return error(400, "Invalid profile update"),
        };

        let mut state = self.lock_state();
        let Some(user) = state.users.iter_mut().find(|u| u.id == claims.user_id) else {
            return error(404, "User not found");
        };
        update.apply_to(user);
        to_response(200, &*user)
    }

    fn create_tweet(&self, claims: &TokenClaims, request: &HttpRequest) -> HttpResponse {
        let text = body_str(request, "text").map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return error(400, "Tweet text is required");
        }

        let mut state = self.lock_state();
        let tweet = StoredTweet {
            id: state.tweets.iter().map(|t| t.id).max().unwrap_or(0) + 1,
            text: text.to_string(),
            author_id: claims.user_id,
            created_at: Utc::now(),
            likes: 0,
            retweets: 0,
            replies: 0,
        };
        state.tweets.insert(0, tweet.clone());
        to_response(201, &tweet.render(&state.users))
    }

    fn search(&self, request: &HttpRequest) -> HttpResponse {
        let Some(query) = request.query_value("q").filter(|q| !q.is_empty()) else {
            return error(400, "Search query is required");
        };
        let query = query.to_lowercase();
        let search_type: SearchType = request
            .query_value("type")
            .unwrap_or("tweets")
            .parse()
            .unwrap_or_default();

        let state = self.lock_state();
        match search_type {
            SearchType::Tweets => {
                let tweets: Vec<_> = state
                    .tweets
                    .iter()
                    .filter(|t| t.text.to_lowercase().contains(&query))
                    .map(|t| t.render(&state.users))
                    .collect();
                let pagination = single_page(tweets.len());
                ok(json!({ "tweets": tweets, "pagination": pagination }))
            }
            SearchType::Users => {
                let users: Vec<_> = state
                    .users
                    .iter()
                    .filter(|u| {
                        u.name.to_lowercase().contains(&query)
                            || u.username.to_lowercase().contains(&query)
                    })
                    .cloned()
                    .collect();
                let pagination = single_page(users.len());
                ok(json!({ "users": users, "pagination": pagination }))
            }
            SearchType::Other(_) => ok(json!({ "tweets": [], "users": [] })),
        }
    }

    fn with_known_user(&self, id: &str, respond: impl FnOnce() -> HttpResponse) -> HttpResponse {
        let Some(user_id) = parse_id(id) else {
            return error(400, "Invalid user id");
        };
        let known = self.lock_state().users.iter().any(|u| u.id == user_id);
        if known {
            respond()
        } else {
            error(404, "User not found")
        }
    }

    fn user_slice(&self, range: std::ops::Range<usize>, page: u32, limit: u32) -> HttpResponse {
        let state = self.lock_state();
        let end = range.end.min(state.users.len());
        let start = range.start.min(end);
        let users = &state.users[start..end];
        let pagination = Pagination {
            page,
            limit,
            total_pages: 1,
            total_items: u32::try_from(users.len()).unwrap_or(u32::MAX),
            has_more: false,
        };
        ok(json!({ "users": users, "pagination": pagination }))
    }
}

#[async_trait]
impl Transport for MockBackend {
    async fn dispatch(
        &self,
        request: &HttpRequest,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        *self.lock_hits().entry(request.path.clone()).or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let response = self.route(request, bearer)?;
        tracing::debug!(
            method = %request.http_method,
            path = %request.path,
            status = response.code,
            "Mock backend handled request"
        );
        Ok(response)
    }
}

fn ok(body: Value) -> HttpResponse {
    HttpResponse::json(200, body)
}

fn to_response<T: Serialize + ?Sized>(code: u16, body: &T) -> HttpResponse {
    match serde_json::to_value(body) {
        Ok(value) => HttpResponse::json(code, value),
        Err(_) => error(500, "Internal server error"),
    }
}

fn error(code: u16, message: &str) -> HttpResponse {
    HttpResponse::json(code, json!({ "error": message }))
}

fn message(code: u16, text: &str) -> HttpResponse {
    HttpResponse::json(code, json!({ "message": text }))
}

fn not_found() -> HttpResponse {
    error(404, "Endpoint not found")
}

fn backend_fault(e: jsonwebtoken::errors::Error) -> TransportError {
    TransportError::Backend(format!("token signing failed: {e}"))
}

fn body_str<'a>(request: &'a HttpRequest, key: &str) -> Option<&'a str> {
    request.body.as_ref()?.get(key)?.as_str()
}

fn parse_id(raw: &str) -> Option<u64> {
    raw.parse().ok()
}

/// Reads `page` and `limit`, falling back to 1 and the default page size
/// for missing, malformed or zero values.
fn page_params(request: &HttpRequest) -> (u32, u32) {
    let read = |key: &str, default: u32| {
        request
            .query_value(key)
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(default)
    };
    (read("page", 1), read("limit", DEFAULT_PAGE_LIMIT))
}

fn single_page(items: usize) -> Pagination {
    Pagination {
        page: 1,
        limit: DEFAULT_PAGE_LIMIT,
        total_pages: 1,
        total_items: u32::try_from(items).unwrap_or(u32::MAX),
        has_more: false,
    }
}

fn tweet_page(
    tweets: &[&StoredTweet],
    users: &[UserProfile],
    page: u32,
    limit: u32,
) -> HttpResponse {
    let start = (page as usize - 1).saturating_mul(limit as usize);
    let rendered: Vec<_> = tweets
        .iter()
        .skip(start)
        .take(limit as usize)
        .map(|t| t.render(users))
        .collect();
    let pagination = Pagination::for_items(
        page,
        limit,
        u32::try_from(tweets.len()).unwrap_or(u32::MAX),
    );
    ok(json!({ "tweets": rendered, "pagination": pagination }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ApiService;

    fn post(path: &str, body: Value) -> HttpRequest {
        HttpRequest::builder(HttpMethod::Post, path)
            .service(ApiService::Auth)
            .body(body)
            .build()
            .unwrap()
    }

    fn get(path: &str) -> HttpRequest {
        HttpRequest::builder(HttpMethod::Get, path).build().unwrap()
    }

    fn demo_token(backend: &MockBackend) -> String {
        backend.tokens().issue_access(2, "demo@twitter.com").unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let backend = MockBackend::new();
        let response = backend.dispatch(&get("/health"), None).await.unwrap();
        assert_eq!(response.code, 200);
        assert_eq!(response.body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_login_rejects_unknown_email_and_empty_password() {
        let backend = MockBackend::new();

        let unknown = post("/auth/login", json!({"email": "x@y.z", "password": "p"}));
        assert_eq!(backend.dispatch(&unknown, None).await.unwrap().code, 401);

        let empty = post("/auth/login", json!({"email": "demo@twitter.com", "password": ""}));
        let response = backend.dispatch(&empty, None).await.unwrap();
        assert_eq!(response.code, 401);
        assert_eq!(response.upstream_message(), Some("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_resource_routes_require_valid_token() {
        let backend = MockBackend::new();
        let request = get("/api/v1/tweets");

        let missing = backend.dispatch(&request, None).await.unwrap();
        assert_eq!(missing.code, 401);
        assert_eq!(missing.upstream_message(), Some("Access token required"));

        let invalid = backend.dispatch(&request, Some("garbage")).await.unwrap();
        assert_eq!(invalid.code, 401);

        let expired = backend
            .tokens()
            .issue(2, "demo@twitter.com", chrono::Duration::minutes(-1))
            .unwrap();
        assert_eq!(backend.dispatch(&request, Some(&expired)).await.unwrap().code, 401);

        let valid = demo_token(&backend);
        assert_eq!(backend.dispatch(&request, Some(&valid)).await.unwrap().code, 200);
    }

    #[tokio::test]
    async fn test_refresh_issues_access_token_without_rotation() {
        let backend = MockBackend::new();
        let refresh = backend.tokens().issue_refresh(2, "demo@twitter.com").unwrap();

        let response = backend
            .dispatch(&post("/auth/refresh", json!({"refreshToken": refresh})), None)
            .await
            .unwrap();

        assert_eq!(response.code, 200);
        assert!(response.body["accessToken"].is_string());
        assert!(response.body.get("refreshToken").is_none());
    }

    #[tokio::test]
    async fn test_logout_revokes_refresh_token() {
        let backend = MockBackend::new();
        let refresh = backend.tokens().issue_refresh(2, "demo@twitter.com").unwrap();

        backend
            .dispatch(&post("/auth/logout", json!({"refreshToken": refresh})), None)
            .await
            .unwrap();
        let response = backend
            .dispatch(&post("/auth/refresh", json!({"refreshToken": refresh})), None)
            .await
            .unwrap();

        assert_eq!(response.code, 401);
        assert_eq!(response.upstream_message(), Some("Invalid refresh token"));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let backend = MockBackend::new();
        let body = json!({
            "name": "New Person",
            "username": "newperson",
            "email": "new@example.com",
            "password": "secret"
        });

        let created = backend.dispatch(&post("/auth/register", body.clone()), None).await.unwrap();
        assert_eq!(created.code, 201);
        assert_eq!(created.body["user"]["id"], 4);

        let duplicate = backend.dispatch(&post("/auth/register", body), None).await.unwrap();
        assert_eq!(duplicate.code, 400);
        assert_eq!(duplicate.upstream_message(), Some("User already exists"));
    }

    #[tokio::test]
    async fn test_create_tweet_prepends_and_validates() {
        let backend = MockBackend::new();
        let token = demo_token(&backend);

        let blank = HttpRequest::builder(HttpMethod::Post, "/api/v1/tweets")
            .body(json!({"text": "   "}))
            .build()
            .unwrap();
        assert_eq!(backend.dispatch(&blank, Some(&token)).await.unwrap().code, 400);

        let request = HttpRequest::builder(HttpMethod::Post, "/api/v1/tweets")
            .body(json!({"text": "  hello chirp  "}))
            .build()
            .unwrap();
        let created = backend.dispatch(&request, Some(&token)).await.unwrap();
        assert_eq!(created.code, 201);
        assert_eq!(created.body["text"], "hello chirp");
        assert_eq!(created.body["author"]["username"], "demouser");

        let list = backend.dispatch(&get("/api/v1/tweets"), Some(&token)).await.unwrap();
        assert_eq!(list.body["tweets"][0]["text"], "hello chirp");
        assert_eq!(list.body["pagination"]["totalItems"], 6);
    }

    #[tokio::test]
    async fn test_pagination_of_tweets() {
        let backend = MockBackend::new();
        let token = demo_token(&backend);
        let request = HttpRequest::builder(HttpMethod::Get, "/api/v1/timeline")
            .query_param("page", 2)
            .query_param("limit", 2)
            .build()
            .unwrap();

        let response = backend.dispatch(&request, Some(&token)).await.unwrap();

        assert_eq!(response.body["tweets"].as_array().unwrap().len(), 2);
        assert_eq!(response.body["pagination"]["totalPages"], 3);
        assert_eq!(response.body["pagination"]["hasMore"], true);
    }

    #[tokio::test]
    async fn test_search_requires_query_and_handles_types() {
        let backend = MockBackend::new();
        let token = demo_token(&backend);

        let missing = backend.dispatch(&get("/api/v1/search"), Some(&token)).await.unwrap();
        assert_eq!(missing.code, 400);

        let users = HttpRequest::builder(HttpMethod::Get, "/api/v1/search")
            .query_param("q", "DEMO")
            .query_param("type", "users")
            .build()
            .unwrap();
        let response = backend.dispatch(&users, Some(&token)).await.unwrap();
        assert_eq!(response.body["users"][0]["username"], "demouser");

        let other = HttpRequest::builder(HttpMethod::Get, "/api/v1/search")
            .query_param("q", "api")
            .query_param("type", "hashtags")
            .build()
            .unwrap();
        let response = backend.dispatch(&other, Some(&token)).await.unwrap();
        assert_eq!(response.body, json!({"tweets": [], "users": []}));
    }

    #[tokio::test]
    async fn test_follow_unknown_user_is_not_found() {
        let backend = MockBackend::new();
        let token = demo_token(&backend);
        let request = HttpRequest::builder(HttpMethod::Post, "/api/v1/follow/99")
            .body(json!({}))
            .build()
            .unwrap();

        let response = backend.dispatch(&request, Some(&token)).await.unwrap();
        assert_eq!(response.code, 404);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found_and_counted() {
        let backend = MockBackend::new();
        let response = backend.dispatch(&get("/nope"), None).await.unwrap();

        assert_eq!(response.code, 404);
        assert_eq!(backend.request_count("/nope"), 1);
        assert_eq!(backend.total_requests(), 1);
    }
}
