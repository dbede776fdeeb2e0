//! Integration tests for the networked transport.
//!
//! These tests verify URL routing per service, gateway header decoration,
//! bearer attachment, and that non-2xx statuses come back as responses.

use std::sync::Arc;

use chirp_sdk::api::{LoginRequest, SearchType};
use chirp_sdk::clients::{ApiService, HttpMethod, HttpRequest, HttpTransport, Transport};
use chirp_sdk::{ApiError, ApiKey, BaseUrl, ChirpClient, ClientConfig, GatewayConfig, TokenStore};
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORG: &str = "twitter-clone-org";
const VERSION: &str = "1.0";

fn gateway_config(server: &MockServer, api_key: Option<&str>) -> ClientConfig {
    let mut gateway = GatewayConfig::new(
        BaseUrl::new(format!("{}/apiman", server.uri())).unwrap(),
        ORG,
        VERSION,
    )
    .unwrap();
    if let Some(key) = api_key {
        gateway = gateway.with_api_key(ApiKey::new(key).unwrap());
    }
    ClientConfig::builder().gateway(gateway).build().unwrap()
}

fn direct_config(server: &MockServer) -> ClientConfig {
    ClientConfig::builder()
        .base_url(BaseUrl::new(server.uri()).unwrap())
        .user_agent_prefix("ChirpTests")
        .build()
        .unwrap()
}

// ============================================================================
// Gateway decoration
// ============================================================================

#[tokio::test]
async fn test_gateway_headers_present_on_resource_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/apiman-gateway/{ORG}/twitter-api/{VERSION}/api/v1/tweets")))
        .and(header("X-API-Key", "gateway-key"))
        .and(header("X-Apiman-Organization", ORG))
        .and(header("X-Apiman-Version", VERSION))
        .and(header("authorization", "Bearer token-1"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tweets": []})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&gateway_config(&server, Some("gateway-key"))).unwrap();
    let request = HttpRequest::builder(HttpMethod::Get, "/api/v1/tweets")
        .query_param("page", 2)
        .build()
        .unwrap();

    let response = transport.dispatch(&request, Some("token-1")).await.unwrap();

    assert!(response.is_ok());
    server.verify().await;
}

#[tokio::test]
async fn test_gateway_routes_auth_calls_to_auth_service() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/apiman-gateway/{ORG}/twitter-auth/{VERSION}/auth/login")))
        .and(header("X-Apiman-Organization", ORG))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"email": "demo@twitter.com", "password": "demo123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "a1",
            "refreshToken": "r1",
            "user": {
                "id": 2,
                "name": "Demo User",
                "username": "demouser",
                "email": "demo@twitter.com",
                "followers": 1000,
                "following": 500
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChirpClient::http(gateway_config(&server, None), TokenStore::in_memory()).unwrap();

    let tokens = client
        .login(&LoginRequest::new("demo@twitter.com", "demo123"))
        .await
        .unwrap();

    assert_eq!(tokens.user.unwrap().username, "demouser");
    assert_eq!(client.token_store().access_token().as_deref(), Some("a1"));
    server.verify().await;
}

#[tokio::test]
async fn test_api_key_header_omitted_without_key() {
    let server = MockServer::start().await;
    let transport = HttpTransport::new(&gateway_config(&server, None)).unwrap();

    assert!(!transport.default_headers().contains_key("X-API-Key"));
    assert_eq!(
        transport.default_headers().get("X-Apiman-Version").map(String::as_str),
        Some(VERSION)
    );
}

#[tokio::test]
async fn test_check_gateway_uses_management_status_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/apiman/system/status"))
        .and(header("X-Apiman-Organization", ORG))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"up": true})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&gateway_config(&server, Some("k"))).unwrap();

    assert!(transport.check_gateway().await);
    server.verify().await;
}

#[tokio::test]
async fn test_check_gateway_false_when_status_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/apiman/system/status"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&gateway_config(&server, Some("k"))).unwrap();
    assert!(!transport.check_gateway().await);

    let direct = HttpTransport::new(&direct_config(&server)).unwrap();
    assert!(!direct.check_gateway().await);
}

// ============================================================================
// Direct routing and responses
// ============================================================================

#[tokio::test]
async fn test_direct_requests_carry_user_agent_and_no_bearer_when_anonymous() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header_regex("user-agent", r"^ChirpTests \| Chirp SDK v\d+\.\d+\.\d+"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(400))
        .expect(0)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&direct_config(&server)).unwrap();
    let request = HttpRequest::builder(HttpMethod::Get, "/health").build().unwrap();

    let response = transport.dispatch(&request, None).await.unwrap();

    assert_eq!(response.body["status"], "healthy");
    server.verify().await;
}

#[tokio::test]
async fn test_non_2xx_statuses_are_responses() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("X-Request-Id", "req-7")
                .set_body_json(json!({"error": "User already exists"})),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&direct_config(&server)).unwrap();
    let request = HttpRequest::builder(HttpMethod::Post, "/auth/register")
        .service(ApiService::Auth)
        .body(json!({"email": "demo@twitter.com"}))
        .build()
        .unwrap();

    let response = transport.dispatch(&request, None).await.unwrap();

    assert_eq!(response.code, 400);
    assert_eq!(response.upstream_message(), Some("User already exists"));
    assert_eq!(response.header("x-request-id"), Some("req-7"));
}

#[tokio::test]
async fn test_login_without_service_message_reports_generic_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = ChirpClient::http(direct_config(&server), TokenStore::in_memory()).unwrap();

    let error = client
        .login(&LoginRequest::new("demo@twitter.com", "demo123"))
        .await
        .unwrap_err();

    assert!(matches!(&error, ApiError::AuthFailed { code: 502, message } if message == "Login failed"));
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_search_query_parameters_and_unknown_type() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .and(query_param("q", "rust"))
        .and(query_param("type", "users"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"users": []})))
        .expect(1)
        .mount(&server)
        .await;

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&direct_config(&server)).unwrap());
    let client = ChirpClient::new(direct_config(&server), transport, TokenStore::in_memory());

    let users = client.search("rust", SearchType::Users, 1, 5).await.unwrap();
    assert!(users.is_empty());

    let other = client
        .search("rust", SearchType::Other("hashtags".to_string()), 1, 5)
        .await
        .unwrap();
    assert!(other.is_empty());

    server.verify().await;
}

#[tokio::test]
async fn test_rejections_without_message_report_operation_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/tweets"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "Index offline"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChirpClient::http(direct_config(&server), TokenStore::in_memory()).unwrap();

    let tweets = client.tweets(1, 20).await.unwrap_err();
    assert_eq!(tweets.status(), Some(500));
    assert!(tweets.to_string().ends_with("Failed to fetch tweets"));

    let search = client
        .search("rust", SearchType::Tweets, 1, 20)
        .await
        .unwrap_err();
    assert!(search.to_string().ends_with("Index offline"));
    server.verify().await;
}
