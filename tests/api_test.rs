mod common;

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use common::{create_test_app_state, test_config, CLIENT_URL};
use serde_json::{json, Value};
use taxdesk_rs::config::AppConfig;
use taxdesk_rs::create_app;

async fn server_with(config: AppConfig) -> TestServer {
    let app = create_app(create_test_app_state(config))
        .await
        .expect("Failed to create app");
    TestServer::new(app).expect("Failed to create test server")
}

async fn server() -> TestServer {
    server_with(test_config()).await
}

#[tokio::test]
async fn test_root_and_status_endpoints() {
    let server = server().await;

    let root = server.get("/").await;
    assert_eq!(root.status_code(), StatusCode::OK);
    assert!(root.text().contains("TaxDesk"));

    let status = server.get("/api/status").await;
    assert_eq!(status.status_code(), StatusCode::OK);
    assert_eq!(status.text(), "API is running");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let server = server().await;
    let response = server.get("/api/does-not-exist").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_protected_routes_require_auth() {
    let server = server().await;

    for path in [
        "/api/auth/profile",
        "/api/services",
        "/api/bills",
        "/api/admin/stats",
        "/api/admin/services",
        "/api/admin/users",
        "/api/admin/users/stats",
    ] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED, "GET {path}");
    }

    let submit = server
        .post("/api/services/itr")
        .json(&json!({ "pan": "ABCDE1234F", "assessment_year": "2024-25" }))
        .await;
    assert_eq!(submit.status_code(), StatusCode::UNAUTHORIZED);

    let testimonial = server
        .post("/api/testimonials")
        .json(&json!({ "message": "Great service", "rating": 5 }))
        .await;
    assert_eq!(testimonial.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_error_body_shape() {
    let server = server().await;

    let response = server.get("/api/auth/profile").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let body: Value = response.json();
    assert_eq!(body["status"], 401);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_malformed_tokens_are_rejected() {
    let server = server().await;

    let not_bearer = server
        .get("/api/auth/profile")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"))
        .await;
    assert_eq!(not_bearer.status_code(), StatusCode::UNAUTHORIZED);

    let garbage = server
        .get("/api/auth/profile")
        .authorization_bearer("not-a-jwt")
        .await;
    assert_eq!(garbage.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation() {
    let server = server().await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "name": "A",
            "email": "invalid-email",
            "password": "123"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_with_invalid_payload() {
    let server = server().await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": "not-an-email", "password": "" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let missing_fields = server.post("/api/auth/login").json(&json!({})).await;
    assert!(missing_fields.status_code().is_client_error());
}

#[tokio::test]
async fn test_otp_endpoints_validate_input() {
    let server = server().await;

    let short_code = server
        .post("/api/auth/verify-otp")
        .json(&json!({ "email": "user@example.com", "otp": "123" }))
        .await;
    assert_eq!(short_code.status_code(), StatusCode::BAD_REQUEST);

    let bad_reset = server
        .post("/api/auth/reset-password")
        .json(&json!({ "email": "user@example.com", "otp": "123456", "new_password": "x" }))
        .await;
    assert_eq!(bad_reset.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_otp_is_rejected() {
    let server = server().await;

    // No code was ever issued for this address, so the store rejects it before any lookup.
    let response = server
        .post("/api/auth/verify-otp")
        .json(&json!({ "email": "nobody@example.com", "otp": "123456" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_contact_forms_validate_input() {
    let server = server().await;

    let suggestion = server
        .post("/api/contact/suggestions")
        .json(&json!({ "name": "Asha", "email": "asha@example.com", "message": "hi" }))
        .await;
    assert_eq!(suggestion.status_code(), StatusCode::BAD_REQUEST);

    let contact = server
        .post("/api/contact/others")
        .json(&json!({
            "name": "Asha",
            "email": "not-an-email",
            "subject": "Company registration",
            "message": "Please call me back"
        }))
        .await;
    assert_eq!(contact.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_service_type_is_bad_request() {
    let server = server().await;

    let pricing = server.get("/api/pricing/astrology").await;
    assert_eq!(pricing.status_code(), StatusCode::BAD_REQUEST);

    let submit = server.post("/api/services/astrology").json(&json!({})).await;
    assert_eq!(submit.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_google_sign_in_disabled_without_credentials() {
    let server = server().await;

    let response = server.get("/api/auth/google").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_google_sign_in_redirects_to_consent_screen() {
    let mut config = test_config();
    config.google.client_id = "client-123".to_string();
    config.google.client_secret = "secret".to_string();
    let server = server_with(config).await;

    let response = server.get("/api/auth/google").await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

    let location = response.header("location");
    let location = location.to_str().expect("location header");
    assert!(location.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
    assert!(location.contains("client_id=client-123"));
    assert!(location.contains("state="));
}

#[tokio::test]
async fn test_google_callback_failures_redirect_to_login() {
    let server = server().await;

    let denied = server
        .get("/api/auth/google/callback")
        .add_query_param("error", "access_denied")
        .await;
    assert_eq!(denied.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(
        denied.header("location").to_str().expect("location header"),
        format!("{CLIENT_URL}/login?error=google_signin_failed")
    );

    let forged_state = server
        .get("/api/auth/google/callback")
        .add_query_param("code", "abc")
        .add_query_param("state", "never-issued")
        .await;
    assert_eq!(forged_state.status_code(), StatusCode::SEE_OTHER);
    assert!(forged_state
        .header("location")
        .to_str()
        .expect("location header")
        .ends_with("/login?error=google_signin_failed"));
}

#[test]
fn test_database_name_rewrite() {
    use common::with_database_name;

    assert_eq!(
        with_database_name("postgres://u:p@localhost:5432/taxdesk", "scratch").as_deref(),
        Some("postgres://u:p@localhost:5432/scratch")
    );
    assert_eq!(
        with_database_name("postgres://localhost/taxdesk?sslmode=disable", "scratch").as_deref(),
        Some("postgres://localhost/scratch?sslmode=disable")
    );
    assert_eq!(
        with_database_name("postgres://localhost:5432", "scratch").as_deref(),
        Some("postgres://localhost:5432/scratch")
    );
    assert!(with_database_name("not a url", "scratch").is_none());
}
