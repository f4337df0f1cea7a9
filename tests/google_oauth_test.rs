use httpmock::prelude::*;
use serde_json::json;
use taxdesk_rs::auth::google::GoogleOAuthService;
use taxdesk_rs::config::GoogleConfig;

fn service_for(server: &MockServer) -> GoogleOAuthService {
    GoogleOAuthService::new(GoogleConfig {
        client_id: "client-123".to_string(),
        client_secret: "shh".to_string(),
        redirect_url: "http://localhost:5000/api/auth/google/callback".to_string(),
        auth_url: server.url("/o/oauth2/v2/auth"),
        token_url: server.url("/token"),
        userinfo_url: server.url("/v1/userinfo"),
    })
}

#[tokio::test]
async fn test_exchange_code_and_fetch_profile() {
    let server = MockServer::start_async().await;

    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/token")
                .body_includes("code=auth-code-1")
                .body_includes("grant_type=authorization_code")
                .body_includes("client_id=client-123");
            then.status(200).json_body(json!({
                "access_token": "ya29.access",
                "expires_in": 3599,
                "token_type": "Bearer"
            }));
        })
        .await;

    let profile_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/userinfo")
                .header("authorization", "Bearer ya29.access");
            then.status(200).json_body(json!({
                "sub": "1093847561",
                "email": "priya@example.com",
                "email_verified": true,
                "name": "Priya Sharma"
            }));
        })
        .await;

    let service = service_for(&server);
    let token = service.exchange_code("auth-code-1").await.expect("token exchange");
    assert_eq!(token.access_token, "ya29.access");

    let profile = service.fetch_profile(&token.access_token).await.expect("profile");
    assert_eq!(profile.sub, "1093847561");
    assert_eq!(profile.email, "priya@example.com");
    assert!(profile.email_verified);
    assert_eq!(profile.name.as_deref(), Some("Priya Sharma"));
    assert!(profile.picture.is_none());

    token_mock.assert_async().await;
    profile_mock.assert_async().await;
}

#[tokio::test]
async fn test_rejected_code_is_an_error() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/token");
            then.status(400).json_body(json!({ "error": "invalid_grant" }));
        })
        .await;

    let service = service_for(&server);
    let err = service.exchange_code("stale").await.expect_err("invalid grant");
    assert!(err.to_string().contains("400"));
}

#[tokio::test]
async fn test_expired_access_token_fails_profile_fetch() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/userinfo");
            then.status(401);
        })
        .await;

    let service = service_for(&server);
    assert!(service.fetch_profile("expired").await.is_err());
}
