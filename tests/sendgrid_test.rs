use httpmock::prelude::*;
use taxdesk_rs::config::EmailConfig;
use taxdesk_rs::services::email::{EmailMessage, EmailService};

fn service_for(server: &MockServer) -> EmailService {
    EmailService::new(EmailConfig {
        sendgrid_api_key: "SG.test-key".to_string(),
        api_base: server.base_url(),
        from_address: "desk@example.com".to_string(),
        from_name: "TaxDesk".to_string(),
        admin_address: "admin@example.com".to_string(),
    })
}

#[tokio::test]
async fn test_send_posts_to_sendgrid() {
    let server = MockServer::start_async().await;

    let mail_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v3/mail/send")
                .header("authorization", "Bearer SG.test-key")
                .body_includes("client@example.com")
                .body_includes("Your verification code");
            then.status(202);
        })
        .await;

    let service = service_for(&server);
    assert!(service.is_enabled());

    let message = EmailMessage::otp("client@example.com", "Ravi", "042917", 10);
    service.send(&message).await.expect("email should be accepted");

    mail_mock.assert_async().await;
}

#[tokio::test]
async fn test_send_reports_rejection() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/v3/mail/send");
            then.status(400).body("{\"errors\":[{\"message\":\"invalid from address\"}]}");
        })
        .await;

    let service = service_for(&server);
    let message = EmailMessage::password_reset("client@example.com", "Ravi", "123456", 10);

    let err = service.send(&message).await.expect_err("rejection should fail");
    assert!(err.to_string().contains("400"));
}

#[tokio::test]
async fn test_notify_swallows_failures() {
    let server = MockServer::start_async().await;

    let mail_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v3/mail/send");
            then.status(500);
        })
        .await;

    let service = service_for(&server);
    service
        .notify(EmailMessage::otp("client@example.com", "Ravi", "000111", 10))
        .await;

    mail_mock.assert_async().await;
}
