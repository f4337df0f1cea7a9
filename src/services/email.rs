use crate::config::EmailConfig;
use crate::models::{bill::format_amount, Bill, OthersContact, ServiceRequest, Suggestion, User};
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn otp(to: &str, name: &str, code: &str, valid_minutes: u64) -> Self {
        Self {
            to: to.to_string(),
            subject: "Your verification code".to_string(),
            body: format!(
                "Hello {name},\n\nYour verification code is {code}. It is valid for {valid_minutes} minutes.\n\nIf you did not sign up, you can ignore this email."
            ),
        }
    }

    pub fn password_reset(to: &str, name: &str, code: &str, valid_minutes: u64) -> Self {
        Self {
            to: to.to_string(),
            subject: "Password reset code".to_string(),
            body: format!(
                "Hello {name},\n\nUse the code {code} to reset your password. It is valid for {valid_minutes} minutes.\n\nIf you did not request a reset, no action is needed."
            ),
        }
    }

    pub fn request_received(user: &User, request: &ServiceRequest) -> Self {
        Self {
            to: user.email.clone(),
            subject: format!("{} request received", request.service_type),
            body: format!(
                "Hello {},\n\nWe have received your {} request (reference {}). Our team will review it and get back to you shortly.",
                user.name, request.service_type, request.id
            ),
        }
    }

    pub fn new_request_for_admin(admin: &str, user: &User, request: &ServiceRequest) -> Self {
        Self {
            to: admin.to_string(),
            subject: format!("New {} request from {}", request.service_type, user.name),
            body: format!(
                "A new {} request was submitted.\n\nClient: {} <{}>\nReference: {}\nQuoted amount: Rs. {}",
                request.service_type,
                user.name,
                user.email,
                request.id,
                format_amount(request.quoted_amount)
            ),
        }
    }

    pub fn status_update(user: &User, request: &ServiceRequest) -> Self {
        let remarks = request
            .remarks
            .as_deref()
            .map(|r| format!("\n\nRemarks: {r}"))
            .unwrap_or_default();

        Self {
            to: user.email.clone(),
            subject: format!("Your {} request is now {}", request.service_type, request.status),
            body: format!(
                "Hello {},\n\nThe status of your {} request (reference {}) changed to {}.{}",
                user.name, request.service_type, request.id, request.status, remarks
            ),
        }
    }

    pub fn payment_receipt(user: &User, bill: &Bill) -> Self {
        Self {
            to: user.email.clone(),
            subject: "Payment received".to_string(),
            body: format!(
                "Hello {},\n\nWe received your payment of {} {} for \"{}\".\nPayment ID: {}\nBill: {}",
                user.name,
                bill.currency,
                format_amount(bill.amount),
                bill.description,
                bill.razorpay_payment_id.as_deref().unwrap_or("-"),
                bill.id
            ),
        }
    }

    pub fn contact_for_admin(admin: &str, contact: &OthersContact) -> Self {
        Self {
            to: admin.to_string(),
            subject: format!("Contact request: {}", contact.subject),
            body: format!(
                "From: {} <{}>\nPhone: {}\n\n{}",
                contact.name,
                contact.email,
                contact.phone.as_deref().unwrap_or("-"),
                contact.message
            ),
        }
    }

    pub fn suggestion_for_admin(admin: &str, suggestion: &Suggestion) -> Self {
        Self {
            to: admin.to_string(),
            subject: format!("New suggestion from {}", suggestion.name),
            body: format!("From: {} <{}>\n\n{}", suggestion.name, suggestion.email, suggestion.message),
        }
    }
}

/// SendGrid v3 mail client.
pub struct EmailService {
    client: Client,
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        let client = Client::builder()
            .user_agent("taxdesk-rs/0.1")
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        if config.sendgrid_api_key.is_empty() {
            warn!("SENDGRID_API_KEY not set, emails will only be logged");
        }

        Self { client, config }
    }

    pub fn admin_address(&self) -> &str {
        &self.config.admin_address
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.sendgrid_api_key.is_empty()
    }

    pub fn payload(&self, message: &EmailMessage) -> serde_json::Value {
        json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.config.from_address, "name": self.config.from_name },
            "subject": message.subject,
            "content": [{ "type": "text/plain", "value": message.body }]
        })
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<()> {
        if !self.is_enabled() {
            info!("Email (not delivered) to {}: {}\n{}", message.to, message.subject, message.body);
            return Ok(());
        }

        let url = format!("{}/v3/mail/send", self.config.api_base.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&self.payload(message))
            .send()
            .await
            .context("SendGrid request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("SendGrid returned {}: {}", status, body));
        }

        info!("Email sent to {}: {}", message.to, message.subject);
        Ok(())
    }

    /// Sends a notification whose failure must not fail the surrounding request.
    pub async fn notify(&self, message: EmailMessage) {
        if let Err(e) = self.send(&message).await {
            error!("Failed to send '{}' to {}: {:?}", message.subject, message.to, e);
        }
    }
}
