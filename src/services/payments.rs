use crate::config::PaymentConfig;
use anyhow::{anyhow, Context, Result};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: &'a HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
}

/// Razorpay Orders API client and checkout signature verification.
pub struct RazorpayClient {
    client: Client,
    config: PaymentConfig,
}

impl RazorpayClient {
    pub fn new(config: PaymentConfig) -> Self {
        let client = Client::builder()
            .user_agent("taxdesk-rs/0.1")
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .unwrap_or_else(|_| Client::new());

        if config.razorpay_key_id.is_empty() || config.razorpay_key_secret.is_empty() {
            warn!("Razorpay credentials not set, payment endpoints will fail");
        }

        Self { client, config }
    }

    /// Public key id handed to the checkout widget.
    pub fn key_id(&self) -> &str {
        &self.config.razorpay_key_id
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    /// Creates an order for `amount` paise.
    pub async fn create_order(
        &self,
        amount: i64,
        receipt: &str,
        notes: &HashMap<String, String>,
    ) -> Result<RazorpayOrder> {
        if amount <= 0 {
            return Err(anyhow!("Order amount must be positive"));
        }

        let url = format!("{}/v1/orders", self.config.api_base.trim_end_matches('/'));
        let body = CreateOrderBody { amount, currency: &self.config.currency, receipt, notes };

        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.razorpay_key_id, Some(&self.config.razorpay_key_secret))
            .json(&body)
            .send()
            .await
            .context("Razorpay order request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Razorpay returned {}: {}", status, body));
        }

        let order = response
            .json::<RazorpayOrder>()
            .await
            .context("Failed to parse Razorpay order")?;

        info!("Created Razorpay order {} for {} paise", order.id, order.amount);
        Ok(order)
    }

    /// Checks the `razorpay_signature` returned by checkout: hex HMAC-SHA256 of
    /// `order_id|payment_id` keyed with the account secret.
    pub fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature.trim()) else {
            debug!("Payment signature is not hex");
            return false;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(self.config.razorpay_key_secret.as_bytes()) else {
            return false;
        };
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());

        mac.verify_slice(&expected).is_ok()
    }

    /// Signature Razorpay would produce for this order/payment pair.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.config.razorpay_key_secret.as_bytes())
            .map_err(|e| anyhow!("Invalid Razorpay secret: {}", e))?;
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}
