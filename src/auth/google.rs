use crate::config::GoogleConfig;
use anyhow::{anyhow, Context, Result};
use rand::{distr::Alphanumeric, Rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

const STATE_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub id_token: Option<String>,
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleProfile {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Google OAuth 2.0 authorization-code flow.
#[derive(Clone)]
pub struct GoogleOAuthService {
    client: Client,
    config: GoogleConfig,
    pending_states: Arc<RwLock<HashMap<String, Instant>>>,
}

impl GoogleOAuthService {
    pub fn new(config: GoogleConfig) -> Self {
        let client = Client::builder()
            .user_agent("taxdesk-rs/0.1")
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config, pending_states: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.client_id.is_empty() && !self.config.client_secret.is_empty()
    }

    /// Consent screen URL with a fresh single-use `state` value.
    pub async fn authorization_url(&self) -> String {
        let state: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        {
            let mut states = self.pending_states.write().await;
            let now = Instant::now();
            states.retain(|_, issued| now.duration_since(*issued) < STATE_TTL);
            states.insert(state.clone(), now);
        }

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&access_type=online&prompt=select_account",
            self.config.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_url),
            urlencoding::encode("openid email profile"),
            state
        )
    }

    /// Returns true once per issued state, and only before it expires.
    pub async fn consume_state(&self, state: &str) -> bool {
        let mut states = self.pending_states.write().await;
        match states.remove(state) {
            Some(issued) => Instant::now().duration_since(issued) < STATE_TTL,
            None => {
                warn!("Unknown or reused OAuth state");
                false
            }
        }
    }

    pub async fn exchange_code(&self, code: &str) -> Result<GoogleTokenResponse> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .context("Google token request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Google token exchange returned {}: {}", status, body));
        }

        let token = response
            .json::<GoogleTokenResponse>()
            .await
            .context("Failed to parse Google token response")?;
        debug!("Exchanged Google authorization code");

        Ok(token)
    }

    pub async fn fetch_profile(&self, access_token: &str) -> Result<GoogleProfile> {
        let response = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .context("Google userinfo request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("Google userinfo returned {}", response.status()));
        }

        let profile = response
            .json::<GoogleProfile>()
            .await
            .context("Failed to parse Google profile")?;

        Ok(profile)
    }
}
