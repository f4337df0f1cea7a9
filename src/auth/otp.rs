//! Short-lived email one-time passwords.
//!
//! Codes live in process memory keyed by (email, purpose). Only a SHA-256
//! digest of each code is kept. Entries leave the map on successful
//! verification, on expiry, or when the background sweeper finds them
//! expired. An entry that ran out of attempts stays behind, locked, so the
//! resend cooldown still applies to it.

use crate::config::AuthConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    EmailVerification,
    PasswordReset,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("No pending code for this email")]
    NotFound,
    #[error("Code has expired")]
    Expired,
    #[error("Incorrect code, {remaining_attempts} attempts left")]
    Invalid { remaining_attempts: u32 },
    #[error("Too many incorrect attempts, request a new code")]
    TooManyAttempts,
    #[error("Please wait {0} seconds before requesting a new code")]
    Cooldown(u64),
}

#[derive(Debug)]
struct OtpEntry {
    code_digest: Vec<u8>,
    issued_at: Instant,
    expires_at: Instant,
    attempts: u32,
    locked_at: Option<Instant>,
}

type OtpKey = (String, OtpPurpose);

#[derive(Clone)]
pub struct OtpStore {
    entries: Arc<RwLock<HashMap<OtpKey, OtpEntry>>>,
    ttl: Duration,
    max_attempts: u32,
    resend_cooldown: Duration,
}

impl OtpStore {
    pub fn new(ttl: Duration, max_attempts: u32, resend_cooldown: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            max_attempts: max_attempts.max(1),
            resend_cooldown,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            Duration::from_secs(config.otp_ttl_seconds),
            config.otp_max_attempts,
            Duration::from_secs(config.otp_resend_cooldown_seconds),
        )
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generates a fresh 6-digit code, replacing any previous one for the same key.
    pub async fn issue(&self, email: &str, purpose: OtpPurpose) -> Result<String, OtpError> {
        let key = (normalize_email(email), purpose);
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries.get(&key) {
            let cooldown_ends = existing.locked_at.unwrap_or(existing.issued_at) + self.resend_cooldown;
            if now < cooldown_ends {
                let wait = (cooldown_ends - now).as_secs_f64().ceil() as u64;
                return Err(OtpError::Cooldown(wait.max(1)));
            }
        }

        let code = generate_code();
        entries.insert(
            key,
            OtpEntry {
                code_digest: digest(&code),
                issued_at: now,
                expires_at: now + self.ttl,
                attempts: 0,
                locked_at: None,
            },
        );
        debug!("Issued {:?} code for {}", purpose, email);

        Ok(code)
    }

    pub async fn verify(&self, email: &str, purpose: OtpPurpose, code: &str) -> Result<(), OtpError> {
        let key = (normalize_email(email), purpose);
        let mut entries = self.entries.write().await;

        let entry = entries.get_mut(&key).ok_or(OtpError::NotFound)?;

        let now = Instant::now();
        if now >= entry.expires_at {
            entries.remove(&key);
            return Err(OtpError::Expired);
        }

        if entry.locked_at.is_some() {
            return Err(OtpError::TooManyAttempts);
        }

        if entry.code_digest == digest(code.trim()) {
            entries.remove(&key);
            return Ok(());
        }

        entry.attempts += 1;
        if entry.attempts >= self.max_attempts {
            entry.locked_at = Some(now);
            return Err(OtpError::TooManyAttempts);
        }

        Err(OtpError::Invalid {
            remaining_attempts: self.max_attempts - entry.attempts,
        })
    }

    /// Drops every expired entry and returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let removed = store.sweep_expired().await;
                if removed > 0 {
                    info!("Evicted {} expired one-time passwords", removed);
                }
            }
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn digest(code: &str) -> Vec<u8> {
    Sha256::digest(code.as_bytes()).to_vec()
}

fn generate_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{:06}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> OtpStore {
        OtpStore::new(Duration::from_secs(600), 3, Duration::from_secs(30))
    }

    #[tokio::test(start_paused = true)]
    async fn test_issue_and_verify() {
        let store = store();
        let code = store.issue("User@Example.com", OtpPurpose::EmailVerification).await.unwrap();

        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));

        store
            .verify("user@example.com ", OtpPurpose::EmailVerification, &code)
            .await
            .unwrap();

        // Single use
        assert_eq!(
            store.verify("user@example.com", OtpPurpose::EmailVerification, &code).await,
            Err(OtpError::NotFound)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_purposes_are_separate() {
        let store = store();
        let code = store.issue("a@example.com", OtpPurpose::PasswordReset).await.unwrap();

        assert_eq!(
            store.verify("a@example.com", OtpPurpose::EmailVerification, &code).await,
            Err(OtpError::NotFound)
        );
        assert!(store.verify("a@example.com", OtpPurpose::PasswordReset, &code).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_code_is_removed() {
        let store = store();
        let code = store.issue("a@example.com", OtpPurpose::EmailVerification).await.unwrap();

        tokio::time::advance(Duration::from_secs(601)).await;

        assert_eq!(
            store.verify("a@example.com", OtpPurpose::EmailVerification, &code).await,
            Err(OtpError::Expired)
        );
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_limit() {
        let store = store();
        let code = store.issue("a@example.com", OtpPurpose::EmailVerification).await.unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        assert_eq!(
            store.verify("a@example.com", OtpPurpose::EmailVerification, wrong).await,
            Err(OtpError::Invalid { remaining_attempts: 2 })
        );
        assert_eq!(
            store.verify("a@example.com", OtpPurpose::EmailVerification, wrong).await,
            Err(OtpError::Invalid { remaining_attempts: 1 })
        );
        assert_eq!(
            store.verify("a@example.com", OtpPurpose::EmailVerification, wrong).await,
            Err(OtpError::TooManyAttempts)
        );

        // The right code no longer works once the entry is locked
        assert_eq!(
            store.verify("a@example.com", OtpPurpose::EmailVerification, &code).await,
            Err(OtpError::TooManyAttempts)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_locked_entry_keeps_resend_cooldown() {
        let store = store();
        let code = store.issue("a@example.com", OtpPurpose::PasswordReset).await.unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        tokio::time::advance(Duration::from_secs(40)).await;
        for _ in 0..3 {
            assert!(store.verify("a@example.com", OtpPurpose::PasswordReset, wrong).await.is_err());
        }

        // Cooldown restarts from the lock, not from the original issue
        assert_eq!(
            store.issue("a@example.com", OtpPurpose::PasswordReset).await,
            Err(OtpError::Cooldown(30))
        );

        tokio::time::advance(Duration::from_secs(30)).await;
        let fresh = store.issue("a@example.com", OtpPurpose::PasswordReset).await.unwrap();
        assert!(store.verify("a@example.com", OtpPurpose::PasswordReset, &fresh).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resend_cooldown() {
        let store = store();
        store.issue("a@example.com", OtpPurpose::EmailVerification).await.unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(
            store.issue("a@example.com", OtpPurpose::EmailVerification).await,
            Err(OtpError::Cooldown(20))
        );

        tokio::time::advance(Duration::from_secs(20)).await;
        let fresh = store.issue("a@example.com", OtpPurpose::EmailVerification).await.unwrap();
        assert!(store.verify("a@example.com", OtpPurpose::EmailVerification, &fresh).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expired() {
        let store = store();
        store.issue("old@example.com", OtpPurpose::EmailVerification).await.unwrap();
        tokio::time::advance(Duration::from_secs(300)).await;
        store.issue("new@example.com", OtpPurpose::EmailVerification).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;

        assert_eq!(store.sweep_expired().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweeper_evicts() {
        let store = store();
        store.issue("a@example.com", OtpPurpose::PasswordReset).await.unwrap();
        let handle = store.spawn_sweeper(Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(660)).await;
        assert!(store.is_empty().await);

        handle.abort();
    }
}
