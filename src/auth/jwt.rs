use crate::auth::claims::TokenClaims;
use crate::config::AuthConfig;
use crate::models::User;
use anyhow::Result;
use chrono::Duration;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expires_in: Duration,
}

impl JwtService {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let secret = config.jwt_secret.as_bytes();

        let expires_in = Self::parse_duration(&config.jwt_expires_in)?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::default(),
            expires_in,
        })
    }

    pub fn encode_token(&self, claims: &TokenClaims) -> Result<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode JWT: {}", e))
    }

    pub fn decode_token(&self, token: &str) -> Result<TokenClaims> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| anyhow::anyhow!("Failed to decode JWT: {}", e))
    }

    pub fn create_token_for_user(&self, user: &User) -> Result<String> {
        self.encode_token(&TokenClaims::for_user(user, self.expires_in))
    }

    /// Parses `JWT_EXPIRES_IN` values such as `7d`, `24h`, `60m` or `30s`.
    /// A bare number is taken as hours.
    pub fn parse_duration(duration_str: &str) -> Result<Duration> {
        let value = duration_str.trim();
        let (amount, unit) = match value.char_indices().last() {
            Some((idx, unit)) if unit.is_ascii_alphabetic() => (&value[..idx], unit),
            _ => (value, 'h'),
        };
        let amount: i64 = amount.parse()?;

        match unit {
            'd' => Ok(Duration::days(amount)),
            'h' => Ok(Duration::hours(amount)),
            'm' => Ok(Duration::minutes(amount)),
            's' => Ok(Duration::seconds(amount)),
            other => Err(anyhow::anyhow!("Unknown duration unit '{}' in {}", other, duration_str)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use uuid::Uuid;

    fn auth_config(expires_in: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: "unit-test-secret".to_string(),
            jwt_expires_in: expires_in.to_string(),
            otp_ttl_seconds: 600,
            otp_max_attempts: 5,
            otp_resend_cooldown_seconds: 30,
        }
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Meera".to_string(),
            email: "meera@example.com".to_string(),
            phone: None,
            password_hash: None,
            google_id: None,
            role: UserRole::Admin,
            active: true,
            email_verified: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(JwtService::parse_duration("24h").unwrap(), Duration::hours(24));
        assert_eq!(JwtService::parse_duration("7d").unwrap(), Duration::days(7));
        assert_eq!(JwtService::parse_duration("60m").unwrap(), Duration::minutes(60));
        assert_eq!(JwtService::parse_duration("30s").unwrap(), Duration::seconds(30));
        assert_eq!(JwtService::parse_duration("2").unwrap(), Duration::hours(2));
        assert!(JwtService::parse_duration("soon").is_err());
        assert!(JwtService::parse_duration("3w").is_err());
    }

    #[test]
    fn test_token_carries_user_identity() {
        let service = JwtService::new(&auth_config("1h")).unwrap();
        let user = user();

        let token = service.create_token_for_user(&user).unwrap();
        let claims = service.decode_token(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "meera@example.com");
        assert_eq!(claims.role, UserRole::Admin);
        assert!(!claims.is_expired());

        let expires_at = claims.expires_at().unwrap();
        let remaining = expires_at - chrono::Utc::now();
        assert!(remaining <= Duration::hours(1));
        assert!(remaining > Duration::minutes(59));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let service = JwtService::new(&auth_config("1h")).unwrap();
        let mut other_config = auth_config("1h");
        other_config.jwt_secret = "another-secret".to_string();
        let other = JwtService::new(&other_config).unwrap();

        let token = other.create_token_for_user(&user()).unwrap();
        assert!(service.decode_token(&token).is_err());
    }
}
