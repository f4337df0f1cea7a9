use crate::auth::{claims::TokenClaims, errors::AuthError, google::GoogleOAuthService, jwt::JwtService, otp::OtpStore};
use crate::config::AppConfig;
use crate::database::Database;
use crate::models::user::User;
use crate::repositories::user_repository::UserRepository;
use crate::services::{email::EmailService, payments::RazorpayClient};
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Shared by every handler. Cloned per request, so heavy members sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub jwt_service: JwtService,
    pub otp_store: OtpStore,
    pub google_oauth: GoogleOAuthService,
    pub email_service: Arc<EmailService>,
    pub payments: Arc<RazorpayClient>,
    pub config: AppConfig,
    pub startup_time: Instant,
}

/// A signed-in, active, verified account, reloaded from the database on every request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub claims: TokenClaims,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        authenticate(state, token).await
    }
}

#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_user = AuthenticatedUser::from_request_parts(parts, state).await?;

        // The stored role wins over the one baked into the token
        if !auth_user.user.is_admin() {
            warn!("{} attempted to access an admin endpoint", auth_user.user.email);
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(AdminUser(auth_user))
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

async fn authenticate(state: &AppState, token: &str) -> Result<AuthenticatedUser, AuthError> {
    let claims = state.jwt_service.decode_token(token).map_err(|e| {
        debug!("Rejected bearer token: {:?}", e);
        AuthError::InvalidToken(e.to_string())
    })?;

    if claims.is_expired() {
        return Err(AuthError::TokenExpired);
    }

    let user = UserRepository::new(state.database.pool().clone())
        .get_user(claims.sub)
        .await
        .map_err(|e| {
            error!("Database error while loading user {}: {:?}", claims.sub, e);
            AuthError::DatabaseError(e.to_string())
        })?
        .ok_or_else(|| {
            warn!("Token for deleted user {}", claims.sub);
            AuthError::UserNotFound
        })?;

    if !user.active {
        warn!("Inactive user attempted to authenticate: {}", user.email);
        return Err(AuthError::UserInactive);
    }

    if !user.email_verified {
        return Err(AuthError::EmailNotVerified);
    }

    debug!("Authenticated {} until {:?}", user.email, claims.expires_at());
    Ok(AuthenticatedUser { user, claims })
}
