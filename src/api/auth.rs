use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Json, Redirect},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::auth::{
    extractors::AppState,
    google::GoogleProfile,
    otp::OtpPurpose,
    password::{hash_password, verify_password},
    AuthError, AuthenticatedUser,
};
use crate::models::user::{User, UserRole};
use crate::repositories::user_repository::UserRepository;
use crate::services::email::EmailMessage;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 10, max = 15))]
    pub phone: Option<String>,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub otp: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub otp: String,
    #[validate(length(min = 6, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    #[validate(length(min = 6, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 10, max = 15))]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetupCheckResponse {
    pub needs_setup: bool,
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub active: bool,
    pub email_verified: bool,
    pub has_password: bool,
    pub google_linked: bool,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        let has_password = user.has_password();
        let google_linked = user.is_google_linked();
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            active: user.active,
            email_verified: user.email_verified,
            has_password,
            google_linked,
        }
    }
}

pub async fn create_router() -> Result<Router<AppState>> {
    let router = Router::new()
        .route("/register", post(register))
        .route("/verify-otp", post(verify_otp))
        .route("/resend-otp", post(resend_otp))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/google", get(google_start))
        .route("/google/callback", get(google_callback))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", put(change_password))
        .route("/setup/check", get(check_setup))
        .route("/setup", post(initial_setup));

    Ok(router)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn auth_response(app_state: &AppState, user: User) -> Result<AuthResponse, ApiError> {
    let token = app_state.jwt_service.create_token_for_user(&user)?;

    Ok(AuthResponse { token, user: UserInfo::from(user) })
}

fn otp_valid_minutes(app_state: &AppState) -> u64 {
    (app_state.otp_store.ttl().as_secs() / 60).max(1)
}

async fn send_verification_code(app_state: &AppState, user: &User, code: &str) -> Result<(), ApiError> {
    let message = EmailMessage::otp(&user.email, &user.name, code, otp_valid_minutes(app_state));

    app_state.email_service.send(&message).await.map_err(|e| {
        error!("Failed to send verification code to {}: {:?}", user.email, e);
        ApiError::BadGateway("Failed to send verification email".to_string())
    })
}

async fn register(
    State(app_state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    req.validate()?;

    let email = normalize_email(&req.email);
    let user_repo = UserRepository::new(app_state.database.pool().clone());
    let password_hash = hash_password(&req.password)?;

    let existing = user_repo.find_by_email(&email).await?;
    if existing.as_ref().is_some_and(|user| user.email_verified) {
        return Err(AuthError::EmailExists.into());
    }

    // The resend cooldown gates any write to the account row
    let code = app_state.otp_store.issue(&email, OtpPurpose::EmailVerification).await?;

    let user = match existing {
        Some(existing) => {
            info!("Re-registration of unverified account {}", email);
            user_repo
                .refresh_unverified(existing.id, req.name.trim(), req.phone.as_deref(), &password_hash)
                .await?
        }
        None => {
            let new_user = User {
                id: Uuid::new_v4(),
                name: req.name.trim().to_string(),
                email: email.clone(),
                phone: req.phone.clone(),
                password_hash: Some(password_hash),
                google_id: None,
                role: UserRole::User,
                active: true,
                email_verified: false,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            };
            user_repo.create_user(&new_user).await?
        }
    };

    send_verification_code(&app_state, &user, &code).await?;
    info!("Registered {} pending email verification", user.email);

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Registration successful. A verification code was sent to your email.")),
    ))
}

async fn verify_otp(
    State(app_state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    req.validate()?;

    let email = normalize_email(&req.email);
    app_state
        .otp_store
        .verify(&email, OtpPurpose::EmailVerification, &req.otp)
        .await?;

    let user_repo = UserRepository::new(app_state.database.pool().clone());
    let user = user_repo.find_by_email(&email).await?.ok_or(ApiError::NotFound("User"))?;
    let user = if user.email_verified { user } else { user_repo.mark_verified(user.id).await? };

    info!("Email verified for {}", user.email);
    Ok(Json(auth_response(&app_state, user)?))
}

async fn resend_otp(
    State(app_state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    req.validate()?;

    let email = normalize_email(&req.email);
    let user_repo = UserRepository::new(app_state.database.pool().clone());
    match user_repo.find_by_email(&email).await? {
        Some(user) if user.active && !user.email_verified => {
            match app_state.otp_store.issue(&user.email, OtpPurpose::EmailVerification).await {
                Ok(code) => {
                    let message = EmailMessage::otp(&user.email, &user.name, &code, otp_valid_minutes(&app_state));
                    app_state.email_service.notify(message).await;
                }
                Err(e) => warn!("Verification code not reissued for {}: {}", user.email, e),
            }
        }
        Some(_) => debug!("Resend requested for {} which needs no verification", email),
        None => debug!("Resend requested for unknown email {}", email),
    }

    // Same answer whether or not a code went out
    Ok(Json(MessageResponse::new(
        "If this email is awaiting verification, a new code has been sent.",
    )))
}

async fn login(
    State(app_state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    req.validate().map_err(|_| AuthError::InvalidCredentials)?;

    let user_repo = UserRepository::new(app_state.database.pool().clone());
    let user = user_repo
        .find_by_email(&normalize_email(&req.email))
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !user.active {
        return Err(AuthError::UserInactive.into());
    }

    let password_hash = user.password_hash.as_deref().ok_or(AuthError::PasswordNotSet)?;
    let is_valid = verify_password(&req.password, password_hash).map_err(|_| AuthError::InvalidCredentials)?;
    if !is_valid {
        warn!("Failed login attempt for {}", user.email);
        return Err(AuthError::InvalidCredentials.into());
    }

    if !user.email_verified {
        return Err(AuthError::EmailNotVerified.into());
    }

    Ok(Json(auth_response(&app_state, user)?))
}

async fn forgot_password(
    State(app_state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    req.validate()?;

    let user_repo = UserRepository::new(app_state.database.pool().clone());
    if let Some(user) = user_repo.find_by_email(&normalize_email(&req.email)).await? {
        if user.active {
            match app_state.otp_store.issue(&user.email, OtpPurpose::PasswordReset).await {
                Ok(code) => {
                    let message =
                        EmailMessage::password_reset(&user.email, &user.name, &code, otp_valid_minutes(&app_state));
                    app_state.email_service.notify(message).await;
                }
                Err(e) => warn!("Password reset code not issued for {}: {}", user.email, e),
            }
        }
    }

    // Same answer whether or not the account exists
    Ok(Json(MessageResponse::new(
        "If an account exists for this email, a reset code has been sent.",
    )))
}

async fn reset_password(
    State(app_state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    req.validate()?;

    let email = normalize_email(&req.email);
    app_state.otp_store.verify(&email, OtpPurpose::PasswordReset, &req.otp).await?;

    let user_repo = UserRepository::new(app_state.database.pool().clone());
    let user = user_repo
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid reset request".to_string()))?;

    let password_hash = hash_password(&req.new_password)?;
    user_repo.update_password(user.id, &password_hash).await?;

    // Receiving the code proves ownership of the address
    if !user.email_verified {
        user_repo.mark_verified(user.id).await?;
    }

    info!("Password reset for {}", user.email);
    Ok(Json(MessageResponse::new("Password has been reset. You can now log in.")))
}

async fn google_start(State(app_state): State<AppState>) -> Result<Redirect, ApiError> {
    if !app_state.google_oauth.is_configured() {
        return Err(ApiError::ServiceUnavailable("Google sign-in is not configured".to_string()));
    }

    Ok(Redirect::to(&app_state.google_oauth.authorization_url().await))
}

async fn google_callback(
    State(app_state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
) -> Redirect {
    let client_url = app_state.config.client.url.trim_end_matches('/').to_string();

    match complete_google_login(&app_state, query).await {
        Ok(token) => Redirect::to(&format!("{}/oauth/callback?token={}", client_url, token)),
        Err(e) => {
            warn!("Google sign-in failed: {}", e);
            Redirect::to(&format!(
                "{}/login?error={}",
                client_url,
                urlencoding::encode("google_signin_failed")
            ))
        }
    }
}

async fn complete_google_login(app_state: &AppState, query: GoogleCallbackQuery) -> Result<String, ApiError> {
    if let Some(error) = query.error {
        return Err(ApiError::BadRequest(format!("Google returned error: {error}")));
    }

    let code = query.code.ok_or_else(|| ApiError::BadRequest("Missing authorization code".to_string()))?;
    let state = query.state.ok_or_else(|| ApiError::BadRequest("Missing state".to_string()))?;

    if !app_state.google_oauth.consume_state(&state).await {
        return Err(ApiError::BadRequest("Invalid OAuth state".to_string()));
    }

    let token = app_state
        .google_oauth
        .exchange_code(&code)
        .await
        .map_err(|e| ApiError::BadGateway(e.to_string()))?;
    let profile = app_state
        .google_oauth
        .fetch_profile(&token.access_token)
        .await
        .map_err(|e| ApiError::BadGateway(e.to_string()))?;

    let user = upsert_google_user(app_state, profile).await?;
    if !user.active {
        return Err(AuthError::UserInactive.into());
    }

    Ok(auth_response(app_state, user)?.token)
}

async fn upsert_google_user(app_state: &AppState, profile: GoogleProfile) -> Result<User, ApiError> {
    if !profile.email_verified {
        return Err(ApiError::Forbidden("Google account email is not verified".to_string()));
    }

    let user_repo = UserRepository::new(app_state.database.pool().clone());

    if let Some(user) = user_repo.find_by_google_id(&profile.sub).await? {
        return Ok(user);
    }

    let email = normalize_email(&profile.email);
    if let Some(existing) = user_repo.find_by_email(&email).await? {
        info!("Linking Google account to existing user {}", existing.email);
        return Ok(user_repo.link_google_account(existing.id, &profile.sub).await?);
    }

    let name = profile
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or("Client").to_string());

    let new_user = User {
        id: Uuid::new_v4(),
        name,
        email,
        phone: None,
        password_hash: None,
        google_id: Some(profile.sub),
        role: UserRole::User,
        active: true,
        email_verified: true,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };

    info!("Creating user from Google sign-in: {}", new_user.email);
    Ok(user_repo.create_user(&new_user).await?)
}

async fn get_profile(auth_user: AuthenticatedUser) -> Result<Json<UserInfo>, ApiError> {
    Ok(Json(UserInfo::from(auth_user.user)))
}

async fn update_profile(
    State(app_state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserInfo>, ApiError> {
    req.validate()?;

    let user_repo = UserRepository::new(app_state.database.pool().clone());
    let user = user_repo
        .update_profile(auth_user.user.id, req.name.as_deref().map(str::trim), req.phone.as_deref())
        .await?;

    Ok(Json(UserInfo::from(user)))
}

async fn change_password(
    State(app_state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    req.validate()?;

    // Google-only accounts may set a first password without a current one
    if let Some(existing_hash) = auth_user.user.password_hash.as_deref() {
        let current = req
            .current_password
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest("Current password is required".to_string()))?;
        if !verify_password(current, existing_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }
    }

    let password_hash = hash_password(&req.new_password)?;
    let user_repo = UserRepository::new(app_state.database.pool().clone());
    user_repo.update_password(auth_user.user.id, &password_hash).await?;

    Ok(Json(MessageResponse::new("Password updated")))
}

async fn check_setup(State(app_state): State<AppState>) -> Result<Json<SetupCheckResponse>, ApiError> {
    let user_repo = UserRepository::new(app_state.database.pool().clone());
    let admin_count = user_repo.count_admins().await?;

    Ok(Json(SetupCheckResponse { needs_setup: admin_count == 0 }))
}

/// Creates the first administrator. Only allowed while no admin exists.
async fn initial_setup(
    State(app_state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    req.validate()?;

    let user_repo = UserRepository::new(app_state.database.pool().clone());
    if user_repo.count_admins().await? > 0 {
        return Err(AuthError::Forbidden("Setup already completed".to_string()).into());
    }

    let email = normalize_email(&req.email);
    if user_repo.find_by_email(&email).await?.is_some() {
        return Err(AuthError::EmailExists.into());
    }

    let admin_user = User {
        id: Uuid::new_v4(),
        name: req.name.trim().to_string(),
        email,
        phone: req.phone.clone(),
        password_hash: Some(hash_password(&req.password)?),
        google_id: None,
        role: UserRole::Admin,
        active: true,
        email_verified: true,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };

    let user = user_repo.create_user(&admin_user).await?;
    info!("Initial administrator {} created", user.email);

    Ok((StatusCode::CREATED, Json(auth_response(&app_state, user)?)))
}
