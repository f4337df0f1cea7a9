use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::auth::extractors::AppState;
use crate::models::{OthersContact, Suggestion};
use crate::repositories::ContactRepository;
use crate::services::email::EmailMessage;

#[derive(Debug, Deserialize, Validate)]
pub struct SuggestionRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 5, max = 2000))]
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 10, max = 15))]
    pub phone: Option<String>,
    #[validate(length(min = 2, max = 200))]
    pub subject: String,
    #[validate(length(min = 5, max = 5000))]
    pub message: String,
}

pub async fn create_router() -> Result<Router<AppState>> {
    let router = Router::new()
        .route("/suggestions", post(create_suggestion))
        .route("/others", post(create_contact));

    Ok(router)
}

async fn create_suggestion(
    State(app_state): State<AppState>,
    Json(req): Json<SuggestionRequest>,
) -> Result<(StatusCode, Json<Suggestion>), ApiError> {
    req.validate()?;

    let repo = ContactRepository::new(app_state.database.pool().clone());
    let suggestion = repo
        .create_suggestion(req.name.trim(), req.email.trim(), req.message.trim())
        .await?;

    let email = &app_state.email_service;
    email
        .notify(EmailMessage::suggestion_for_admin(email.admin_address(), &suggestion))
        .await;

    Ok((StatusCode::CREATED, Json(suggestion)))
}

async fn create_contact(
    State(app_state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> Result<(StatusCode, Json<OthersContact>), ApiError> {
    req.validate()?;

    let repo = ContactRepository::new(app_state.database.pool().clone());
    let contact = repo
        .create_contact(
            req.name.trim(),
            req.email.trim(),
            req.phone.as_deref(),
            req.subject.trim(),
            req.message.trim(),
        )
        .await?;

    let email = &app_state.email_service;
    email
        .notify(EmailMessage::contact_for_admin(email.admin_address(), &contact))
        .await;

    Ok((StatusCode::CREATED, Json(contact)))
}
