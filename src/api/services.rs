use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tracing::info;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::auth::{extractors::AppState, AuthenticatedUser};
use crate::models::{ServiceDetails, ServiceRequest, ServiceStatus, ServiceType};
use crate::repositories::{PricingRepository, ServiceRequestFilter, ServiceRequestRepository};
use crate::services::email::EmailMessage;

pub async fn create_router() -> Result<Router<AppState>> {
    let router = Router::new()
        .route("/", get(list_my_requests))
        .route("/{service_type}", post(submit_request))
        .route("/request/{id}", get(get_request))
        .route("/request/{id}/cancel", post(cancel_request));

    Ok(router)
}

async fn submit_request(
    State(app_state): State<AppState>,
    Path(service_type): Path<ServiceType>,
    auth_user: AuthenticatedUser,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<ServiceRequest>), ApiError> {
    let details = ServiceDetails::parse(service_type, body)?;

    let pricing_repo = PricingRepository::new(app_state.database.pool().clone());
    let quoted_amount = pricing_repo
        .get(service_type)
        .await?
        .map(|p| p.price)
        .unwrap_or(0);

    let request_repo = ServiceRequestRepository::new(app_state.database.pool().clone());
    let request = request_repo
        .create(auth_user.user.id, service_type, details.into_json(), quoted_amount)
        .await?;

    info!(
        "{} request {} submitted by {}",
        request.service_type, request.id, auth_user.user.email
    );

    let email = &app_state.email_service;
    email.notify(EmailMessage::request_received(&auth_user.user, &request)).await;
    email
        .notify(EmailMessage::new_request_for_admin(email.admin_address(), &auth_user.user, &request))
        .await;

    Ok((StatusCode::CREATED, Json(request)))
}

async fn list_my_requests(
    State(app_state): State<AppState>,
    auth_user: AuthenticatedUser,
    Query(filter): Query<ServiceRequestFilter>,
) -> Result<Json<Vec<ServiceRequest>>, ApiError> {
    let request_repo = ServiceRequestRepository::new(app_state.database.pool().clone());
    let requests = request_repo.list_for_user(auth_user.user.id, &filter).await?;
    Ok(Json(requests))
}

async fn get_request(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthenticatedUser,
) -> Result<Json<ServiceRequest>, ApiError> {
    let request_repo = ServiceRequestRepository::new(app_state.database.pool().clone());
    let request = request_repo.get(id).await?.ok_or(ApiError::NotFound("Service request"))?;

    // Someone else's request is reported as missing
    if request.user_id != auth_user.user.id && !auth_user.user.is_admin() {
        return Err(ApiError::NotFound("Service request"));
    }

    Ok(Json(request))
}

async fn cancel_request(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthenticatedUser,
) -> Result<Json<ServiceRequest>, ApiError> {
    let request_repo = ServiceRequestRepository::new(app_state.database.pool().clone());
    let request = request_repo.get(id).await?.ok_or(ApiError::NotFound("Service request"))?;

    if request.user_id != auth_user.user.id {
        return Err(ApiError::NotFound("Service request"));
    }

    if request.status != ServiceStatus::Pending {
        return Err(ApiError::Conflict(format!(
            "Only pending requests can be cancelled, this one is {}",
            request.status
        )));
    }

    let cancelled = request_repo
        .update_status(id, ServiceStatus::Pending, ServiceStatus::Cancelled, None, None)
        .await?
        .ok_or_else(|| ApiError::Conflict("Request status changed, please reload".to_string()))?;

    info!("Service request {} cancelled by owner", id);
    Ok(Json(cancelled))
}
