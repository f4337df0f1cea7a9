use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::api::{errors::ApiError, users, ListQuery};
use crate::auth::extractors::{AdminUser, AppState};
use crate::models::{
    Bill, OthersContact, ServicePricing, ServiceRequest, ServiceStatus, ServiceType, Suggestion, Testimonial,
};
use crate::repositories::{
    user_repository::UserStats, BillRepository, ContactRepository, PricingRepository, RevenueSummary,
    ServiceRequestFilter, ServiceRequestRepository, StatusCount, TestimonialRepository, TypeCount,
    UserRepository,
};
use crate::services::email::EmailMessage;

#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub uptime_seconds: u64,
    pub version: String,
    pub database_status: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub system: SystemStats,
    pub users: UserStats,
    pub requests_by_status: Vec<StatusCount>,
    pub requests_by_type: Vec<TypeCount>,
    pub revenue: RevenueSummary,
    pub unpriced_services: Vec<ServiceType>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    pub status: ServiceStatus,
    #[validate(length(max = 2000))]
    pub remarks: Option<String>,
    #[validate(range(min = 0))]
    pub quoted_amount: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertPricingRequest {
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(length(max = 500))]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub approved: bool,
}

#[derive(Debug, Deserialize)]
pub struct ContactListQuery {
    #[serde(default)]
    pub open_only: bool,
}

pub async fn create_router() -> Result<Router<AppState>> {
    let router = Router::new()
        .route("/stats", get(get_dashboard_stats))
        .route("/services", get(list_requests))
        .route("/services/{id}/status", put(update_request_status))
        .route("/pricing/{service_type}", put(upsert_pricing))
        .route("/bills", get(list_bills))
        .route("/bills/{id}/cancel", put(cancel_bill))
        .route("/testimonials", get(list_testimonials))
        .route("/testimonials/{id}", delete(delete_testimonial))
        .route("/testimonials/{id}/approval", put(set_testimonial_approval))
        .route("/suggestions", get(list_suggestions))
        .route("/contacts", get(list_contacts))
        .route("/contacts/{id}/resolve", put(resolve_contact))
        .nest("/users", users::create_router().await?);

    Ok(router)
}

async fn get_dashboard_stats(
    State(app_state): State<AppState>,
    _admin_user: AdminUser,
) -> Result<Json<DashboardStats>, ApiError> {
    let pool = app_state.database.pool().clone();

    let database_status = match app_state.database.health_check().await {
        Ok(_) => "healthy".to_string(),
        Err(e) => {
            warn!("Database health check failed: {}", e);
            "unhealthy".to_string()
        }
    };

    let system = SystemStats {
        uptime_seconds: app_state.startup_time.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database_status,
    };

    let users = UserRepository::new(pool.clone()).get_user_stats().await?;
    let request_repo = ServiceRequestRepository::new(pool.clone());
    let requests_by_status = request_repo.count_by_status().await?;
    let requests_by_type = request_repo.count_by_type().await?;
    let revenue = BillRepository::new(pool.clone()).revenue_summary().await?;

    let priced: Vec<ServiceType> = PricingRepository::new(pool)
        .list()
        .await?
        .into_iter()
        .map(|p| p.service_type)
        .collect();
    let unpriced_services = ServiceType::ALL
        .into_iter()
        .filter(|t| !priced.contains(t))
        .collect();

    Ok(Json(DashboardStats {
        system,
        users,
        requests_by_status,
        requests_by_type,
        revenue,
        unpriced_services,
    }))
}

async fn list_requests(
    State(app_state): State<AppState>,
    _admin_user: AdminUser,
    Query(filter): Query<ServiceRequestFilter>,
) -> Result<Json<Vec<ServiceRequest>>, ApiError> {
    let request_repo = ServiceRequestRepository::new(app_state.database.pool().clone());
    Ok(Json(request_repo.list_all(&filter).await?))
}

async fn update_request_status(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    admin_user: AdminUser,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ServiceRequest>, ApiError> {
    req.validate()?;

    if !req.status.is_admin_assignable() {
        return Err(ApiError::Forbidden("Only the client can cancel a request".to_string()));
    }

    let pool = app_state.database.pool().clone();
    let request_repo = ServiceRequestRepository::new(pool.clone());
    let current = request_repo.get(id).await?.ok_or(ApiError::NotFound("Service request"))?;

    if !current.status.can_transition_to(req.status) {
        let reason = if current.status.is_terminal() {
            format!("{} requests can no longer change status", current.status)
        } else {
            format!("Cannot move a request from {} to {}", current.status, req.status)
        };
        return Err(ApiError::Conflict(reason));
    }

    if req.quoted_amount.is_some() && current.paid {
        return Err(ApiError::Conflict("Cannot change the quote of a paid request".to_string()));
    }

    let remarks = req.remarks.as_deref().map(str::trim).filter(|r| !r.is_empty());
    let updated = request_repo
        .update_status(id, current.status, req.status, remarks, req.quoted_amount)
        .await?
        .ok_or_else(|| ApiError::Conflict("Request status changed, please reload".to_string()))?;

    if updated.quoted_amount != current.quoted_amount {
        let bill_repo = BillRepository::new(pool.clone());
        if let Some(open) = bill_repo.find_open_for_request(id).await? {
            if open.amount != updated.quoted_amount {
                warn!("Request {} re-quoted, abandoning order {}", id, open.razorpay_order_id);
                bill_repo.mark_failed(open.id).await?;
            }
        }
    }

    info!(
        "{} moved request {} from {} to {}",
        admin_user.0.user.email, id, current.status, updated.status
    );

    if updated.status != current.status {
        if let Some(owner) = UserRepository::new(pool).get_user(updated.user_id).await? {
            app_state
                .email_service
                .notify(EmailMessage::status_update(&owner, &updated))
                .await;
        }
    }

    Ok(Json(updated))
}

async fn upsert_pricing(
    State(app_state): State<AppState>,
    Path(service_type): Path<ServiceType>,
    admin_user: AdminUser,
    Json(req): Json<UpsertPricingRequest>,
) -> Result<Json<ServicePricing>, ApiError> {
    req.validate()?;

    let pricing_repo = PricingRepository::new(app_state.database.pool().clone());
    let pricing = pricing_repo
        .upsert(service_type, req.price, req.description.trim())
        .await?;

    info!("{} set {} price to {} paise", admin_user.0.user.email, service_type, pricing.price);
    Ok(Json(pricing))
}

async fn list_bills(
    State(app_state): State<AppState>,
    _admin_user: AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Bill>>, ApiError> {
    let bill_repo = BillRepository::new(app_state.database.pool().clone());
    Ok(Json(bill_repo.list_all(query.limit, query.offset).await?))
}

async fn cancel_bill(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    admin_user: AdminUser,
) -> Result<Json<Bill>, ApiError> {
    let bill_repo = BillRepository::new(app_state.database.pool().clone());
    let bill = bill_repo.get(id).await?.ok_or(ApiError::NotFound("Bill"))?;

    if bill.is_paid() {
        return Err(ApiError::Conflict("A paid bill cannot be cancelled".to_string()));
    }

    let cancelled = bill_repo
        .mark_failed(id)
        .await?
        .ok_or_else(|| ApiError::Conflict("Bill is no longer open".to_string()))?;

    info!("{} cancelled bill {}", admin_user.0.user.email, id);
    Ok(Json(cancelled))
}

async fn list_testimonials(
    State(app_state): State<AppState>,
    _admin_user: AdminUser,
) -> Result<Json<Vec<Testimonial>>, ApiError> {
    let repo = TestimonialRepository::new(app_state.database.pool().clone());
    Ok(Json(repo.list_all().await?))
}

async fn set_testimonial_approval(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    _admin_user: AdminUser,
    Json(req): Json<ApprovalRequest>,
) -> Result<Json<Testimonial>, ApiError> {
    let repo = TestimonialRepository::new(app_state.database.pool().clone());
    let testimonial = repo
        .set_approved(id, req.approved)
        .await?
        .ok_or(ApiError::NotFound("Testimonial"))?;

    Ok(Json(testimonial))
}

async fn delete_testimonial(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    _admin_user: AdminUser,
) -> Result<StatusCode, ApiError> {
    let repo = TestimonialRepository::new(app_state.database.pool().clone());
    if !repo.delete(id).await? {
        return Err(ApiError::NotFound("Testimonial"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_suggestions(
    State(app_state): State<AppState>,
    _admin_user: AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    let repo = ContactRepository::new(app_state.database.pool().clone());
    Ok(Json(repo.list_suggestions(query.limit, query.offset).await?))
}

async fn list_contacts(
    State(app_state): State<AppState>,
    _admin_user: AdminUser,
    Query(query): Query<ContactListQuery>,
) -> Result<Json<Vec<OthersContact>>, ApiError> {
    let repo = ContactRepository::new(app_state.database.pool().clone());
    Ok(Json(repo.list_contacts(query.open_only).await?))
}

async fn resolve_contact(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    _admin_user: AdminUser,
) -> Result<Json<OthersContact>, ApiError> {
    let repo = ContactRepository::new(app_state.database.pool().clone());
    let contact = repo.resolve_contact(id).await?.ok_or(ApiError::NotFound("Contact"))?;
    Ok(Json(contact))
}
