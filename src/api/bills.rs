use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::auth::{extractors::AppState, AuthenticatedUser};
use crate::models::{Bill, ServiceRequest, ServiceStatus};
use crate::repositories::{BillRepository, NewBill, ServiceRequestRepository};
use crate::services::email::EmailMessage;

#[derive(Debug, Deserialize)]
pub struct CreateBillRequest {
    pub service_request_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1, max = 64))]
    pub razorpay_order_id: String,
    #[validate(length(min = 1, max = 64))]
    pub razorpay_payment_id: String,
    #[validate(length(min = 1, max = 128))]
    pub razorpay_signature: String,
}

/// Everything the checkout widget needs to open a payment.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub bill: Bill,
    pub order_id: String,
    pub key_id: String,
    pub amount: i64,
    pub currency: String,
}

pub async fn create_router() -> Result<Router<AppState>> {
    let router = Router::new()
        .route("/", get(list_my_bills).post(create_bill))
        .route("/verify", post(verify_payment))
        .route("/{id}", get(get_bill));

    Ok(router)
}

fn ensure_payable(request: &ServiceRequest) -> Result<(), ApiError> {
    if request.paid {
        return Err(ApiError::Conflict("This request has already been paid".to_string()));
    }
    if matches!(request.status, ServiceStatus::Rejected | ServiceStatus::Cancelled) {
        return Err(ApiError::BadRequest(format!(
            "A {} request cannot be paid",
            request.status.label().to_lowercase()
        )));
    }
    if request.quoted_amount <= 0 {
        return Err(ApiError::BadRequest("This request has not been priced yet".to_string()));
    }
    Ok(())
}

/// A bill can only settle the request at the amount currently quoted.
fn ensure_bill_matches_quote(bill: &Bill, request: &ServiceRequest) -> Result<(), ApiError> {
    if request.paid {
        return Err(ApiError::Conflict("This request has already been paid".to_string()));
    }
    if bill.amount != request.quoted_amount {
        return Err(ApiError::Conflict(
            "The quote for this request has changed, please create a new bill".to_string(),
        ));
    }
    Ok(())
}

fn checkout(app_state: &AppState, bill: Bill) -> CheckoutResponse {
    CheckoutResponse {
        order_id: bill.razorpay_order_id.clone(),
        key_id: app_state.payments.key_id().to_string(),
        amount: bill.amount,
        currency: bill.currency.clone(),
        bill,
    }
}

async fn create_bill(
    State(app_state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<CreateBillRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let pool = app_state.database.pool().clone();
    let request_repo = ServiceRequestRepository::new(pool.clone());
    let bill_repo = BillRepository::new(pool);

    let request = request_repo
        .get(req.service_request_id)
        .await?
        .filter(|r| r.user_id == auth_user.user.id)
        .ok_or(ApiError::NotFound("Service request"))?;

    ensure_payable(&request)?;

    // Reuse the open order while the quote is unchanged
    if let Some(open) = bill_repo.find_open_for_request(request.id).await? {
        if open.amount == request.quoted_amount {
            return Ok((StatusCode::OK, Json(checkout(&app_state, open))));
        }
        warn!("Quote for request {} changed, abandoning order {}", request.id, open.razorpay_order_id);
        bill_repo.mark_failed(open.id).await?;
    }

    let receipt = format!("req_{}", &request.id.simple().to_string()[..16]);
    let notes = HashMap::from([
        ("service_request_id".to_string(), request.id.to_string()),
        ("user_id".to_string(), auth_user.user.id.to_string()),
    ]);

    let order = app_state
        .payments
        .create_order(request.quoted_amount, &receipt, &notes)
        .await
        .map_err(|e| {
            error!("Failed to create payment order for request {}: {:?}", request.id, e);
            ApiError::BadGateway("Payment gateway is unavailable".to_string())
        })?;

    let description = format!("{} service", request.service_type);
    let bill = bill_repo
        .create(NewBill {
            user_id: auth_user.user.id,
            service_request_id: Some(request.id),
            amount: order.amount,
            currency: &order.currency,
            description: &description,
            razorpay_order_id: &order.id,
        })
        .await?;

    info!("Bill {} created for request {} (order {})", bill.id, request.id, order.id);
    Ok((StatusCode::CREATED, Json(checkout(&app_state, bill))))
}

async fn verify_payment(
    State(app_state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<Json<Bill>, ApiError> {
    req.validate()?;

    let pool = app_state.database.pool().clone();
    let bill_repo = BillRepository::new(pool.clone());

    let bill = bill_repo
        .find_by_order_id(&req.razorpay_order_id)
        .await?
        .filter(|b| b.user_id == auth_user.user.id)
        .ok_or(ApiError::NotFound("Bill"))?;

    if bill.is_paid() {
        return Err(ApiError::Conflict("Bill is already paid".to_string()));
    }

    if !app_state.payments.verify_payment_signature(
        &req.razorpay_order_id,
        &req.razorpay_payment_id,
        &req.razorpay_signature,
    ) {
        warn!("Payment signature mismatch for order {}", req.razorpay_order_id);
        return Err(ApiError::BadRequest("Payment verification failed".to_string()));
    }

    let request_repo = ServiceRequestRepository::new(pool);
    if let Some(request_id) = bill.service_request_id {
        if let Some(request) = request_repo.get(request_id).await? {
            if let Err(e) = ensure_bill_matches_quote(&bill, &request) {
                warn!("Order {} no longer matches request {}", bill.razorpay_order_id, request.id);
                bill_repo.mark_failed(bill.id).await?;
                return Err(e);
            }
        }
    }

    let paid = bill_repo
        .mark_paid(bill.id, &req.razorpay_payment_id)
        .await?
        .ok_or_else(|| ApiError::Conflict("Bill is no longer awaiting payment".to_string()))?;

    if let Some(request_id) = paid.service_request_id {
        request_repo.mark_paid(request_id).await?;
    }

    info!("Payment {} verified for bill {}", req.razorpay_payment_id, paid.id);
    app_state
        .email_service
        .notify(EmailMessage::payment_receipt(&auth_user.user, &paid))
        .await;

    Ok(Json(paid))
}

async fn list_my_bills(
    State(app_state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<Json<Vec<Bill>>, ApiError> {
    let bill_repo = BillRepository::new(app_state.database.pool().clone());
    Ok(Json(bill_repo.list_for_user(auth_user.user.id).await?))
}

async fn get_bill(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthenticatedUser,
) -> Result<Json<Bill>, ApiError> {
    let bill_repo = BillRepository::new(app_state.database.pool().clone());
    let bill = bill_repo
        .get(id)
        .await?
        .filter(|b| b.user_id == auth_user.user.id || auth_user.user.is_admin())
        .ok_or(ApiError::NotFound("Bill"))?;

    Ok(Json(bill))
}
