use anyhow::Result;
use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};

use crate::api::errors::ApiError;
use crate::auth::extractors::AppState;
use crate::models::{ServicePricing, ServiceType};
use crate::repositories::PricingRepository;

pub async fn create_router() -> Result<Router<AppState>> {
    let router = Router::new()
        .route("/", get(list_pricing))
        .route("/{service_type}", get(get_pricing));

    Ok(router)
}

async fn list_pricing(State(app_state): State<AppState>) -> Result<Json<Vec<ServicePricing>>, ApiError> {
    let pricing_repo = PricingRepository::new(app_state.database.pool().clone());
    Ok(Json(pricing_repo.list().await?))
}

async fn get_pricing(
    State(app_state): State<AppState>,
    Path(service_type): Path<ServiceType>,
) -> Result<Json<ServicePricing>, ApiError> {
    let pricing_repo = PricingRepository::new(app_state.database.pool().clone());
    let pricing = pricing_repo
        .get(service_type)
        .await?
        .ok_or(ApiError::NotFound("Pricing"))?;

    Ok(Json(pricing))
}
