use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::auth::{extractors::AppState, AuthenticatedUser};
use crate::models::Testimonial;
use crate::repositories::TestimonialRepository;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTestimonialRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: i16,
    #[validate(length(min = 10, max = 1000))]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TestimonialQuery {
    pub limit: Option<u32>,
}

pub async fn create_router() -> Result<Router<AppState>> {
    let router = Router::new().route("/", get(list_approved).post(create_testimonial));

    Ok(router)
}

async fn list_approved(
    State(app_state): State<AppState>,
    Query(query): Query<TestimonialQuery>,
) -> Result<Json<Vec<Testimonial>>, ApiError> {
    let repo = TestimonialRepository::new(app_state.database.pool().clone());
    Ok(Json(repo.list_approved(query.limit.map(|l| l.min(100))).await?))
}

async fn create_testimonial(
    State(app_state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<CreateTestimonialRequest>,
) -> Result<(StatusCode, Json<Testimonial>), ApiError> {
    req.validate()?;

    let repo = TestimonialRepository::new(app_state.database.pool().clone());
    let testimonial = repo
        .create(auth_user.user.id, &auth_user.user.name, req.rating, req.message.trim())
        .await?;

    info!("Testimonial {} submitted by {} awaiting approval", testimonial.id, auth_user.user.email);
    Ok((StatusCode::CREATED, Json(testimonial)))
}
