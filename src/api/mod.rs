pub mod admin;
pub mod auth;
pub mod bills;
pub mod contact;
pub mod errors;
pub mod pricing;
pub mod services;
pub mod testimonials;
pub mod users;

use anyhow::Result;
use axum::{routing::get, Router};
use serde::Deserialize;

use crate::auth::extractors::AppState;

/// Paging parameters shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn create_router() -> Result<Router<AppState>> {
    let router = Router::new()
        .route("/status", get(status_handler))
        .nest("/auth", auth::create_router().await?)
        .nest("/services", services::create_router().await?)
        .nest("/pricing", pricing::create_router().await?)
        .nest("/bills", bills::create_router().await?)
        .nest("/testimonials", testimonials::create_router().await?)
        .nest("/contact", contact::create_router().await?)
        .nest("/admin", admin::create_router().await?);

    Ok(router)
}

async fn status_handler() -> &'static str {
    "API is running"
}
