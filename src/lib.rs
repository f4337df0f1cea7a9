pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod models;
pub mod repositories;
pub mod services;

use anyhow::Result;
use axum::{http::HeaderValue, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use config::AppConfig;
pub use database::Database;

use auth::extractors::AppState;

pub async fn create_app(app_state: AppState) -> Result<Router> {
    let cors = cors_layer(&app_state.config.client.url);

    let app = Router::new()
        .route("/", get(root_handler))
        .route(
            "/health",
            get({
                let db = app_state.database.clone();
                move || health_handler(db)
            }),
        )
        .nest("/api", api::create_router().await?)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Ok(app)
}

/// Restricts CORS to the client origin, falling back to permissive when it cannot be parsed.
fn cors_layer(client_url: &str) -> CorsLayer {
    match client_url.trim_end_matches('/').parse::<HeaderValue>() {
        Ok(origin) if !client_url.is_empty() => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        _ => {
            warn!("CLIENT_URL is not a valid origin, using permissive CORS");
            CorsLayer::permissive()
        }
    }
}

async fn root_handler() -> &'static str {
    "TaxDesk-RS: Tax and Business Services API"
}

async fn health_handler(database: Database) -> &'static str {
    match database.health_check().await {
        Ok(_) => "OK",
        Err(_) => "Database connection failed",
    }
}
