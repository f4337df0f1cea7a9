use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::{errors::ApiError, ListQuery};
use crate::auth::extractors::{AdminUser, AppState};
use crate::models::{User, UserRole};
use crate::repositories::{user_repository::UserStats, UserRepository};

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub active: bool,
    pub email_verified: bool,
    pub google_linked: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let google_linked = user.is_google_linked();
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            active: user.active,
            email_verified: user.email_verified,
            google_linked,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

pub async fn create_router() -> Result<Router<AppState>> {
    let router = Router::new()
        .route("/", get(list_users))
        .route("/stats", get(get_user_stats))
        .route("/{id}", get(get_user).delete(delete_user))
        .route("/{id}/role", put(update_user_role))
        .route("/{id}/status", put(update_user_status));

    Ok(router)
}

async fn list_users(
    State(app_state): State<AppState>,
    _admin_user: AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let user_repository = UserRepository::new(app_state.database.pool().clone());
    let users = user_repository.list_users(query.limit, query.offset).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

async fn get_user(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    _admin_user: AdminUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user_repository = UserRepository::new(app_state.database.pool().clone());
    let user = user_repository.get_user(id).await?.ok_or(ApiError::NotFound("User"))?;
    Ok(Json(UserResponse::from(user)))
}

async fn update_user_role(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    admin_user: AdminUser,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if admin_user.0.user.id == id && payload.role != UserRole::Admin {
        return Err(ApiError::BadRequest("You cannot remove your own admin role".to_string()));
    }

    let user_repository = UserRepository::new(app_state.database.pool().clone());
    user_repository.get_user(id).await?.ok_or(ApiError::NotFound("User"))?;

    let user = user_repository.update_user_role(id, payload.role).await?;
    info!("{} changed role of {} to {}", admin_user.0.user.email, user.email, user.role);
    Ok(Json(UserResponse::from(user)))
}

async fn update_user_status(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    admin_user: AdminUser,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if admin_user.0.user.id == id && !payload.active {
        return Err(ApiError::BadRequest("You cannot deactivate your own account".to_string()));
    }

    let user_repository = UserRepository::new(app_state.database.pool().clone());
    user_repository.get_user(id).await?.ok_or(ApiError::NotFound("User"))?;

    let user = user_repository.update_user_status(id, payload.active).await?;
    info!("{} set active={} for {}", admin_user.0.user.email, user.active, user.email);
    Ok(Json(UserResponse::from(user)))
}

async fn delete_user(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    admin_user: AdminUser,
) -> Result<StatusCode, ApiError> {
    // Prevent self-deletion
    if admin_user.0.user.id == id {
        return Err(ApiError::BadRequest("You cannot delete your own account".to_string()));
    }

    let user_repository = UserRepository::new(app_state.database.pool().clone());
    if !user_repository.delete_user(id).await? {
        return Err(ApiError::NotFound("User"));
    }

    info!("{} deleted user {}", admin_user.0.user.email, id);
    Ok(StatusCode::NO_CONTENT)
}

async fn get_user_stats(
    State(app_state): State<AppState>,
    _admin_user: AdminUser,
) -> Result<Json<UserStats>, ApiError> {
    let user_repository = UserRepository::new(app_state.database.pool().clone());
    Ok(Json(user_repository.get_user_stats().await?))
}
