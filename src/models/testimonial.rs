use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, FromRow)]
pub struct Testimonial {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_name: String,
    pub rating: i16,
    pub message: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}
