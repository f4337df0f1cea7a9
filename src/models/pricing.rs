use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ServiceType;

#[derive(Debug, Serialize, Deserialize, Clone, FromRow)]
pub struct ServicePricing {
    pub service_type: ServiceType,
    /// Price in paise.
    pub price: i64,
    pub description: String,
    pub updated_at: DateTime<Utc>,
}
