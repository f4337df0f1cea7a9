use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar")]
#[sqlx(rename_all = "lowercase")]
pub enum BillStatus {
    Created,
    Paid,
    Failed,
}

#[derive(Debug, Serialize, Deserialize, Clone, FromRow)]
pub struct Bill {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_request_id: Option<Uuid>,
    /// Amount in paise.
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub status: BillStatus,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    pub fn is_paid(&self) -> bool {
        self.status == BillStatus::Paid
    }
}

/// Formats paise as rupees with two decimals, e.g. `149900` -> `1499.00`.
pub fn format_amount(paise: i64) -> String {
    let sign = if paise < 0 { "-" } else { "" };
    let abs = paise.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
