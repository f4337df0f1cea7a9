use crate::models::{Bill, BillStatus};
use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

const BILL_COLUMNS: &str = "id, user_id, service_request_id, amount, currency, description, status, \
     razorpay_order_id, razorpay_payment_id, paid_at, created_at, updated_at";

pub struct NewBill<'a> {
    pub user_id: Uuid,
    pub service_request_id: Option<Uuid>,
    pub amount: i64,
    pub currency: &'a str,
    pub description: &'a str,
    pub razorpay_order_id: &'a str,
}

pub struct BillRepository {
    pool: PgPool,
}

impl BillRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, bill: NewBill<'_>) -> Result<Bill> {
        let result = sqlx::query_as::<_, Bill>(&format!(
            "INSERT INTO bills (id, user_id, service_request_id, amount, currency, description, status, razorpay_order_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {BILL_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(bill.user_id)
        .bind(bill.service_request_id)
        .bind(bill.amount)
        .bind(bill.currency)
        .bind(bill.description)
        .bind(BillStatus::Created)
        .bind(bill.razorpay_order_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!("SELECT {BILL_COLUMNS} FROM bills WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(bill)
    }

    pub async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE razorpay_order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Open (unpaid) bill for a service request, reused instead of creating a second order.
    pub async fn find_open_for_request(&self, service_request_id: Uuid) -> Result<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills
             WHERE service_request_id = $1 AND status = $2
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(service_request_id)
        .bind(BillStatus::Created)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Bill>> {
        let bills = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    pub async fn list_all(&self, limit: Option<u32>, offset: Option<u32>) -> Result<Vec<Bill>> {
        let bills = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit.unwrap_or(50) as i64)
        .bind(offset.unwrap_or(0) as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    /// Returns `None` when the bill was no longer in `created` state.
    pub async fn mark_paid(&self, id: Uuid, payment_id: &str) -> Result<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "UPDATE bills
             SET status = $2, razorpay_payment_id = $3, paid_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND status = $4
             RETURNING {BILL_COLUMNS}"
        ))
        .bind(id)
        .bind(BillStatus::Paid)
        .bind(payment_id)
        .bind(BillStatus::Created)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    pub async fn mark_failed(&self, id: Uuid) -> Result<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "UPDATE bills
             SET status = $2, updated_at = NOW()
             WHERE id = $1 AND status = $3
             RETURNING {BILL_COLUMNS}"
        ))
        .bind(id)
        .bind(BillStatus::Failed)
        .bind(BillStatus::Created)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    pub async fn revenue_summary(&self) -> Result<RevenueSummary> {
        let (paid_bills, total_paid): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(amount), 0)::BIGINT FROM bills WHERE status = 'paid'",
        )
        .fetch_one(&self.pool)
        .await?;

        let pending_bills =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bills WHERE status = 'created'")
                .fetch_one(&self.pool)
                .await?;

        let paid_last_30_days = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM bills
             WHERE status = 'paid' AND paid_at >= NOW() - INTERVAL '30 days'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(RevenueSummary {
            paid_bills,
            pending_bills,
            total_paid,
            paid_last_30_days,
        })
    }
}

#[derive(Debug, serde::Serialize)]
pub struct RevenueSummary {
    pub paid_bills: i64,
    pub pending_bills: i64,
    /// Paise.
    pub total_paid: i64,
    pub paid_last_30_days: i64,
}
