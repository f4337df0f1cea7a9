use crate::models::{ServiceRequest, ServiceStatus, ServiceType};
use anyhow::Result;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

const REQUEST_COLUMNS: &str =
    "id, user_id, service_type, status, details, quoted_amount, remarks, paid, created_at, updated_at";

#[derive(Debug, Default, Clone, serde::Deserialize)]
pub struct ServiceRequestFilter {
    pub service_type: Option<ServiceType>,
    pub status: Option<ServiceStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub struct ServiceRequestRepository {
    pool: PgPool,
}

impl ServiceRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        service_type: ServiceType,
        details: serde_json::Value,
        quoted_amount: i64,
    ) -> Result<ServiceRequest> {
        let request = sqlx::query_as::<_, ServiceRequest>(&format!(
            "INSERT INTO service_requests (id, user_id, service_type, status, details, quoted_amount)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(service_type)
        .bind(ServiceStatus::Pending)
        .bind(Json(details))
        .bind(quoted_amount)
        .fetch_one(&self.pool)
        .await?;

        Ok(request)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ServiceRequest>> {
        let request = sqlx::query_as::<_, ServiceRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM service_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    pub async fn list_for_user(&self, user_id: Uuid, filter: &ServiceRequestFilter) -> Result<Vec<ServiceRequest>> {
        let requests = sqlx::query_as::<_, ServiceRequest>(&format!(
            "SELECT {REQUEST_COLUMNS}
             FROM service_requests
             WHERE user_id = $1
               AND ($2::varchar IS NULL OR service_type = $2)
               AND ($3::varchar IS NULL OR status = $3)
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .bind(filter.service_type)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    pub async fn list_all(&self, filter: &ServiceRequestFilter) -> Result<Vec<ServiceRequest>> {
        let limit = filter.limit.unwrap_or(50).min(200);
        let offset = filter.offset.unwrap_or(0);

        let requests = sqlx::query_as::<_, ServiceRequest>(&format!(
            "SELECT {REQUEST_COLUMNS}
             FROM service_requests
             WHERE ($1::varchar IS NULL OR service_type = $1)
               AND ($2::varchar IS NULL OR status = $2)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(filter.service_type)
        .bind(filter.status)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    /// Writes a new status. `from` guards against a concurrent change since the caller read the row.
    pub async fn update_status(
        &self,
        id: Uuid,
        from: ServiceStatus,
        to: ServiceStatus,
        remarks: Option<&str>,
        quoted_amount: Option<i64>,
    ) -> Result<Option<ServiceRequest>> {
        let request = sqlx::query_as::<_, ServiceRequest>(&format!(
            "UPDATE service_requests
             SET status = $3,
                 remarks = COALESCE($4, remarks),
                 quoted_amount = COALESCE($5, quoted_amount),
                 updated_at = NOW()
             WHERE id = $1 AND status = $2
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(remarks)
        .bind(quoted_amount)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    pub async fn mark_paid(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE service_requests SET paid = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn count_by_status(&self) -> Result<Vec<StatusCount>> {
        let rows = sqlx::query_as::<_, (ServiceStatus, i64)>(
            "SELECT status, COUNT(*) FROM service_requests GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect())
    }

    pub async fn count_by_type(&self) -> Result<Vec<TypeCount>> {
        let rows = sqlx::query_as::<_, (ServiceType, i64)>(
            "SELECT service_type, COUNT(*) FROM service_requests GROUP BY service_type ORDER BY service_type",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(service_type, count)| TypeCount { service_type, count })
            .collect())
    }
}

#[derive(Debug, serde::Serialize)]
pub struct StatusCount {
    pub status: ServiceStatus,
    pub count: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct TypeCount {
    pub service_type: ServiceType,
    pub count: i64,
}
