use crate::models::{ServicePricing, ServiceType};
use anyhow::Result;
use sqlx::PgPool;

pub struct PricingRepository {
    pool: PgPool,
}

impl PricingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<ServicePricing>> {
        let pricing = sqlx::query_as::<_, ServicePricing>(
            "SELECT service_type, price, description, updated_at FROM service_pricing ORDER BY service_type",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(pricing)
    }

    pub async fn get(&self, service_type: ServiceType) -> Result<Option<ServicePricing>> {
        let pricing = sqlx::query_as::<_, ServicePricing>(
            "SELECT service_type, price, description, updated_at FROM service_pricing WHERE service_type = $1",
        )
        .bind(service_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pricing)
    }

    pub async fn upsert(&self, service_type: ServiceType, price: i64, description: &str) -> Result<ServicePricing> {
        let pricing = sqlx::query_as::<_, ServicePricing>(
            "INSERT INTO service_pricing (service_type, price, description)
             VALUES ($1, $2, $3)
             ON CONFLICT (service_type)
             DO UPDATE SET price = EXCLUDED.price, description = EXCLUDED.description, updated_at = NOW()
             RETURNING service_type, price, description, updated_at",
        )
        .bind(service_type)
        .bind(price)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;

        Ok(pricing)
    }
}
