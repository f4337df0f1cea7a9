use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

fn pool_options(max_connections: u32, acquire_timeout: Duration) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
}

impl Database {
    /// Connects and applies the embedded migrations.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = pool_options(max_connections, Duration::from_secs(10))
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations applied");

        Ok(Self { pool })
    }

    /// Builds a pool that only connects on first use. Migrations are not run.
    pub fn new_lazy(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = pool_options(max_connections, Duration::from_secs(2)).connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
