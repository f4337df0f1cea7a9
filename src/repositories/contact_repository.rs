use crate::models::{OthersContact, Suggestion};
use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

pub struct ContactRepository {
    pool: PgPool,
}

impl ContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_suggestion(&self, name: &str, email: &str, message: &str) -> Result<Suggestion> {
        let suggestion = sqlx::query_as::<_, Suggestion>(
            "INSERT INTO suggestions (id, name, email, message)
             VALUES ($1, $2, $3, $4)
             RETURNING id, name, email, message, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;

        Ok(suggestion)
    }

    pub async fn list_suggestions(&self, limit: Option<u32>, offset: Option<u32>) -> Result<Vec<Suggestion>> {
        let suggestions = sqlx::query_as::<_, Suggestion>(
            "SELECT id, name, email, message, created_at
             FROM suggestions
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2",
        )
        .bind(limit.unwrap_or(50) as i64)
        .bind(offset.unwrap_or(0) as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(suggestions)
    }

    pub async fn create_contact(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        subject: &str,
        message: &str,
    ) -> Result<OthersContact> {
        let contact = sqlx::query_as::<_, OthersContact>(
            "INSERT INTO others_contacts (id, name, email, phone, subject, message)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, name, email, phone, subject, message, resolved, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(subject)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;

        Ok(contact)
    }

    pub async fn list_contacts(&self, only_open: bool) -> Result<Vec<OthersContact>> {
        let contacts = sqlx::query_as::<_, OthersContact>(
            "SELECT id, name, email, phone, subject, message, resolved, created_at
             FROM others_contacts
             WHERE ($1 = FALSE OR resolved = FALSE)
             ORDER BY created_at DESC",
        )
        .bind(only_open)
        .fetch_all(&self.pool)
        .await?;

        Ok(contacts)
    }

    pub async fn resolve_contact(&self, id: Uuid) -> Result<Option<OthersContact>> {
        let contact = sqlx::query_as::<_, OthersContact>(
            "UPDATE others_contacts SET resolved = TRUE
             WHERE id = $1
             RETURNING id, name, email, phone, subject, message, resolved, created_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(contact)
    }
}
