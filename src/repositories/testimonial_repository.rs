use crate::models::Testimonial;
use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

const TESTIMONIAL_COLUMNS: &str = "id, user_id, author_name, rating, message, approved, created_at";

pub struct TestimonialRepository {
    pool: PgPool,
}

impl TestimonialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid, author_name: &str, rating: i16, message: &str) -> Result<Testimonial> {
        let testimonial = sqlx::query_as::<_, Testimonial>(&format!(
            "INSERT INTO testimonials (id, user_id, author_name, rating, message, approved)
             VALUES ($1, $2, $3, $4, $5, FALSE)
             RETURNING {TESTIMONIAL_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(author_name)
        .bind(rating)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;

        Ok(testimonial)
    }

    pub async fn list_approved(&self, limit: Option<u32>) -> Result<Vec<Testimonial>> {
        let testimonials = sqlx::query_as::<_, Testimonial>(&format!(
            "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials
             WHERE approved = TRUE
             ORDER BY created_at DESC
             LIMIT $1"
        ))
        .bind(limit.unwrap_or(20) as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(testimonials)
    }

    pub async fn list_all(&self) -> Result<Vec<Testimonial>> {
        let testimonials = sqlx::query_as::<_, Testimonial>(&format!(
            "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials ORDER BY approved ASC, created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(testimonials)
    }

    pub async fn set_approved(&self, id: Uuid, approved: bool) -> Result<Option<Testimonial>> {
        let testimonial = sqlx::query_as::<_, Testimonial>(&format!(
            "UPDATE testimonials SET approved = $2 WHERE id = $1 RETURNING {TESTIMONIAL_COLUMNS}"
        ))
        .bind(id)
        .bind(approved)
        .fetch_optional(&self.pool)
        .await?;

        Ok(testimonial)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM testimonials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
