use crate::models::{User, UserRole};
use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, name, email, phone, password_hash, google_id, role, active, email_verified, created_at, updated_at";

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_user(&self, user: &User) -> Result<User> {
        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, phone, password_hash, google_id, role, active, email_verified)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(&user.google_id)
        .bind(&user.role)
        .bind(user.active)
        .bind(user.email_verified)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE google_id = $1"
        ))
        .bind(google_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn list_users(&self, limit: Option<u32>, offset: Option<u32>) -> Result<Vec<User>> {
        let limit = limit.unwrap_or(50);
        let offset = offset.unwrap_or(0);

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS}
             FROM users
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn update_profile(&self, id: Uuid, name: Option<&str>, phone: Option<&str>) -> Result<User> {
        let existing_user = self
            .get_user(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found"))?;

        let updated_name = name.unwrap_or(&existing_user.name);
        let updated_phone = phone.or(existing_user.phone.as_deref());

        let updated_user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = $2, phone = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(updated_name)
        .bind(updated_phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated_user)
    }

    /// Refreshes name and password of an account that never completed verification.
    pub async fn refresh_unverified(&self, id: Uuid, name: &str, phone: Option<&str>, password_hash: &str) -> Result<User> {
        let updated_user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = $2, phone = $3, password_hash = $4, updated_at = NOW()
             WHERE id = $1 AND email_verified = FALSE
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(phone)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated_user)
    }

    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn mark_verified(&self, id: Uuid) -> Result<User> {
        let updated_user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET email_verified = TRUE, updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated_user)
    }

    /// Attaches a Google account to an existing user. Google has verified the address,
    /// so a password set on a never-verified account is dropped.
    pub async fn link_google_account(&self, id: Uuid, google_id: &str) -> Result<User> {
        let updated_user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET google_id = $2,
                 password_hash = CASE WHEN email_verified THEN password_hash ELSE NULL END,
                 email_verified = TRUE, updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(google_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated_user)
    }

    pub async fn update_user_role(&self, id: Uuid, role: UserRole) -> Result<User> {
        let updated_user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&role)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated_user)
    }

    pub async fn update_user_status(&self, id: Uuid, active: bool) -> Result<User> {
        let updated_user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET active = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated_user)
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_admins(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'Admin'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn get_user_stats(&self) -> Result<UserStats> {
        let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let active_users =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE active = true")
                .fetch_one(&self.pool)
                .await?;

        let verified_users =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email_verified = true")
                .fetch_one(&self.pool)
                .await?;

        let admin_users =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'Admin'")
                .fetch_one(&self.pool)
                .await?;

        let recent_registrations = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE created_at >= NOW() - INTERVAL '30 days'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(UserStats {
            total_users,
            active_users,
            verified_users,
            admin_users,
            recent_registrations,
        })
    }
}

#[derive(Debug, serde::Serialize)]
pub struct UserStats {
    pub total_users: i64,
    pub active_users: i64,
    pub verified_users: i64,
    pub admin_users: i64,
    pub recent_registrations: i64,
}
