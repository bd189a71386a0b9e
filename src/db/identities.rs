use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::AppUser;

use super::IdentityStore;

pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[tonic::async_trait]
impl IdentityStore for PgIdentityStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> AppResult<AppUser> {
        sqlx::query_as::<_, AppUser>(
            "INSERT INTO app_users (email, password_hash) VALUES ($1, $2) \
             RETURNING id, email, password_hash, created_at",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let unique = e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation());
            if unique {
                AppError::AlreadyExists("An account with this email already exists".into())
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<AppUser>> {
        let user = sqlx::query_as::<_, AppUser>(
            "SELECT id, email, password_hash, created_at FROM app_users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM app_users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }

    async fn user_exists(&self, id: Uuid) -> AppResult<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM app_users WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn revoke_session(&self, session_id: Uuid, expires_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO revoked_sessions (session_id, expires_at) VALUES ($1, $2) \
             ON CONFLICT (session_id) DO NOTHING",
        )
        .bind(session_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        // Expired tokens are rejected by signature validation anyway
        sqlx::query("DELETE FROM revoked_sessions WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn is_session_revoked(&self, session_id: Uuid) -> AppResult<bool> {
        let revoked: Option<(Uuid,)> =
            sqlx::query_as("SELECT session_id FROM revoked_sessions WHERE session_id = $1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(revoked.is_some())
    }
}
