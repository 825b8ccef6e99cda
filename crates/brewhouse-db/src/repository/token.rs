//! # Token Repository
//!
//! Storage for email-verification and password-reset tokens. Issuing and
//! mailing tokens happens elsewhere; rows cascade away with their user.

use brewhouse_core::{EmailVerification, PasswordReset};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for token database operations.
#[derive(Debug, Clone)]
pub struct TokenRepository {
    pool: SqlitePool,
}

impl TokenRepository {
    /// Creates a new TokenRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TokenRepository { pool }
    }

    // =========================================================================
    // Email verification
    // =========================================================================

    pub async fn insert_verification(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(user_id = %user_id, "Inserting email verification");

        sqlx::query(
            "INSERT INTO email_verifications (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_verification(&self, token: &str) -> DbResult<Option<EmailVerification>> {
        let row = sqlx::query_as::<_, EmailVerification>(
            "SELECT token, user_id, expires_at FROM email_verifications WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// The verification with the latest expiry for a user.
    pub async fn latest_verification(&self, user_id: &str) -> DbResult<Option<EmailVerification>> {
        let row = sqlx::query_as::<_, EmailVerification>(
            r#"
            SELECT token, user_id, expires_at
            FROM email_verifications
            WHERE user_id = ?1
            ORDER BY expires_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn delete_verification(&self, token: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM email_verifications WHERE token = ?1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // =========================================================================
    // Password reset
    // =========================================================================

    pub async fn insert_reset(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(user_id = %user_id, "Inserting password reset");

        sqlx::query("INSERT INTO password_resets (token, user_id, expires_at) VALUES (?1, ?2, ?3)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_reset(&self, token: &str) -> DbResult<Option<PasswordReset>> {
        let row = sqlx::query_as::<_, PasswordReset>(
            "SELECT token, user_id, expires_at FROM password_resets WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn delete_reset(&self, token: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM password_resets WHERE token = ?1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
