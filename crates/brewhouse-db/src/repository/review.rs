//! # Review Repository
//!
//! `reviews.user_id` is UNIQUE, so the one-review-per-user rule holds even
//! if two gate transactions interleave.

use brewhouse_core::Review;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Repository for review database operations.
#[derive(Debug, Clone)]
pub struct ReviewRepository {
    pool: SqlitePool,
}

impl ReviewRepository {
    /// Creates a new ReviewRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReviewRepository { pool }
    }

    /// Newest first; `limit <= 0` returns every review.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<Review>> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = if limit > 0 { limit } else { -1 };

        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, user_id, user_name, user_photo, rating, comment, created_at
            FROM reviews
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    pub async fn count_for_user(&self, user_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::count_by_user(&mut *conn, user_id).await
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    pub async fn count_by_user(conn: &mut SqliteConnection, user_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(count)
    }

    /// Inserts a review.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - The user already has a review
    pub async fn insert(conn: &mut SqliteConnection, review: &Review) -> DbResult<()> {
        debug!(id = %review.id, user_id = %review.user_id, "Inserting review");

        sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, user_name, user_photo, rating, comment, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&review.id)
        .bind(&review.user_id)
        .bind(&review.user_name)
        .bind(&review.user_photo)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
