//! # Cart Repository
//!
//! One `carts` row per user plus `cart_items` lines keyed by
//! `(user_id, product_id)`. Lines come back in the order they were first
//! added.

use brewhouse_core::CartItem;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Lines of a user's cart, empty when the user has none.
    pub async fn items(&self, user_id: &str) -> DbResult<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT product_id, quantity
            FROM cart_items
            WHERE user_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Deletes every line and the cart row. Idempotent.
    pub async fn clear(&self, user_id: &str) -> DbResult<()> {
        debug!(user_id = %user_id, "Clearing cart");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cart_items WHERE user_id = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM carts WHERE user_id = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    /// Quantity already in the cart for `product_id`.
    pub async fn line_quantity(
        conn: &mut SqliteConnection,
        user_id: &str,
        product_id: &str,
    ) -> DbResult<Option<i64>> {
        let quantity: Option<i64> = sqlx::query_scalar(
            "SELECT quantity FROM cart_items WHERE user_id = ?1 AND product_id = ?2",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(quantity)
    }

    /// Sets a line to `quantity`, creating the cart and the line if needed.
    pub async fn upsert_line(
        conn: &mut SqliteConnection,
        user_id: &str,
        product_id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(user_id = %user_id, product_id = %product_id, quantity, "Upserting cart line");

        sqlx::query(
            r#"
            INSERT INTO carts (user_id, updated_at) VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity) VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, product_id) DO UPDATE SET quantity = excluded.quantity
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn delete_line(
        conn: &mut SqliteConnection,
        user_id: &str,
        product_id: &str,
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = ?1 AND product_id = ?2")
            .bind(user_id)
            .bind(product_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
