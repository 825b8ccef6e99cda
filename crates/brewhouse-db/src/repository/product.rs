//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Best-seller ranking from paid/done order lines
//! - Versioned updates and the conditional stock decrement used by checkout
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read, compare in Rust, write back                           │
//! │     SELECT stock ...; if stock >= qty { UPDATE SET stock = 7 }         │
//! │     Two checkouts both read 8, both write 7, 2 units sold from 1.      │
//! │                                                                         │
//! │  ✅ CORRECT: the guard is part of the write                            │
//! │     UPDATE products SET stock = stock - ?                              │
//! │     WHERE id = ? AND stock >= ?                                        │
//! │                                                                         │
//! │  rows_affected == 1 → decremented                                     │
//! │  rows_affected == 0 → missing or insufficient, caller rolls back      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use brewhouse_core::{Product, ProductSort};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Units sold per product, counting only orders that count as sales.
const UNITS_SOLD: &str = r#"
    SELECT oi.product_id AS product_id, SUM(oi.quantity) AS sold
    FROM order_items oi
    INNER JOIN orders o ON o.id = oi.order_id
    WHERE o.status IN ('paid', 'done')
    GROUP BY oi.product_id
"#;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists every product in display order. Search filtering happens in
    /// `SqlStore` with the same case folding as the in-memory engine.
    ///
    /// ## Ordering
    /// - `Newest`: `created_at DESC`, then insertion order descending
    /// - `BestSeller`: units sold descending, then as `Newest`
    pub async fn list(&self, sort: ProductSort) -> DbResult<Vec<Product>> {
        debug!(sort = ?sort, "Listing products");

        let sql = match sort {
            ProductSort::Newest => {
                "SELECT p.* FROM products p ORDER BY p.created_at DESC, p.rowid DESC".to_string()
            }
            ProductSort::BestSeller => format!(
                "SELECT p.* FROM products p LEFT JOIN ({}) s ON s.product_id = p.id \
                 ORDER BY COALESCE(s.sold, 0) DESC, p.created_at DESC, p.rowid DESC",
                UNITS_SOLD
            ),
        };

        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, category, price_cents, sku,
                stock, thumbnail, created_at, updated_at, version
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(&product.sku)
        .bind(product.stock)
        .bind(&product.thumbnail)
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a product. Cart lines cascade; order lines keep their snapshot.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts products (for diagnostics and the seed binary).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    /// Reads a product inside an open transaction.
    pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Writes every mutable column if the stored version still equals
    /// `expected_version`, bumping the version by one.
    ///
    /// ## Returns
    /// * `Ok(true)` - Row written
    /// * `Ok(false)` - Row missing or a concurrent writer got there first
    pub async fn update_versioned(
        conn: &mut SqliteConnection,
        product: &Product,
        expected_version: i64,
    ) -> DbResult<bool> {
        debug!(id = %product.id, expected_version, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?3,
                description = ?4,
                category = ?5,
                price_cents = ?6,
                sku = ?7,
                stock = ?8,
                thumbnail = ?9,
                updated_at = ?10,
                version = version + 1
            WHERE id = ?1 AND version = ?2
            "#,
        )
        .bind(&product.id)
        .bind(expected_version)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(&product.sku)
        .bind(product.stock)
        .bind(&product.thumbnail)
        .bind(product.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Takes `quantity` units from stock only if that many are on hand.
    ///
    /// ## Returns
    /// * `Ok(true)` - Stock decremented, version bumped
    /// * `Ok(false)` - Product missing or stock below `quantity`
    pub async fn decrement_stock(
        conn: &mut SqliteConnection,
        id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, quantity, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET
                stock = stock - ?2,
                updated_at = ?3,
                version = version + 1
            WHERE id = ?1 AND stock >= ?2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Current `(stock, price_cents)` of a product, `None` when absent.
    pub async fn stock_and_price(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<(i64, i64)>> {
        let row: Option<(i64, i64)> =
            sqlx::query_as("SELECT stock, price_cents FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(row)
    }
}
