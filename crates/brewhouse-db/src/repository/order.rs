//! # Order Repository
//!
//! Database operations for orders and their item snapshots.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CHECKOUT (one transaction, see SqlStore::create_order)             │
//! │     └── decrement_stock() per line                                     │
//! │     └── insert_header() → orders                                       │
//! │     └── insert_item()   → order_items (price frozen)                   │
//! │                                                                         │
//! │  2. PAYMENT CALLBACK                                                   │
//! │     └── update_payment_ref()                                           │
//! │     └── update_status() → paid / failed                                │
//! │                                                                         │
//! │  3. FULFILMENT                                                         │
//! │     └── update_status() → done                                         │
//! │                                                                         │
//! │  Orders are never deleted.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use brewhouse_core::{Order, OrderItem, OrderStatus};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Header row of an order, before its items are attached.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: String,
    amount_cents: i64,
    status: OrderStatus,
    payment_ref: String,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            items,
            amount_cents: self.amount_cents,
            status: self.status,
            payment_ref: self.payment_ref,
            created_at: self.created_at,
        }
    }
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, amount_cents, status, payment_ref, created_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT order_id, product_id, quantity, price_cents
            FROM order_items
            WHERE order_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(row.into_order(items)))
    }

    /// Orders of one user, newest first.
    pub async fn list_by_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, amount_cents, status, payment_ref, created_at
            FROM orders
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT oi.order_id, oi.product_id, oi.quantity, oi.price_cents
            FROM order_items oi
            INNER JOIN orders o ON o.id = oi.order_id
            WHERE o.user_id = ?1
            ORDER BY oi.rowid
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attach_items(rows, items))
    }

    /// Every order, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, amount_cents, status, payment_ref, created_at
            FROM orders
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT order_id, product_id, quantity, price_cents FROM order_items ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(attach_items(rows, items))
    }

    /// Sets the status. Writing the current status again succeeds.
    pub async fn update_status(&self, id: &str, status: OrderStatus) -> DbResult<()> {
        debug!(id = %id, status = %status, "Updating order status");

        let result = sqlx::query("UPDATE orders SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    pub async fn update_payment_ref(&self, id: &str, payment_ref: &str) -> DbResult<()> {
        debug!(id = %id, "Updating order payment reference");

        let result = sqlx::query("UPDATE orders SET payment_ref = ?2 WHERE id = ?1")
            .bind(id)
            .bind(payment_ref)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    /// Inserts the order header. Items go in separately.
    pub async fn insert_header(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, user_id = %order.user_id, "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, amount_cents, status, payment_ref, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(order.amount_cents)
        .bind(order.status)
        .bind(&order.payment_ref)
        .bind(order.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts one snapshot line.
    pub async fn insert_item(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, price_cents)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&item.order_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.price_cents)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn count_by_user(conn: &mut SqliteConnection, user_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(count)
    }
}

/// Groups item rows under their headers, keeping header order.
fn attach_items(rows: Vec<OrderRow>, items: Vec<OrderItem>) -> Vec<Order> {
    let mut by_order: HashMap<String, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id.clone()).or_default().push(item);
    }

    rows.into_iter()
        .map(|row| {
            let items = by_order.remove(&row.id).unwrap_or_default();
            row.into_order(items)
        })
        .collect()
}
