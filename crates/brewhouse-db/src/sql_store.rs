//! # Relational Engine
//!
//! `Store` over SQLite. Compound operations run in one transaction each.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  create_order (single transaction)                      │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    for each merged line:                                               │
//! │      UPDATE products SET stock = stock - q WHERE id = ? AND stock >= q │
//! │        │                                                                │
//! │        ├── 1 row  → read price, queue snapshot line                    │
//! │        └── 0 rows → read stock: missing → NotFound                     │
//! │                                  short   → InsufficientStock           │
//! │                     return early, tx dropped = ROLLBACK                │
//! │    INSERT orders                                                        │
//! │    INSERT order_items ...                                              │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `update_product`, cart edits and the review gate follow the same shape:
//! read, check, write, commit, with any early return rolling back. Every
//! transaction opens with `BEGIN IMMEDIATE`, so the reads already hold the
//! write lock and concurrent callers queue instead of failing.

use async_trait::async_trait;
use brewhouse_core::validation::{
    merge_order_lines, validate_amount_cents, validate_draft, validate_email, validate_product,
    validate_quantity, validate_rating, validate_required,
};
use brewhouse_core::{
    AuthProvider, Cart, CartItem, EmailVerification, NewUser, Order, OrderItem, OrderStatus,
    PasswordReset, Product, ProductDraft, ProductPatch, ProductQuery, Review, StoreError,
    StoreResult, User, UserRole,
};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::DbError;
use crate::pool::Database;
use crate::repository::cart::CartRepository;
use crate::repository::order::OrderRepository;
use crate::repository::product::ProductRepository;
use crate::repository::review::ReviewRepository;
use crate::store::{new_id, review_photo, Store, ADMIN_NAME};

/// SQLite-backed store.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./brewhouse.db")).await?;
/// let store: Arc<dyn Store> = Arc::new(SqlStore::new(db));
/// ```
#[derive(Debug, Clone)]
pub struct SqlStore {
    db: Database,
}

impl SqlStore {
    pub fn new(db: Database) -> Self {
        SqlStore { db }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Opens a write transaction. `BEGIN IMMEDIATE` takes the database write
    /// lock up front, so a concurrent writer waits on the busy timeout instead
    /// of failing the first write after a read.
    async fn begin(&self) -> StoreResult<sqlx::Transaction<'static, sqlx::Sqlite>> {
        Ok(self
            .db
            .pool()
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(DbError::from)?)
    }

    async fn commit(tx: sqlx::Transaction<'static, sqlx::Sqlite>) -> StoreResult<()> {
        Ok(tx.commit().await.map_err(DbError::from)?)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        validate_email(&user.email)?;

        let record = User {
            id: new_id(),
            full_name: user.full_name,
            phone: user.phone,
            email: user.email.trim().to_string(),
            password_hash: user.password_hash,
            role: user.role,
            auth_provider: user.auth_provider,
            google_id: user.google_id,
            email_verified: user.email_verified,
            created_at: Utc::now(),
        };

        match self.db.users().insert(&record).await {
            Ok(()) => Ok(record),
            Err(err) if err.is_unique_violation() => {
                Err(StoreError::conflict("email already registered"))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn require_user(&self, user_id: &str) -> StoreResult<()> {
        if self.db.users().exists(user_id).await? {
            Ok(())
        } else {
            Err(StoreError::not_found("User", user_id))
        }
    }
}

#[async_trait]
impl Store for SqlStore {
    // =========================================================================
    // Inventory
    // =========================================================================

    async fn create_product(&self, draft: ProductDraft) -> StoreResult<Product> {
        let draft = validate_draft(&draft)?;
        let now = Utc::now();

        let product = Product {
            id: new_id(),
            name: draft.name,
            description: draft.description,
            category: draft.category,
            price_cents: draft.price_cents,
            sku: draft.sku,
            stock: draft.stock,
            thumbnail: draft.thumbnail,
            created_at: now,
            updated_at: now,
            version: 1,
        };

        self.db.products().insert(&product).await?;
        Ok(product)
    }

    async fn update_product(&self, id: &str, patch: ProductPatch) -> StoreResult<Product> {
        let mut tx = self.begin().await?;

        let current = ProductRepository::fetch(&mut *tx, id)
            .await?
            .ok_or_else(|| StoreError::not_found("Product", id))?;

        if let Some(expected) = patch.expected_version {
            if expected != current.version {
                return Err(StoreError::conflict(format!(
                    "product {} is at version {}, expected {}",
                    id, current.version, expected
                )));
            }
        }

        if patch.is_empty() {
            return Ok(current);
        }

        let mut updated = current.clone();
        patch.apply_to(&mut updated);
        validate_product(&updated)?;
        updated.updated_at = Utc::now();
        updated.version = current.version + 1;

        if !ProductRepository::update_versioned(&mut *tx, &updated, current.version).await? {
            warn!(product_id = %id, version = current.version, "Concurrent product update");
            return Err(StoreError::conflict(format!(
                "product {} was modified concurrently",
                id
            )));
        }

        Self::commit(tx).await?;
        Ok(updated)
    }

    async fn delete_product(&self, id: &str) -> StoreResult<()> {
        Ok(self.db.products().delete(id).await?)
    }

    async fn get_product(&self, id: &str) -> StoreResult<Product> {
        self.db
            .products()
            .get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Product", id))
    }

    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        let products = self.db.products().list(query.sort).await?;

        // SQLite's LOWER() only folds ASCII; match in Rust like MemoryStore.
        Ok(match query.needle() {
            Some(needle) => products
                .into_iter()
                .filter(|p| p.matches_search(&needle))
                .collect(),
            None => products,
        })
    }

    // =========================================================================
    // Cart
    // =========================================================================

    async fn add_to_cart(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> StoreResult<()> {
        validate_required("user_id", user_id)?;
        validate_quantity(quantity)?;

        debug!(user_id = %user_id, product_id = %product_id, quantity, "Adding to cart");

        let mut tx = self.begin().await?;

        let (stock, _) = ProductRepository::stock_and_price(&mut *tx, product_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Product", product_id))?;

        let existing = CartRepository::line_quantity(&mut *tx, user_id, product_id)
            .await?
            .unwrap_or(0);

        let requested = existing.saturating_add(quantity);
        if requested > stock {
            return Err(StoreError::InsufficientStock {
                product_id: product_id.to_string(),
                available: stock,
                requested,
            });
        }

        CartRepository::upsert_line(&mut *tx, user_id, product_id, requested, Utc::now()).await?;
        Self::commit(tx).await
    }

    async fn remove_from_cart(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> StoreResult<()> {
        validate_quantity(quantity)?;

        debug!(user_id = %user_id, product_id = %product_id, quantity, "Removing from cart");

        let mut tx = self.begin().await?;

        let existing = CartRepository::line_quantity(&mut *tx, user_id, product_id)
            .await?
            .ok_or_else(|| StoreError::not_found("CartItem", product_id))?;

        if existing <= quantity {
            CartRepository::delete_line(&mut *tx, user_id, product_id).await?;
        } else {
            CartRepository::upsert_line(
                &mut *tx,
                user_id,
                product_id,
                existing - quantity,
                Utc::now(),
            )
            .await?;
        }

        Self::commit(tx).await
    }

    async fn clear_cart(&self, user_id: &str) -> StoreResult<()> {
        Ok(self.db.carts().clear(user_id).await?)
    }

    async fn get_cart(&self, user_id: &str) -> StoreResult<Cart> {
        let items = self.db.carts().items(user_id).await?;
        Ok(Cart {
            user_id: user_id.to_string(),
            items,
        })
    }

    // =========================================================================
    // Orders
    // =========================================================================

    async fn create_order(
        &self,
        user_id: &str,
        items: &[CartItem],
        amount_cents: i64,
        status: OrderStatus,
        payment_ref: &str,
    ) -> StoreResult<Order> {
        validate_required("user_id", user_id)?;
        validate_amount_cents(amount_cents)?;
        let lines = merge_order_lines(items)?;

        let now = Utc::now();
        let order_id = new_id();
        let mut snapshot = Vec::with_capacity(lines.len());

        let mut tx = self.begin().await?;

        for line in &lines {
            let decremented =
                ProductRepository::decrement_stock(&mut *tx, &line.product_id, line.quantity, now)
                    .await?;

            let observed = ProductRepository::stock_and_price(&mut *tx, &line.product_id).await?;

            let price_cents = match (decremented, observed) {
                (true, Some((_, price_cents))) => price_cents,
                (_, None) => {
                    return Err(StoreError::not_found("Product", &line.product_id));
                }
                (false, Some((stock, _))) => {
                    warn!(
                        user_id = %user_id,
                        product_id = %line.product_id,
                        available = stock,
                        requested = line.quantity,
                        "Checkout rejected"
                    );
                    return Err(StoreError::InsufficientStock {
                        product_id: line.product_id.clone(),
                        available: stock,
                        requested: line.quantity,
                    });
                }
            };

            snapshot.push(OrderItem {
                order_id: order_id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                price_cents,
            });
        }

        let order = Order {
            id: order_id,
            user_id: user_id.to_string(),
            items: snapshot,
            amount_cents,
            status,
            payment_ref: payment_ref.to_string(),
            created_at: now,
        };

        OrderRepository::insert_header(&mut *tx, &order).await?;
        for item in &order.items {
            OrderRepository::insert_item(&mut *tx, item).await?;
        }

        Self::commit(tx).await?;

        debug!(order_id = %order.id, user_id = %user_id, lines = lines.len(), "Order created");
        Ok(order)
    }

    async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> StoreResult<()> {
        Ok(self.db.orders().update_status(order_id, status).await?)
    }

    async fn update_order_payment_ref(
        &self,
        order_id: &str,
        payment_ref: &str,
    ) -> StoreResult<()> {
        Ok(self
            .db
            .orders()
            .update_payment_ref(order_id, payment_ref)
            .await?)
    }

    async fn get_order(&self, order_id: &str) -> StoreResult<Order> {
        self.db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Order", order_id))
    }

    async fn list_orders_by_user(&self, user_id: &str) -> StoreResult<Vec<Order>> {
        Ok(self.db.orders().list_by_user(user_id).await?)
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        Ok(self.db.orders().list_all().await?)
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    async fn create_review(
        &self,
        user_id: &str,
        user_name: &str,
        user_photo: &str,
        rating: i64,
        comment: &str,
    ) -> StoreResult<Review> {
        validate_required("user_id", user_id)?;
        validate_rating(rating)?;

        let mut tx = self.begin().await?;

        if OrderRepository::count_by_user(&mut *tx, user_id).await? == 0 {
            return Err(StoreError::forbidden("user has no orders"));
        }
        if ReviewRepository::count_by_user(&mut *tx, user_id).await? > 0 {
            return Err(StoreError::forbidden("user has already submitted a review"));
        }

        let review = Review {
            id: new_id(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            user_photo: review_photo(user_photo),
            rating,
            comment: comment.to_string(),
            created_at: Utc::now(),
        };

        match ReviewRepository::insert(&mut *tx, &review).await {
            Ok(()) => {}
            Err(err) if err.is_unique_violation() => {
                return Err(StoreError::forbidden("user has already submitted a review"));
            }
            Err(err) => return Err(err.into()),
        }

        Self::commit(tx).await?;

        debug!(review_id = %review.id, user_id = %user_id, rating, "Review created");
        Ok(review)
    }

    async fn list_reviews(&self, limit: i64) -> StoreResult<Vec<Review>> {
        Ok(self.db.reviews().list(limit).await?)
    }

    async fn user_review_count(&self, user_id: &str) -> StoreResult<i64> {
        Ok(self.db.reviews().count_for_user(user_id).await?)
    }

    // =========================================================================
    // Users
    // =========================================================================

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        debug!(email = %user.email, "Creating user");
        self.insert_user(user).await
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        self.db
            .users()
            .get_by_email(email.trim())
            .await?
            .ok_or_else(|| StoreError::not_found("User", email))
    }

    async fn get_user_by_id(&self, id: &str) -> StoreResult<User> {
        self.db
            .users()
            .get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found("User", id))
    }

    async fn seed_admin_user(&self, email: &str, password_hash: &str) -> StoreResult<()> {
        if self.db.users().get_by_email(email.trim()).await?.is_some() {
            debug!(email = %email, "Admin user already present");
            return Ok(());
        }

        let admin = NewUser {
            full_name: ADMIN_NAME.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role: UserRole::Admin,
            auth_provider: AuthProvider::Email,
            email_verified: true,
            ..Default::default()
        };

        match self.insert_user(admin).await {
            Ok(_) | Err(StoreError::Conflict { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn update_user_password(&self, user_id: &str, password_hash: &str) -> StoreResult<()> {
        Ok(self
            .db
            .users()
            .update_password(user_id, password_hash)
            .await?)
    }

    async fn mark_email_verified(&self, user_id: &str) -> StoreResult<()> {
        Ok(self.db.users().mark_email_verified(user_id).await?)
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    async fn create_email_verification(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        validate_required("token", token)?;
        self.require_user(user_id).await?;
        Ok(self
            .db
            .tokens()
            .insert_verification(user_id, token, expires_at)
            .await?)
    }

    async fn get_email_verification(&self, token: &str) -> StoreResult<EmailVerification> {
        self.db
            .tokens()
            .get_verification(token)
            .await?
            .ok_or_else(|| StoreError::not_found("EmailVerification", token))
    }

    async fn latest_email_verification(&self, user_id: &str) -> StoreResult<EmailVerification> {
        self.db
            .tokens()
            .latest_verification(user_id)
            .await?
            .ok_or_else(|| StoreError::not_found("EmailVerification", user_id))
    }

    async fn delete_email_verification(&self, token: &str) -> StoreResult<()> {
        Ok(self.db.tokens().delete_verification(token).await?)
    }

    async fn create_password_reset(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        validate_required("token", token)?;
        self.require_user(user_id).await?;
        Ok(self
            .db
            .tokens()
            .insert_reset(user_id, token, expires_at)
            .await?)
    }

    async fn get_password_reset(&self, token: &str) -> StoreResult<PasswordReset> {
        self.db
            .tokens()
            .get_reset(token)
            .await?
            .ok_or_else(|| StoreError::not_found("PasswordReset", token))
    }

    async fn delete_password_reset(&self, token: &str) -> StoreResult<()> {
        Ok(self.db.tokens().delete_reset(token).await?)
    }
}
