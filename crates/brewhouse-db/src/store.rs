//! # Store Contract
//!
//! The single trait both engines implement. Callers hold an
//! `Arc<dyn Store>` and never learn which engine is behind it.
//!
//! ## Engines
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          dyn Store                                      │
//! │                              │                                          │
//! │             ┌────────────────┴────────────────┐                         │
//! │             ▼                                 ▼                         │
//! │  ┌─────────────────────┐          ┌─────────────────────────┐          │
//! │  │    MemoryStore      │          │        SqlStore         │          │
//! │  │  one RwLock over    │          │  SqlitePool             │          │
//! │  │  every collection   │          │  tx per checkout        │          │
//! │  │                     │          │  UPDATE ... WHERE       │          │
//! │  │  write lock held    │          │    stock >= ?           │          │
//! │  │  for whole checkout │          │  rows_affected == 0     │          │
//! │  │                     │          │    → rollback           │          │
//! │  └─────────────────────┘          └─────────────────────────┘          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every value handed back is an owned copy. Mutating a returned `Cart` or
//! `Order` never reaches the store.

use async_trait::async_trait;
use brewhouse_core::{
    Cart, CartItem, EmailVerification, NewUser, Order, OrderStatus, PasswordReset, Product,
    ProductDraft, ProductPatch, ProductQuery, Review, StoreResult, User,
};
use chrono::{DateTime, Utc};

/// Transactional Cart / Order / Product store.
///
/// ## Error Contract
/// - `NotFound` when the addressed record is absent
/// - `Validation` for bad input, before any state is touched
/// - `InsufficientStock` from cart admission and checkout
/// - `Conflict` for duplicate emails and stale product versions
/// - `Forbidden` from the review gate
/// - `Internal` for backend failures
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Inventory
    // =========================================================================

    /// Creates a product with a fresh id, version 1 and `created_at = now`.
    async fn create_product(&self, draft: ProductDraft) -> StoreResult<Product>;

    /// Applies `patch` atomically, bumping `version` and `updated_at`.
    async fn update_product(&self, id: &str, patch: ProductPatch) -> StoreResult<Product>;

    /// Deletes a product and every cart line that references it.
    async fn delete_product(&self, id: &str) -> StoreResult<()>;

    async fn get_product(&self, id: &str) -> StoreResult<Product>;

    /// Newest first, or best-seller first when the query asks for it.
    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>>;

    // =========================================================================
    // Cart
    // =========================================================================

    /// Adds `quantity` units, merging into an existing line.
    async fn add_to_cart(&self, user_id: &str, product_id: &str, quantity: i64)
        -> StoreResult<()>;

    /// Removes `quantity` units; the line disappears once it reaches zero.
    async fn remove_from_cart(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> StoreResult<()>;

    /// Idempotent.
    async fn clear_cart(&self, user_id: &str) -> StoreResult<()>;

    /// Snapshot of the cart; empty for users who never added anything.
    async fn get_cart(&self, user_id: &str) -> StoreResult<Cart>;

    // =========================================================================
    // Orders
    // =========================================================================

    /// Atomic checkout: every line's stock is decremented and the order is
    /// persisted, or nothing changes.
    async fn create_order(
        &self,
        user_id: &str,
        items: &[CartItem],
        amount_cents: i64,
        status: OrderStatus,
        payment_ref: &str,
    ) -> StoreResult<Order>;

    async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> StoreResult<()>;

    async fn update_order_payment_ref(&self, order_id: &str, payment_ref: &str)
        -> StoreResult<()>;

    async fn get_order(&self, order_id: &str) -> StoreResult<Order>;

    async fn list_orders_by_user(&self, user_id: &str) -> StoreResult<Vec<Order>>;

    async fn list_orders(&self) -> StoreResult<Vec<Order>>;

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Review gate: the user needs at least one order and no prior review.
    async fn create_review(
        &self,
        user_id: &str,
        user_name: &str,
        user_photo: &str,
        rating: i64,
        comment: &str,
    ) -> StoreResult<Review>;

    /// Newest first; `limit <= 0` means no cap.
    async fn list_reviews(&self, limit: i64) -> StoreResult<Vec<Review>>;

    async fn user_review_count(&self, user_id: &str) -> StoreResult<i64>;

    // =========================================================================
    // Users
    // =========================================================================

    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn get_user_by_email(&self, email: &str) -> StoreResult<User>;

    async fn get_user_by_id(&self, id: &str) -> StoreResult<User>;

    /// Creates the administrator account unless the email is taken.
    async fn seed_admin_user(&self, email: &str, password_hash: &str) -> StoreResult<()>;

    async fn update_user_password(&self, user_id: &str, password_hash: &str) -> StoreResult<()>;

    async fn mark_email_verified(&self, user_id: &str) -> StoreResult<()>;

    // =========================================================================
    // Tokens
    // =========================================================================

    async fn create_email_verification(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn get_email_verification(&self, token: &str) -> StoreResult<EmailVerification>;

    /// The verification with the latest expiry for `user_id`.
    async fn latest_email_verification(&self, user_id: &str) -> StoreResult<EmailVerification>;

    async fn delete_email_verification(&self, token: &str) -> StoreResult<()>;

    async fn create_password_reset(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn get_password_reset(&self, token: &str) -> StoreResult<PasswordReset>;

    async fn delete_password_reset(&self, token: &str) -> StoreResult<()>;
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Generates a new record id.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Photo stored on a review when the caller passes none.
pub(crate) fn review_photo(user_photo: &str) -> String {
    if user_photo.trim().is_empty() {
        brewhouse_core::DEFAULT_REVIEW_PHOTO.to_string()
    } else {
        user_photo.to_string()
    }
}

pub(crate) const ADMIN_NAME: &str = "Administrator";
