//! # In-Memory Engine
//!
//! Every collection lives in one `State` behind a single `tokio::sync::RwLock`.
//!
//! ## Locking Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MemoryStore                                      │
//! │                                                                         │
//! │   get_* / list_*            read lock  (shared, many at once)           │
//! │   add_to_cart, update_*     write lock (exclusive)                      │
//! │   create_order              write lock for validate + apply             │
//! │   create_review             write lock for gate checks + insert         │
//! │                                                                         │
//! │   ┌──────────────────────── RwLock<State> ────────────────────────┐    │
//! │   │ products  carts  orders  reviews  users  tokens   seq counter │    │
//! │   └───────────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! │   No await points while the guard is held.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records carry an insertion sequence so "newest first" is stable even when
//! two records share a `created_at`.

use std::collections::HashMap;

use async_trait::async_trait;
use brewhouse_core::validation::{
    merge_order_lines, validate_amount_cents, validate_draft, validate_email, validate_product,
    validate_quantity, validate_rating, validate_required,
};
use brewhouse_core::{
    AuthProvider, Cart, CartItem, EmailVerification, NewUser, Order, OrderItem, OrderStatus,
    PasswordReset, Product, ProductDraft, ProductPatch, ProductQuery, ProductSort, Review,
    StoreError, StoreResult, User, UserRole,
};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::store::{new_id, review_photo, Store, ADMIN_NAME};

// =============================================================================
// State
// =============================================================================

/// A record plus the order it was inserted in.
#[derive(Debug, Clone)]
struct Sequenced<T> {
    seq: u64,
    value: T,
}

#[derive(Debug, Default)]
struct State {
    next_seq: u64,
    products: HashMap<String, Sequenced<Product>>,
    /// Lines in insertion order, product ids unique.
    carts: HashMap<String, Vec<CartItem>>,
    orders: HashMap<String, Sequenced<Order>>,
    reviews: Vec<Sequenced<Review>>,
    users: HashMap<String, User>,
    verifications: HashMap<String, EmailVerification>,
    resets: HashMap<String, PasswordReset>,
}

impl State {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn product(&self, id: &str) -> StoreResult<&Product> {
        self.products
            .get(id)
            .map(|p| &p.value)
            .ok_or_else(|| StoreError::not_found("Product", id))
    }

    fn order_mut(&mut self, id: &str) -> StoreResult<&mut Order> {
        self.orders
            .get_mut(id)
            .map(|o| &mut o.value)
            .ok_or_else(|| StoreError::not_found("Order", id))
    }

    fn user_mut(&mut self, id: &str) -> StoreResult<&mut User> {
        self.users
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("User", id))
    }

    fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email == email)
    }

    /// Units sold per product across orders that count as sales.
    fn units_sold(&self) -> HashMap<&str, i64> {
        let mut sold: HashMap<&str, i64> = HashMap::new();
        for order in self.orders.values().map(|o| &o.value) {
            if !order.status.counts_as_sale() {
                continue;
            }
            for item in &order.items {
                *sold.entry(item.product_id.as_str()).or_insert(0) += item.quantity;
            }
        }
        sold
    }

    fn insert_user(&mut self, user: NewUser, now: DateTime<Utc>) -> StoreResult<User> {
        validate_email(&user.email)?;
        let email = user.email.trim().to_string();
        if self.user_by_email(&email).is_some() {
            return Err(StoreError::conflict("email already registered"));
        }

        let record = User {
            id: new_id(),
            full_name: user.full_name,
            phone: user.phone,
            email,
            password_hash: user.password_hash,
            role: user.role,
            auth_provider: user.auth_provider,
            google_id: user.google_id,
            email_verified: user.email_verified,
            created_at: now,
        };
        self.users.insert(record.id.clone(), record.clone());
        Ok(record)
    }
}

/// Newest first, insertion order breaking timestamp ties.
fn newest_first<T>(items: &mut [&Sequenced<T>], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by(|a, b| {
        created_at(&b.value)
            .cmp(&created_at(&a.value))
            .then(b.seq.cmp(&a.seq))
    });
}

// =============================================================================
// MemoryStore
// =============================================================================

/// Process-local store. Create one per process or per test.
///
/// ## Usage
/// ```rust,ignore
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// store.add_to_cart("u-1", &product.id, 2).await?;
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
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

        debug!(product_id = %product.id, sku = %product.sku, "Creating product");

        let mut state = self.state.write().await;
        let seq = state.next_seq();
        state.products.insert(
            product.id.clone(),
            Sequenced {
                seq,
                value: product.clone(),
            },
        );
        Ok(product)
    }

    async fn update_product(&self, id: &str, patch: ProductPatch) -> StoreResult<Product> {
        debug!(product_id = %id, "Updating product");

        let mut state = self.state.write().await;
        let stored = state
            .products
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("Product", id))?;

        if let Some(expected) = patch.expected_version {
            if expected != stored.value.version {
                return Err(StoreError::conflict(format!(
                    "product {} is at version {}, expected {}",
                    id, stored.value.version, expected
                )));
            }
        }

        if patch.is_empty() {
            return Ok(stored.value.clone());
        }

        let mut updated = stored.value.clone();
        patch.apply_to(&mut updated);
        validate_product(&updated)?;
        updated.updated_at = Utc::now();
        updated.version += 1;

        stored.value = updated.clone();
        Ok(updated)
    }

    async fn delete_product(&self, id: &str) -> StoreResult<()> {
        debug!(product_id = %id, "Deleting product");

        let mut state = self.state.write().await;
        if state.products.remove(id).is_none() {
            return Err(StoreError::not_found("Product", id));
        }
        for lines in state.carts.values_mut() {
            lines.retain(|line| line.product_id != id);
        }
        Ok(())
    }

    async fn get_product(&self, id: &str) -> StoreResult<Product> {
        let state = self.state.read().await;
        state.product(id).cloned()
    }

    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        let needle = query.needle();
        let state = self.state.read().await;

        let mut matches: Vec<&Sequenced<Product>> = state
            .products
            .values()
            .filter(|p| {
                needle
                    .as_deref()
                    .map_or(true, |needle| p.value.matches_search(needle))
            })
            .collect();
        newest_first(&mut matches, |p| p.created_at);

        if query.sort == ProductSort::BestSeller {
            let sold = state.units_sold();
            // Stable sort keeps the newest-first order among equal sales.
            matches.sort_by_key(|p| {
                std::cmp::Reverse(sold.get(p.value.id.as_str()).copied().unwrap_or(0))
            });
        }

        debug!(count = matches.len(), "Listed products");
        Ok(matches.into_iter().map(|p| p.value.clone()).collect())
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

        let mut state = self.state.write().await;
        let stock = state.product(product_id)?.stock;

        let lines = state.carts.entry(user_id.to_string()).or_default();
        let existing = lines
            .iter()
            .find(|line| line.product_id == product_id)
            .map_or(0, |line| line.quantity);

        let requested = existing.saturating_add(quantity);
        if requested > stock {
            return Err(StoreError::InsufficientStock {
                product_id: product_id.to_string(),
                available: stock,
                requested,
            });
        }

        match lines.iter_mut().find(|line| line.product_id == product_id) {
            Some(line) => line.quantity = requested,
            None => lines.push(CartItem::new(product_id, quantity)),
        }
        Ok(())
    }

    async fn remove_from_cart(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> StoreResult<()> {
        validate_quantity(quantity)?;

        debug!(user_id = %user_id, product_id = %product_id, quantity, "Removing from cart");

        let mut state = self.state.write().await;
        let lines = state
            .carts
            .get_mut(user_id)
            .ok_or_else(|| StoreError::not_found("CartItem", product_id))?;
        let idx = lines
            .iter()
            .position(|line| line.product_id == product_id)
            .ok_or_else(|| StoreError::not_found("CartItem", product_id))?;

        if lines[idx].quantity <= quantity {
            lines.remove(idx);
        } else {
            lines[idx].quantity -= quantity;
        }
        Ok(())
    }

    async fn clear_cart(&self, user_id: &str) -> StoreResult<()> {
        debug!(user_id = %user_id, "Clearing cart");
        self.state.write().await.carts.remove(user_id);
        Ok(())
    }

    async fn get_cart(&self, user_id: &str) -> StoreResult<Cart> {
        let state = self.state.read().await;
        Ok(Cart {
            user_id: user_id.to_string(),
            items: state.carts.get(user_id).cloned().unwrap_or_default(),
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

        let mut state = self.state.write().await;

        // Validate every line before touching any stock.
        for line in &lines {
            let product = state.product(&line.product_id)?;
            if !product.can_fulfil(line.quantity) {
                warn!(
                    user_id = %user_id,
                    product_id = %line.product_id,
                    available = product.stock,
                    requested = line.quantity,
                    "Checkout rejected"
                );
                return Err(StoreError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    available: product.stock,
                    requested: line.quantity,
                });
            }
        }

        let now = Utc::now();
        let order_id = new_id();
        let mut snapshot = Vec::with_capacity(lines.len());

        for line in &lines {
            let stored = state
                .products
                .get_mut(&line.product_id)
                .ok_or_else(|| StoreError::not_found("Product", &line.product_id))?;
            stored.value.stock -= line.quantity;
            stored.value.version += 1;
            stored.value.updated_at = now;

            snapshot.push(OrderItem {
                order_id: order_id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                price_cents: stored.value.price_cents,
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

        debug!(order_id = %order.id, user_id = %user_id, lines = lines.len(), "Order created");

        let seq = state.next_seq();
        state.orders.insert(
            order.id.clone(),
            Sequenced {
                seq,
                value: order.clone(),
            },
        );
        Ok(order)
    }

    async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> StoreResult<()> {
        debug!(order_id = %order_id, status = %status, "Updating order status");
        let mut state = self.state.write().await;
        state.order_mut(order_id)?.status = status;
        Ok(())
    }

    async fn update_order_payment_ref(
        &self,
        order_id: &str,
        payment_ref: &str,
    ) -> StoreResult<()> {
        debug!(order_id = %order_id, "Updating order payment reference");
        let mut state = self.state.write().await;
        state.order_mut(order_id)?.payment_ref = payment_ref.to_string();
        Ok(())
    }

    async fn get_order(&self, order_id: &str) -> StoreResult<Order> {
        let state = self.state.read().await;
        state
            .orders
            .get(order_id)
            .map(|o| o.value.clone())
            .ok_or_else(|| StoreError::not_found("Order", order_id))
    }

    async fn list_orders_by_user(&self, user_id: &str) -> StoreResult<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<&Sequenced<Order>> = state
            .orders
            .values()
            .filter(|o| o.value.user_id == user_id)
            .collect();
        newest_first(&mut orders, |o| o.created_at);
        Ok(orders.into_iter().map(|o| o.value.clone()).collect())
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<&Sequenced<Order>> = state.orders.values().collect();
        newest_first(&mut orders, |o| o.created_at);
        Ok(orders.into_iter().map(|o| o.value.clone()).collect())
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

        let mut state = self.state.write().await;

        if !state.orders.values().any(|o| o.value.user_id == user_id) {
            return Err(StoreError::forbidden("user has no orders"));
        }
        if state.reviews.iter().any(|r| r.value.user_id == user_id) {
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

        debug!(review_id = %review.id, user_id = %user_id, rating, "Review created");

        let seq = state.next_seq();
        state.reviews.push(Sequenced {
            seq,
            value: review.clone(),
        });
        Ok(review)
    }

    async fn list_reviews(&self, limit: i64) -> StoreResult<Vec<Review>> {
        let state = self.state.read().await;
        let mut reviews: Vec<&Sequenced<Review>> = state.reviews.iter().collect();
        newest_first(&mut reviews, |r| r.created_at);

        let reviews = reviews.into_iter().map(|r| r.value.clone());
        Ok(if limit > 0 {
            reviews.take(limit as usize).collect()
        } else {
            reviews.collect()
        })
    }

    async fn user_review_count(&self, user_id: &str) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .iter()
            .filter(|r| r.value.user_id == user_id)
            .count() as i64)
    }

    // =========================================================================
    // Users
    // =========================================================================

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        debug!(email = %user.email, "Creating user");
        let mut state = self.state.write().await;
        state.insert_user(user, Utc::now())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        let state = self.state.read().await;
        state
            .user_by_email(email.trim())
            .cloned()
            .ok_or_else(|| StoreError::not_found("User", email))
    }

    async fn get_user_by_id(&self, id: &str) -> StoreResult<User> {
        let state = self.state.read().await;
        state
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("User", id))
    }

    async fn seed_admin_user(&self, email: &str, password_hash: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.user_by_email(email.trim()).is_some() {
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
        state.insert_user(admin, Utc::now())?;
        Ok(())
    }

    async fn update_user_password(&self, user_id: &str, password_hash: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.user_mut(user_id)?.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn mark_email_verified(&self, user_id: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.user_mut(user_id)?.email_verified = true;
        Ok(())
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
        let mut state = self.state.write().await;
        state.user_mut(user_id)?;
        if state.verifications.contains_key(token) {
            return Err(StoreError::conflict("verification token already exists"));
        }
        state.verifications.insert(
            token.to_string(),
            EmailVerification {
                token: token.to_string(),
                user_id: user_id.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get_email_verification(&self, token: &str) -> StoreResult<EmailVerification> {
        let state = self.state.read().await;
        state
            .verifications
            .get(token)
            .cloned()
            .ok_or_else(|| StoreError::not_found("EmailVerification", token))
    }

    async fn latest_email_verification(&self, user_id: &str) -> StoreResult<EmailVerification> {
        let state = self.state.read().await;
        state
            .verifications
            .values()
            .filter(|v| v.user_id == user_id)
            .max_by_key(|v| v.expires_at)
            .cloned()
            .ok_or_else(|| StoreError::not_found("EmailVerification", user_id))
    }

    async fn delete_email_verification(&self, token: &str) -> StoreResult<()> {
        self.state.write().await.verifications.remove(token);
        Ok(())
    }

    async fn create_password_reset(
        &self,
        user_id: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        validate_required("token", token)?;
        let mut state = self.state.write().await;
        state.user_mut(user_id)?;
        if state.resets.contains_key(token) {
            return Err(StoreError::conflict("reset token already exists"));
        }
        state.resets.insert(
            token.to_string(),
            PasswordReset {
                token: token.to_string(),
                user_id: user_id.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get_password_reset(&self, token: &str) -> StoreResult<PasswordReset> {
        let state = self.state.read().await;
        state
            .resets
            .get(token)
            .cloned()
            .ok_or_else(|| StoreError::not_found("PasswordReset", token))
    }

    async fn delete_password_reset(&self, token: &str) -> StoreResult<()> {
        self.state.write().await.resets.remove(token);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
