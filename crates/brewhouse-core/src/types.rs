//! # Domain Types
//!
//! Plain records shared by both store engines.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Cart       │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  user_id        │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  items[]        │   │  items[] (snap) │       │
//! │  │  price_cents    │   │   CartItem      │   │  amount_cents   │       │
//! │  │  stock ≥ 0      │   │   (pid, qty>0)  │   │  status         │       │
//! │  │  version        │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Review      │   │      User       │   │  OrderStatus    │       │
//! │  │  rating 1..=5   │   │  email (unique) │   │  Pending Paid   │       │
//! │  │  one per user   │   │  role, provider │   │  Failed  Done   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! `OrderItem.price_cents` freezes the product price at checkout. Later
//! product edits never reach an existing order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A sellable catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    pub description: String,

    /// Free-form category used for filtering ("coffee", "pastry", ...).
    pub category: String,

    /// Price in minor currency units. Always > 0.
    pub price_cents: i64,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Thumbnail image reference.
    pub thumbnail: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Optimistic concurrency token, bumped by every write.
    pub version: i64,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// True when `quantity` units can be taken from stock.
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }

    /// Case-insensitive substring match over name, description, SKU and
    /// category. `needle` must already be lowercase.
    pub fn matches_search(&self, needle: &str) -> bool {
        [&self.name, &self.description, &self.sku, &self.category]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Input for creating a product. The store assigns id, timestamps and
/// version.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price_cents: i64,
    /// Empty means "generate from the name".
    #[serde(default)]
    pub sku: String,
    pub stock: i64,
    #[serde(default)]
    pub thumbnail: String,
}

/// A field-level partial update. `None` leaves the field untouched.
///
/// ## Concurrency
/// `expected_version` is an etag: when set, the update only applies if the
/// stored product still carries that version, otherwise the store reports
/// `Conflict`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: Option<i64>,
    pub sku: Option<String>,
    pub stock: Option<i64>,
    pub thumbnail: Option<String>,
    pub expected_version: Option<i64>,
}

impl ProductPatch {
    /// Applies the patch to `product` in place. Does not touch timestamps or
    /// version; the store stamps those.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(category) = &self.category {
            product.category = category.clone();
        }
        if let Some(price_cents) = self.price_cents {
            product.price_cents = price_cents;
        }
        if let Some(sku) = &self.sku {
            product.sku = sku.clone();
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(thumbnail) = &self.thumbnail {
            product.thumbnail = thumbnail.clone();
        }
    }

    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.price_cents.is_none()
            && self.sku.is_none()
            && self.stock.is_none()
            && self.thumbnail.is_none()
    }
}

/// Ordering applied by `list_products`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    /// Newest-created first.
    #[default]
    Newest,
    /// Most units sold in paid/done orders first, then newest-created.
    BestSeller,
}

/// Catalog listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub sort: ProductSort,
}

impl ProductQuery {
    /// All products, newest first.
    pub fn all() -> Self {
        Self::default()
    }

    /// Substring search, newest first.
    pub fn search(term: impl Into<String>) -> Self {
        ProductQuery {
            search: term.into(),
            sort: ProductSort::Newest,
        }
    }

    pub fn sorted_by(mut self, sort: ProductSort) -> Self {
        self.sort = sort;
        self
    }

    /// Lowercased, trimmed search term, `None` when the query matches all.
    pub fn needle(&self) -> Option<String> {
        let term = self.search.trim();
        if term.is_empty() {
            None
        } else {
            Some(term.to_lowercase())
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One line of a cart: a product and a positive quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: i64,
}

impl CartItem {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        CartItem {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A user's cart. Product ids are unique across `items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    pub user_id: String,
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Creates an empty cart.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Cart {
            user_id: user_id.into(),
            items: Vec::new(),
        }
    }

    /// Quantity of `product_id` already in the cart (0 when absent).
    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.items
            .iter()
            .find(|item| item.product_id == product_id)
            .map_or(0, |item| item.quantity)
    }

    /// Total units across every line.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created at checkout, awaiting payment.
    Pending,
    /// Payment provider confirmed the charge.
    Paid,
    /// Payment was rejected or expired.
    Failed,
    /// Fulfilled.
    Done,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
            OrderStatus::Done => "done",
        }
    }

    /// Statuses whose items count towards best-seller ranking.
    pub const fn counts_as_sale(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Done)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    /// Case-insensitive; `completed` is accepted as an alias of `done`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "failed" => Ok(OrderStatus::Failed),
            "done" | "completed" => Ok(OrderStatus::Done),
            "" => Err(ValidationError::Required {
                field: "status".to_string(),
            }),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: ["pending", "paid", "failed", "done"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// One immutable line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price at time of purchase (frozen).
    pub price_cents: i64,
}

impl OrderItem {
    /// Unit price × quantity.
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.price_cents * self.quantity)
    }
}

/// A placed order with its item snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub amount_cents: i64,
    pub status: OrderStatus,
    /// Reference returned by the external payment provider.
    pub payment_ref: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Sum of the snapshot line totals (may differ from `amount_cents`
    /// when the caller priced the order differently).
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

// =============================================================================
// Review
// =============================================================================

/// A storefront review. At most one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Review {
    pub id: String,
    pub user_id: String,
    /// Display name at time of review (frozen).
    pub user_name: String,
    /// Avatar reference at time of review (frozen).
    pub user_photo: String,
    /// 1 to 5 inclusive.
    pub rating: i64,
    pub comment: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    #[default]
    Email,
    Google,
}

/// An account. Carts, orders and reviews reference it by id only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    /// Never leaves the process.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: UserRole,
    pub auth_provider: AuthProvider,
    pub google_id: String,
    pub email_verified: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub auth_provider: AuthProvider,
    pub google_id: String,
    pub email_verified: bool,
}

/// A pending email verification token.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct EmailVerification {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

/// A pending password reset token.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PasswordReset {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".to_string(),
            name: "Kopi Susu".to_string(),
            description: "Iced palm sugar latte".to_string(),
            category: "Coffee".to_string(),
            price_cents: 2_500_000,
            sku: "abc-123".to_string(),
            stock: 5,
            thumbnail: String::new(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[test]
    fn test_order_status_parse() {
        assert_eq!("PAID".parse::<OrderStatus>().unwrap(), OrderStatus::Paid);
        assert_eq!(" done ".parse::<OrderStatus>().unwrap(), OrderStatus::Done);
        assert_eq!(
            "completed".parse::<OrderStatus>().unwrap(),
            OrderStatus::Done
        );
        let err = "shipped".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.field(), "status");
    }

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert!(OrderStatus::Done.counts_as_sale());
        assert!(!OrderStatus::Failed.counts_as_sale());
    }

    #[test]
    fn test_search_matches_sku_case_insensitively() {
        let product = sample_product();
        let needle = ProductQuery::search("ABC").needle().unwrap();
        assert!(product.matches_search(&needle));
        assert!(product.matches_search("palm sugar"));
        assert!(!product.matches_search("croissant"));
        assert_eq!(ProductQuery::search("   ").needle(), None);
    }

    #[test]
    fn test_patch_applies_only_named_fields() {
        let mut product = sample_product();
        let patch = ProductPatch {
            price_cents: Some(3_000_000),
            stock: Some(0),
            ..Default::default()
        };
        patch.apply_to(&mut product);
        assert_eq!(product.price_cents, 3_000_000);
        assert_eq!(product.stock, 0);
        assert_eq!(product.name, "Kopi Susu");
        assert!(!patch.is_empty());
        assert!(ProductPatch::default().is_empty());
    }

    #[test]
    fn test_cart_helpers() {
        let cart = Cart {
            user_id: "u-1".to_string(),
            items: vec![CartItem::new("p-1", 2), CartItem::new("p-2", 3)],
        };
        assert_eq!(cart.quantity_of("p-2"), 3);
        assert_eq!(cart.quantity_of("p-9"), 0);
        assert_eq!(cart.total_quantity(), 5);
        assert!(Cart::empty("u-2").is_empty());
    }

    #[test]
    fn test_user_json_omits_password_hash() {
        let user = User {
            id: "u-1".to_string(),
            full_name: "Ayu".to_string(),
            phone: String::new(),
            email: "ayu@example.com".to_string(),
            password_hash: "secret-hash".to_string(),
            role: UserRole::default(),
            auth_provider: AuthProvider::default(),
            google_id: String::new(),
            email_verified: false,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));

        let status = serde_json::to_string(&OrderStatus::Paid).unwrap();
        assert_eq!(status, "\"paid\"");
    }

    #[test]
    fn test_order_items_total() {
        let order = Order {
            id: "o-1".to_string(),
            user_id: "u-1".to_string(),
            items: vec![
                OrderItem {
                    order_id: "o-1".to_string(),
                    product_id: "p-1".to_string(),
                    quantity: 2,
                    price_cents: 150,
                },
                OrderItem {
                    order_id: "o-1".to_string(),
                    product_id: "p-2".to_string(),
                    quantity: 1,
                    price_cents: 400,
                },
            ],
            amount_cents: 700,
            status: OrderStatus::Pending,
            payment_ref: String::new(),
            created_at: Utc::now(),
        };
        assert_eq!(order.items_total(), order.amount());
    }
}
