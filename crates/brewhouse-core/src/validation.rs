//! # Validation Module
//!
//! Business rule validation shared by both store engines.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request binding (outside this workspace)                     │
//! │  ├── JSON shape, required fields                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (called by every engine before touching state)   │
//! │  ├── price > 0, stock ≥ 0, quantity > 0, rating 1..=5                 │
//! │  └── line merging for checkout                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Storage                                                      │
//! │  ├── CHECK (stock >= 0), UNIQUE (email)                                │
//! │  └── conditional UPDATE ... WHERE stock >= ?                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use brewhouse_core::validation::{validate_sku, validate_quantity};
//!
//! validate_sku("ESP-001").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::ValidationError;
use crate::types::{CartItem, Product, ProductDraft};
use crate::{MAX_RATING, MIN_RATING};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Rejects an empty or whitespace-only identifier.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use brewhouse_core::validation::validate_sku;
///
/// assert!(validate_sku("abc-123").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 100,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 255 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 255 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 255,
        });
    }

    Ok(())
}

/// Validates an email address (presence and a single `@`).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain".to_string(),
        }),
    }
}

/// Generates an SKU from a product name: the uppercase initials of each word,
/// a hyphen, then six digits. "Kopi Susu Gula Aren" → `KSGA-042137`.
pub fn generate_sku(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().find(|c| c.is_alphanumeric()))
        .flat_map(char::to_uppercase)
        .collect();
    let initials = if initials.is_empty() {
        "PROD".to_string()
    } else {
        initials
    };
    let suffix = Uuid::new_v4().as_u128() % 1_000_000;
    format!("{}-{:06}", initials, suffix)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart or order line quantity. Any positive count is accepted;
/// stock is the only upper bound.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a product price. Free products are not allowed.
///
/// ## Example
/// ```rust
/// use brewhouse_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "price_cents".to_string(),
        });
    }

    Ok(())
}

/// Validates a stock level.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

/// Validates an order amount. Zero is allowed (fully discounted orders).
pub fn validate_amount_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "amount_cents".to_string(),
        });
    }

    Ok(())
}

/// Validates a review rating.
pub fn validate_rating(rating: i64) -> ValidationResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: MIN_RATING,
            max: MAX_RATING,
        });
    }

    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates a draft and returns it with a resolved SKU.
pub fn validate_draft(draft: &ProductDraft) -> ValidationResult<ProductDraft> {
    validate_product_name(&draft.name)?;
    validate_price_cents(draft.price_cents)?;
    validate_stock(draft.stock)?;

    let mut resolved = draft.clone();
    resolved.name = draft.name.trim().to_string();
    resolved.sku = if draft.sku.trim().is_empty() {
        generate_sku(&resolved.name)
    } else {
        draft.sku.trim().to_string()
    };
    validate_sku(&resolved.sku)?;

    Ok(resolved)
}

/// Validates a product after a patch has been applied.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    validate_price_cents(product.price_cents)?;
    validate_stock(product.stock)?;
    validate_sku(&product.sku)?;
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates checkout lines and merges duplicate product ids.
///
/// ## Rules
/// - At least one line
/// - Every quantity positive
/// - Repeated product ids are summed, first occurrence keeps its position
pub fn merge_order_lines(items: &[CartItem]) -> ValidationResult<Vec<CartItem>> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    let mut merged: Vec<CartItem> = Vec::with_capacity(items.len());
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for item in items {
        validate_required("product_id", &item.product_id)?;
        validate_quantity(item.quantity)?;

        match positions.get(item.product_id.as_str()) {
            Some(&idx) => {
                if let Some(line) = merged.get_mut(idx) {
                    line.quantity = line.quantity.saturating_add(item.quantity);
                }
            }
            None => {
                positions.insert(item.product_id.as_str(), merged.len());
                merged.push(item.clone());
            }
        }
    }

    Ok(merged)
}

// =============================================================================
// Unit Tests
// =============================================================================
