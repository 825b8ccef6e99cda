//! # Error Types
//!
//! The error taxonomy every store engine speaks.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  brewhouse-core errors (this file)                                     │
//! │  ├── StoreError       - What every Store operation returns             │
//! │  └── ValidationError  - Input validation failures (names the field)    │
//! │                                                                         │
//! │  brewhouse-db errors (separate crate)                                  │
//! │  └── DbError          - sqlx failures, folded into StoreError          │
//! │                                                                         │
//! │  Flow: ValidationError → StoreError ← DbError                          │
//! │        StoreError → (external) transport status code                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store never retries. Every failure comes back synchronously as one of
//! these variants; mapping them to HTTP codes happens outside this workspace.

use thiserror::Error;

// =============================================================================
// Store Error
// =============================================================================

/// Errors returned by every `Store` operation, identical across engines.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Caller input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The write collides with existing state (duplicate email, stale
    /// product version).
    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    /// Not enough stock to admit a cart line or commit a checkout.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Cart (qty: 3, already in cart: 3)
    ///      │
    ///      ▼
    /// Check stock: available=5
    ///      │
    ///      ▼
    /// InsufficientStock { product_id, available: 5, requested: 6 }
    /// ```
    #[error(
        "Insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// The caller is not allowed to perform this operation (review gate).
    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    /// Unexpected backend failure (connectivity, corrupt row, ...).
    #[error("Internal store error: {cause}")]
    Internal { cause: String },
}

impl StoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(reason: impl Into<String>) -> Self {
        StoreError::Conflict {
            reason: reason.into(),
        }
    }

    /// Creates a Forbidden error.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        StoreError::Forbidden {
            reason: reason.into(),
        }
    }

    /// Creates an Internal error.
    pub fn internal(cause: impl Into<String>) -> Self {
        StoreError::Internal {
            cause: cause.into(),
        }
    }

    /// Returns true for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Every variant carries the offending field name so the transport layer can
/// point at it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., unknown status string).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Name of the field that failed validation.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
