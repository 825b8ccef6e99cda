//! # brewhouse-core: Pure Domain Types for Brewhouse
//!
//! The entity model, money arithmetic, validation rules and error taxonomy
//! shared by every storage engine. Zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Brewhouse Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          HTTP handlers (external: routing, auth, payment)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Store trait                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    brewhouse-db                                 │   │
//! │  │       MemoryStore (RwLock)   │   SqlStore (SQLite tx)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ brewhouse-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   error   │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ StoreError│  │   rules   │  │   │
//! │  │   │Cart Order │  │           │  │           │  │   merge   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entity records (Product, Cart, Order, Review, User)
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - `StoreError` taxonomy and `ValidationError`
//! - [`validation`] - Business rule validation

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{StoreError, StoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Lowest allowed review rating.
pub const MIN_RATING: i64 = 1;

/// Highest allowed review rating.
pub const MAX_RATING: i64 = 5;

/// Photo used when a reviewer has no avatar.
pub const DEFAULT_REVIEW_PHOTO: &str =
    "https://images.unsplash.com/photo-1535713875002-d1d0cf377fde?auto=format&fit=crop&w=240&q=80";
