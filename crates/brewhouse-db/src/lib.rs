//! # brewhouse-db: Store Layer for Brewhouse
//!
//! The `Store` contract and its two engines, plus the checkout service and
//! the configuration that picks an engine.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Brewhouse Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (add to cart, checkout, payment callback, ...)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  brewhouse-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   Checkout ──► Arc<dyn Store> ◄── open_store(&StoreConfig)      │   │
//! │  │                      │                                          │   │
//! │  │          ┌───────────┴───────────┐                              │   │
//! │  │          ▼                       ▼                              │   │
//! │  │   ┌─────────────┐    ┌──────────────────────────────────┐      │   │
//! │  │   │ MemoryStore │    │ SqlStore                         │      │   │
//! │  │   │ RwLock      │    │  Database (pool.rs)              │      │   │
//! │  │   │             │    │  Repositories (repository/)      │      │   │
//! │  │   │             │    │  Migrations (embedded)           │      │   │
//! │  │   └─────────────┘    └──────────────────────────────────┘      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │                         SQLite database file                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - The `Store` trait
//! - [`memory`] - In-memory engine
//! - [`sql_store`] - Relational engine
//! - [`checkout`] - Cart to order coordination
//! - [`config`] - Engine selection
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - SQL per table group
//!
//! ## Usage
//!
//! ```rust,ignore
//! use brewhouse_db::{open_store, Checkout, StoreConfig};
//!
//! let store = open_store(&StoreConfig::load(None)?).await?;
//! store.add_to_cart("user-1", &product_id, 2).await?;
//!
//! let order = Checkout::new(store.clone()).checkout("user-1").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod error;
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod sql_store;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::Checkout;
pub use config::{open_store, Backend, ConfigError, SqliteSettings, StoreConfig};
pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use pool::{Database, DbConfig};
pub use sql_store::SqlStore;
pub use store::Store;

// Repository re-exports for convenience
pub use repository::cart::CartRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::review::ReviewRepository;
pub use repository::token::TokenRepository;
pub use repository::user::UserRepository;
