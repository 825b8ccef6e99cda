//! # Repository Module
//!
//! SQL for the relational engine, one repository per table group.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  SqlStore (implements Store)                                           │
//! │       │                                                                 │
//! │       ├── pool reads:   db.products().list(sort)                       │
//! │       │                                                                 │
//! │       └── transactions: let mut tx = begin_with("BEGIN IMMEDIATE")    │
//! │                         ProductRepository::decrement_stock(&mut tx..)  │
//! │                         OrderRepository::insert_header(&mut tx, ..)    │
//! │                         tx.commit()                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Methods on `&self` use the pool. Associated functions taking          │
//! │  `&mut SqliteConnection` run inside the caller's transaction.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog listing, stock decrement
//! - [`cart::CartRepository`] - Cart lines
//! - [`order::OrderRepository`] - Orders and item snapshots
//! - [`review::ReviewRepository`] - Reviews
//! - [`user::UserRepository`] - Accounts
//! - [`token::TokenRepository`] - Verification and reset tokens

pub mod cart;
pub mod order;
pub mod product;
pub mod review;
pub mod token;
pub mod user;
