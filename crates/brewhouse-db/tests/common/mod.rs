//! Shared fixtures: every contract test runs once per engine.

#![allow(dead_code)]

use std::sync::Arc;

use brewhouse_core::{Product, ProductDraft};
use brewhouse_db::{Database, DbConfig, MemoryStore, SqlStore, Store};

/// One fresh store per engine, labelled for assertion messages.
pub async fn engines() -> Vec<(&'static str, Arc<dyn Store>)> {
    let db = Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory sqlite should open");

    vec![
        ("memory", Arc::new(MemoryStore::new()) as Arc<dyn Store>),
        ("sqlite", Arc::new(SqlStore::new(db)) as Arc<dyn Store>),
    ]
}

pub fn draft(name: &str, price_cents: i64, stock: i64) -> ProductDraft {
    ProductDraft {
        name: name.to_string(),
        category: "coffee".to_string(),
        price_cents,
        stock,
        ..Default::default()
    }
}

pub async fn product(store: &Arc<dyn Store>, name: &str, price_cents: i64, stock: i64) -> Product {
    store
        .create_product(draft(name, price_cents, stock))
        .await
        .expect("product should be created")
}
