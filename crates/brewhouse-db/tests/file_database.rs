//! SqlStore over an on-disk database with a multi-connection pool.
//!
//! Contending transactions must surface as domain errors, never as a
//! lock failure mapped to `Internal`.

mod common;

use std::sync::Arc;

use brewhouse_core::{CartItem, OrderStatus, ProductPatch, StoreError};
use brewhouse_db::{Database, DbConfig, SqlStore, Store};
use tempfile::TempDir;

use common::product;

const TASKS: usize = 16;

/// The directory must outlive the store.
async fn file_store() -> (TempDir, Arc<dyn Store>) {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let config = DbConfig::new(dir.path().join("store.db")).max_connections(8);
    let db = Database::new(config)
        .await
        .expect("file database should open");
    (dir, Arc::new(SqlStore::new(db)) as Arc<dyn Store>)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_versioned_updates_conflict_cleanly() {
    let (_dir, store) = file_store().await;
    let latte = product(&store, "Latte", 3_000, 10).await;

    let mut handles = Vec::new();
    for i in 0..TASKS {
        let store = store.clone();
        let id = latte.id.clone();
        let version = latte.version;
        handles.push(tokio::spawn(async move {
            store
                .update_product(
                    &id,
                    ProductPatch {
                        price_cents: Some(3_000 + i as i64),
                        expected_version: Some(version),
                        ..Default::default()
                    },
                )
                .await
        }));
    }

    let mut updated = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => updated += 1,
            Err(StoreError::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(updated, 1);
    assert_eq!(conflicts, TASKS - 1);
    assert_eq!(store.get_product(&latte.id).await.unwrap().version, latte.version + 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cart_adds_respect_stock() {
    let (_dir, store) = file_store().await;
    let beans = product(&store, "Kintamani 250g", 11_000, 1).await;

    let mut handles = Vec::new();
    for i in 0..TASKS {
        let store = store.clone();
        let id = beans.id.clone();
        handles.push(tokio::spawn(async move {
            // Two tasks per user; only one unit fits on each line.
            let user = format!("u-{}", i % 8);
            store.add_to_cart(&user, &id, 1).await
        }));
    }

    let mut added = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => added += 1,
            Err(StoreError::InsufficientStock { .. }) => refused += 1,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!(added, 8);
    assert_eq!(refused, 8);

    for i in 0..8 {
        let cart = store.get_cart(&format!("u-{i}")).await.unwrap();
        assert_eq!(cart.quantity_of(&beans.id), 1, "u-{i}");
    }

    let mut removals = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        let id = beans.id.clone();
        removals.push(tokio::spawn(async move {
            store.remove_from_cart(&format!("u-{i}"), &id, 1).await
        }));
    }
    for handle in removals {
        handle.await.unwrap().unwrap();
    }
    for i in 0..8 {
        assert!(store.get_cart(&format!("u-{i}")).await.unwrap().is_empty(), "u-{i}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reviews_allow_one_per_user() {
    let (_dir, store) = file_store().await;
    let mocha = product(&store, "Mocha", 4_000, 10).await;
    store
        .create_order("u-1", &[CartItem::new(&mocha.id, 1)], 4_000, OrderStatus::Paid, "pay-1")
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..TASKS {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .create_review("u-1", "Ayu", "", 5, &format!("Visit {i}"))
                .await
        }));
    }

    let mut created = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(StoreError::Forbidden { .. }) => refused += 1,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(refused, TASKS - 1);
    assert_eq!(store.user_review_count("u-1").await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_never_oversell_on_disk() {
    let (_dir, store) = file_store().await;
    let beans = product(&store, "Toraja 250g", 13_000, 5).await;

    let mut handles = Vec::new();
    for i in 0..TASKS {
        let store = store.clone();
        let id = beans.id.clone();
        handles.push(tokio::spawn(async move {
            store
                .create_order(
                    &format!("u-{i}"),
                    &[CartItem::new(&id, 1)],
                    13_000,
                    OrderStatus::Pending,
                    "",
                )
                .await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(StoreError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(placed, 5);
    assert_eq!(store.get_product(&beans.id).await.unwrap().stock, 0);
}
