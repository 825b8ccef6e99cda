//! Behaviour both engines must agree on.

mod common;

use std::sync::Arc;

use brewhouse_core::{
    CartItem, NewUser, OrderStatus, ProductDraft, ProductPatch, ProductQuery, ProductSort,
    StoreError, UserRole, DEFAULT_REVIEW_PHOTO,
};
use brewhouse_db::Store;
use chrono::{Duration, Utc};

use common::{engines, product};

// =============================================================================
// Inventory
// =============================================================================

#[tokio::test]
async fn test_create_product_assigns_identity() {
    for (engine, store) in engines().await {
        let created = store
            .create_product(ProductDraft {
                name: "  Flat White  ".to_string(),
                price_cents: 4_500,
                stock: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(!created.id.is_empty(), "{engine}");
        assert_eq!(created.name, "Flat White", "{engine}");
        assert_eq!(created.version, 1, "{engine}");
        assert!(!created.sku.is_empty(), "{engine}: sku generated");

        let fetched = store.get_product(&created.id).await.unwrap();
        assert_eq!(fetched.id, created.id, "{engine}");
        assert_eq!(fetched.sku, created.sku, "{engine}");
        assert_eq!(fetched.stock, 10, "{engine}");
    }
}

#[tokio::test]
async fn test_create_product_rejects_bad_input() {
    for (engine, store) in engines().await {
        let free = store
            .create_product(common::draft("Free Coffee", 0, 1))
            .await;
        assert!(
            matches!(free, Err(StoreError::Validation(_))),
            "{engine}: {free:?}"
        );

        let negative = store
            .create_product(common::draft("Ghost Latte", 100, -1))
            .await;
        assert!(
            matches!(negative, Err(StoreError::Validation(_))),
            "{engine}: {negative:?}"
        );

        let listed = store.list_products(&ProductQuery::all()).await.unwrap();
        assert!(listed.is_empty(), "{engine}");
    }
}

#[tokio::test]
async fn test_missing_records_are_not_found() {
    for (engine, store) in engines().await {
        assert!(store.get_product("nope").await.unwrap_err().is_not_found(), "{engine}");
        assert!(store.delete_product("nope").await.unwrap_err().is_not_found(), "{engine}");
        assert!(
            store
                .update_product("nope", ProductPatch::default())
                .await
                .unwrap_err()
                .is_not_found(),
            "{engine}"
        );
        assert!(store.get_order("nope").await.unwrap_err().is_not_found(), "{engine}");
        assert!(
            store
                .update_order_status("nope", OrderStatus::Paid)
                .await
                .unwrap_err()
                .is_not_found(),
            "{engine}"
        );
        assert!(store.get_user_by_id("nope").await.unwrap_err().is_not_found(), "{engine}");
    }
}

#[tokio::test]
async fn test_search_is_case_insensitive_over_sku() {
    for (engine, store) in engines().await {
        let matching = store
            .create_product(ProductDraft {
                name: "Kopi Susu".to_string(),
                sku: "abc-123".to_string(),
                price_cents: 2_500,
                stock: 3,
                ..Default::default()
            })
            .await
            .unwrap();
        product(&store, "Croissant", 3_000, 3).await;

        let found = store
            .list_products(&ProductQuery::search("ABC"))
            .await
            .unwrap();
        let ids: Vec<&str> = found.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![matching.id.as_str()], "{engine}");

        let all = store.list_products(&ProductQuery::search("  ")).await.unwrap();
        assert_eq!(all.len(), 2, "{engine}: blank search matches everything");

        let latte = product(&store, "CAFÉ Latte", 3_500, 3).await;
        let found = store
            .list_products(&ProductQuery::search("café"))
            .await
            .unwrap();
        let ids: Vec<&str> = found.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![latte.id.as_str()], "{engine}: non-ASCII folding");
    }
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    for (engine, store) in engines().await {
        product(&store, "100% Arabica", 5_000, 1).await;
        product(&store, "House Blend", 4_000, 1).await;

        let found = store.list_products(&ProductQuery::search("%")).await.unwrap();
        assert_eq!(found.len(), 1, "{engine}");
        assert_eq!(found[0].name, "100% Arabica", "{engine}");

        let underscore = store.list_products(&ProductQuery::search("_")).await.unwrap();
        assert!(underscore.is_empty(), "{engine}");
    }
}

#[tokio::test]
async fn test_listing_is_newest_first() {
    for (engine, store) in engines().await {
        let first = product(&store, "Americano", 3_000, 1).await;
        let second = product(&store, "Cortado", 3_500, 1).await;
        let third = product(&store, "Mocha", 4_000, 1).await;

        let listed = store.list_products(&ProductQuery::all()).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![third.id.as_str(), second.id.as_str(), first.id.as_str()],
            "{engine}"
        );
    }
}

#[tokio::test]
async fn test_best_seller_counts_paid_and_done_orders_only() {
    for (engine, store) in engines().await {
        let older = product(&store, "Espresso", 2_000, 20).await;
        let newer = product(&store, "Latte", 3_000, 20).await;
        let unsold = product(&store, "Scone", 2_500, 20).await;

        store
            .create_order("u-1", &[CartItem::new(&older.id, 2)], 4_000, OrderStatus::Paid, "pay-1")
            .await
            .unwrap();
        store
            .create_order("u-2", &[CartItem::new(&older.id, 1)], 2_000, OrderStatus::Done, "pay-2")
            .await
            .unwrap();
        // Pending and failed orders do not count as sales.
        store
            .create_order("u-3", &[CartItem::new(&newer.id, 9)], 27_000, OrderStatus::Pending, "")
            .await
            .unwrap();
        store
            .create_order("u-4", &[CartItem::new(&newer.id, 1)], 3_000, OrderStatus::Failed, "")
            .await
            .unwrap();

        let ranked = store
            .list_products(&ProductQuery::all().sorted_by(ProductSort::BestSeller))
            .await
            .unwrap();
        let ids: Vec<&str> = ranked.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![older.id.as_str(), unsold.id.as_str(), newer.id.as_str()],
            "{engine}: sold first, ties newest first"
        );
    }
}

#[tokio::test]
async fn test_update_product_versions() {
    for (engine, store) in engines().await {
        let created = product(&store, "Cold Brew", 4_000, 5).await;

        let updated = store
            .update_product(
                &created.id,
                ProductPatch {
                    price_cents: Some(4_500),
                    expected_version: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price_cents, 4_500, "{engine}");
        assert_eq!(updated.version, 2, "{engine}");
        assert_eq!(updated.name, "Cold Brew", "{engine}");

        let stale = store
            .update_product(
                &created.id,
                ProductPatch {
                    stock: Some(50),
                    expected_version: Some(1),
                    ..Default::default()
                },
            )
            .await;
        assert!(
            matches!(stale, Err(StoreError::Conflict { .. })),
            "{engine}: {stale:?}"
        );

        let unchanged = store
            .update_product(&created.id, ProductPatch::default())
            .await
            .unwrap();
        assert_eq!(unchanged.version, 2, "{engine}: empty patch is a no-op");
        assert_eq!(unchanged.stock, 5, "{engine}");

        let invalid = store
            .update_product(
                &created.id,
                ProductPatch {
                    stock: Some(-3),
                    ..Default::default()
                },
            )
            .await;
        assert!(
            matches!(invalid, Err(StoreError::Validation(_))),
            "{engine}: {invalid:?}"
        );
        assert_eq!(store.get_product(&created.id).await.unwrap().stock, 5, "{engine}");
    }
}

#[tokio::test]
async fn test_delete_product_removes_cart_lines() {
    for (engine, store) in engines().await {
        let keep = product(&store, "Chai Latte", 3_500, 5).await;
        let gone = product(&store, "Matcha Latte", 4_000, 5).await;

        store.add_to_cart("u-1", &keep.id, 1).await.unwrap();
        store.add_to_cart("u-1", &gone.id, 2).await.unwrap();
        store.delete_product(&gone.id).await.unwrap();

        let cart = store.get_cart("u-1").await.unwrap();
        assert_eq!(cart.items, vec![CartItem::new(&keep.id, 1)], "{engine}");
        assert!(store.get_product(&gone.id).await.unwrap_err().is_not_found(), "{engine}");
    }
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_add_to_cart_admission_control() {
    for (engine, store) in engines().await {
        let beans = product(&store, "Kenya AA 250g", 9_000, 5).await;

        store.add_to_cart("u-1", &beans.id, 3).await.unwrap();
        let err = store.add_to_cart("u-1", &beans.id, 3).await.unwrap_err();
        match err {
            StoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => {
                assert_eq!(product_id, beans.id, "{engine}");
                assert_eq!(available, 5, "{engine}");
                assert_eq!(requested, 6, "{engine}");
            }
            other => panic!("{engine}: expected InsufficientStock, got {other:?}"),
        }

        let cart = store.get_cart("u-1").await.unwrap();
        assert_eq!(cart.quantity_of(&beans.id), 3, "{engine}: failed add changes nothing");

        // Admission does not reserve stock.
        assert_eq!(store.get_product(&beans.id).await.unwrap().stock, 5, "{engine}");
    }
}

#[tokio::test]
async fn test_add_to_cart_validates_input() {
    for (engine, store) in engines().await {
        let latte = product(&store, "Latte", 3_000, 5).await;

        for quantity in [0, -2] {
            let result = store.add_to_cart("u-1", &latte.id, quantity).await;
            assert!(
                matches!(result, Err(StoreError::Validation(_))),
                "{engine}: quantity {quantity}"
            );
        }

        let missing = store.add_to_cart("u-1", "no-such-product", 1).await;
        assert!(missing.unwrap_err().is_not_found(), "{engine}");
        assert!(store.get_cart("u-1").await.unwrap().is_empty(), "{engine}");
    }
}

#[tokio::test]
async fn test_cart_merges_and_keeps_insertion_order() {
    for (engine, store) in engines().await {
        let first = product(&store, "Mocha", 4_000, 10).await;
        let second = product(&store, "Cortado", 3_500, 10).await;

        store.add_to_cart("u-1", &first.id, 1).await.unwrap();
        store.add_to_cart("u-1", &second.id, 2).await.unwrap();
        store.add_to_cart("u-1", &first.id, 2).await.unwrap();

        let cart = store.get_cart("u-1").await.unwrap();
        assert_eq!(
            cart.items,
            vec![CartItem::new(&first.id, 3), CartItem::new(&second.id, 2)],
            "{engine}"
        );
        assert!(store.get_cart("u-2").await.unwrap().is_empty(), "{engine}");
    }
}

#[tokio::test]
async fn test_remove_from_cart_semantics() {
    for (engine, store) in engines().await {
        let scone = product(&store, "Scone", 2_500, 10).await;
        store.add_to_cart("u-1", &scone.id, 3).await.unwrap();

        store.remove_from_cart("u-1", &scone.id, 1).await.unwrap();
        assert_eq!(store.get_cart("u-1").await.unwrap().quantity_of(&scone.id), 2, "{engine}");

        // Removing more than is present drops the line.
        store.remove_from_cart("u-1", &scone.id, 5).await.unwrap();
        assert!(store.get_cart("u-1").await.unwrap().is_empty(), "{engine}");

        let again = store.remove_from_cart("u-1", &scone.id, 1).await;
        assert!(again.unwrap_err().is_not_found(), "{engine}");

        let stranger = store.remove_from_cart("u-9", &scone.id, 1).await;
        assert!(stranger.unwrap_err().is_not_found(), "{engine}");
    }
}

#[tokio::test]
async fn test_clear_cart_is_idempotent() {
    for (engine, store) in engines().await {
        let brownie = product(&store, "Brownie", 2_000, 4).await;
        store.add_to_cart("u-1", &brownie.id, 2).await.unwrap();

        store.clear_cart("u-1").await.unwrap();
        store.clear_cart("u-1").await.unwrap();
        store.clear_cart("never-shopped").await.unwrap();

        assert!(store.get_cart("u-1").await.unwrap().is_empty(), "{engine}");

        // The cart is usable again after clearing.
        store.add_to_cart("u-1", &brownie.id, 4).await.unwrap();
        assert_eq!(store.get_cart("u-1").await.unwrap().total_quantity(), 4, "{engine}");
    }
}

#[tokio::test]
async fn test_returned_values_are_snapshots() {
    for (engine, store) in engines().await {
        let latte = product(&store, "Latte", 3_000, 5).await;
        store.add_to_cart("u-1", &latte.id, 1).await.unwrap();

        let mut cart = store.get_cart("u-1").await.unwrap();
        cart.items[0].quantity = 99;
        cart.items.push(CartItem::new("forged", 1));

        let fresh = store.get_cart("u-1").await.unwrap();
        assert_eq!(fresh.items, vec![CartItem::new(&latte.id, 1)], "{engine}");

        let mut order = store
            .create_order("u-1", &[CartItem::new(&latte.id, 1)], 3_000, OrderStatus::Pending, "")
            .await
            .unwrap();
        order.status = OrderStatus::Done;
        order.items.clear();

        let stored = store.get_order(&order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Pending, "{engine}");
        assert_eq!(stored.items.len(), 1, "{engine}");
    }
}

#[tokio::test]
async fn test_quantities_have_no_upper_bound() {
    for (engine, store) in engines().await {
        let pods = product(&store, "Capsule Pack", 100, 5_000).await;

        store.add_to_cart("u-1", &pods.id, 1_000).await.unwrap();
        assert_eq!(
            store.get_cart("u-1").await.unwrap().quantity_of(&pods.id),
            1_000,
            "{engine}"
        );

        store.add_to_cart("u-2", &pods.id, 5).await.unwrap();
        store.remove_from_cart("u-2", &pods.id, 1_000).await.unwrap();
        assert!(store.get_cart("u-2").await.unwrap().is_empty(), "{engine}: line removed");

        let order = store
            .create_order(
                "u-1",
                &[CartItem::new(&pods.id, 1_000)],
                100_000,
                OrderStatus::Pending,
                "",
            )
            .await
            .unwrap();
        assert_eq!(order.items[0].quantity, 1_000, "{engine}");
        assert_eq!(store.get_product(&pods.id).await.unwrap().stock, 4_000, "{engine}");
    }
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn test_create_order_is_all_or_nothing() {
    for (engine, store) in engines().await {
        let plenty = product(&store, "House Blend", 8_000, 10).await;
        let scarce = product(&store, "Geisha", 20_000, 1).await;

        let result = store
            .create_order(
                "u-1",
                &[CartItem::new(&plenty.id, 2), CartItem::new(&scarce.id, 2)],
                56_000,
                OrderStatus::Pending,
                "",
            )
            .await;

        match result {
            Err(StoreError::InsufficientStock {
                product_id,
                available,
                requested,
            }) => {
                assert_eq!(product_id, scarce.id, "{engine}");
                assert_eq!(available, 1, "{engine}");
                assert_eq!(requested, 2, "{engine}");
            }
            other => panic!("{engine}: expected InsufficientStock, got {other:?}"),
        }

        assert_eq!(store.get_product(&plenty.id).await.unwrap().stock, 10, "{engine}");
        assert_eq!(store.get_product(&scarce.id).await.unwrap().stock, 1, "{engine}");
        assert!(store.list_orders().await.unwrap().is_empty(), "{engine}");
        assert!(store.list_orders_by_user("u-1").await.unwrap().is_empty(), "{engine}");
    }
}

#[tokio::test]
async fn test_create_order_rolls_back_on_missing_product() {
    for (engine, store) in engines().await {
        let latte = product(&store, "Latte", 3_000, 4).await;

        let result = store
            .create_order(
                "u-1",
                &[CartItem::new(&latte.id, 1), CartItem::new("deleted", 1)],
                3_000,
                OrderStatus::Pending,
                "",
            )
            .await;
        assert!(result.unwrap_err().is_not_found(), "{engine}");
        assert_eq!(store.get_product(&latte.id).await.unwrap().stock, 4, "{engine}");
        assert!(store.list_orders().await.unwrap().is_empty(), "{engine}");
    }
}

#[tokio::test]
async fn test_create_order_validates_lines() {
    for (engine, store) in engines().await {
        let latte = product(&store, "Latte", 3_000, 4).await;

        let empty = store
            .create_order("u-1", &[], 0, OrderStatus::Pending, "")
            .await;
        assert!(matches!(empty, Err(StoreError::Validation(_))), "{engine}");

        let zero = store
            .create_order("u-1", &[CartItem::new(&latte.id, 0)], 0, OrderStatus::Pending, "")
            .await;
        assert!(matches!(zero, Err(StoreError::Validation(_))), "{engine}");

        let negative_amount = store
            .create_order("u-1", &[CartItem::new(&latte.id, 1)], -1, OrderStatus::Pending, "")
            .await;
        assert!(matches!(negative_amount, Err(StoreError::Validation(_))), "{engine}");

        assert_eq!(store.get_product(&latte.id).await.unwrap().stock, 4, "{engine}");
    }
}

#[tokio::test]
async fn test_order_snapshots_price_and_decrements_stock() {
    for (engine, store) in engines().await {
        let mocha = product(&store, "Mocha", 4_000, 6).await;

        let order = store
            .create_order(
                "u-1",
                &[CartItem::new(&mocha.id, 2), CartItem::new(&mocha.id, 1)],
                12_000,
                OrderStatus::Pending,
                "",
            )
            .await
            .unwrap();

        assert_eq!(order.items.len(), 1, "{engine}: duplicate lines merge");
        assert_eq!(order.items[0].quantity, 3, "{engine}");
        assert_eq!(order.items[0].price_cents, 4_000, "{engine}");
        assert_eq!(order.items[0].order_id, order.id, "{engine}");

        let after = store.get_product(&mocha.id).await.unwrap();
        assert_eq!(after.stock, 3, "{engine}");
        assert!(after.version > mocha.version, "{engine}");

        store
            .update_product(
                &mocha.id,
                ProductPatch {
                    price_cents: Some(5_500),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = store.get_order(&order.id).await.unwrap();
        assert_eq!(stored.items[0].price_cents, 4_000, "{engine}: snapshot is frozen");
        assert_eq!(stored.amount_cents, 12_000, "{engine}");
    }
}

#[tokio::test]
async fn test_order_can_take_last_unit() {
    for (engine, store) in engines().await {
        let last = product(&store, "Last Croissant", 3_000, 2).await;

        store
            .create_order("u-1", &[CartItem::new(&last.id, 2)], 6_000, OrderStatus::Pending, "")
            .await
            .unwrap();
        assert_eq!(store.get_product(&last.id).await.unwrap().stock, 0, "{engine}");

        let sold_out = store
            .create_order("u-2", &[CartItem::new(&last.id, 1)], 3_000, OrderStatus::Pending, "")
            .await;
        assert!(
            matches!(sold_out, Err(StoreError::InsufficientStock { available: 0, .. })),
            "{engine}: {sold_out:?}"
        );
    }
}

#[tokio::test]
async fn test_order_status_and_payment_updates() {
    for (engine, store) in engines().await {
        let latte = product(&store, "Latte", 3_000, 5).await;
        let order = store
            .create_order("u-1", &[CartItem::new(&latte.id, 1)], 3_000, OrderStatus::Pending, "")
            .await
            .unwrap();

        store.update_order_status(&order.id, OrderStatus::Paid).await.unwrap();
        store.update_order_status(&order.id, OrderStatus::Paid).await.unwrap();
        store
            .update_order_payment_ref(&order.id, "snap-123")
            .await
            .unwrap();

        let stored = store.get_order(&order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Paid, "{engine}");
        assert_eq!(stored.payment_ref, "snap-123", "{engine}");

        let missing = store.update_order_payment_ref("nope", "x").await;
        assert!(missing.unwrap_err().is_not_found(), "{engine}");
    }
}

#[tokio::test]
async fn test_order_listings() {
    for (engine, store) in engines().await {
        let latte = product(&store, "Latte", 3_000, 10).await;
        let line = [CartItem::new(&latte.id, 1)];

        let first = store
            .create_order("u-1", &line, 3_000, OrderStatus::Pending, "")
            .await
            .unwrap();
        let other = store
            .create_order("u-2", &line, 3_000, OrderStatus::Pending, "")
            .await
            .unwrap();
        let second = store
            .create_order("u-1", &line, 3_000, OrderStatus::Pending, "")
            .await
            .unwrap();

        let mine = store.list_orders_by_user("u-1").await.unwrap();
        let ids: Vec<&str> = mine.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()], "{engine}");
        assert!(mine.iter().all(|o| o.items.len() == 1), "{engine}");

        let all = store.list_orders().await.unwrap();
        let ids: Vec<&str> = all.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![second.id.as_str(), other.id.as_str(), first.id.as_str()],
            "{engine}"
        );

        assert!(store.list_orders_by_user("u-9").await.unwrap().is_empty(), "{engine}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_never_oversell() {
    for (engine, store) in engines().await {
        let beans = product(&store, "Yirgacheffe 250g", 12_000, 5).await;

        let mut handles = Vec::new();
        for i in 0..12 {
            let store: Arc<dyn Store> = store.clone();
            let product_id = beans.id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create_order(
                        &format!("u-{i}"),
                        &[CartItem::new(&product_id, 1)],
                        12_000,
                        OrderStatus::Pending,
                        "",
                    )
                    .await
            }));
        }

        let mut placed = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(StoreError::InsufficientStock { .. }) => rejected += 1,
                Err(other) => panic!("{engine}: unexpected error {other:?}"),
            }
        }

        assert_eq!(placed, 5, "{engine}");
        assert_eq!(rejected, 7, "{engine}");
        assert_eq!(store.get_product(&beans.id).await.unwrap().stock, 0, "{engine}");
        assert_eq!(store.list_orders().await.unwrap().len(), 5, "{engine}");
    }
}

// =============================================================================
// Reviews
// =============================================================================

#[tokio::test]
async fn test_review_gate() {
    for (engine, store) in engines().await {
        let no_orders = store.create_review("u-1", "Ayu", "", 5, "Lovely").await;
        assert!(
            matches!(no_orders, Err(StoreError::Forbidden { .. })),
            "{engine}: {no_orders:?}"
        );

        let latte = product(&store, "Latte", 3_000, 5).await;
        // Any order opens the gate, paid or not.
        store
            .create_order("u-1", &[CartItem::new(&latte.id, 1)], 3_000, OrderStatus::Failed, "")
            .await
            .unwrap();

        let out_of_range = store.create_review("u-1", "Ayu", "", 6, "Too good").await;
        assert!(matches!(out_of_range, Err(StoreError::Validation(_))), "{engine}");

        let review = store
            .create_review("u-1", "Ayu", "", 5, "Lovely")
            .await
            .unwrap();
        assert_eq!(review.user_photo, DEFAULT_REVIEW_PHOTO, "{engine}");
        assert_eq!(review.rating, 5, "{engine}");

        let second = store.create_review("u-1", "Ayu", "", 4, "Still good").await;
        assert!(
            matches!(second, Err(StoreError::Forbidden { .. })),
            "{engine}: {second:?}"
        );

        assert_eq!(store.user_review_count("u-1").await.unwrap(), 1, "{engine}");
        assert_eq!(store.user_review_count("u-2").await.unwrap(), 0, "{engine}");
    }
}

#[tokio::test]
async fn test_list_reviews_newest_first_with_limit() {
    for (engine, store) in engines().await {
        let latte = product(&store, "Latte", 3_000, 10).await;
        let mut ids = Vec::new();
        for user in ["u-1", "u-2", "u-3"] {
            store
                .create_order(user, &[CartItem::new(&latte.id, 1)], 3_000, OrderStatus::Paid, "")
                .await
                .unwrap();
            let review = store
                .create_review(user, user, "https://img.example/me.png", 4, "Nice")
                .await
                .unwrap();
            ids.push(review.id);
        }

        let all = store.list_reviews(0).await.unwrap();
        let listed: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(listed, vec![ids[2].as_str(), ids[1].as_str(), ids[0].as_str()], "{engine}");
        assert_eq!(all[0].user_photo, "https://img.example/me.png", "{engine}");

        let capped = store.list_reviews(2).await.unwrap();
        assert_eq!(capped.len(), 2, "{engine}");
        assert_eq!(capped[0].id, ids[2], "{engine}");

        assert_eq!(store.list_reviews(-1).await.unwrap().len(), 3, "{engine}");
    }
}

// =============================================================================
// Users and Tokens
// =============================================================================

fn new_user(email: &str) -> NewUser {
    NewUser {
        full_name: "Budi Santoso".to_string(),
        email: email.to_string(),
        password_hash: "hash-1".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_user_lifecycle() {
    for (engine, store) in engines().await {
        let user = store.create_user(new_user("budi@example.com")).await.unwrap();
        assert_eq!(user.role, UserRole::User, "{engine}");
        assert!(!user.email_verified, "{engine}");

        let duplicate = store.create_user(new_user("budi@example.com")).await;
        assert!(
            matches!(duplicate, Err(StoreError::Conflict { .. })),
            "{engine}: {duplicate:?}"
        );

        let invalid = store.create_user(new_user("not-an-email")).await;
        assert!(matches!(invalid, Err(StoreError::Validation(_))), "{engine}");

        let by_email = store.get_user_by_email("budi@example.com").await.unwrap();
        assert_eq!(by_email.id, user.id, "{engine}");

        store.update_user_password(&user.id, "hash-2").await.unwrap();
        store.mark_email_verified(&user.id).await.unwrap();

        let reloaded = store.get_user_by_id(&user.id).await.unwrap();
        assert_eq!(reloaded.password_hash, "hash-2", "{engine}");
        assert!(reloaded.email_verified, "{engine}");

        assert!(
            store.update_user_password("nope", "x").await.unwrap_err().is_not_found(),
            "{engine}"
        );
        assert!(
            store.get_user_by_email("ghost@example.com").await.unwrap_err().is_not_found(),
            "{engine}"
        );
    }
}

#[tokio::test]
async fn test_seed_admin_user_is_idempotent() {
    for (engine, store) in engines().await {
        store
            .seed_admin_user("admin@example.com", "admin-hash")
            .await
            .unwrap();
        store
            .seed_admin_user("admin@example.com", "other-hash")
            .await
            .unwrap();

        let admin = store.get_user_by_email("admin@example.com").await.unwrap();
        assert_eq!(admin.role, UserRole::Admin, "{engine}");
        assert!(admin.email_verified, "{engine}");
        assert_eq!(admin.password_hash, "admin-hash", "{engine}: first seed wins");
    }
}

#[tokio::test]
async fn test_email_verification_tokens() {
    for (engine, store) in engines().await {
        let user = store.create_user(new_user("sari@example.com")).await.unwrap();
        let soon = Utc::now() + Duration::hours(1);
        let later = Utc::now() + Duration::hours(24);

        store.create_email_verification(&user.id, "tok-a", soon).await.unwrap();
        store.create_email_verification(&user.id, "tok-b", later).await.unwrap();

        let duplicate = store.create_email_verification(&user.id, "tok-a", later).await;
        assert!(
            matches!(duplicate, Err(StoreError::Conflict { .. })),
            "{engine}: {duplicate:?}"
        );

        let orphan = store.create_email_verification("ghost", "tok-c", soon).await;
        assert!(orphan.unwrap_err().is_not_found(), "{engine}");

        let fetched = store.get_email_verification("tok-a").await.unwrap();
        assert_eq!(fetched.user_id, user.id, "{engine}");

        let latest = store.latest_email_verification(&user.id).await.unwrap();
        assert_eq!(latest.token, "tok-b", "{engine}");

        store.delete_email_verification("tok-b").await.unwrap();
        store.delete_email_verification("tok-b").await.unwrap();
        assert!(
            store.get_email_verification("tok-b").await.unwrap_err().is_not_found(),
            "{engine}"
        );
        assert_eq!(
            store.latest_email_verification(&user.id).await.unwrap().token,
            "tok-a",
            "{engine}"
        );
    }
}

#[tokio::test]
async fn test_password_reset_tokens() {
    for (engine, store) in engines().await {
        let user = store.create_user(new_user("dewi@example.com")).await.unwrap();
        let expires = Utc::now() + Duration::minutes(30);

        store.create_password_reset(&user.id, "reset-1", expires).await.unwrap();
        let reset = store.get_password_reset("reset-1").await.unwrap();
        assert_eq!(reset.user_id, user.id, "{engine}");

        store.delete_password_reset("reset-1").await.unwrap();
        assert!(
            store.get_password_reset("reset-1").await.unwrap_err().is_not_found(),
            "{engine}"
        );

        let blank = store.create_password_reset(&user.id, "", expires).await;
        assert!(matches!(blank, Err(StoreError::Validation(_))), "{engine}");
    }
}
