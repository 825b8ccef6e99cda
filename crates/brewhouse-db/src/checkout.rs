//! # Checkout Service
//!
//! Turns a user's cart into an order.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         checkout(user_id)                               │
//! │                                                                         │
//! │  get_cart ──► empty? ──► Validation { field: "cart" }                  │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  price each line from the live product (Money, checked)                │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  create_order(lines, amount, Pending, "")  ── atomic in the engine     │
//! │     │                                                                   │
//! │     ├── Err ──► cart untouched, error returned                         │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  remove the ordered quantities from the cart                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The amount is computed from prices read before the order transaction; the
//! order's item snapshot carries the prices read inside it. Lines or units
//! added to the cart after the snapshot stay in the cart.

use std::sync::Arc;

use brewhouse_core::{Cart, Money, Order, OrderStatus, StoreError, StoreResult, ValidationError};
use tracing::{info, warn};

use crate::store::Store;

/// Coordinates cart, pricing and order creation over any engine.
#[derive(Clone)]
pub struct Checkout {
    store: Arc<dyn Store>,
}

impl Checkout {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Checkout { store }
    }

    /// Places an order for everything in the user's cart.
    ///
    /// ## Errors
    /// - `Validation` when the cart is empty
    /// - `NotFound` when a product in the cart has been deleted
    /// - `InsufficientStock` from the engine; nothing is changed
    pub async fn checkout(&self, user_id: &str) -> StoreResult<Order> {
        let cart = self.store.get_cart(user_id).await?;
        self.checkout_cart(&cart).await
    }

    /// Places an order for a cart snapshot, then takes exactly the ordered
    /// quantities out of the user's live cart.
    pub async fn checkout_cart(&self, cart: &Cart) -> StoreResult<Order> {
        let user_id = cart.user_id.as_str();
        if cart.is_empty() {
            return Err(ValidationError::Required {
                field: "cart".to_string(),
            }
            .into());
        }

        let mut amount = Money::zero();
        for line in &cart.items {
            let product = self.store.get_product(&line.product_id).await?;
            amount = product
                .price()
                .checked_mul_quantity(line.quantity)
                .and_then(|line_total| amount.checked_add(line_total))
                .ok_or_else(|| StoreError::internal("order amount overflow"))?;
        }

        let order = match self
            .store
            .create_order(user_id, &cart.items, amount.cents(), OrderStatus::Pending, "")
            .await
        {
            Ok(order) => order,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "Checkout failed");
                return Err(err);
            }
        };

        for line in &cart.items {
            match self
                .store
                .remove_from_cart(user_id, &line.product_id, line.quantity)
                .await
            {
                Ok(()) => {}
                // Already removed by the user or by a product delete.
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }

        info!(
            order_id = %order.id,
            user_id = %user_id,
            amount = %amount,
            "Checkout complete"
        );
        Ok(order)
    }

    /// Records the payment provider's verdict on an order.
    pub async fn record_payment(
        &self,
        order_id: &str,
        payment_ref: &str,
        status: OrderStatus,
    ) -> StoreResult<()> {
        self.store
            .update_order_payment_ref(order_id, payment_ref)
            .await?;
        self.store.update_order_status(order_id, status).await?;

        info!(order_id = %order_id, status = %status, "Payment recorded");
        Ok(())
    }
}
