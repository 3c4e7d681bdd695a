//! Checkout
//!
//! Creates the order plus its payment in one transaction. The unit price is
//! captured from the product at this moment; later catalog edits never change
//! what an open order owes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::store::{Order, OrderStatus, Payment, PaymentStatus, Store, StorageError};
use shared::util::{now_millis, snowflake_id};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Product {0} is not for sale")]
    ProductInactive(i64),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub product_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Explicit slot choice; otherwise the first available slot for the
    /// product is picked
    pub slot_id: Option<i64>,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: i64,
    pub payment_id: i64,
    pub amount_due: Decimal,
    pub slot_code: Option<String>,
}

/// Create an order with its pending payment
#[instrument(skip(store), fields(product_id = request.product_id))]
pub fn create_order(store: &Store, request: &CheckoutRequest) -> Result<CheckoutReceipt, CheckoutError> {
    if request.quantity == 0 {
        return Err(CheckoutError::InvalidQuantity(
            "quantity must be positive".into(),
        ));
    }

    let product = store
        .get_product(request.product_id)?
        .ok_or(CheckoutError::ProductNotFound(request.product_id))?;
    if !product.is_active {
        return Err(CheckoutError::ProductInactive(product.id));
    }

    // Pick the slot before opening the write transaction
    let slot = match request.slot_id {
        Some(slot_id) => {
            let slot = store
                .get_slot(slot_id)?
                .ok_or_else(|| CheckoutError::SlotUnavailable(format!("slot {} not found", slot_id)))?;
            if slot.product_id != Some(product.id) {
                return Err(CheckoutError::SlotUnavailable(format!(
                    "slot {} does not hold product {}",
                    slot.code, product.id
                )));
            }
            if !slot.is_available_with(Some(&product)) {
                return Err(CheckoutError::SlotUnavailable(format!(
                    "slot {} is empty or disabled",
                    slot.code
                )));
            }
            Some(slot)
        }
        None => store
            .list_slots()?
            .into_iter()
            .find(|s| s.product_id == Some(product.id) && s.is_available_with(Some(&product))),
    };

    let slot = slot.ok_or_else(|| {
        CheckoutError::SlotUnavailable(format!("no stocked slot for product {}", product.id))
    })?;

    if u64::from(slot.quantity) < u64::from(request.quantity) {
        return Err(CheckoutError::SlotUnavailable(format!(
            "slot {} holds only {} unit(s)",
            slot.code, slot.quantity
        )));
    }

    let order = Order {
        id: snowflake_id(),
        product_id: product.id,
        slot_id: Some(slot.id),
        unit_price: product.price,
        quantity: request.quantity,
        status: OrderStatus::New,
        vended: false,
        created_at: now_millis(),
    };
    let payment = Payment {
        id: snowflake_id(),
        order_id: order.id,
        amount_due: product.price * Decimal::from(request.quantity),
        amount_inserted: Decimal::ZERO,
        status: PaymentStatus::Pending,
        created_at: now_millis(),
    };

    let txn = store.begin_write()?;
    store.put_order(&txn, &order)?;
    store.put_payment(&txn, &payment)?;
    txn.commit().map_err(StorageError::from)?;

    info!(
        order_id = order.id,
        payment_id = payment.id,
        due = %payment.amount_due,
        slot = %slot.code,
        "Order created"
    );
    Ok(CheckoutReceipt {
        order_id: order.id,
        payment_id: payment.id,
        amount_due: payment.amount_due,
        slot_code: Some(slot.code),
    })
}
