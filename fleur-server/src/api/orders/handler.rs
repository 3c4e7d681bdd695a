//! Order API handlers

use axum::Json;
use axum::extract::{Path, State};

use crate::core::ServerState;
use crate::dispense::FulfillmentReceipt;
use crate::store::Order;
use crate::utils::error::{AppError, AppResult, ok};
use shared::ApiResponse;

/// GET /api/orders
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    Ok(ok(state.store.list_orders()?))
}

/// GET /api/orders/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state
        .store
        .get_order(id)?
        .ok_or_else(|| AppError::NotFound(format!("Order {}", id)))?;
    Ok(ok(order))
}

/// POST /api/orders/:id/fulfill
pub async fn fulfill(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<FulfillmentReceipt>>> {
    let receipt = state.orchestrator.fulfill(id).await?;
    Ok(ok(receipt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispense::{ActuatorError, SlotActuator};
    use crate::store::{OrderStatus, Payment, PaymentStatus, Product, Slot};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use shared::util::{now_millis, snowflake_id};
    use std::sync::Arc;

    struct NoopActuator;

    #[async_trait]
    impl SlotActuator for NoopActuator {
        async fn open_slot(&self, _channel: u8) -> Result<bool, ActuatorError> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_checkout_credit_fulfill_flow() {
        let state = ServerState::for_tests(Arc::new(NoopActuator));

        let product = Product {
            id: snowflake_id(),
            category_id: 1,
            name: "Tulips".into(),
            slug: "tulips".into(),
            description: String::new(),
            price: Decimal::from(2000u32),
            is_active: true,
        };
        let slot = Slot {
            id: snowflake_id(),
            code: "4".into(),
            product_id: Some(product.id),
            quantity: 2,
            is_enabled: true,
            relay_channel: 4,
        };
        let txn = state.store.begin_write().unwrap();
        state.store.put_product(&txn, &product).unwrap();
        state.store.put_slot(&txn, &slot).unwrap();
        txn.commit().unwrap();

        let receipt = crate::checkout::create_order(
            &state.store,
            &crate::checkout::CheckoutRequest {
                product_id: product.id,
                quantity: 1,
                slot_id: None,
            },
        )
        .unwrap();

        let outcome = state.ledger.credit(receipt.payment_id, 2000).unwrap();
        assert!(outcome.completed);

        let response = fulfill(State(state.clone()), Path(receipt.order_id))
            .await
            .unwrap();
        let fulfillment = response.0.data.unwrap();
        assert!(fulfillment.vended);
        assert!(!fulfillment.already_vended);

        let order = state.store.get_order(receipt.order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(order.vended);
        assert_eq!(state.store.get_slot(slot.id).unwrap().unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_fulfill_unpaid_order_conflicts() {
        let state = ServerState::for_tests(Arc::new(NoopActuator));

        let order = Order {
            id: snowflake_id(),
            product_id: 1,
            slot_id: None,
            unit_price: Decimal::from(500u32),
            quantity: 1,
            status: OrderStatus::New,
            vended: false,
            created_at: now_millis(),
        };
        let payment = Payment {
            id: snowflake_id(),
            order_id: order.id,
            amount_due: Decimal::from(500u32),
            amount_inserted: Decimal::ZERO,
            status: PaymentStatus::Pending,
            created_at: now_millis(),
        };
        let txn = state.store.begin_write().unwrap();
        state.store.put_order(&txn, &order).unwrap();
        state.store.put_payment(&txn, &payment).unwrap();
        txn.commit().unwrap();

        let result = fulfill(State(state), Path(order.id)).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }
}
