//! Payment API handlers

use axum::Json;
use axum::extract::{Path, State};

use crate::core::ServerState;
use crate::utils::error::{AppError, AppResult, ok};
use shared::{ApiResponse, PaymentStatusView};

/// GET /api/payments/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<PaymentStatusView>>> {
    let payment = state
        .store
        .get_payment(id)?
        .ok_or_else(|| AppError::NotFound(format!("Payment {}", id)))?;

    Ok(ok(PaymentStatusView {
        payment_id: payment.id,
        order_id: payment.order_id,
        amount_due: payment.amount_due,
        amount_inserted: payment.amount_inserted,
        remaining: payment.remaining(),
        completed: payment.status == crate::store::PaymentStatus::Succeeded,
        status: payment.status.as_str().to_string(),
    }))
}

/// POST /api/payments/:id/cancel
pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.ledger.cancel(id)?;
    Ok(ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispense::{ActuatorError, SlotActuator};
    use crate::store::{Order, OrderStatus, Payment, PaymentStatus};
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

    fn seed_payment(state: &ServerState, due: u32, inserted: u32) -> i64 {
        let order_id = snowflake_id();
        let payment_id = snowflake_id();
        let order = Order {
            id: order_id,
            product_id: 1,
            slot_id: None,
            unit_price: Decimal::from(due),
            quantity: 1,
            status: OrderStatus::New,
            vended: false,
            created_at: now_millis(),
        };
        let payment = Payment {
            id: payment_id,
            order_id,
            amount_due: Decimal::from(due),
            amount_inserted: Decimal::from(inserted),
            status: PaymentStatus::Pending,
            created_at: now_millis(),
        };
        let txn = state.store.begin_write().unwrap();
        state.store.put_order(&txn, &order).unwrap();
        state.store.put_payment(&txn, &payment).unwrap();
        txn.commit().unwrap();
        payment_id
    }

    #[tokio::test]
    async fn test_status_view() {
        let state = ServerState::for_tests(Arc::new(NoopActuator));
        let payment_id = seed_payment(&state, 1500, 500);

        let response = get_by_id(State(state), Path(payment_id)).await.unwrap();
        let view = response.0.data.unwrap();
        assert_eq!(view.remaining, Decimal::from(1000u32));
        assert!(!view.completed);
        assert_eq!(view.status, "PENDING");
    }

    #[tokio::test]
    async fn test_cancel_then_status() {
        let state = ServerState::for_tests(Arc::new(NoopActuator));
        let payment_id = seed_payment(&state, 1500, 500);

        cancel(State(state.clone()), Path(payment_id)).await.unwrap();
        let response = get_by_id(State(state), Path(payment_id)).await.unwrap();
        let view = response.0.data.unwrap();
        assert_eq!(view.status, "FAILED");
    }

    #[tokio::test]
    async fn test_double_cancel_conflicts() {
        let state = ServerState::for_tests(Arc::new(NoopActuator));
        let payment_id = seed_payment(&state, 1500, 0);

        cancel(State(state.clone()), Path(payment_id)).await.unwrap();
        let result = cancel(State(state), Path(payment_id)).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }
}
