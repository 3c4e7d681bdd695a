//! Credit event handler
//!
//! The hardware bridge reports every stacked note here. The response body is
//! the fixed `{ok, completed}` acknowledgement the bridge firmware contract
//! expects, not the enveloped shape the admin endpoints use. The bridge
//! retries on any network failure, so this endpoint must stay idempotent for
//! completed payments.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::core::ServerState;
use crate::utils::error::{AppError, AppResult};
use shared::{CreditAck, CreditEvent};

/// POST /api/payment/insert-event
pub async fn insert_event(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(event): Json<CreditEvent>,
) -> AppResult<Json<CreditAck>> {
    let presented = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if presented != state.config.api_key {
        return Err(AppError::Forbidden("invalid api key".into()));
    }

    if event.amount == 0 {
        return Err(AppError::Validation("amount must be positive".into()));
    }

    let outcome = state.ledger.credit(event.payment_id, event.amount)?;
    Ok(Json(CreditAck {
        ok: true,
        completed: outcome.completed,
    }))
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

    fn test_state() -> ServerState {
        ServerState::for_tests(Arc::new(NoopActuator))
    }

    fn seed_payment(state: &ServerState, due: u32) -> i64 {
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
            amount_inserted: Decimal::ZERO,
            status: PaymentStatus::Pending,
            created_at: now_millis(),
        };
        let txn = state.store.begin_write().unwrap();
        state.store.put_order(&txn, &order).unwrap();
        state.store.put_payment(&txn, &payment).unwrap();
        txn.commit().unwrap();
        payment_id
    }

    fn auth_headers(state: &ServerState) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", state.config.api_key.parse().unwrap());
        headers
    }

    fn event(payment_id: i64, amount: u32) -> CreditEvent {
        CreditEvent {
            payment_id,
            amount,
            source: Some("bill_acceptor".into()),
        }
    }

    #[tokio::test]
    async fn test_rejects_missing_api_key() {
        let state = test_state();
        let payment_id = seed_payment(&state, 500);

        let result = insert_event(
            State(state),
            HeaderMap::new(),
            Json(event(payment_id, 500)),
        )
        .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_partial_then_completing_credit() {
        let state = test_state();
        let payment_id = seed_payment(&state, 1500);
        let headers = auth_headers(&state);

        let ack = insert_event(
            State(state.clone()),
            headers.clone(),
            Json(event(payment_id, 500)),
        )
        .await
        .unwrap();
        assert!(ack.ok);
        assert!(!ack.completed);

        let ack = insert_event(State(state), headers, Json(event(payment_id, 1000)))
            .await
            .unwrap();
        assert!(ack.ok);
        assert!(ack.completed);
    }

    #[tokio::test]
    async fn test_duplicate_event_after_completion() {
        let state = test_state();
        let payment_id = seed_payment(&state, 500);
        let headers = auth_headers(&state);

        let first = insert_event(
            State(state.clone()),
            headers.clone(),
            Json(event(payment_id, 500)),
        )
        .await
        .unwrap();
        assert!(first.completed);

        // Bridge retry of the same notification gets the same answer
        let replay = insert_event(
            State(state.clone()),
            headers,
            Json(event(payment_id, 500)),
        )
        .await
        .unwrap();
        assert!(replay.ok);
        assert!(replay.completed);

        let payment = state.store.get_payment(payment_id).unwrap().unwrap();
        assert_eq!(payment.amount_inserted, Decimal::from(500u32));
    }

    #[tokio::test]
    async fn test_zero_amount_and_unknown_payment() {
        let state = test_state();
        let payment_id = seed_payment(&state, 500);
        let headers = auth_headers(&state);

        let result = insert_event(
            State(state.clone()),
            headers.clone(),
            Json(event(payment_id, 0)),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = insert_event(State(state), headers, Json(event(424242, 500))).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
