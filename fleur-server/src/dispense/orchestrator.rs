//! Dispense orchestrator
//!
//! Turns a paid order into a physical hand-over: open the slot door, then
//! decrement stock and mark the order vended inside one write transaction.
//!
//! The actuation call runs before and outside the transaction. Holding the
//! single redb writer across a network call to the bridge would stall every
//! credit and every other fulfillment for its duration. The cost is the known
//! failure window: a door that opened but a process that died before the
//! commit leaves `vended = false`, and a retry may open the door again. That
//! direction loses a bouquet at worst; the opposite ordering could mark an
//! order vended without ever opening the door, which takes the customer's
//! money for nothing.

use std::sync::Arc;
use thiserror::Error;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::dispense::actuator::SlotActuator;
use crate::store::{OrderStatus, PaymentStatus, Store, StorageError};

#[derive(Debug, Error)]
pub enum DispenseError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Order {0} has no payment record")]
    PaymentNotFound(i64),

    #[error("Order {0} is not fully paid")]
    PaymentIncomplete(i64),
}

/// What one fulfillment attempt did
#[derive(Debug, Clone, Serialize)]
pub struct FulfillmentReceipt {
    pub order_id: i64,
    pub vended: bool,
    /// True when a previous attempt already dispensed this order
    pub already_vended: bool,
    /// None when no actuation was attempted (already vended)
    pub actuated: Option<bool>,
    pub slot_code: Option<String>,
}

pub struct DispenseOrchestrator {
    store: Store,
    actuator: Arc<dyn SlotActuator>,
}

impl DispenseOrchestrator {
    pub fn new(store: Store, actuator: Arc<dyn SlotActuator>) -> Self {
        Self { store, actuator }
    }

    /// Dispense the bouquet for a paid order, exactly once
    ///
    /// Safe to retry: a second call for an already-vended order reports
    /// `already_vended` without touching stock or hardware. Two concurrent
    /// calls serialize on the write transaction; the loser re-reads the
    /// vended flag and backs off.
    #[instrument(skip(self), fields(order_id = order_id))]
    pub async fn fulfill(&self, order_id: i64) -> Result<FulfillmentReceipt, DispenseError> {
        // Precheck outside any transaction
        let order = self
            .store
            .get_order(order_id)?
            .ok_or(DispenseError::OrderNotFound(order_id))?;

        let payment_id = self
            .store
            .payment_id_for_order(order_id)?
            .ok_or(DispenseError::PaymentNotFound(order_id))?;
        let payment = self
            .store
            .get_payment(payment_id)?
            .ok_or(DispenseError::PaymentNotFound(order_id))?;
        if payment.status != PaymentStatus::Succeeded {
            return Err(DispenseError::PaymentIncomplete(order_id));
        }

        if order.vended {
            info!("Order already vended, skipping");
            return Ok(FulfillmentReceipt {
                order_id,
                vended: true,
                already_vended: true,
                actuated: None,
                slot_code: None,
            });
        }

        let slot = match order.slot_id {
            Some(slot_id) => self.store.get_slot(slot_id)?,
            None => None,
        };

        // Actuate before taking the write lock
        let actuated = match &slot {
            Some(slot) => match self.actuator.open_slot(slot.relay_channel).await {
                Ok(opened) => Some(opened),
                Err(e) => {
                    warn!(error = %e, "Slot actuation failed, recording vend anyway");
                    Some(false)
                }
            },
            None => {
                warn!("Order has no slot assigned, nothing to actuate");
                None
            }
        };

        let txn = self.store.begin_write()?;

        // Re-read under the lock; a concurrent attempt may have won
        let mut order = self
            .store
            .get_order_txn(&txn, order_id)?
            .ok_or(DispenseError::OrderNotFound(order_id))?;
        if order.vended {
            drop(txn);
            info!("Lost the fulfillment race, order already vended");
            return Ok(FulfillmentReceipt {
                order_id,
                vended: true,
                already_vended: true,
                actuated,
                slot_code: slot.map(|s| s.code),
            });
        }

        let mut slot_code = None;
        if let Some(slot_id) = order.slot_id
            && let Some(mut slot) = self.store.get_slot_txn(&txn, slot_id)?
        {
            if slot.quantity > 0 {
                slot.quantity -= 1;
            } else {
                warn!(slot = %slot.code, "Slot stock already at zero");
            }
            slot_code = Some(slot.code.clone());
            self.store.put_slot(&txn, &slot)?;
        }

        order.vended = true;
        // A vended order must never read as unpaid
        order.status = OrderStatus::Paid;
        self.store.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        info!(slot = ?slot_code, actuated = ?actuated, "Order fulfilled");
        Ok(FulfillmentReceipt {
            order_id,
            vended: true,
            already_vended: false,
            actuated,
            slot_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispense::actuator::ActuatorError;
    use crate::store::{Order, OrderStatus, Payment, Slot};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use shared::util::{now_millis, snowflake_id};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    struct MockActuator {
        calls: AtomicU32,
        fail: AtomicBool,
    }

    impl MockActuator {
        fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl SlotActuator for MockActuator {
        async fn open_slot(&self, _channel: u8) -> Result<bool, ActuatorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err(ActuatorError::Bridge("relay offline".into()))
            } else {
                Ok(true)
            }
        }
    }

    fn seed_paid_order(store: &Store, slot_quantity: u32) -> (i64, i64) {
        let slot_id = snowflake_id();
        let order_id = snowflake_id();
        let payment_id = snowflake_id();

        let slot = Slot {
            id: slot_id,
            code: "1".into(),
            product_id: Some(1),
            quantity: slot_quantity,
            is_enabled: true,
            relay_channel: 1,
        };
        let order = Order {
            id: order_id,
            product_id: 1,
            slot_id: Some(slot_id),
            unit_price: Decimal::from(1500u32),
            quantity: 1,
            status: OrderStatus::Paid,
            vended: false,
            created_at: now_millis(),
        };
        let payment = Payment {
            id: payment_id,
            order_id,
            amount_due: Decimal::from(1500u32),
            amount_inserted: Decimal::from(1500u32),
            status: PaymentStatus::Succeeded,
            created_at: now_millis(),
        };

        let txn = store.begin_write().unwrap();
        store.put_slot(&txn, &slot).unwrap();
        store.put_order(&txn, &order).unwrap();
        store.put_payment(&txn, &payment).unwrap();
        txn.commit().unwrap();
        (order_id, slot_id)
    }

    #[tokio::test]
    async fn test_fulfill_decrements_stock_once() {
        let store = Store::open_in_memory().unwrap();
        let actuator = Arc::new(MockActuator::new());
        let orchestrator = DispenseOrchestrator::new(store.clone(), actuator.clone());
        let (order_id, slot_id) = seed_paid_order(&store, 3);

        let receipt = orchestrator.fulfill(order_id).await.unwrap();
        assert!(receipt.vended);
        assert!(!receipt.already_vended);
        assert_eq!(receipt.actuated, Some(true));
        assert_eq!(receipt.slot_code.as_deref(), Some("1"));

        assert_eq!(store.get_slot(slot_id).unwrap().unwrap().quantity, 2);
        assert!(store.get_order(order_id).unwrap().unwrap().vended);
        assert_eq!(actuator.calls.load(Ordering::SeqCst), 1);

        // Retry is a no-op
        let retry = orchestrator.fulfill(order_id).await.unwrap();
        assert!(retry.already_vended);
        assert_eq!(store.get_slot(slot_id).unwrap().unwrap().quantity, 2);
        assert_eq!(actuator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_fulfill_single_decrement() {
        let store = Store::open_in_memory().unwrap();
        let actuator = Arc::new(MockActuator::new());
        let orchestrator = Arc::new(DispenseOrchestrator::new(store.clone(), actuator));
        let (order_id, slot_id) = seed_paid_order(&store, 1);

        let a = {
            let orch = orchestrator.clone();
            tokio::spawn(async move { orch.fulfill(order_id).await })
        };
        let b = {
            let orch = orchestrator.clone();
            tokio::spawn(async move { orch.fulfill(order_id).await })
        };
        let ra = a.await.unwrap().unwrap();
        let rb = b.await.unwrap().unwrap();

        // Exactly one of the two performed the decrement
        assert_eq!(
            [ra.already_vended, rb.already_vended]
                .iter()
                .filter(|&&x| !x)
                .count(),
            1
        );
        assert_eq!(store.get_slot(slot_id).unwrap().unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn test_fulfill_reasserts_paid_status() {
        let store = Store::open_in_memory().unwrap();
        let orchestrator =
            DispenseOrchestrator::new(store.clone(), Arc::new(MockActuator::new()));
        let (order_id, _slot_id) = seed_paid_order(&store, 1);

        // Externally seeded inconsistency: succeeded payment, stale order status
        let txn = store.begin_write().unwrap();
        let mut order = store.get_order_txn(&txn, order_id).unwrap().unwrap();
        order.status = OrderStatus::New;
        store.put_order(&txn, &order).unwrap();
        txn.commit().unwrap();

        let receipt = orchestrator.fulfill(order_id).await.unwrap();
        assert!(receipt.vended);

        let order = store.get_order(order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(order.vended);
    }

    #[tokio::test]
    async fn test_actuator_failure_still_records_vend() {
        let store = Store::open_in_memory().unwrap();
        let actuator = Arc::new(MockActuator::new());
        actuator.fail.store(true, Ordering::SeqCst);
        let orchestrator = DispenseOrchestrator::new(store.clone(), actuator);
        let (order_id, slot_id) = seed_paid_order(&store, 2);

        let receipt = orchestrator.fulfill(order_id).await.unwrap();
        assert_eq!(receipt.actuated, Some(false));
        assert!(receipt.vended);
        assert_eq!(store.get_slot(slot_id).unwrap().unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_unpaid_order_rejected() {
        let store = Store::open_in_memory().unwrap();
        let orchestrator =
            DispenseOrchestrator::new(store.clone(), Arc::new(MockActuator::new()));

        let order_id = snowflake_id();
        let payment_id = snowflake_id();
        let order = Order {
            id: order_id,
            product_id: 1,
            slot_id: None,
            unit_price: Decimal::from(1500u32),
            quantity: 1,
            status: OrderStatus::New,
            vended: false,
            created_at: now_millis(),
        };
        let payment = Payment {
            id: payment_id,
            order_id,
            amount_due: Decimal::from(1500u32),
            amount_inserted: Decimal::from(500u32),
            status: PaymentStatus::Pending,
            created_at: now_millis(),
        };
        let txn = store.begin_write().unwrap();
        store.put_order(&txn, &order).unwrap();
        store.put_payment(&txn, &payment).unwrap();
        txn.commit().unwrap();

        assert!(matches!(
            orchestrator.fulfill(order_id).await,
            Err(DispenseError::PaymentIncomplete(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let store = Store::open_in_memory().unwrap();
        let orchestrator = DispenseOrchestrator::new(store, Arc::new(MockActuator::new()));
        assert!(matches!(
            orchestrator.fulfill(99).await,
            Err(DispenseError::OrderNotFound(99))
        ));
    }
}
