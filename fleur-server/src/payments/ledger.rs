//! Payment ledger
//!
//! Accumulates bill credits against pending payments and flips a payment to
//! SUCCEEDED, atomically with the order becoming PAID, once the inserted
//! total covers the amount due.
//!
//! Every mutation runs inside one redb write transaction. redb serializes
//! writers, so two credits for the same payment cannot interleave: the second
//! one observes the first one's committed state. That serialization is also
//! what makes credits commute; 500 then 1000 and 1000 then 500 end in the
//! same ledger state.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::store::{OrderStatus, PaymentStatus, Store, StorageError};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Payment not found: {0}")]
    PaymentNotFound(i64),

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Payment {0} is already in a terminal state")]
    PaymentClosed(i64),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Result of applying one credit event
#[derive(Debug, Clone, Copy)]
pub struct CreditOutcome {
    /// True once the payment has reached SUCCEEDED
    pub completed: bool,
    pub amount_due: Decimal,
    pub amount_inserted: Decimal,
}

#[derive(Clone)]
pub struct PaymentLedger {
    store: Store,
}

impl PaymentLedger {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Apply one credit of `amount` whole DA to a payment
    ///
    /// Idempotent on completed payments: crediting a SUCCEEDED payment is a
    /// no-op that still reports `completed: true`, so a retried notification
    /// after a lost acknowledgement converges instead of failing. A FAILED
    /// payment rejects the credit; the note was accepted against a dead
    /// payment and the operator has to resolve it by hand.
    #[instrument(skip(self), fields(payment_id = payment_id, amount = amount))]
    pub fn credit(&self, payment_id: i64, amount: u32) -> LedgerResult<CreditOutcome> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount("amount must be positive".into()));
        }

        let txn = self.store.begin_write()?;

        let mut payment = self
            .store
            .get_payment_txn(&txn, payment_id)?
            .ok_or(LedgerError::PaymentNotFound(payment_id))?;

        match payment.status {
            PaymentStatus::Succeeded => {
                // Duplicate notification after completion
                info!("Credit on completed payment, ignoring");
                return Ok(CreditOutcome {
                    completed: true,
                    amount_due: payment.amount_due,
                    amount_inserted: payment.amount_inserted,
                });
            }
            PaymentStatus::Failed => {
                warn!("Credit on failed payment rejected");
                return Err(LedgerError::PaymentClosed(payment_id));
            }
            PaymentStatus::Pending => {}
        }

        payment.amount_inserted += Decimal::from(amount);
        let completed = payment.amount_inserted >= payment.amount_due;

        if completed {
            payment.status = PaymentStatus::Succeeded;

            // The order flips to PAID in the same transaction; no observer
            // can ever see a SUCCEEDED payment next to a NEW order.
            let mut order = self
                .store
                .get_order_txn(&txn, payment.order_id)?
                .ok_or(LedgerError::OrderNotFound(payment.order_id))?;
            order.status = OrderStatus::Paid;
            self.store.put_order(&txn, &order)?;
        }

        self.store.put_payment(&txn, &payment)?;
        let outcome = CreditOutcome {
            completed,
            amount_due: payment.amount_due,
            amount_inserted: payment.amount_inserted,
        };
        txn.commit().map_err(StorageError::from)?;

        info!(
            inserted = %outcome.amount_inserted,
            due = %outcome.amount_due,
            completed = completed,
            "Credit applied"
        );
        Ok(outcome)
    }

    /// Cancel a pending payment and fail its order, atomically
    ///
    /// Racing against a completing credit is resolved by whoever gets the
    /// write transaction first; the loser sees a terminal state and gets
    /// [`LedgerError::PaymentClosed`].
    #[instrument(skip(self), fields(payment_id = payment_id))]
    pub fn cancel(&self, payment_id: i64) -> LedgerResult<()> {
        let txn = self.store.begin_write()?;

        let mut payment = self
            .store
            .get_payment_txn(&txn, payment_id)?
            .ok_or(LedgerError::PaymentNotFound(payment_id))?;

        if payment.status.is_terminal() {
            return Err(LedgerError::PaymentClosed(payment_id));
        }
        payment.status = PaymentStatus::Failed;

        let mut order = self
            .store
            .get_order_txn(&txn, payment.order_id)?
            .ok_or(LedgerError::OrderNotFound(payment.order_id))?;
        order.status = OrderStatus::Failed;

        self.store.put_payment(&txn, &payment)?;
        self.store.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        info!("Payment cancelled");
        Ok(())
    }
}
