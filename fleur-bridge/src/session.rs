//! Active payment session
//!
//! The kiosk screen binds the cabinet to one payment at a time: after
//! checkout it posts the payment id here, and stack requests without an
//! explicit payment id fall back to it. The binding survives until replaced
//! or cleared; a stale session is harmless because the storefront rejects
//! credits on closed payments.

use parking_lot::Mutex;
use shared::util::now_millis;

#[derive(Debug, Clone, Copy)]
pub struct ActiveSession {
    pub payment_id: i64,
    pub opened_at: i64,
}

#[derive(Default)]
pub struct SessionTracker {
    current: Mutex<Option<ActiveSession>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the cabinet to a payment, replacing any previous binding
    pub fn open(&self, payment_id: i64) {
        let mut current = self.current.lock();
        *current = Some(ActiveSession {
            payment_id,
            opened_at: now_millis(),
        });
    }

    pub fn clear(&self) {
        *self.current.lock() = None;
    }

    pub fn current_payment(&self) -> Option<i64> {
        self.current.lock().map(|s| s.payment_id)
    }
}
