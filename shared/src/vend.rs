//! Bridge <-> server wire protocol types
//!
//! The bridge reports physical money as [`CreditEvent`]s and the server
//! answers with a [`CreditAck`]. Delivery is at-least-once: the bridge may
//! retry a failed POST, so the server treats credits against an already
//! succeeded payment as an idempotent re-acknowledgment.
//!
//! Amounts on this wire are whole Algerian dinars as integers; the server
//! converts to `Decimal` at its boundary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Bill denominations the acceptor is configured for (DA)
pub const SUPPORTED_BILLS: [u32; 3] = [500, 1000, 2000];

/// Whether a bill amount is one of the accepted denominations
pub fn is_supported_bill(amount: u32) -> bool {
    SUPPORTED_BILLS.contains(&amount)
}

/// A confirmed "money inserted" event, emitted exactly once per stacked note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditEvent {
    pub payment_id: i64,
    /// Whole dinars, always positive
    pub amount: u32,
    /// Which detector produced the event ("serial", "cv", "simulate")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Gateway acknowledgment for a credit event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditAck {
    pub ok: bool,
    /// True once amount inserted covers the amount due
    pub completed: bool,
}

/// Request to stack a bill (kiosk UI -> bridge)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StackRequest {
    pub bill: u32,
    /// Falls back to the bridge's active session when absent
    #[serde(default)]
    pub payment_id: Option<i64>,
}

/// Request to pulse a relay channel (server -> bridge)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSlotRequest {
    pub channel: u8,
}

/// Relay actuation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSlotResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Bind the bridge's active session to a payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub payment_id: i64,
}

/// Read-only payment progress, served to the polling storefront UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusView {
    pub payment_id: i64,
    pub order_id: i64,
    pub amount_due: Decimal,
    pub amount_inserted: Decimal,
    /// Never negative; zero once covered
    pub remaining: Decimal,
    pub completed: bool,
    pub status: String,
}
