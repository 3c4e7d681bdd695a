//! Persisted entity types
//!
//! All records are JSON-serialized into redb tables keyed by snowflake id.
//! Prices and money accumulators are `Decimal`; credit events arrive as whole
//! dinars and are converted at the gateway boundary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A bouquet for sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Price in DA
    pub price: Decimal,
    pub is_active: bool,
}

/// One physical dispensing bay of the cabinet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: i64,
    /// Human-readable code, unique ("1".."12" or "A1")
    pub code: String,
    pub product_id: Option<i64>,
    /// Bouquets currently loaded
    pub quantity: u32,
    pub is_enabled: bool,
    /// Relay board channel that opens this bay, 1..=12
    pub relay_channel: u8,
}

impl Slot {
    /// A slot can sell iff it is enabled, stocked, and holds an active product
    pub fn is_available_with(&self, product: Option<&Product>) -> bool {
        self.is_enabled
            && self.quantity > 0
            && self.product_id.is_some()
            && product.is_some_and(|p| p.is_active)
    }
}

/// Order lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    New,
    Paid,
    Failed,
}

/// One purchase intent
///
/// `unit_price` is captured at creation and never re-read from the product.
/// `vended` flips false -> true exactly once, inside the fulfillment
/// transaction, and only when the order is paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub product_id: i64,
    pub slot_id: Option<i64>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub status: OrderStatus,
    pub vended: bool,
    pub created_at: i64,
}

/// Payment lifecycle; terminal states are immutable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded | PaymentStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Succeeded => "SUCCEEDED",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

/// Money-collection record, one per order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    /// Fixed at creation: order unit price x quantity
    pub amount_due: Decimal,
    /// Monotonically non-decreasing accumulator
    pub amount_inserted: Decimal,
    pub status: PaymentStatus,
    pub created_at: i64,
}

impl Payment {
    /// What is still owed; never negative
    pub fn remaining(&self) -> Decimal {
        (self.amount_due - self.amount_inserted).max(Decimal::ZERO)
    }

    /// Overpayment beyond the amount due; zero when not overpaid
    pub fn change(&self) -> Decimal {
        (self.amount_inserted - self.amount_due).max(Decimal::ZERO)
    }
}
