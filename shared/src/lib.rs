//! Shared types for the Fleur vending system
//!
//! Wire types spoken between the storefront server and the hardware bridge,
//! plus ID/time utilities used by every crate.

pub mod response;
pub mod util;
pub mod vend;

// Re-exports
pub use response::ApiResponse;
pub use vend::{
    CreditAck, CreditEvent, OpenSlotRequest, OpenSlotResponse, PaymentStatusView, SessionRequest,
    StackRequest, is_supported_bill,
};
