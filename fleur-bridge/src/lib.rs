//! Fleur Bridge - cabinet-side hardware agent
//!
//! Runs next to the cabinet and owns the serial devices: the ID-003 bill
//! acceptor and the relay board behind the slot doors. Exposes a small local
//! HTTP API for the kiosk screen and the storefront server, and reports
//! every stacked note upstream as a credit event.
//!
//! ```text
//! kiosk screen ──► /set-session, /stack ──► fleur-bridge ──► bill acceptor
//! storefront   ──► /open-slot           ──►              ──► relay board
//!                                           │
//!                                           └──► POST /api/payment/insert-event
//! ```

pub mod api;
pub mod config;
pub mod gateway;
pub mod session;
pub mod state;

pub use api::build_app;
pub use config::Config;
pub use gateway::{CreditGateway, CreditReporter};
pub use session::SessionTracker;
pub use state::BridgeState;
