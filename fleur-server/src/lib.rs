//! Fleur Server - flower vending storefront
//!
//! # Architecture overview
//!
//! The storefront sells bouquets out of a twelve-slot refrigerated cabinet.
//! A customer checks out on the kiosk screen, feeds notes into the bill
//! acceptor, and the matching slot door opens once the payment is covered.
//!
//! - **Storage** (`store`): embedded redb database, single-writer transactions
//! - **Payments** (`payments`): credit accumulation and payment completion
//! - **Dispense** (`dispense`): slot actuation and exactly-once fulfillment
//! - **HTTP API** (`api`): RESTful storefront and bridge-facing endpoints
//!
//! # Module structure
//!
//! ```text
//! fleur-server/src/
//! ├── core/          # config, state, server
//! ├── api/           # HTTP routes and handlers
//! ├── payments/      # payment ledger
//! ├── dispense/      # dispense orchestrator, bridge actuator
//! ├── store/         # redb storage layer
//! ├── checkout.rs    # order creation
//! └── utils/         # errors, logging
//! ```

pub mod api;
pub mod checkout;
pub mod core;
pub mod dispense;
pub mod payments;
pub mod store;
pub mod utils;

pub use crate::core::{Config, Server, ServerState};
pub use dispense::{DispenseOrchestrator, SlotActuator};
pub use payments::PaymentLedger;
pub use store::Store;
pub use utils::{AppError, AppResult};

pub use utils::logger::init_logger_with_file;

/// Load environment and bring up logging
pub fn setup_environment() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    config.ensure_work_dir_structure()?;

    let log_level = std::env::var("LOG_LEVEL").ok();
    if config.is_production() {
        init_logger_with_file(log_level.as_deref(), config.log_dir().to_str());
    } else {
        init_logger_with_file(log_level.as_deref(), None);
    }
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ______
   / __/ /__  __  _______
  / /_/ / _ \/ / / / ___/
 / __/ /  __/ /_/ / /
/_/ /_/\___/\__,_/_/
    "#
    );
}
