//! # fleur-device
//!
//! Low-level drivers for the vending cabinet hardware - framing and transport
//! only.
//!
//! ## Scope
//!
//! This crate handles HOW to talk to the devices:
//! - ID-003 frame building/parsing for the bill acceptor
//! - Relay-board command bytes for the slot doors
//! - Network transports (devices attach through serial-TCP converters)
//! - Simulators for development without hardware
//!
//! Business logic (WHICH bill to take, WHEN to open a door) stays in
//! application code:
//! - Credit decisions → fleur-bridge
//! - Dispense decisions → fleur-server
//!
//! ## Example
//!
//! ```ignore
//! use fleur_device::{BillAcceptor, NetworkAcceptor};
//!
//! let acceptor = NetworkAcceptor::new("192.168.1.50", 4001, vec![500, 1000, 2000])?;
//! if acceptor.accept(1000).await? {
//!     // the 1000 DA note is physically in the cashbox
//! }
//! ```

mod acceptor;
mod error;
pub mod id003;
mod relay;

// Re-exports
pub use acceptor::{BillAcceptor, NetworkAcceptor, SimulatedAcceptor};
pub use error::{DeviceError, DeviceResult};
pub use id003::AcceptorStatus;
pub use relay::{NetworkRelay, RelayDriver, SimulatedRelay, relay_command};
