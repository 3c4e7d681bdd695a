pub mod actuator;
pub mod orchestrator;

pub use actuator::{ActuatorError, BridgeActuator, SlotActuator};
pub use orchestrator::{DispenseError, DispenseOrchestrator, FulfillmentReceipt};
