//! Slot actuation client
//!
//! The orchestrator opens slot doors through this trait. In production it is
//! an HTTP call to the hardware bridge, which pulses the relay channel. The
//! trait seam keeps the orchestrator testable without any hardware.

use async_trait::async_trait;
use shared::{OpenSlotRequest, OpenSlotResponse};
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("Bridge request failed: {0}")]
    Request(String),

    #[error("Bridge reported failure: {0}")]
    Bridge(String),
}

/// Opens the physical door of a slot
#[async_trait]
pub trait SlotActuator: Send + Sync {
    /// Pulse the relay for `channel`; `Ok(true)` means the door opened
    async fn open_slot(&self, channel: u8) -> Result<bool, ActuatorError>;
}

/// Actuator that calls the hardware bridge over HTTP
pub struct BridgeActuator {
    client: reqwest::Client,
    base_url: String,
}

impl BridgeActuator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SlotActuator for BridgeActuator {
    #[instrument(skip(self), fields(channel = channel))]
    async fn open_slot(&self, channel: u8) -> Result<bool, ActuatorError> {
        let url = format!("{}/open-slot", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&OpenSlotRequest { channel })
            .send()
            .await
            .map_err(|e| ActuatorError::Request(e.to_string()))?;

        let body: OpenSlotResponse = response
            .json()
            .await
            .map_err(|e| ActuatorError::Request(e.to_string()))?;

        if body.ok {
            Ok(true)
        } else {
            Err(ActuatorError::Bridge(
                body.error.unwrap_or_else(|| "unknown".into()),
            ))
        }
    }
}
