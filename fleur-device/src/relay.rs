//! Relay board adapters for the slot door solenoids
//!
//! The board speaks a plain ASCII line protocol; one relay channel per slot
//! door. Opening a door is an ON pulse held for a configured interval.

use crate::error::{DeviceError, DeviceResult};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument};

/// Highest relay channel on the board
pub const MAX_CHANNEL: u8 = 12;

/// Command bytes to switch one relay channel
pub fn relay_command(channel: u8, on: bool) -> Vec<u8> {
    let state = if on { "ON" } else { "OFF" };
    format!("CH{}:{}\r\n", channel, state).into_bytes()
}

/// Trait for relay board adapters
#[async_trait]
pub trait RelayDriver: Send + Sync {
    /// Pulse the given channel ON then OFF to open its door
    async fn pulse(&self, channel: u8) -> DeviceResult<()>;

    /// Check if the board is reachable
    async fn is_online(&self) -> bool;
}

/// Relay board reached over TCP
#[derive(Debug, Clone)]
pub struct NetworkRelay {
    addr: SocketAddr,
    timeout: Duration,
    /// How long the relay stays ON before switching OFF
    pulse_hold: Duration,
}

impl NetworkRelay {
    pub fn new(host: &str, port: u16) -> DeviceResult<Self> {
        let addr_str = format!("{}:{}", host, port);
        let addr = addr_str
            .parse()
            .map_err(|_| DeviceError::InvalidConfig(format!("Invalid address: {}", addr_str)))?;
        Ok(Self {
            addr,
            timeout: Duration::from_secs(3),
            pulse_hold: Duration::from_millis(700),
        })
    }

    /// Set the ON hold interval
    pub fn with_pulse_hold(mut self, hold: Duration) -> Self {
        self.pulse_hold = hold;
        self
    }

    async fn connect(&self) -> DeviceResult<TcpStream> {
        tokio::time::timeout(self.timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| DeviceError::Timeout(format!("Connection timeout: {}", self.addr)))?
            .map_err(|e| DeviceError::Connection(format!("{}: {}", self.addr, e)))
    }
}

#[async_trait]
impl RelayDriver for NetworkRelay {
    #[instrument(skip(self), fields(addr = %self.addr, channel = channel))]
    async fn pulse(&self, channel: u8) -> DeviceResult<()> {
        if channel == 0 || channel > MAX_CHANNEL {
            return Err(DeviceError::InvalidConfig(format!(
                "channel must be 1..={}, got {}",
                MAX_CHANNEL, channel
            )));
        }

        let mut stream = self.connect().await?;

        stream.write_all(&relay_command(channel, true)).await?;
        stream.flush().await?;
        tokio::time::sleep(self.pulse_hold).await;
        stream.write_all(&relay_command(channel, false)).await?;
        stream.flush().await?;

        info!("Relay pulsed");
        Ok(())
    }

    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn is_online(&self) -> bool {
        self.connect().await.is_ok()
    }
}

/// Simulated relay board: logs the pulse and sleeps through the hold interval
#[derive(Debug, Clone)]
pub struct SimulatedRelay {
    pulse_hold: Duration,
}

impl SimulatedRelay {
    pub fn new(pulse_hold: Duration) -> Self {
        Self { pulse_hold }
    }
}

impl Default for SimulatedRelay {
    fn default() -> Self {
        Self::new(Duration::from_millis(700))
    }
}

#[async_trait]
impl RelayDriver for SimulatedRelay {
    async fn pulse(&self, channel: u8) -> DeviceResult<()> {
        if channel == 0 || channel > MAX_CHANNEL {
            return Err(DeviceError::InvalidConfig(format!(
                "channel must be 1..={}, got {}",
                MAX_CHANNEL, channel
            )));
        }
        tokio::time::sleep(self.pulse_hold).await;
        info!(channel = channel, "Simulated relay pulsed");
        Ok(())
    }

    async fn is_online(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_command_bytes() {
        assert_eq!(relay_command(3, true), b"CH3:ON\r\n".to_vec());
        assert_eq!(relay_command(12, false), b"CH12:OFF\r\n".to_vec());
    }

    #[tokio::test]
    async fn test_simulated_relay_validates_channel() {
        let relay = SimulatedRelay::new(Duration::from_millis(1));
        assert!(relay.pulse(1).await.is_ok());
        assert!(relay.pulse(0).await.is_err());
        assert!(relay.pulse(13).await.is_err());
    }
}
