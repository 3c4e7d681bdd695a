//! Bill acceptor adapters
//!
//! Supports:
//! - Network acceptors (ID-003 device behind a serial-TCP converter)
//! - Simulated acceptor for development without hardware

use crate::error::{DeviceError, DeviceResult};
use crate::id003::{self, AcceptorStatus};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, instrument, warn};

/// Trait for bill acceptor adapters
///
/// `accept` blocks until the device confirms capture of a note of the
/// expected denomination, returns it, or the deadline passes. `Ok(true)`
/// means the note is irrevocably in the cashbox ("stacked"); only then may
/// the caller report a credit.
#[async_trait]
pub trait BillAcceptor: Send + Sync {
    /// Wait for a note of `amount` DA; stack it if it matches, return it
    /// otherwise. `Ok(false)` = no matching note captured before the deadline.
    async fn accept(&self, amount: u32) -> DeviceResult<bool>;

    /// Check if the acceptor is reachable
    async fn is_online(&self) -> bool;
}

/// ID-003 acceptor reached over TCP
#[derive(Debug, Clone)]
pub struct NetworkAcceptor {
    addr: SocketAddr,
    /// Overall deadline for one accept cycle
    deadline: Duration,
    /// Delay between status polls
    poll_interval: Duration,
    /// Denominations the inhibit mask allows
    allowed: Vec<u32>,
}

impl NetworkAcceptor {
    pub fn new(host: &str, port: u16, allowed: Vec<u32>) -> DeviceResult<Self> {
        let addr_str = format!("{}:{}", host, port);
        let addr = addr_str
            .parse()
            .map_err(|_| DeviceError::InvalidConfig(format!("Invalid address: {}", addr_str)))?;
        Ok(Self {
            addr,
            deadline: Duration::from_secs(10),
            poll_interval: Duration::from_millis(200),
            allowed,
        })
    }

    /// Set the overall accept deadline
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    async fn connect(&self) -> DeviceResult<TcpStream> {
        tokio::time::timeout(Duration::from_secs(3), TcpStream::connect(self.addr))
            .await
            .map_err(|_| DeviceError::Timeout(format!("Connection timeout: {}", self.addr)))?
            .map_err(|e| DeviceError::Connection(format!("{}: {}", self.addr, e)))
    }

    async fn send(&self, stream: &mut TcpStream, cmd: u8, data: &[u8]) -> DeviceResult<()> {
        stream.write_all(&id003::frame(cmd, data)).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Read one status frame, tolerating partial reads
    async fn read_status(&self, stream: &mut TcpStream) -> DeviceResult<AcceptorStatus> {
        let mut buf = Vec::with_capacity(32);
        let mut chunk = [0u8; 32];
        let deadline = tokio::time::Instant::now() + Duration::from_millis(500);
        loop {
            if let Some((cmd, data, consumed)) = id003::parse_frame(&buf)? {
                debug_assert!(consumed <= buf.len());
                return Ok(id003::parse_status(cmd, &data));
            }
            let remaining = deadline
                .checked_duration_since(tokio::time::Instant::now())
                .ok_or_else(|| DeviceError::Timeout("status read timed out".into()))?;
            let n = tokio::time::timeout(remaining, stream.read(&mut chunk))
                .await
                .map_err(|_| DeviceError::Timeout("status read timed out".into()))??;
            if n == 0 {
                return Err(DeviceError::Connection("acceptor closed connection".into()));
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }
}

#[async_trait]
impl BillAcceptor for NetworkAcceptor {
    #[instrument(skip(self), fields(addr = %self.addr, amount = amount))]
    async fn accept(&self, amount: u32) -> DeviceResult<bool> {
        let mut stream = self.connect().await?;

        // Allow only the configured denominations
        let mask = id003::inhibit_mask_for(&self.allowed);
        self.send(&mut stream, id003::CMD_INHIBIT, &[mask]).await?;

        info!("Waiting for note in escrow");
        let deadline = tokio::time::Instant::now() + self.deadline;
        let mut stacking = false;

        while tokio::time::Instant::now() < deadline {
            self.send(&mut stream, id003::CMD_STATUS_REQ, &[]).await?;
            let status = match self.read_status(&mut stream).await {
                Ok(s) => s,
                Err(DeviceError::Timeout(_)) => {
                    tokio::time::sleep(self.poll_interval).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match status {
                AcceptorStatus::Escrow(value) if !stacking => {
                    if value == amount {
                        info!(value = value, "Note in escrow matches, stacking");
                        self.send(&mut stream, id003::CMD_STACK, &[]).await?;
                        stacking = true;
                    } else {
                        warn!(value = value, expected = amount, "Wrong denomination, returning");
                        self.send(&mut stream, id003::CMD_RETURN, &[]).await?;
                    }
                }
                s if s.is_captured() => {
                    info!("Note stacked");
                    return Ok(true);
                }
                AcceptorStatus::Rejecting => {
                    debug!("Device rejected the note");
                    stacking = false;
                }
                _ => {}
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        Ok(false)
    }

    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn is_online(&self) -> bool {
        self.connect().await.is_ok()
    }
}

/// Simulated acceptor: confirms any requested note after a short delay
#[derive(Debug, Clone)]
pub struct SimulatedAcceptor {
    delay: Duration,
}

impl SimulatedAcceptor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedAcceptor {
    fn default() -> Self {
        Self::new(Duration::from_millis(400))
    }
}

#[async_trait]
impl BillAcceptor for SimulatedAcceptor {
    async fn accept(&self, amount: u32) -> DeviceResult<bool> {
        tokio::time::sleep(self.delay).await;
        info!(amount = amount, "Simulated note stacked");
        Ok(true)
    }

    async fn is_online(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_acceptor_accepts() {
        let acceptor = SimulatedAcceptor::new(Duration::from_millis(1));
        assert!(acceptor.accept(500).await.unwrap());
        assert!(acceptor.is_online().await);
    }

    #[test]
    fn test_network_acceptor_rejects_bad_address() {
        assert!(NetworkAcceptor::new("not an address", 4001, vec![500]).is_err());
    }
}
