//! Error types for the device drivers

use thiserror::Error;

/// Device error types
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error while talking to the device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting for the device
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Malformed or unexpected frame from the device
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid device configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;
