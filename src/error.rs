//! Error types for SBrick protocol operations.

use thiserror::Error;

/// Result type alias for SBrick operations.
pub type Result<T> = std::result::Result<T, SBrickError>;

/// Error types for SBrick communication.
#[derive(Error, Debug)]
pub enum SBrickError {
    /// Missing or out-of-range argument, rejected before any wire traffic
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation attempted while the transport reports disconnected
    #[error("Not connected")]
    NotConnected,

    /// A characteristic write or read failed
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// Connected device runs a firmware older than the supported protocol revision
    #[error("Firmware {found} is not supported (requires {required} or newer)")]
    FirmwareIncompatible {
        /// Firmware revision reported by the device
        found: String,
        /// Oldest supported firmware revision
        required: String,
    },

    /// Response didn't match expected format
    #[error("Invalid response: expected {expected}, got {actual}")]
    InvalidResponse {
        /// Expected response format
        expected: String,
        /// Actual response received
        actual: String,
    },

    /// Data parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid controller configuration
    #[error("Config error: {0}")]
    Config(String),
}
