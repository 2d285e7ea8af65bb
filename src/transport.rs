//! The wireless link the controller talks through.
//!
//! Discovery, connection and pairing are left to the host application, which
//! hands the controller something implementing [`Transport`].

use crate::constants::*;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// GATT characteristics used by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    /// Drive, break, ADC and PVM commands, and their telemetry replies
    RemoteControl,
    /// Packed 4-byte quick-drive frames
    QuickDrive,
    ModelNumber,
    FirmwareRevision,
    HardwareRevision,
    SoftwareRevision,
    ManufacturerName,
}

impl Characteristic {
    pub fn uuid(self) -> &'static str {
        match self {
            Characteristic::RemoteControl => REMOTE_CONTROL_CHAR_UUID,
            Characteristic::QuickDrive => QUICK_DRIVE_CHAR_UUID,
            Characteristic::ModelNumber => MODEL_NUMBER_CHAR_UUID,
            Characteristic::FirmwareRevision => FIRMWARE_REVISION_CHAR_UUID,
            Characteristic::HardwareRevision => HARDWARE_REVISION_CHAR_UUID,
            Characteristic::SoftwareRevision => SOFTWARE_REVISION_CHAR_UUID,
            Characteristic::ManufacturerName => MANUFACTURER_NAME_CHAR_UUID,
        }
    }

    /// UUID of the service the characteristic belongs to
    pub fn service_uuid(self) -> &'static str {
        match self {
            Characteristic::RemoteControl | Characteristic::QuickDrive => REMOTE_CONTROL_SERVICE_UUID,
            _ => DEVICE_INFO_SERVICE_UUID,
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.uuid())
    }
}

/// Characteristic-level access to a connected device.
///
/// Implementations report failures as [`crate::SBrickError::TransportFailure`]
/// and must write bytes exactly in the order supplied. The controller never
/// issues two operations concurrently.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write a value to a characteristic.
    async fn write(&self, characteristic: Characteristic, bytes: &[u8]) -> Result<()>;

    /// Read the current value of a characteristic.
    async fn read(&self, characteristic: Characteristic) -> Result<Vec<u8>>;

    fn is_connected(&self) -> bool;

    /// Release the link.
    async fn disconnect(&self) -> Result<()>;
}
