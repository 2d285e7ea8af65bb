use crate::constants::PORT_COUNT;
use crate::error::{Result, SBrickError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rotation direction of a driven channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl Direction {
    /// Wire encoding (0 = clockwise, 1 = counter-clockwise)
    pub fn as_byte(self) -> u8 {
        match self {
            Direction::Clockwise => 0,
            Direction::CounterClockwise => 1,
        }
    }
}

/// What a port is wired for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortMode {
    /// Motor or other actuator
    #[default]
    Output,
    /// Sensor
    Input,
}

/// Validated port index (0-3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PortId(u8);

impl PortId {
    /// All four ports in index order
    pub const ALL: [PortId; PORT_COUNT] = [PortId(0), PortId(1), PortId(2), PortId(3)];

    pub fn new(id: u8) -> Result<Self> {
        if usize::from(id) < PORT_COUNT {
            Ok(PortId(id))
        } else {
            Err(SBrickError::InvalidArgument(format!(
                "port {} out of range (0-{})",
                id,
                PORT_COUNT - 1
            )))
        }
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Channel id used by drive and break commands
    pub fn hardware_id(self) -> u8 {
        self.0
    }

    /// The two ADC channels backing this port
    pub fn channels(self) -> [u8; 2] {
        [self.0 * 2, self.0 * 2 + 1]
    }
}

impl TryFrom<u8> for PortId {
    type Error = SBrickError;

    fn try_from(id: u8) -> Result<Self> {
        PortId::new(id)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// In-memory record of a single port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port {
    pub id: PortId,
    pub power: u8,
    pub direction: Direction,
    pub mode: PortMode,
    /// A drive/stop frame for this port is queued but not yet on the wire
    pub busy: bool,
    /// Periodic voltage measurement is enabled for this port's channels
    pub pvm_active: bool,
}

impl Port {
    pub fn new(id: PortId) -> Self {
        Port {
            id,
            power: 0,
            direction: Direction::Clockwise,
            mode: PortMode::Output,
            busy: false,
            pvm_active: false,
        }
    }

    pub fn snapshot(&self) -> PortSnapshot {
        PortSnapshot {
            port: self.id.value(),
            direction: self.direction,
            power: self.power,
            mode: self.mode,
        }
    }
}

/// Read-only projection of a port handed back to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSnapshot {
    pub port: u8,
    pub direction: Direction,
    pub power: u8,
    pub mode: PortMode,
}

/// One entry of a quick-drive request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveSetting {
    pub port: u8,
    #[serde(default)]
    pub direction: Direction,
    /// Requested power; the magnitude is clamped to 0-255
    pub power: i32,
}

/// Whether a power command reached the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The frame was written and the settings applied
    Applied(T),
    /// A previous command for the same port(s) was still pending; nothing was sent
    Coalesced,
}

impl<T> Outcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Coalesced => None,
        }
    }

    pub fn is_coalesced(&self) -> bool {
        matches!(self, Outcome::Coalesced)
    }
}

/// How raw sensor channels are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Classifier {
    /// Plain channel-B / reference ratio
    #[default]
    Default,
    /// LEGO WeDo 1.0 tilt and motion sensors
    Wedo,
}

impl Classifier {
    pub fn from_str(s: &str) -> Self {
        match s {
            "wedo" => Classifier::Wedo,
            _ => Classifier::Default,
        }
    }
}

/// Sensor family inferred by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorCategory {
    Tilt,
    Motion,
    Unknown,
}

/// Decoded sensor telemetry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSample {
    /// Type id derived from channel A (WeDo classifier only)
    pub type_id: Option<u32>,
    pub category: SensorCategory,
    pub value: f64,
}

/// Battery voltage reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatteryReading {
    pub volts: f64,
    pub percent: u8,
}

/// Firmware revision as reported in the device information service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FirmwareVersion {
    pub major: u16,
    pub minor: u16,
}

impl FirmwareVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        FirmwareVersion { major, minor }
    }

    /// Parse a revision string such as `"4.17"`; trailing components are ignored.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        let mut parts = trimmed.split('.');
        let component = |part: Option<&str>| -> Result<u16> {
            match part {
                Some(p) => p
                    .parse::<u16>()
                    .map_err(|_| SBrickError::Parse(format!("Invalid firmware version \"{}\"", trimmed))),
                None => Ok(0),
            }
        };

        let major = component(parts.next())?;
        let minor = component(parts.next())?;
        Ok(FirmwareVersion { major, minor })
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl TryFrom<String> for FirmwareVersion {
    type Error = SBrickError;

    fn try_from(s: String) -> Result<Self> {
        FirmwareVersion::parse(&s)
    }
}

impl From<FirmwareVersion> for String {
    fn from(version: FirmwareVersion) -> Self {
        version.to_string()
    }
}

/// Device information strings read at connect time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub model_number: String,
    pub firmware_revision: String,
    pub hardware_revision: String,
    pub software_revision: String,
    pub manufacturer_name: String,
}

/// Notification published to external observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ControllerEvent {
    /// A drive, quick-drive or stop command completed for this port
    PortChanged {
        port: PortSnapshot,
        at: DateTime<Utc>,
    },
    /// The keepalive found the transport disconnected
    ConnectionLost { at: DateTime<Utc> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_id_maps_to_channels() {
        let port = PortId::new(1).unwrap();
        assert_eq!(port.hardware_id(), 1);
        assert_eq!(port.channels(), [2, 3]);
        assert_eq!(PortId::new(3).unwrap().channels(), [6, 7]);
    }

    #[test]
    fn port_id_rejects_out_of_range() {
        assert!(matches!(PortId::new(4), Err(SBrickError::InvalidArgument(_))));
        assert!(PortId::try_from(200u8).is_err());
    }

    #[test]
    fn classifier_from_str() {
        assert_eq!(Classifier::from_str("wedo"), Classifier::Wedo);
        assert_eq!(Classifier::from_str("lego"), Classifier::Default);
        assert_eq!(Classifier::from_str(""), Classifier::Default);
    }

    #[test]
    fn firmware_versions_compare_numerically() {
        let required = FirmwareVersion::parse("4.17").unwrap();
        assert!(FirmwareVersion::parse("4.10").unwrap() < required);
        assert!(FirmwareVersion::parse("4.2").unwrap() < required);
        assert!(FirmwareVersion::parse("4.17").unwrap() >= required);
        assert!(FirmwareVersion::parse("5.0").unwrap() > required);
        assert_eq!(FirmwareVersion::parse("4.17.3\0").unwrap(), required);
    }

    #[test]
    fn firmware_version_rejects_garbage() {
        assert!(matches!(FirmwareVersion::parse("abc"), Err(SBrickError::Parse(_))));
        assert!(FirmwareVersion::parse("").is_err());
        assert!(FirmwareVersion::parse("4.x").is_err());
    }

    #[test]
    fn event_serializes_with_tag() {
        let event = ControllerEvent::PortChanged {
            port: Port::new(PortId::ALL[2]).snapshot(),
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "port_changed");
        assert_eq!(json["port"]["port"], 2);
        assert_eq!(json["port"]["direction"], "clockwise");
    }
}
