//! Protocol constants for SBrick communication.
//!
//! This module defines the command opcodes, ADC channel ids, GATT
//! characteristic UUIDs and timing parameters used by the remote-control
//! protocol.

/// Break command (stop one or more channels)
pub const BREAK_CMD: u8 = 0x00;

/// Drive command (set direction and power of a single channel)
pub const DRIVE_CMD: u8 = 0x01;

/// Query ADC command (read the latest measurement of named channels)
pub const ADC_CMD: u8 = 0x0F;

/// Set up periodic voltage measurement on the listed channels
pub const PVM_CMD: u8 = 0x2C;

/// ADC channel carrying the battery voltage
pub const ADC_CHANNEL_VOLTAGE: u8 = 0x08;

/// ADC channel carrying the internal temperature
pub const ADC_CHANNEL_TEMPERATURE: u8 = 0x09;

/// Number of ports on the device
pub const PORT_COUNT: usize = 4;

/// Highest power accepted by the drive command
pub const MAX_POWER: u8 = 255;

/// Highest power representable in a quick-drive slot (7 bits)
pub const MAX_QUICK_DRIVE_POWER: u8 = 127;

/// Battery voltage considered "full" when computing a percentage
pub const MAX_VOLT: f64 = 9.0;

/// Full-scale voltage of the ADC reference
pub const VOLTAGE_SCALE: f64 = 0.83875;

/// ADC count corresponding to [`VOLTAGE_SCALE`]
pub const VOLTAGE_DIVISOR: f64 = 2047.0;

/// ADC counts per degree Celsius
pub const TEMPERATURE_DIVISOR: f64 = 118.85795;

/// Temperature offset in degrees Celsius
pub const TEMPERATURE_OFFSET: f64 = 160.0;

/// Number of bits the 12-bit sensor readings are left-shifted by in their 16-bit slot
pub const SENSOR_SHIFT: u32 = 4;

/// WeDo type ids classified as a tilt sensor
pub const WEDO_TILT_RANGE: std::ops::RangeInclusive<u32> = 48..=50;

/// Remote control service UUID
pub const REMOTE_CONTROL_SERVICE_UUID: &str = "4dc591b0-857c-41de-b5f1-15abda665b0c";

/// Remote control commands characteristic UUID
pub const REMOTE_CONTROL_CHAR_UUID: &str = "02b8cbcc-0e25-4bda-8790-a15f53e6010f";

/// Quick drive characteristic UUID
pub const QUICK_DRIVE_CHAR_UUID: &str = "489a6ae0-c1ab-4c9c-bdb2-11d373c1b7fb";

/// Device information service UUID
pub const DEVICE_INFO_SERVICE_UUID: &str = "0000180a-0000-1000-8000-00805f9b34fb";

/// Model number string characteristic UUID
pub const MODEL_NUMBER_CHAR_UUID: &str = "00002a24-0000-1000-8000-00805f9b34fb";

/// Firmware revision string characteristic UUID
pub const FIRMWARE_REVISION_CHAR_UUID: &str = "00002a26-0000-1000-8000-00805f9b34fb";

/// Hardware revision string characteristic UUID
pub const HARDWARE_REVISION_CHAR_UUID: &str = "00002a27-0000-1000-8000-00805f9b34fb";

/// Software revision string characteristic UUID
pub const SOFTWARE_REVISION_CHAR_UUID: &str = "00002a28-0000-1000-8000-00805f9b34fb";

/// Manufacturer name string characteristic UUID
pub const MANUFACTURER_NAME_CHAR_UUID: &str = "00002a29-0000-1000-8000-00805f9b34fb";

/// Oldest firmware revision speaking the supported protocol
pub const MIN_FIRMWARE_VERSION: &str = "4.17";

/// Device-side inactivity watchdog window in milliseconds
pub const WATCHDOG_TIMEOUT_MS: u64 = 500;

/// Interval between keepalive probes
pub const KEEPALIVE_INTERVAL_MS: u64 = 300;

/// Delay after a measurement-mode change before telemetry is trustworthy
pub const SETTLE_DELAY_MS: u64 = 500;

/// Capacity of the controller event channel
pub const EVENT_CAPACITY: usize = 64;

/// Reply length of a single-channel ADC query
pub const ADC_SAMPLE_LEN: usize = 2;

/// Reply length of a sensor query (reference voltage + two channels)
pub const SENSOR_FRAME_LEN: usize = 6;
