//! Frame encoding and telemetry decoding for the SBrick remote-control protocol.
//!
//! Every function here is a pure mapping between domain values and wire bytes;
//! I/O lives in the scheduler and the controller.

use crate::constants::*;
use crate::error::{Result, SBrickError};
use crate::types::*;

/// Clamp a requested power to the drive range, taking the magnitude first.
pub fn clamp_power(power: i32) -> u8 {
    power.unsigned_abs().min(u32::from(MAX_POWER)) as u8
}

/// Encode a drive frame for a single channel.
pub fn encode_drive(hardware_id: u8, direction: Direction, power: i32) -> Result<Vec<u8>> {
    let power = u8::try_from(power).map_err(|_| {
        SBrickError::InvalidArgument(format!("power {} outside 0-{}", power, MAX_POWER))
    })?;
    Ok(vec![DRIVE_CMD, hardware_id, direction.as_byte(), power])
}

/// Encode a break frame for the output ports among `ports`.
///
/// Input ports are left out. Returns `None` when nothing is left to stop.
pub fn encode_stop(ports: &[Port]) -> Option<Vec<u8>> {
    let ids: Vec<u8> = ports
        .iter()
        .filter(|p| p.mode == PortMode::Output)
        .map(|p| p.id.hardware_id())
        .collect();

    if ids.is_empty() {
        return None;
    }

    let mut frame = Vec::with_capacity(ids.len() + 1);
    frame.push(BREAK_CMD);
    frame.extend(ids);
    Some(frame)
}

/// Pack one quick-drive slot: upper 7 bits power (0-127), low bit direction.
fn quick_drive_byte(port: &Port) -> u8 {
    let scaled = u16::from(port.power) * u16::from(MAX_QUICK_DRIVE_POWER) / u16::from(MAX_POWER);
    ((scaled as u8) << 1) | port.direction.as_byte()
}

/// Encode the 4-byte quick-drive frame, one slot per port in index order.
///
/// Input ports and empty slots are sent as `0`, which the device ignores.
pub fn encode_quick_drive(slots: &[Option<Port>; PORT_COUNT]) -> [u8; PORT_COUNT] {
    let mut frame = [0u8; PORT_COUNT];
    for (byte, slot) in frame.iter_mut().zip(slots) {
        if let Some(port) = slot.filter(|p| p.mode == PortMode::Output) {
            *byte = quick_drive_byte(&port);
        }
    }
    frame
}

/// Encode the periodic voltage measurement set-up for every port with PVM active.
///
/// An empty active set yields the bare opcode, which disables measurement.
pub fn encode_pvm_toggle(ports: &[Port]) -> Vec<u8> {
    let mut frame = vec![PVM_CMD];
    for port in ports.iter().filter(|p| p.pvm_active) {
        frame.extend_from_slice(&port.id.channels());
    }
    frame
}

/// Encode an ADC query for the given channels.
pub fn encode_adc_query(channels: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(channels.len() + 1);
    frame.push(ADC_CMD);
    frame.extend_from_slice(channels);
    frame
}

/// Extract the signed 16-bit sample from a single-channel ADC reply.
pub fn decode_adc_sample(bytes: &[u8]) -> Result<i16> {
    match bytes {
        [lo, hi, ..] => Ok(i16::from_le_bytes([*lo, *hi])),
        _ => Err(SBrickError::InvalidResponse {
            expected: format!("{} bytes", ADC_SAMPLE_LEN),
            actual: format_frame(bytes),
        }),
    }
}

/// Convert a raw voltage sample to volts.
pub fn decode_voltage(raw: i16) -> f64 {
    f64::from(raw) * VOLTAGE_SCALE / VOLTAGE_DIVISOR
}

/// Convert a raw temperature sample to degrees Celsius.
pub fn decode_temperature(raw: i16) -> f64 {
    f64::from(raw) / TEMPERATURE_DIVISOR - TEMPERATURE_OFFSET
}

/// Convert degrees Celsius to Fahrenheit.
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Battery charge as a percentage of [`MAX_VOLT`].
pub fn decode_battery_percent(volts: f64) -> u8 {
    ((volts / MAX_VOLT).abs() * 100.0).round() as u8
}

/// Decode a sensor reply: little-endian words holding 12-bit readings.
///
/// Word 0 is the reference voltage, word 1 channel A and word 2 channel B.
pub fn decode_sensor_frame(bytes: &[u8], classifier: Classifier) -> Result<SensorSample> {
    if bytes.len() < SENSOR_FRAME_LEN {
        return Err(SBrickError::InvalidResponse {
            expected: format!("{} bytes", SENSOR_FRAME_LEN),
            actual: format_frame(bytes),
        });
    }

    let words: Vec<f64> = bytes[..SENSOR_FRAME_LEN]
        .chunks_exact(2)
        .map(|w| f64::from(u16::from_le_bytes([w[0], w[1]]) >> SENSOR_SHIFT))
        .collect();
    let (voltage, channel_a, channel_b) = (words[0], words[1], words[2]);

    if voltage == 0.0 {
        return Err(SBrickError::InvalidResponse {
            expected: "non-zero reference voltage".to_string(),
            actual: format_frame(bytes),
        });
    }

    let sample = match classifier {
        Classifier::Wedo => {
            let type_id = (channel_a / voltage * 255.0).round() as u32;
            let category = if WEDO_TILT_RANGE.contains(&type_id) {
                SensorCategory::Tilt
            } else {
                SensorCategory::Motion
            };
            SensorSample {
                type_id: Some(type_id),
                category,
                value: (channel_b / voltage * 255.0).round(),
            }
        }
        Classifier::Default => SensorSample {
            type_id: None,
            category: SensorCategory::Unknown,
            value: channel_b / voltage,
        },
    };

    Ok(sample)
}

/// Render a frame as space-separated hex for logging.
pub fn format_frame(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
