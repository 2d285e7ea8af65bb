//! Basic Usage Example
//!
//! Drives a simulated SBrick from an interactive menu:
//! - Driving single ports and all four ports with quick drive
//! - Stopping ports
//! - Reading sensors, battery and temperature
//! - Frame logging for protocol analysis
//!
//! The simulated device answers on an in-process loopback transport, so no
//! Bluetooth adapter is needed. A real application supplies its own
//! [`Transport`] backed by a BLE stack.
//!
//! Usage:
//!   cargo run --example basic_usage
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=trace cargo run --example basic_usage   # every frame in hex
//!   RUST_LOG=debug cargo run --example basic_usage

use async_trait::async_trait;
use inquire::{CustomType, Select};
use log::info;
use parking_lot::Mutex;
use sbrick_protocol::constants::*;
use sbrick_protocol::{
    Characteristic, Classifier, ControllerConfig, Direction, DriveSetting, MotorController, Result,
    SBrickError, Transport,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Loopback device answering ADC queries with fixed telemetry
struct SimulatedSBrick {
    connected: AtomicBool,
    values: Mutex<HashMap<Characteristic, Vec<u8>>>,
}

impl SimulatedSBrick {
    fn new() -> Self {
        let values = HashMap::from([
            (Characteristic::ModelNumber, b"SBrick".to_vec()),
            (Characteristic::FirmwareRevision, b"4.17".to_vec()),
            (Characteristic::HardwareRevision, b"4.0".to_vec()),
            (Characteristic::SoftwareRevision, b"4.17".to_vec()),
            (Characteristic::ManufacturerName, b"Vengit Ltd.".to_vec()),
        ]);
        SimulatedSBrick {
            connected: AtomicBool::new(true),
            values: Mutex::new(values),
        }
    }

    /// Reply the device would publish after `frame`
    fn reply_to(frame: &[u8]) -> Option<Vec<u8>> {
        match frame {
            [ADC_CMD, ADC_CHANNEL_VOLTAGE] => Some(0x5000i16.to_le_bytes().to_vec()),
            [ADC_CMD, ADC_CHANNEL_TEMPERATURE] => {
                let raw = ((24.5 + TEMPERATURE_OFFSET) * TEMPERATURE_DIVISOR) as i16;
                Some(raw.to_le_bytes().to_vec())
            }
            // Tilt sensor: reference, type id ~49, reading
            [ADC_CMD, ADC_CHANNEL_VOLTAGE, _, _] => Some(
                [1000u16, 192, 500]
                    .iter()
                    .flat_map(|w| (w << SENSOR_SHIFT).to_le_bytes())
                    .collect(),
            ),
            _ => None,
        }
    }
}

#[async_trait]
impl Transport for SimulatedSBrick {
    async fn write(&self, characteristic: Characteristic, bytes: &[u8]) -> Result<()> {
        if !self.is_connected() {
            return Err(SBrickError::TransportFailure("link down".to_string()));
        }
        if let Some(reply) = SimulatedSBrick::reply_to(bytes) {
            self.values.lock().insert(characteristic, reply);
        }
        Ok(())
    }

    async fn read(&self, characteristic: Characteristic) -> Result<Vec<u8>> {
        Ok(self.values.lock().get(&characteristic).cloned().unwrap_or_default())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

fn prompt_port() -> std::result::Result<u8, inquire::InquireError> {
    CustomType::<u8>::new("Port (0-3):").with_default(0).prompt()
}

fn prompt_power() -> std::result::Result<i32, inquire::InquireError> {
    CustomType::<i32>::new("Power (-255 to 255, sign sets direction):")
        .with_default(128)
        .prompt()
}

fn direction_for(power: i32) -> Direction {
    if power < 0 {
        Direction::CounterClockwise
    } else {
        Direction::Clockwise
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize logger with default info level if RUST_LOG is not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let link: Arc<dyn Transport> = Arc::new(SimulatedSBrick::new());
    let sbrick = MotorController::connect(link, ControllerConfig::default()).await?;
    info!("Model {} by {}", sbrick.device_info().model_number, sbrick.device_info().manufacturer_name);

    let actions = vec![
        "Drive port",
        "Quick drive all ports",
        "Stop ports",
        "Read sensor",
        "Battery",
        "Temperature",
        "Quit",
    ];

    loop {
        let action = Select::new("Action:", actions.clone()).prompt()?;
        let result = match action {
            "Drive port" => {
                let port = prompt_port()?;
                let power = prompt_power()?;
                sbrick
                    .drive(port, direction_for(power), power)
                    .await
                    .map(|outcome| info!("Drive: {:?}", outcome))
            }
            "Quick drive all ports" => {
                let power = prompt_power()?;
                let settings: Vec<DriveSetting> = (0..4)
                    .map(|port| DriveSetting {
                        port,
                        direction: direction_for(power),
                        power,
                    })
                    .collect();
                sbrick
                    .quick_drive(&settings)
                    .await
                    .map(|outcome| info!("Quick drive: {:?}", outcome))
            }
            "Stop ports" => sbrick
                .stop(&[0, 1, 2, 3])
                .await
                .map(|ports| info!("Stopped: {:?}", ports)),
            "Read sensor" => {
                let port = prompt_port()?;
                let classifier = Select::new("Classifier:", vec!["wedo", "default"]).prompt()?;
                sbrick
                    .get_sensor(port, Classifier::from_str(classifier))
                    .await
                    .map(|sample| info!("Sensor: {:?}", sample))
            }
            "Battery" => sbrick
                .get_battery()
                .await
                .map(|b| info!("Battery: {:.2}V ({}%)", b.volts, b.percent)),
            "Temperature" => sbrick
                .get_temperature(false)
                .await
                .map(|t| info!("Temperature: {:.1}°C", t)),
            _ => break,
        };

        if let Err(e) = result {
            info!("✗ {}", e);
        }
    }

    sbrick.disconnect().await?;
    info!("=== Basic Usage Complete ===");
    Ok(())
}
