//! # SBrick Protocol Library
//!
//! A Rust library for driving SBrick 4-port motor/sensor controllers over
//! Bluetooth LE. The GATT link itself is supplied by the caller through the
//! [`Transport`] trait; this crate owns the wire protocol and command pacing.
//!
//! ## Features
//!
//! - Drive single ports or all four at once with the packed quick-drive frame
//! - Stop motors without disturbing ports wired as sensors
//! - Read WeDo tilt/motion sensors, battery voltage and internal temperature
//! - Serialized command queue with coalescing of redundant drive commands
//! - Keepalive traffic for the device's inactivity watchdog
//! - Firmware compatibility check at connect time
//!
//! ## Example
//!
//! ```no_run
//! use sbrick_protocol::{ControllerConfig, Direction, MotorController, Transport};
//! use std::sync::Arc;
//!
//! async fn run(link: Arc<dyn Transport>) -> sbrick_protocol::Result<()> {
//!     let sbrick = MotorController::connect(link, ControllerConfig::default()).await?;
//!     sbrick.drive(0, Direction::Clockwise, 200).await?;
//!     let battery = sbrick.get_battery().await?;
//!     println!("Battery: {:.2}V ({}%)", battery.volts, battery.percent);
//!     sbrick.stop(&[0]).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod keepalive;
pub mod ports;
pub mod protocol;
pub mod scheduler;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock_transport;

pub use config::ControllerConfig;
pub use controller::MotorController;
pub use error::{Result, SBrickError};
pub use transport::{Characteristic, Transport};
pub use types::*;
