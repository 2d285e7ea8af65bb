use crate::config::ControllerConfig;
use crate::constants::*;
use crate::error::{Result, SBrickError};
use crate::keepalive::KeepaliveTimer;
use crate::ports::PortTable;
use crate::protocol;
use crate::scheduler::{Command, CommandScheduler, PendingCommand};
use crate::transport::{Characteristic, Transport};
use crate::types::*;
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Main SBrick interface
///
/// Every public operation funnels its wire traffic through one
/// [`CommandScheduler`], so commands issued from concurrent tasks never
/// overlap on the link. Power commands are checked against each port's mode
/// first: a port wired as a sensor is switched back to output (with the
/// measurement settle delay) before it is driven, and is never sent a break.
pub struct MotorController {
    transport: Arc<dyn Transport>,
    scheduler: CommandScheduler,
    ports: PortTable,
    /// Held from a port's mode change until its dependent command is queued
    mode_locks: [Mutex<()>; PORT_COUNT],
    keepalive: KeepaliveTimer,
    events: broadcast::Sender<ControllerEvent>,
    config: ControllerConfig,
    device_info: DeviceInfo,
}

impl MotorController {
    /// Take over a connected transport.
    ///
    /// Reads the device information strings and refuses firmware older than
    /// `config.min_firmware`, disconnecting the transport in that case. On
    /// success the command queue and keepalive are running.
    pub async fn connect(transport: Arc<dyn Transport>, config: ControllerConfig) -> Result<Self> {
        config.validate()?;
        if !transport.is_connected() {
            return Err(SBrickError::NotConnected);
        }

        let device_info = read_device_info(&*transport).await?;
        let compatible = match FirmwareVersion::parse(&device_info.firmware_revision) {
            Ok(version) => version >= config.min_firmware,
            Err(e) => {
                warn!("{}", e);
                false
            }
        };
        if !compatible {
            warn!(
                "Firmware {:?} below {}, disconnecting",
                device_info.firmware_revision, config.min_firmware
            );
            if let Err(e) = transport.disconnect().await {
                warn!("Disconnect after firmware rejection failed: {}", e);
            }
            return Err(SBrickError::FirmwareIncompatible {
                found: device_info.firmware_revision,
                required: config.min_firmware.to_string(),
            });
        }

        let scheduler = CommandScheduler::spawn(transport.clone());
        let (events, _) = broadcast::channel(config.event_capacity);
        let keepalive = KeepaliveTimer::new(scheduler.clone(), transport.clone(), events.clone());
        keepalive.start(config.keepalive_interval());

        info!(
            "Connected to {} (firmware {}, hardware {})",
            device_info.model_number, device_info.firmware_revision, device_info.hardware_revision
        );

        Ok(MotorController {
            transport,
            scheduler,
            ports: PortTable::new(),
            mode_locks: std::array::from_fn(|_| Mutex::new(())),
            keepalive,
            events,
            config,
            device_info,
        })
    }

    /// Stop the keepalive and release the transport.
    ///
    /// Commands already queued are not cancelled; they fail with
    /// [`SBrickError::NotConnected`] once the transport reports the link down.
    pub async fn disconnect(&self) -> Result<()> {
        self.keepalive.stop();
        self.transport.disconnect().await?;
        info!("Disconnected");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn keepalive_running(&self) -> bool {
        self.keepalive.is_running()
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Receive port changes and connection loss notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// Commands queued or in flight
    pub fn queue_depth(&self) -> usize {
        self.scheduler.depth()
    }

    pub fn port(&self, port: u8) -> Result<PortSnapshot> {
        Ok(self.ports.snapshot(PortId::new(port)?))
    }

    pub fn ports(&self) -> Vec<PortSnapshot> {
        self.ports.all().iter().map(Port::snapshot).collect()
    }

    /// Drive a single port.
    ///
    /// The magnitude of `power` is clamped to 0-255. If a previous drive or
    /// stop for the same port has not reached the wire yet (including one
    /// still waiting out a mode change), nothing is sent and
    /// [`Outcome::Coalesced`] is returned.
    pub async fn drive(&self, port: u8, direction: Direction, power: i32) -> Result<Outcome<PortSnapshot>> {
        let id = PortId::new(port)?;
        self.ensure_connected()?;

        let power = protocol::clamp_power(power);
        if !self.ports.try_mark_busy(id) {
            debug!("Port {} busy, drive coalesced", id);
            return Ok(Outcome::Coalesced);
        }

        let pending = match self.submit_drive(id, direction, power).await {
            Ok(pending) => pending,
            Err(e) => {
                self.ports.clear_busy(id);
                return Err(e);
            }
        };

        let result = pending.await;
        self.ports.clear_busy(id);
        result?;

        let snapshot = self.ports.snapshot(id);
        self.notify(&[snapshot]);
        Ok(Outcome::Applied(snapshot))
    }

    /// Drive several ports with one packed quick-drive frame.
    ///
    /// Listed ports take their new settings immediately; the frame carries
    /// every port's current state. If any port is busy the frame is not sent
    /// and [`Outcome::Coalesced`] is returned; the caller has to retry.
    pub async fn quick_drive(&self, settings: &[DriveSetting]) -> Result<Outcome<Vec<PortSnapshot>>> {
        if settings.is_empty() {
            return Err(SBrickError::InvalidArgument("quick drive needs at least one port".to_string()));
        }
        let ids = settings
            .iter()
            .map(|s| PortId::new(s.port))
            .collect::<Result<Vec<_>>>()?;
        self.ensure_connected()?;

        for (id, setting) in ids.iter().zip(settings) {
            self.ports
                .set_drive(*id, setting.direction, protocol::clamp_power(setting.power));
        }

        if !self.ports.try_mark_all_busy() {
            debug!("Ports busy, quick drive skipped");
            return Ok(Outcome::Coalesced);
        }

        let frame = protocol::encode_quick_drive(&self.ports.all().map(Some));
        let result = self
            .scheduler
            .execute(Command::write(Characteristic::QuickDrive, frame.to_vec()))
            .await;
        self.ports.clear_all_busy();
        result?;

        let snapshots: Vec<PortSnapshot> = ids.iter().map(|id| self.ports.snapshot(*id)).collect();
        self.notify(&snapshots);
        Ok(Outcome::Applied(snapshots))
    }

    /// Stop the given ports.
    ///
    /// Input ports are left untouched and kept out of the break frame; when
    /// none of the ports is an output nothing is sent. The returned list has
    /// one entry per requested id, in request order, duplicates included;
    /// the break frame names each port once.
    pub async fn stop(&self, ports: &[u8]) -> Result<Vec<PortSnapshot>> {
        if ports.is_empty() {
            return Err(SBrickError::InvalidArgument("stop needs at least one port".to_string()));
        }
        let requested = ports
            .iter()
            .map(|&port| PortId::new(port))
            .collect::<Result<Vec<_>>>()?;
        self.ensure_connected()?;

        let mut outputs: Vec<PortId> = Vec::with_capacity(requested.len());
        for id in &requested {
            if !outputs.contains(id) && self.ports.get(*id).mode == PortMode::Output {
                outputs.push(*id);
            }
        }
        for id in &outputs {
            self.ports.set_power(*id, 0);
        }

        let records: Vec<Port> = outputs.iter().map(|id| self.ports.get(*id)).collect();
        if let Some(frame) = protocol::encode_stop(&records) {
            for id in &outputs {
                self.ports.mark_busy(*id);
            }
            let result = self
                .scheduler
                .execute(Command::write(Characteristic::RemoteControl, frame))
                .await;
            for id in &outputs {
                self.ports.clear_busy(*id);
            }
            result?;

            let stopped: Vec<PortSnapshot> = outputs.iter().map(|id| self.ports.snapshot(*id)).collect();
            self.notify(&stopped);
        } else {
            debug!("No output ports among {:?}, stop skipped", ports);
        }

        Ok(requested.iter().map(|id| self.ports.snapshot(*id)).collect())
    }

    /// Read a sensor attached to `port`.
    ///
    /// The port is switched to input with periodic voltage measurement on
    /// (waiting out the settle delay if that changed anything) and stays an
    /// input afterwards.
    pub async fn get_sensor(&self, port: u8, classifier: Classifier) -> Result<SensorSample> {
        let id = PortId::new(port)?;
        self.ensure_connected()?;

        let pending = {
            let _guard = self.mode_locks[id.index()].lock().await;
            let mode_changed = self.ports.set_mode(id, PortMode::Input);
            let pvm_changed = self.ports.set_pvm_active(id, true);
            if mode_changed || pvm_changed {
                self.apply_measurement_mode().await?;
            }

            let [channel_a, channel_b] = id.channels();
            self.scheduler.submit(Command::query(
                Characteristic::RemoteControl,
                protocol::encode_adc_query(&[ADC_CHANNEL_VOLTAGE, channel_a, channel_b]),
                SENSOR_FRAME_LEN,
            ))
        };
        let reply = pending.await?;
        protocol::decode_sensor_frame(&reply, classifier)
    }

    /// Battery voltage in volts
    pub async fn get_voltage(&self) -> Result<f64> {
        let raw = self.query_adc(ADC_CHANNEL_VOLTAGE).await?;
        Ok(protocol::decode_voltage(raw))
    }

    pub async fn get_battery(&self) -> Result<BatteryReading> {
        let volts = self.get_voltage().await?;
        Ok(BatteryReading {
            volts,
            percent: protocol::decode_battery_percent(volts),
        })
    }

    /// Internal temperature, in Celsius unless `fahrenheit` is set
    pub async fn get_temperature(&self, fahrenheit: bool) -> Result<f64> {
        let raw = self.query_adc(ADC_CHANNEL_TEMPERATURE).await?;
        let celsius = protocol::decode_temperature(raw);
        Ok(if fahrenheit {
            protocol::celsius_to_fahrenheit(celsius)
        } else {
            celsius
        })
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.transport.is_connected() {
            Ok(())
        } else {
            Err(SBrickError::NotConnected)
        }
    }

    async fn query_adc(&self, channel: u8) -> Result<i16> {
        self.ensure_connected()?;
        let reply = self
            .scheduler
            .execute(Command::query(
                Characteristic::RemoteControl,
                protocol::encode_adc_query(&[channel]),
                ADC_SAMPLE_LEN,
            ))
            .await?;
        protocol::decode_adc_sample(&reply)
    }

    /// Queue a drive frame, first flipping a sensor port back to output.
    ///
    /// The caller holds the port's busy flag. The state update happens once
    /// the frame is queued.
    async fn submit_drive(&self, id: PortId, direction: Direction, power: u8) -> Result<PendingCommand> {
        let _guard = self.mode_locks[id.index()].lock().await;
        if self.ports.set_mode(id, PortMode::Output) {
            self.ports.set_pvm_active(id, false);
            self.apply_measurement_mode().await?;
        }

        let frame = protocol::encode_drive(id.hardware_id(), direction, i32::from(power))?;
        let pending = self.scheduler.submit(Command::write(Characteristic::RemoteControl, frame));
        self.ports.set_drive(id, direction, power);
        Ok(pending)
    }

    /// Send the current PVM channel set and wait for it to settle.
    async fn apply_measurement_mode(&self) -> Result<()> {
        let frame = protocol::encode_pvm_toggle(&self.ports.all());
        self.scheduler
            .execute(Command::write(Characteristic::RemoteControl, frame))
            .await?;
        tokio::time::sleep(self.config.settle_delay()).await;
        Ok(())
    }

    fn notify(&self, snapshots: &[PortSnapshot]) {
        let at = Utc::now();
        for port in snapshots {
            // No subscribers is fine
            let _ = self.events.send(ControllerEvent::PortChanged { port: *port, at });
        }
    }
}

/// Read the device information strings.
///
/// Only the firmware revision is required; the others default to empty
/// strings when they cannot be read.
pub async fn read_device_info(transport: &dyn Transport) -> Result<DeviceInfo> {
    Ok(DeviceInfo {
        firmware_revision: read_string(transport, Characteristic::FirmwareRevision).await?,
        model_number: read_optional_string(transport, Characteristic::ModelNumber).await,
        hardware_revision: read_optional_string(transport, Characteristic::HardwareRevision).await,
        software_revision: read_optional_string(transport, Characteristic::SoftwareRevision).await,
        manufacturer_name: read_optional_string(transport, Characteristic::ManufacturerName).await,
    })
}

async fn read_optional_string(transport: &dyn Transport, characteristic: Characteristic) -> String {
    match read_string(transport, characteristic).await {
        Ok(value) => value,
        Err(e) => {
            warn!("Could not read {}: {}", characteristic, e);
            String::new()
        }
    }
}

async fn read_string(transport: &dyn Transport, characteristic: Characteristic) -> Result<String> {
    let bytes = transport.read(characteristic).await?;
    Ok(String::from_utf8_lossy(&bytes).trim_end_matches('\0').trim().to_string())
}
