//! Keepalive traffic for the device's inactivity watchdog.
//!
//! The device drops the link when no command arrives within its watchdog
//! window. While running, the timer submits a temperature ADC query on every
//! tick where the command queue is empty; when other traffic is queued the
//! tick is skipped. The reply is discarded.

use crate::constants::*;
use crate::protocol::encode_adc_query;
use crate::scheduler::{Command, CommandScheduler};
use crate::transport::{Characteristic, Transport};
use crate::types::ControllerEvent;
use chrono::Utc;
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

struct Run {
    cancel: CancellationToken,
    running: Arc<AtomicBool>,
}

/// Stopped/Running timer sharing the controller's command queue.
///
/// Dropping the timer stops it.
pub struct KeepaliveTimer {
    scheduler: CommandScheduler,
    transport: Arc<dyn Transport>,
    events: broadcast::Sender<ControllerEvent>,
    run: Mutex<Option<Run>>,
}

impl KeepaliveTimer {
    pub fn new(
        scheduler: CommandScheduler,
        transport: Arc<dyn Transport>,
        events: broadcast::Sender<ControllerEvent>,
    ) -> Self {
        KeepaliveTimer {
            scheduler,
            transport,
            events,
            run: Mutex::new(None),
        }
    }

    /// Start ticking every `interval`, replacing any previous run.
    pub fn start(&self, interval: Duration) {
        let cancel = CancellationToken::new();
        let running = Arc::new(AtomicBool::new(true));

        tokio::spawn(tick_loop(
            self.scheduler.clone(),
            self.transport.clone(),
            self.events.clone(),
            running.clone(),
            cancel.clone(),
            interval,
        ));

        if let Some(previous) = self.run.lock().replace(Run { cancel, running }) {
            previous.cancel.cancel();
        }
        debug!("Keepalive started ({} ms)", interval.as_millis());
    }

    pub fn stop(&self) {
        if let Some(run) = self.run.lock().take() {
            run.cancel.cancel();
            run.running.store(false, Ordering::SeqCst);
            debug!("Keepalive stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.run
            .lock()
            .as_ref()
            .is_some_and(|run| run.running.load(Ordering::SeqCst))
    }
}

impl Drop for KeepaliveTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn tick_loop(
    scheduler: CommandScheduler,
    transport: Arc<dyn Transport>,
    events: broadcast::Sender<ControllerEvent>,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if !transport.is_connected() {
            warn!("Connection lost, stopping keepalive");
            running.store(false, Ordering::SeqCst);
            let _ = events.send(ControllerEvent::ConnectionLost { at: Utc::now() });
            break;
        }

        if !scheduler.is_idle() {
            continue;
        }

        let probe = scheduler.submit(Command::query(
            Characteristic::RemoteControl,
            encode_adc_query(&[ADC_CHANNEL_TEMPERATURE]),
            ADC_SAMPLE_LEN,
        ));
        if let Err(e) = probe.await {
            debug!("Keepalive probe failed: {}", e);
        }
    }
}
