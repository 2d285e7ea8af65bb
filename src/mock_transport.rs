//! In-memory transport for unit tests.
//!
//! Reads answer the last payload written to the same characteristic, the way
//! the device replies to a query, falling back to a fixed value per
//! characteristic (device information strings).

use crate::error::{Result, SBrickError};
use crate::transport::{Characteristic, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct MockTransport {
    connected: AtomicBool,
    disconnect_calls: AtomicUsize,
    writes: Mutex<Vec<(Characteristic, Vec<u8>)>>,
    last_write: Mutex<HashMap<Characteristic, Vec<u8>>>,
    replies: Mutex<HashMap<(Characteristic, Vec<u8>), Vec<u8>>>,
    fixed_reads: Mutex<HashMap<Characteristic, Vec<u8>>>,
    failing_reads: Mutex<HashSet<Characteristic>>,
    failing_writes: AtomicUsize,
    write_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    /// Connected device reporting firmware 4.17
    pub fn new() -> Self {
        let mock = MockTransport::default();
        mock.connected.store(true, Ordering::SeqCst);
        mock.set_read(Characteristic::FirmwareRevision, b"4.17");
        mock
    }

    pub fn with_firmware(version: &str) -> Self {
        let mock = MockTransport::new();
        mock.set_read(Characteristic::FirmwareRevision, version.as_bytes());
        mock
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Reply returned by a remote-control read following a write of `request`.
    pub fn set_reply(&self, request: &[u8], reply: Vec<u8>) {
        self.replies
            .lock()
            .insert((Characteristic::RemoteControl, request.to_vec()), reply);
    }

    /// Value returned when no reply matches the last write.
    pub fn set_read(&self, characteristic: Characteristic, bytes: &[u8]) {
        self.fixed_reads.lock().insert(characteristic, bytes.to_vec());
    }

    /// Every read of `characteristic` fails from now on.
    pub fn fail_reads(&self, characteristic: Characteristic) {
        self.failing_reads.lock().insert(characteristic);
    }

    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock() = Some(delay);
    }

    pub fn writes(&self) -> Vec<(Characteristic, Vec<u8>)> {
        self.writes.lock().clone()
    }

    /// Payloads written to `characteristic`, in order
    pub fn writes_to(&self, characteristic: Characteristic) -> Vec<Vec<u8>> {
        self.writes
            .lock()
            .iter()
            .filter(|(c, _)| *c == characteristic)
            .map(|(_, bytes)| bytes.clone())
            .collect()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().clear();
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_writes(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&self, characteristic: Characteristic, bytes: &[u8]) -> Result<()> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let delay = *self.write_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failing = self.failing_writes.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_writes.store(failing - 1, Ordering::SeqCst);
            return Err(SBrickError::TransportFailure("mock write failure".to_string()));
        }

        self.writes.lock().push((characteristic, bytes.to_vec()));
        self.last_write.lock().insert(characteristic, bytes.to_vec());
        Ok(())
    }

    async fn read(&self, characteristic: Characteristic) -> Result<Vec<u8>> {
        if self.failing_reads.lock().contains(&characteristic) {
            return Err(SBrickError::TransportFailure("mock read failure".to_string()));
        }
        let last = self.last_write.lock().get(&characteristic).cloned();
        if let Some(request) = last {
            if let Some(reply) = self.replies.lock().get(&(characteristic, request)) {
                return Ok(reply.clone());
            }
        }
        Ok(self
            .fixed_reads
            .lock()
            .get(&characteristic)
            .cloned()
            .unwrap_or_default())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}
