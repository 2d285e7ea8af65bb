//! Per-port configuration and in-flight flags.
//!
//! [`PortTable`] is the single source of truth for mode, power, direction,
//! busy and measurement state of the four ports. Only the controller mutates
//! it; every setter reports whether anything actually changed so callers can
//! skip redundant wire traffic.

use crate::constants::PORT_COUNT;
use crate::types::*;
use parking_lot::Mutex;

pub struct PortTable {
    ports: Mutex<[Port; PORT_COUNT]>,
}

impl Default for PortTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PortTable {
    /// All ports start as idle outputs at zero power.
    pub fn new() -> Self {
        PortTable {
            ports: Mutex::new(PortId::ALL.map(Port::new)),
        }
    }

    pub fn get(&self, id: PortId) -> Port {
        self.ports.lock()[id.index()]
    }

    /// Copy of every port record, in index order
    pub fn all(&self) -> [Port; PORT_COUNT] {
        *self.ports.lock()
    }

    pub fn snapshot(&self, id: PortId) -> PortSnapshot {
        self.get(id).snapshot()
    }

    /// Set the port mode; returns `true` if it differed.
    pub fn set_mode(&self, id: PortId, mode: PortMode) -> bool {
        let mut ports = self.ports.lock();
        let port = &mut ports[id.index()];
        let changed = port.mode != mode;
        port.mode = mode;
        changed
    }

    /// Set the measurement-enable flag; returns `true` if it differed.
    pub fn set_pvm_active(&self, id: PortId, active: bool) -> bool {
        let mut ports = self.ports.lock();
        let port = &mut ports[id.index()];
        let changed = port.pvm_active != active;
        port.pvm_active = active;
        changed
    }

    pub fn set_drive(&self, id: PortId, direction: Direction, power: u8) {
        let mut ports = self.ports.lock();
        let port = &mut ports[id.index()];
        port.direction = direction;
        port.power = power;
    }

    pub fn set_power(&self, id: PortId, power: u8) {
        self.ports.lock()[id.index()].power = power;
    }

    /// Mark a port busy unless it already is; returns `false` when it was busy.
    pub fn try_mark_busy(&self, id: PortId) -> bool {
        let mut ports = self.ports.lock();
        let port = &mut ports[id.index()];
        if port.busy {
            return false;
        }
        port.busy = true;
        true
    }

    /// Mark a port busy regardless of its current flag.
    pub fn mark_busy(&self, id: PortId) {
        self.ports.lock()[id.index()].busy = true;
    }

    pub fn clear_busy(&self, id: PortId) {
        self.ports.lock()[id.index()].busy = false;
    }

    /// Mark all four ports busy, but only if none of them is; all-or-nothing.
    pub fn try_mark_all_busy(&self) -> bool {
        let mut ports = self.ports.lock();
        if ports.iter().any(|p| p.busy) {
            return false;
        }
        for port in ports.iter_mut() {
            port.busy = true;
        }
        true
    }

    pub fn clear_all_busy(&self) {
        for port in self.ports.lock().iter_mut() {
            port.busy = false;
        }
    }
}
