//! Timed downstream memory.
//!
//! Wraps the [`Bus`] with a controller latency model and a bounded number of
//! pending accesses. The data access is performed when a request is accepted;
//! the response is released after `controller cycles × clock period` plus the
//! bus transit time.

use super::controller::{self, MemoryController};
use crate::common::{DeviceError, Tick};
use crate::config::{MemoryConfig, SystemConfig};
use crate::soc::interconnect::Bus;
use crate::soc::packet::Packet;

/// Outcome of offering a request to the timed memory.
#[derive(Debug, PartialEq, Eq)]
pub enum Offer {
    /// The access was performed; `response` must be delivered at its `ready_at`.
    Accepted {
        /// The completed response packet.
        response: Packet,
    },
    /// All pending slots are taken; the packet is handed back.
    Busy(Packet),
}

/// Memory behind the bus with a bounded request queue.
pub struct TimedMemory {
    /// Bus the memory devices hang off.
    pub bus: Bus,
    controller: Box<dyn MemoryController>,
    clock_period: Tick,
    max_pending: usize,
    pending: usize,
    retry_needed: bool,
}

impl std::fmt::Debug for TimedMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedMemory")
            .field("bus", &self.bus)
            .field("clock_period", &self.clock_period)
            .field("max_pending", &self.max_pending)
            .field("pending", &self.pending)
            .field("retry_needed", &self.retry_needed)
            .finish_non_exhaustive()
    }
}

impl TimedMemory {
    /// Creates a timed memory over `bus` using the configured controller.
    pub fn new(bus: Bus, system: &SystemConfig, memory: &MemoryConfig) -> Self {
        Self {
            bus,
            controller: controller::from_config(memory),
            clock_period: system.clock_period,
            max_pending: memory.max_pending,
            pending: 0,
            retry_needed: false,
        }
    }

    /// Returns the number of accepted accesses whose response is still due.
    pub const fn pending(&self) -> usize {
        self.pending
    }

    /// Returns `true` if a memory device covers every byte of the access.
    pub fn is_routable(&self, addr: u64, size: u64) -> bool {
        self.bus.is_routable(addr, size)
    }

    /// Returns the ticks an access of `size` bytes at `addr` takes.
    fn access_time(&mut self, addr: u64, size: u64) -> Tick {
        let cycles = self.controller.access_latency(addr) + self.bus.calculate_transit_time(size);
        cycles.saturating_mul(self.clock_period)
    }

    /// Offers a timed request at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Misrouted`] if no memory device covers the access.
    pub fn offer(&mut self, mut pkt: Packet, now: Tick) -> Result<Offer, DeviceError> {
        if self.pending >= self.max_pending {
            self.retry_needed = true;
            tracing::debug!(id = pkt.id, addr = pkt.addr, "downstream memory busy");
            return Ok(Offer::Busy(pkt));
        }
        self.bus.access(&mut pkt)?;
        let done = now.saturating_add(self.access_time(pkt.addr, pkt.size));
        pkt.make_response(done);
        self.pending += 1;
        Ok(Offer::Accepted { response: pkt })
    }

    /// Frees one pending slot once its response has been delivered.
    ///
    /// Returns `true` if a request was refused since the last retry, in which
    /// case the caller must signal a retry to the requester.
    pub fn complete(&mut self) -> bool {
        self.pending = self.pending.saturating_sub(1);
        std::mem::take(&mut self.retry_needed)
    }

    /// Performs `pkt` immediately against the backing devices.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Misrouted`] if no memory device covers the access.
    pub fn functional(&mut self, pkt: &mut Packet) -> Result<(), DeviceError> {
        self.bus.access(pkt)
    }
}
