//! Port-side contract between a device and the simulation kernel that hosts it.
//!
//! The device owns no scheduler. Everything it needs from the outside world goes
//! through [`Host`]: scheduling a future event on itself, handing a response to
//! the requester, issuing a request toward memory, signalling a retry, and
//! forwarding a functional (untimed) access downstream.

use crate::common::{DeviceError, Tick};
use crate::soc::packet::Packet;

/// Events a device asks its host to deliver back at a future tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// The timed access admitted into `slot` has reached its completion tick.
    Respond {
        /// In-flight slot assigned at admission.
        slot: u64,
    },
    /// The bandwidth regulator has caught up and can admit again.
    Release,
    /// Time to poll the cohort queues.
    Poll,
}

/// Outcome of offering a request to a device's response port.
#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    /// The device took ownership of the packet and will respond later.
    Accepted,
    /// The device is out of resources. The packet is handed back and the
    /// requester must wait for a retry signal before offering it again.
    Retry(Packet),
}

impl Admission {
    /// Returns `true` if the request was accepted.
    #[inline]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Effects a device can issue toward the simulation kernel and its port peers.
pub trait Host {
    /// Schedules `event` for delivery to the device at tick `when`.
    ///
    /// Events at the same tick are delivered in the order they were scheduled.
    fn schedule(&mut self, when: Tick, event: EngineEvent);

    /// Sends a response out of the response port.
    ///
    /// Returns the packet back if the requester cannot take it right now; the
    /// requester will call `recv_resp_retry` once it can.
    fn send_timing_resp(&mut self, pkt: Packet) -> Result<(), Packet>;

    /// Sends a request out of the request port toward downstream memory.
    ///
    /// Returns the packet back if downstream is busy; downstream will call
    /// `recv_req_retry` once it can take more.
    fn send_timing_req(&mut self, pkt: Packet) -> Result<(), Packet>;

    /// Tells the requester that a previously refused request may be resent.
    fn send_retry_req(&mut self);

    /// Performs a functional access downstream, completing it in place.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] if nothing downstream claims the address.
    fn send_functional(&mut self, pkt: &mut Packet) -> Result<(), DeviceError>;
}
