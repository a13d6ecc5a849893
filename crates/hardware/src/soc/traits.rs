//! Device and port capability traits.
//!
//! This module defines the seams every simulated component plugs into:
//! 1. **Device:** Functional byte access to an addressable region (memories on the bus).
//! 2. **RequestReceiver:** The response-port side of the timing protocol.
//! 3. **RequestIssuer:** The request-port side of the timing protocol.
//! 4. **Clocked:** Delivery of events the component scheduled on itself.
//!
//! All timing entry points receive the current tick and a [`Host`] through which
//! every side effect is issued.

use crate::common::{AddrRange, DeviceError, Tick};
use crate::soc::packet::Packet;
use crate::soc::port::{Admission, EngineEvent, Host};

/// An addressable region on the interconnect with synchronous byte access.
pub trait Device: Send {
    /// Returns a short name for this device (e.g., `"DRAM"`).
    fn name(&self) -> &str;

    /// Returns the physical range this device claims.
    fn address_range(&self) -> AddrRange;

    /// Reads `buf.len()` bytes starting at the device-relative `offset`.
    fn read(&mut self, offset: u64, buf: &mut [u8]);

    /// Writes `data` starting at the device-relative `offset`.
    fn write(&mut self, offset: u64, data: &[u8]);

    /// Reads eight bytes (little-endian) at the given offset.
    fn read_u64(&mut self, offset: u64) -> u64 {
        let mut buf = [0u8; 8];
        self.read(offset, &mut buf);
        u64::from_le_bytes(buf)
    }

    /// Writes eight bytes (little-endian) at the given offset.
    fn write_u64(&mut self, offset: u64, val: u64) {
        self.write(offset, &val.to_le_bytes());
    }
}

/// Response-port side of the timing protocol: accepts requests, returns responses.
pub trait RequestReceiver {
    /// Offers a timed request arriving at `now`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] for accesses the device can never service.
    fn recv_timing_req(
        &mut self,
        pkt: Packet,
        now: Tick,
        host: &mut dyn Host,
    ) -> Result<Admission, DeviceError>;

    /// Called by the requester when it can take a previously refused response.
    ///
    /// # Errors
    ///
    /// Propagates failures raised while resending queued responses.
    fn recv_resp_retry(&mut self, now: Tick, host: &mut dyn Host) -> Result<(), DeviceError>;

    /// Performs an untimed access immediately, completing `pkt` in place.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] if the address is neither owned nor forwardable.
    fn recv_functional(&mut self, pkt: &mut Packet, host: &mut dyn Host)
    -> Result<(), DeviceError>;

    /// Returns the ranges this receiver serves itself.
    fn addr_ranges(&self) -> Vec<AddrRange>;
}

/// Request-port side of the timing protocol: issues requests, receives responses.
pub trait RequestIssuer {
    /// Delivers a response from downstream.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] if the response matches nothing outstanding.
    fn recv_timing_resp(
        &mut self,
        pkt: Packet,
        now: Tick,
        host: &mut dyn Host,
    ) -> Result<(), DeviceError>;

    /// Called by downstream when it can take a previously refused request.
    ///
    /// # Errors
    ///
    /// Propagates failures raised while resending queued requests.
    fn recv_req_retry(&mut self, now: Tick, host: &mut dyn Host) -> Result<(), DeviceError>;
}

/// A component that receives the events it scheduled through its host.
pub trait Clocked {
    /// Handles `event` at tick `now`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] for fatal conditions discovered while handling the event.
    fn process_event(
        &mut self,
        event: EngineEvent,
        now: Tick,
        host: &mut dyn Host,
    ) -> Result<(), DeviceError>;
}
