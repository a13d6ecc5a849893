//! System interconnect (bus) for downstream memory access.
//!
//! This module implements the bus that routes physical address accesses to devices. It provides:
//! 1. **Device registration:** Devices are added by address range, rejected if they overlap, and kept sorted.
//! 2. **Access routing:** Functional packet access by address with a last-device hint.
//! 3. **Claims:** Ranges served elsewhere (the engine's queue region) are reserved so DRAM cannot overlap them.
//! 4. **Transit time:** Bus transfer cycles from width and base latency.

use crate::common::{AddrRange, ConfigError, DeviceError};
use crate::soc::packet::Packet;
use crate::soc::traits::Device;

/// Bus connecting the engine's request port to downstream devices.
pub struct Bus {
    /// Registered devices, sorted by base address.
    devices: Vec<Box<dyn Device>>,
    /// Ranges owned by components not on this bus, with their owner's name.
    claims: Vec<(String, AddrRange)>,
    /// Bus width in bytes (e.g., 8 for 64-bit); used to compute transfer cycles.
    pub width_bytes: u64,
    /// Base latency in cycles per transaction.
    pub latency_cycles: u64,
    last_device_idx: usize,
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field(
                "devices",
                &self
                    .devices
                    .iter()
                    .map(|d| (d.name().to_string(), d.address_range()))
                    .collect::<Vec<_>>(),
            )
            .field("claims", &self.claims)
            .field("width_bytes", &self.width_bytes)
            .field("latency_cycles", &self.latency_cycles)
            .finish()
    }
}

impl Bus {
    /// Creates an empty bus with the given width and latency.
    ///
    /// # Arguments
    ///
    /// * `width_bytes` - Transfer width in bytes (e.g., 8).
    /// * `latency_cycles` - Base cycles per transaction.
    pub fn new(width_bytes: u64, latency_cycles: u64) -> Self {
        Self {
            devices: Vec::new(),
            claims: Vec::new(),
            width_bytes: width_bytes.max(1),
            latency_cycles,
            last_device_idx: 0,
        }
    }

    fn check_free(&self, owner: &str, range: AddrRange) -> Result<(), ConfigError> {
        if range.end().is_none() {
            return Err(ConfigError::RangeOverflow(range));
        }
        let registered = self
            .devices
            .iter()
            .map(|d| (d.name(), d.address_range()))
            .chain(self.claims.iter().map(|(n, r)| (n.as_str(), *r)));
        for (name, existing) in registered {
            if existing.overlaps(&range) {
                return Err(ConfigError::Overlap {
                    first_owner: name.to_string(),
                    first: existing,
                    second_owner: owner.to_string(),
                    second: range,
                });
            }
        }
        Ok(())
    }

    /// Registers a device; devices are sorted by base address for lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Overlap`] if the device's range overlaps a
    /// registered device or claim.
    pub fn add_device(&mut self, dev: Box<dyn Device>) -> Result<(), ConfigError> {
        self.check_free(dev.name(), dev.address_range())?;
        self.devices.push(dev);
        self.devices.sort_by_key(|d| d.address_range().base);
        self.last_device_idx = 0;
        Ok(())
    }

    /// Reserves `range` for a component that is not on this bus.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Overlap`] if the range is already taken.
    pub fn claim(&mut self, owner: &str, range: AddrRange) -> Result<(), ConfigError> {
        self.check_free(owner, range)?;
        self.claims.push((owner.to_string(), range));
        Ok(())
    }

    /// Returns the number of registered devices.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Returns the cycles to transfer `bytes` on this bus.
    ///
    /// Cycles = base latency plus ceiling(bytes / width_bytes) transfers.
    pub const fn calculate_transit_time(&self, bytes: u64) -> u64 {
        self.latency_cycles + bytes.div_ceil(self.width_bytes)
    }

    /// Returns `true` if a registered device covers every byte of the access.
    pub fn is_routable(&self, addr: u64, len: u64) -> bool {
        self.devices
            .iter()
            .any(|d| d.address_range().contains_access(addr, len))
    }

    fn find_device(&mut self, addr: u64, len: u64) -> Option<(&mut Box<dyn Device>, u64)> {
        let hint = self.last_device_idx;
        let idx = if self
            .devices
            .get(hint)
            .is_some_and(|d| d.address_range().contains_access(addr, len))
        {
            hint
        } else {
            self.devices
                .iter()
                .position(|d| d.address_range().contains_access(addr, len))?
        };
        self.last_device_idx = idx;
        let dev = &mut self.devices[idx];
        let offset = addr - dev.address_range().base;
        Some((dev, offset))
    }

    /// Performs `pkt` functionally against the device that claims it.
    ///
    /// Reads fill the packet payload; writes update the device.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Misrouted`] if no single device covers the access.
    pub fn access(&mut self, pkt: &mut Packet) -> Result<(), DeviceError> {
        let Some((dev, offset)) = self.find_device(pkt.addr, pkt.size) else {
            return Err(DeviceError::Misrouted {
                device: "bus".to_string(),
                addr: pkt.addr,
                size: pkt.size,
                cmd: pkt.cmd,
            });
        };
        if pkt.is_write() {
            dev.write(offset, &pkt.data);
        } else {
            pkt.data.resize(pkt.size as usize, 0);
            dev.read(offset, &mut pkt.data);
        }
        Ok(())
    }

    /// Writes a blob at `addr`; returns `false` if no single device covers it.
    pub fn load(&mut self, addr: u64, data: &[u8]) -> bool {
        match self.find_device(addr, data.len() as u64) {
            Some((dev, offset)) => {
                dev.write(offset, data);
                true
            }
            None => false,
        }
    }

    /// Reads eight bytes (little-endian) at `addr`; returns 0 if unclaimed.
    pub fn read_u64(&mut self, addr: u64) -> u64 {
        self.find_device(addr, 8)
            .map_or(0, |(dev, offset)| dev.read_u64(offset))
    }

    /// Writes eight bytes (little-endian) at `addr`; no-op if unclaimed.
    pub fn write_u64(&mut self, addr: u64, val: u64) {
        if let Some((dev, offset)) = self.find_device(addr, 8) {
            dev.write_u64(offset, val);
        }
    }
}
