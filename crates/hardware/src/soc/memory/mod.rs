//! Simulated memory.
//!
//! This module implements the memories the engine talks to or contains. It provides:
//! 1. **Buffer:** Lazily allocated backing storage for memory contents.
//! 2. **Memory:** A [`Device`] mapping a buffer at a physical base address.
//! 3. **Controller:** Latency modeling (simple or DRAM row-buffer) for downstream timing.
//! 4. **Timed memory:** The downstream memory behind the bus that the pass-through engine forwards to.

/// Backing storage (mmap or heap) for raw bytes.
pub mod buffer;

/// Memory controller implementations for access latency modeling.
pub mod controller;

/// Timed downstream memory.
pub mod timed;

use self::buffer::BackingStore;
use crate::common::AddrRange;
use crate::soc::traits::Device;

pub use timed::{Offer, TimedMemory};

/// A plain memory device mapped at `range`.
#[derive(Debug)]
pub struct Memory {
    name: String,
    store: BackingStore,
    range: AddrRange,
}

impl Memory {
    /// Creates a zeroed memory covering `range`.
    pub fn new(name: impl Into<String>, range: AddrRange) -> Self {
        Self {
            name: name.into(),
            store: BackingStore::new(range.size as usize),
            range,
        }
    }

    /// Loads `data` at the device-relative `offset`; returns `false` if it does not fit.
    ///
    /// Used to preload images or queue contents before simulation starts.
    pub fn load(&mut self, offset: u64, data: &[u8]) -> bool {
        self.store.write(offset, data)
    }
}

impl Device for Memory {
    fn name(&self) -> &str {
        &self.name
    }

    fn address_range(&self) -> AddrRange {
        self.range
    }

    /// Reads from the store; out-of-range bytes read as zero.
    fn read(&mut self, offset: u64, buf: &mut [u8]) {
        if !self.store.read(offset, buf) {
            buf.fill(0);
        }
    }

    /// Writes to the store; out-of-range writes are dropped.
    fn write(&mut self, offset: u64, data: &[u8]) {
        if !self.store.write(offset, data) {
            tracing::warn!(
                device = %self.name,
                offset,
                len = data.len(),
                "write past the end of memory dropped"
            );
        }
    }
}
