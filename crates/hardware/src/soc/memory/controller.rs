//! Memory controller latency models for the downstream memory.
//!
//! This module provides:
//! 1. **SimpleController:** Fixed latency per access (no row-buffer modeling).
//! 2. **DramController:** Row-buffer-aware latency (CAS, RAS, precharge) for DRAM-style timing.
//!
//! Controllers report latency in memory-side clock cycles; the timed memory
//! converts cycles to ticks with the configured clock period.

use crate::config::{MemoryConfig, MemoryController as ControllerKind};

/// Trait for memory controller implementations that report access latency in cycles.
pub trait MemoryController: Send {
    /// Returns the number of cycles required for an access to the given address.
    ///
    /// # Arguments
    ///
    /// * `addr` - Physical address being accessed (may be used for row-buffer modeling).
    fn access_latency(&mut self, addr: u64) -> u64;
}

/// Builds the controller selected by `config`.
pub fn from_config(config: &MemoryConfig) -> Box<dyn MemoryController> {
    match config.controller {
        ControllerKind::Simple => Box::new(SimpleController::new(config.fixed_latency)),
        ControllerKind::Dram => Box::new(DramController::new(
            config.t_cas,
            config.t_ras,
            config.t_pre,
        )),
    }
}

/// Fixed-latency memory controller; every access takes the same number of cycles.
#[derive(Debug, Clone)]
pub struct SimpleController {
    latency: u64,
}

impl SimpleController {
    /// Creates a simple controller with the given fixed latency in cycles.
    pub const fn new(latency: u64) -> Self {
        Self { latency }
    }
}

impl MemoryController for SimpleController {
    fn access_latency(&mut self, _addr: u64) -> u64 {
        self.latency
    }
}

/// Bytes per DRAM row; accesses within the same row hit the open row buffer.
const ROW_BYTES: u64 = 2048;

/// DRAM-style controller with a single open row.
#[derive(Debug, Clone)]
pub struct DramController {
    open_row: Option<u64>,
    t_cas: u64,
    t_ras: u64,
    t_pre: u64,
}

impl DramController {
    /// Creates a DRAM controller with no row open.
    ///
    /// # Arguments
    ///
    /// * `t_cas` - Column access strobe latency.
    /// * `t_ras` - Row access strobe latency.
    /// * `t_pre` - Precharge latency.
    pub const fn new(t_cas: u64, t_ras: u64, t_pre: u64) -> Self {
        Self {
            open_row: None,
            t_cas,
            t_ras,
            t_pre,
        }
    }
}

impl MemoryController for DramController {
    fn access_latency(&mut self, addr: u64) -> u64 {
        let row = addr / ROW_BYTES;
        match self.open_row.replace(row) {
            Some(open) if open == row => self.t_cas,
            Some(_) => self.t_pre + self.t_ras + self.t_cas,
            None => self.t_ras + self.t_cas,
        }
    }
}
