//! System construction and top-level `System` type.
//!
//! This module builds the device and its surroundings from configuration. It performs:
//! 1. **Validation:** Runs [`Config::validate`] once before anything is built.
//! 2. **Engine:** Instantiates the [`CohortEngine`] with its queue region.
//! 3. **Memory map:** Registers DRAM ranges on the bus and rejects overlaps with the queue region.
//! 4. **Downstream:** Wires a timed memory to the request port of the pass-through variant.

use crate::common::ConfigError;
use crate::config::{Config, EngineMode};
use crate::soc::engine::CohortEngine;
use crate::soc::interconnect::Bus;
use crate::soc::memory::{Memory, TimedMemory};

/// Name the engine reports in diagnostics and address-map conflicts.
pub const ENGINE_NAME: &str = "cohort_engine";

/// The engine plus the memory behind its request port.
#[derive(Debug)]
pub struct System {
    /// The memory-timing device.
    pub engine: CohortEngine,
    /// Downstream memory; present only for the pass-through variant.
    pub downstream: Option<TimedMemory>,
}

impl System {
    /// Builds a new system from configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid, if a DRAM
    /// range overlaps the queue region or another DRAM range, or if the
    /// pass-through variant has no memory to forward to.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let engine = CohortEngine::new(ENGINE_NAME, &config.engine)?;

        let mut bus = Bus::new(config.system.bus_width, config.system.bus_latency);
        if config.engine.owns_queue_region() {
            bus.claim(ENGINE_NAME, engine.queue_region())?;
        }
        for (i, range) in config.system.mem_ranges.iter().enumerate() {
            bus.add_device(Box::new(Memory::new(format!("dram{i}"), *range)))?;
        }

        let downstream = match config.engine.mode {
            EngineMode::Terminal => None,
            EngineMode::PassThrough => {
                if bus.device_count() == 0 {
                    return Err(ConfigError::UnconnectedPort {
                        device: ENGINE_NAME,
                        port: "mem_side",
                    });
                }
                Some(TimedMemory::new(bus, &config.system, &config.memory))
            }
        };

        tracing::info!(
            mode = ?config.engine.mode,
            region = %engine.queue_region(),
            dram_ranges = config.system.mem_ranges.len(),
            "system built"
        );
        Ok(Self { engine, downstream })
    }

    /// Loads `data` at `addr` into the queue region or downstream memory.
    ///
    /// Returns `false` if nothing covers the whole blob.
    pub fn load(&mut self, addr: u64, data: &[u8]) -> bool {
        if self.engine.load(addr, data) {
            return true;
        }
        self.downstream
            .as_mut()
            .is_some_and(|mem| mem.bus.load(addr, data))
    }

    /// Reads a little-endian word from the queue region or downstream memory.
    pub fn read_u64(&mut self, addr: u64) -> Option<u64> {
        if let Some(v) = self.engine.peek_u64(addr) {
            return Some(v);
        }
        let mem = self.downstream.as_mut()?;
        mem.bus.is_routable(addr, 8).then(|| mem.bus.read_u64(addr))
    }
}
