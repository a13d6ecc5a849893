//! Cohort memory-timing device model.
//!
//! This crate models the CohortEngine, a device on a split request/response
//! memory protocol, with the following:
//! 1. **Engine:** Latency and bandwidth shaping, retry flow control, ordered responses.
//! 2. **Pass-through:** Forwarding of shaped requests to downstream memory.
//! 3. **Cohort queues:** An in-memory producer/consumer queue pair polled by the engine.
//! 4. **SoC:** Bus, memory devices and controllers behind the engine.
//! 5. **Simulation:** A deterministic reference host, configuration, and statistics.

/// Common types (addresses, time units, errors).
pub mod common;
/// Configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// Reference host: event queue, requester, simulator, loader.
pub mod sim;
/// Engine, packets, ports, bus and memories.
pub mod soc;
/// Engine statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// The memory-timing device.
pub use crate::soc::engine::CohortEngine;
/// Top-level system (engine plus downstream memory); construct with `System::new`.
pub use crate::soc::System;
