//! Device and memory-system components.
//!
//! This module organizes the pieces of the simulated memory system: the packet
//! and port contract, the Cohort engine itself, the bus and memories behind it,
//! and the builder that assembles them.

/// System builder for assembling the engine and its memories.
pub mod builder;

/// The Cohort memory-timing device.
pub mod engine;

/// Bus interconnect and routing.
pub mod interconnect;

/// Backing stores, memory devices and controllers.
pub mod memory;

/// Memory commands and packets.
pub mod packet;

/// Host effect interface and engine events.
pub mod port;

/// Device and port capability traits.
pub mod traits;

pub use builder::System;
