//! Reference host for the engine.
//!
//! This module drives the device end to end without an external simulator. It provides:
//! 1. **Event queue:** Deterministic `(tick, sequence)` ordering.
//! 2. **Traffic:** A trace-replaying requester with retry and response-slot handling.
//! 3. **Simulator:** The event loop and the [`Host`](crate::soc::port::Host) implementation.
//! 4. **Loader:** JSON configuration and trace input.
//! 5. **Scenarios:** Built-in demonstration setups.

/// Deterministic discrete-event queue.
pub mod event_queue;

/// Configuration and trace loading.
pub mod loader;

/// Built-in scenarios.
pub mod scenario;

/// Event loop and host implementation.
pub mod simulator;

/// Trace-driven traffic source.
pub mod traffic;

pub use event_queue::EventQueue;
pub use simulator::{Kernel, SimEvent, Simulator};
pub use traffic::{Completion, Requester, TraceCmd, TraceEntry};
