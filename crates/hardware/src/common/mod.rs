//! Common utilities and types used throughout the Cohort engine model.
//!
//! This module provides the building blocks shared by the device, the reference
//! host, and the configuration layer. It includes:
//! 1. **Address Types:** Half-open address ranges with overlap and containment checks.
//! 2. **Time and Units:** The picosecond `Tick` plus parsers for `"30ns"` and `"12.8GiB/s"`.
//! 3. **Error Handling:** Configuration, device, and simulation error enums.

/// Address range definitions.
pub mod addr;

/// Error types for configuration, device protocol, and simulation failures.
pub mod error;

/// Simulated time and unit parsing.
pub mod time;

pub use addr::AddrRange;
pub use error::{ConfigError, DeviceError, SimError};
pub use time::{TICKS_PER_NS, TICKS_PER_SEC, Tick};
