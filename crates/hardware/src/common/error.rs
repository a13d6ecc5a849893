//! Error definitions.
//!
//! This module defines the three error families of the model:
//! 1. **Configuration errors:** Invalid parameters or topology, detected before simulation starts.
//! 2. **Device errors:** Fatal runtime conditions such as a misrouted access.
//! 3. **Simulation errors:** The union of the above plus I/O and JSON failures for the loader and CLI.
//!
//! Protocol backpressure is deliberately absent: a device that cannot accept a
//! request hands the packet back through [`Admission::Retry`](crate::soc::port::Admission).

use std::path::PathBuf;

use thiserror::Error;

use super::addr::AddrRange;
use crate::soc::packet::MemCmd;

/// Invalid configuration or system topology.
///
/// Raised by [`Config::validate`](crate::config::Config::validate) and
/// [`System::new`](crate::soc::System::new); always fatal.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A parameter that must be strictly positive was zero.
    #[error("{param} must be greater than zero")]
    Zero {
        /// Name of the offending parameter.
        param: &'static str,
    },

    /// The queue region base address was left unset.
    #[error("queue_base_addr must be set explicitly")]
    MissingQueueBase,

    /// A value could not be parsed or is out of its legal domain.
    #[error("invalid {kind} `{value}`: {reason}")]
    InvalidValue {
        /// What kind of value was being parsed (e.g. `"latency"`).
        kind: &'static str,
        /// The offending text.
        value: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// Two devices claim overlapping address ranges.
    #[error("address range {first} of {first_owner} overlaps {second} of {second_owner}")]
    Overlap {
        /// Owner of the range already registered.
        first_owner: String,
        /// Range already registered.
        first: AddrRange,
        /// Owner of the range being registered.
        second_owner: String,
        /// Range being registered.
        second: AddrRange,
    },

    /// A range extends past the top of the 64-bit address space.
    #[error("address range {0} wraps past the end of the address space")]
    RangeOverflow(AddrRange),

    /// A port required by the selected variant has nothing connected to it.
    #[error("port `{port}` of {device} is not connected")]
    UnconnectedPort {
        /// Device owning the port.
        device: &'static str,
        /// Port name.
        port: &'static str,
    },

    /// A cohort queue does not fit inside the memory it is placed in.
    #[error("{queue} queue layout is invalid: {reason}")]
    QueueLayout {
        /// Which queue (`"in"`, `"out"`, `"accelerator"`).
        queue: &'static str,
        /// Human-readable explanation.
        reason: String,
    },
}

/// Fatal device-level failure during simulation.
///
/// These indicate a misconfigured topology or a protocol violation by a peer,
/// and terminate the run with the diagnostic context they carry.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// An access arrived for an address the device neither owns nor forwards.
    #[error("{device}: misrouted {cmd} of {size} bytes at {addr:#x}")]
    Misrouted {
        /// Device that received the access.
        device: String,
        /// Start address of the access.
        addr: u64,
        /// Size of the access in bytes.
        size: u64,
        /// Memory command of the access.
        cmd: MemCmd,
    },

    /// A command the device does not implement reached it.
    #[error("{device}: unsupported command {cmd} at {addr:#x}")]
    UnsupportedCommand {
        /// Device that received the access.
        device: String,
        /// Start address of the access.
        addr: u64,
        /// Offending command.
        cmd: MemCmd,
    },

    /// A cohort queue pointer lies below its virtual base.
    #[error("{queue} queue pointer {ptr:#x} lies below its base {virt_base:#x}")]
    QueuePointer {
        /// Which queue (`"in"` or `"out"`).
        queue: &'static str,
        /// Pointer value read from memory.
        ptr: u64,
        /// Virtual base address of the queue.
        virt_base: u64,
    },

    /// A downstream response matched no request forwarded by this device.
    #[error("{device}: response {id} does not match any forwarded request")]
    UnknownResponse {
        /// Device that received the response.
        device: String,
        /// Packet id carried by the response.
        id: u64,
    },
}

/// Top-level error for loading inputs and running a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid configuration or topology.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fatal device failure while simulating.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// A file could not be read.
    #[error("could not read `{path}`: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A file did not contain the expected JSON.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}
