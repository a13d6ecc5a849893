//! Configuration system for the Cohort engine model.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the model. It provides:
//! 1. **Defaults:** Baseline device parameters (latency, bandwidth, queue geometry) and host parameters.
//! 2. **Structures:** Hierarchical config for the engine, the system memory map, downstream memory, and the requester.
//! 3. **Enums:** Engine variant and memory controller types.
//! 4. **Validation:** A single `validate` pass that rejects unusable parameters before simulation starts.
//!
//! Configuration is supplied as JSON (see [`crate::sim::loader`]) or built from `Config::default()`.
//! Durations accept ticks or unit strings (`"30ns"`); bandwidth accepts bytes per second or
//! unit strings (`"12.8GiB/s"`).

use serde::Deserialize;

use crate::common::time::serde_units;
use crate::common::{AddrRange, ConfigError, Tick};

/// Default configuration constants for the model.
///
/// These values define the baseline configuration when not explicitly
/// overridden in JSON configuration files.
pub mod defaults {
    use crate::common::{AddrRange, Tick};

    /// Request to response latency (30 ns).
    pub const LATENCY: Tick = 30_000;

    /// Request to response latency variance (none).
    pub const LATENCY_VAR: Tick = 0;

    /// Combined read and write bandwidth limit (12.8 GiB/s).
    ///
    /// Representative of a x64 DDR3-1600 channel.
    pub const BANDWIDTH: u64 = 13_743_895_347;

    /// Size of the device-owned queue region (256 MiB).
    pub const QUEUE_SIZE: u64 = 0x1000_0000;

    /// Maximum number of admitted requests awaiting a response.
    pub const MAX_OUTSTANDING: usize = 64;

    /// Seed for the latency variance generator.
    pub const SEED: u64 = 0x00C0_4057_5EED;

    /// Ticks between two polls of the cohort queues (10 ns).
    pub const POLL_INTERVAL: Tick = 10_000;

    /// Ticks from startup to the first cohort poll (1 ns).
    pub const STARTUP_DELAY: Tick = 1_000;

    /// Entries in each cohort queue.
    pub const QUEUE_ENTRIES: u64 = 64;

    /// Offset of the out queue from the queue base.
    pub const OUT_QUEUE_OFFSET: u64 = 0x1000;

    /// Offset of the accelerator operand from the queue base.
    pub const ACCEL_OFFSET: u64 = 0x2000;

    /// System DRAM range (512 MiB at address zero).
    pub const MEM_RANGE: AddrRange = AddrRange::new(0, 512 * 1024 * 1024);

    /// Clock period of the memory side (1 GHz).
    pub const CLOCK_PERIOD: Tick = 1_000;

    /// System bus width in bytes (8 bytes = 64-bit bus).
    pub const BUS_WIDTH: u64 = 8;

    /// System bus latency in cycles.
    pub const BUS_LATENCY: u64 = 4;

    /// Fixed latency of the simple controller in cycles.
    pub const FIXED_LATENCY: u64 = 30;

    /// CAS (Column Access Strobe) latency in DRAM cycles.
    pub const T_CAS: u64 = 14;

    /// RAS (Row Access Strobe) latency in DRAM cycles.
    pub const T_RAS: u64 = 14;

    /// Precharge latency in DRAM cycles.
    pub const T_PRE: u64 = 14;

    /// Requests the downstream memory accepts before refusing.
    pub const MAX_PENDING: usize = 32;
}

/// Which variant of the engine to build.
///
/// Both variants share one implementation; the flag decides who services
/// addresses outside the queue region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum EngineMode {
    /// The engine is the backing store for its queue region and never issues
    /// downstream requests. Accesses outside the region are fatal.
    #[default]
    Terminal,
    /// The engine shapes every request and re-issues it toward downstream
    /// memory on its request port.
    #[serde(alias = "Passthrough", alias = "pass_through")]
    PassThrough,
}

/// Memory controller implementation types for the downstream memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum MemoryController {
    /// Simple fixed-latency memory controller.
    #[default]
    Simple,
    /// DRAM controller with row buffer modeling.
    #[serde(alias = "DRAM")]
    Dram,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use cohort_core::config::{Config, EngineMode};
///
/// let json = r#"{
///     "engine": {
///         "latency": "30ns",
///         "latency_var": "5ns",
///         "bandwidth": "12.8GiB/s",
///         "queue_base_addr": 2415919104,
///         "mode": "PassThrough"
///     },
///     "system": {
///         "mem_ranges": [{ "base": 0, "size": 536870912 }]
///     }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.engine.latency, 30_000);
/// assert_eq!(config.engine.latency_var, 5_000);
/// assert_eq!(config.engine.mode, EngineMode::PassThrough);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Engine (device under test) parameters
    #[serde(default)]
    pub engine: EngineConfig,
    /// System memory map and bus parameters
    #[serde(default)]
    pub system: SystemConfig,
    /// Downstream memory timing
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Reference requester behavior
    #[serde(default)]
    pub requester: RequesterConfig,
}

impl Config {
    /// Checks every section once, before anything is built.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.system.validate()?;
        if self.memory.max_pending == 0 {
            return Err(ConfigError::Zero {
                param: "memory.max_pending",
            });
        }
        if self.requester.response_slots == Some(0) {
            return Err(ConfigError::Zero {
                param: "requester.response_slots",
            });
        }
        Ok(())
    }
}

/// Engine parameters, the Rust counterpart of the device's parameter declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Request to response latency
    #[serde(
        default = "EngineConfig::default_latency",
        deserialize_with = "serde_units::latency"
    )]
    pub latency: Tick,

    /// Request to response latency variance
    #[serde(
        default = "EngineConfig::default_latency_var",
        deserialize_with = "serde_units::latency"
    )]
    pub latency_var: Tick,

    /// Combined read and write bandwidth in bytes per second
    #[serde(
        default = "EngineConfig::default_bandwidth",
        deserialize_with = "serde_units::bandwidth"
    )]
    pub bandwidth: u64,

    /// Base of the queue region. Has no default: revisions of the device
    /// disagreed on it, so callers must choose.
    #[serde(default)]
    pub queue_base_addr: Option<u64>,

    /// Size of the queue region in bytes
    #[serde(default = "EngineConfig::default_queue_size")]
    pub queue_size: u64,

    /// Terminal memory or pass-through
    #[serde(default)]
    pub mode: EngineMode,

    /// In pass-through mode, whether the queue region is still served locally
    #[serde(default = "EngineConfig::default_own_queue_region")]
    pub own_queue_region: bool,

    /// In pass-through mode, the only range that may be forwarded (`None` forwards anything)
    #[serde(default)]
    pub forward_range: Option<AddrRange>,

    /// Admitted requests that may await a response at once
    #[serde(default = "EngineConfig::default_max_outstanding")]
    pub max_outstanding: usize,

    /// Refuse new requests while the bandwidth backlog exceeds this many ticks
    /// (`None` never refuses and delays completions instead)
    #[serde(default, deserialize_with = "serde_units::opt_latency")]
    pub max_bandwidth_delay: Option<Tick>,

    /// Seed for latency variance sampling
    #[serde(default = "EngineConfig::default_seed")]
    pub seed: u64,

    /// Cohort queue poller
    #[serde(default)]
    pub cohort: CohortConfig,
}

impl EngineConfig {
    /// Returns the default request to response latency.
    fn default_latency() -> Tick {
        defaults::LATENCY
    }

    /// Returns the default latency variance.
    fn default_latency_var() -> Tick {
        defaults::LATENCY_VAR
    }

    /// Returns the default bandwidth in bytes per second.
    fn default_bandwidth() -> u64 {
        defaults::BANDWIDTH
    }

    /// Returns the default queue region size.
    fn default_queue_size() -> u64 {
        defaults::QUEUE_SIZE
    }

    /// Queue region is served locally unless told otherwise.
    fn default_own_queue_region() -> bool {
        true
    }

    /// Returns the default in-flight limit.
    fn default_max_outstanding() -> usize {
        defaults::MAX_OUTSTANDING
    }

    /// Returns the default variance seed.
    fn default_seed() -> u64 {
        defaults::SEED
    }

    /// Returns the queue region, or `None` if the base is unset.
    pub fn queue_range(&self) -> Option<AddrRange> {
        self.queue_base_addr
            .map(|base| AddrRange::new(base, self.queue_size))
    }

    /// Returns `true` if the engine serves the queue region itself.
    pub fn owns_queue_region(&self) -> bool {
        match self.mode {
            EngineMode::Terminal => true,
            EngineMode::PassThrough => self.own_queue_region,
        }
    }

    /// Validates the engine parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for zero latency, bandwidth, queue size or
    /// in-flight limit, a missing or wrapping queue region, or a cohort queue
    /// placed outside the memory it must live in.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.latency == 0 {
            return Err(ConfigError::Zero { param: "latency" });
        }
        if self.bandwidth == 0 {
            return Err(ConfigError::Zero { param: "bandwidth" });
        }
        if self.queue_size == 0 {
            return Err(ConfigError::Zero {
                param: "queue_size",
            });
        }
        if self.max_outstanding == 0 {
            return Err(ConfigError::Zero {
                param: "max_outstanding",
            });
        }
        let range = self.queue_range().ok_or(ConfigError::MissingQueueBase)?;
        if range.end().is_none() {
            return Err(ConfigError::RangeOverflow(range));
        }
        if let Some(fwd) = self.forward_range {
            if fwd.end().is_none() {
                return Err(ConfigError::RangeOverflow(fwd));
            }
        }
        self.cohort.validate(range, self.mode == EngineMode::Terminal)
    }
}

impl Default for EngineConfig {
    /// Creates the default engine configuration.
    ///
    /// Latency 30 ns, no variance, 12.8 GiB/s, terminal mode, and no queue
    /// base: it must be set before the configuration validates.
    fn default() -> Self {
        Self {
            latency: defaults::LATENCY,
            latency_var: defaults::LATENCY_VAR,
            bandwidth: defaults::BANDWIDTH,
            queue_base_addr: None,
            queue_size: defaults::QUEUE_SIZE,
            mode: EngineMode::default(),
            own_queue_region: true,
            forward_range: None,
            max_outstanding: defaults::MAX_OUTSTANDING,
            max_bandwidth_delay: None,
            seed: defaults::SEED,
            cohort: CohortConfig::default(),
        }
    }
}

/// Cohort queue poller configuration.
///
/// Addresses left unset are derived from the queue base: in queue at the base,
/// out queue at base + 0x1000, accelerator operand at base + 0x2000. Virtual
/// bases left unset equal the physical base.
#[derive(Debug, Clone, Deserialize)]
pub struct CohortConfig {
    /// Enable polling
    #[serde(default)]
    pub enabled: bool,

    /// Ticks between polls
    #[serde(
        default = "CohortConfig::default_poll_interval",
        deserialize_with = "serde_units::latency"
    )]
    pub poll_interval: Tick,

    /// Ticks from startup to the first poll
    #[serde(
        default = "CohortConfig::default_startup_delay",
        deserialize_with = "serde_units::latency"
    )]
    pub startup_delay: Tick,

    /// Entries per queue
    #[serde(default = "CohortConfig::default_entries")]
    pub entries: u64,

    /// Physical base of the in queue
    #[serde(default)]
    pub in_base: Option<u64>,

    /// Software-visible base the in-queue pointers are relative to
    #[serde(default)]
    pub in_virt_base: Option<u64>,

    /// Physical base of the out queue
    #[serde(default)]
    pub out_base: Option<u64>,

    /// Software-visible base the out-queue pointers are relative to
    #[serde(default)]
    pub out_virt_base: Option<u64>,

    /// Address of the accelerator operand
    #[serde(default)]
    pub accel_addr: Option<u64>,
}

impl CohortConfig {
    /// Returns the default poll interval.
    fn default_poll_interval() -> Tick {
        defaults::POLL_INTERVAL
    }

    /// Returns the default startup delay.
    fn default_startup_delay() -> Tick {
        defaults::STARTUP_DELAY
    }

    /// Returns the default queue depth.
    fn default_entries() -> u64 {
        defaults::QUEUE_ENTRIES
    }

    /// Returns `(base, virt_base)` of the in queue for a given queue region base.
    pub fn in_queue(&self, queue_base: u64) -> (u64, u64) {
        let base = self.in_base.unwrap_or(queue_base);
        (base, self.in_virt_base.unwrap_or(base))
    }

    /// Returns `(base, virt_base)` of the out queue for a given queue region base.
    pub fn out_queue(&self, queue_base: u64) -> (u64, u64) {
        let base = self
            .out_base
            .unwrap_or(queue_base.wrapping_add(defaults::OUT_QUEUE_OFFSET));
        (base, self.out_virt_base.unwrap_or(base))
    }

    /// Returns the accelerator operand address for a given queue region base.
    pub fn accel(&self, queue_base: u64) -> u64 {
        self.accel_addr
            .unwrap_or(queue_base.wrapping_add(defaults::ACCEL_OFFSET))
    }

    /// Bytes occupied by one queue: head and tail pointers plus the entries.
    pub fn footprint(&self) -> u64 {
        16 + self.entries.saturating_mul(8)
    }

    /// Validates the poller against the queue region it will run in.
    ///
    /// With `must_be_owned`, every queue word has to sit inside `region`
    /// because the engine has no downstream port to reach anything else.
    fn validate(&self, region: AddrRange, must_be_owned: bool) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.poll_interval == 0 {
            return Err(ConfigError::Zero {
                param: "cohort.poll_interval",
            });
        }
        if self.entries == 0 {
            return Err(ConfigError::Zero {
                param: "cohort.entries",
            });
        }
        if !must_be_owned {
            return Ok(());
        }
        let (in_base, _) = self.in_queue(region.base);
        let (out_base, _) = self.out_queue(region.base);
        let placements = [
            ("in", in_base, self.footprint()),
            ("out", out_base, self.footprint()),
            ("accelerator", self.accel(region.base), 8),
        ];
        for (queue, base, len) in placements {
            if !region.contains_access(base, len) {
                return Err(ConfigError::QueueLayout {
                    queue,
                    reason: format!(
                        "{len} bytes at {base:#x} fall outside the queue region {region}"
                    ),
                });
            }
        }
        let in_range = AddrRange::new(in_base, self.footprint());
        let out_range = AddrRange::new(out_base, self.footprint());
        if in_range.overlaps(&out_range) {
            return Err(ConfigError::QueueLayout {
                queue: "out",
                reason: format!("{out_range} overlaps the in queue {in_range}"),
            });
        }
        Ok(())
    }
}

impl Default for CohortConfig {
    /// Creates a disabled poller with the default geometry.
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval: defaults::POLL_INTERVAL,
            startup_delay: defaults::STARTUP_DELAY,
            entries: defaults::QUEUE_ENTRIES,
            in_base: None,
            in_virt_base: None,
            out_base: None,
            out_virt_base: None,
            accel_addr: None,
        }
    }
}

/// System memory map and bus configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Ranges backed by downstream DRAM
    #[serde(default = "SystemConfig::default_mem_ranges")]
    pub mem_ranges: Vec<AddrRange>,

    /// Clock period of the memory side in ticks
    #[serde(
        default = "SystemConfig::default_clock_period",
        deserialize_with = "serde_units::latency"
    )]
    pub clock_period: Tick,

    /// System bus width in bytes
    #[serde(default = "SystemConfig::default_bus_width")]
    pub bus_width: u64,

    /// System bus latency in cycles
    #[serde(default = "SystemConfig::default_bus_latency")]
    pub bus_latency: u64,
}

impl SystemConfig {
    /// Returns the default DRAM ranges.
    fn default_mem_ranges() -> Vec<AddrRange> {
        vec![defaults::MEM_RANGE]
    }

    /// Returns the default memory-side clock period.
    fn default_clock_period() -> Tick {
        defaults::CLOCK_PERIOD
    }

    /// Returns the default system bus width in bytes.
    fn default_bus_width() -> u64 {
        defaults::BUS_WIDTH
    }

    /// Returns the default system bus latency in cycles.
    fn default_bus_latency() -> u64 {
        defaults::BUS_LATENCY
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.clock_period == 0 {
            return Err(ConfigError::Zero {
                param: "system.clock_period",
            });
        }
        if self.bus_width == 0 {
            return Err(ConfigError::Zero {
                param: "system.bus_width",
            });
        }
        for range in &self.mem_ranges {
            if range.end().is_none() {
                return Err(ConfigError::RangeOverflow(*range));
            }
        }
        Ok(())
    }
}

impl Default for SystemConfig {
    /// Creates a default system configuration: 512 MiB of DRAM at zero on a
    /// 1 GHz, 64-bit bus.
    fn default() -> Self {
        Self {
            mem_ranges: vec![defaults::MEM_RANGE],
            clock_period: defaults::CLOCK_PERIOD,
            bus_width: defaults::BUS_WIDTH,
            bus_latency: defaults::BUS_LATENCY,
        }
    }
}

/// Downstream memory configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Memory controller type
    #[serde(default)]
    pub controller: MemoryController,

    /// Fixed latency of the simple controller in cycles
    #[serde(default = "MemoryConfig::default_fixed_latency")]
    pub fixed_latency: u64,

    /// CAS latency (column access strobe)
    #[serde(default = "MemoryConfig::default_t_cas")]
    pub t_cas: u64,

    /// RAS latency (row access strobe)
    #[serde(default = "MemoryConfig::default_t_ras")]
    pub t_ras: u64,

    /// Precharge latency
    #[serde(default = "MemoryConfig::default_t_pre")]
    pub t_pre: u64,

    /// Requests accepted before refusing
    #[serde(default = "MemoryConfig::default_max_pending")]
    pub max_pending: usize,
}

impl MemoryConfig {
    /// Returns the default simple-controller latency in cycles.
    fn default_fixed_latency() -> u64 {
        defaults::FIXED_LATENCY
    }

    /// Returns the default CAS latency in DRAM cycles.
    fn default_t_cas() -> u64 {
        defaults::T_CAS
    }

    /// Returns the default RAS latency in DRAM cycles.
    fn default_t_ras() -> u64 {
        defaults::T_RAS
    }

    /// Returns the default precharge latency in DRAM cycles.
    fn default_t_pre() -> u64 {
        defaults::T_PRE
    }

    /// Returns the default downstream queue depth.
    fn default_max_pending() -> usize {
        defaults::MAX_PENDING
    }
}

impl Default for MemoryConfig {
    /// Creates a default memory configuration with a simple controller.
    fn default() -> Self {
        Self {
            controller: MemoryController::default(),
            fixed_latency: defaults::FIXED_LATENCY,
            t_cas: defaults::T_CAS,
            t_ras: defaults::T_RAS,
            t_pre: defaults::T_PRE,
            max_pending: defaults::MAX_PENDING,
        }
    }
}

/// Reference requester configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequesterConfig {
    /// Responses the requester can hold at once (`None` = unbounded)
    #[serde(default)]
    pub response_slots: Option<usize>,

    /// Ticks the requester needs to consume one response
    #[serde(default, deserialize_with = "serde_units::latency")]
    pub consume_latency: Tick,
}
