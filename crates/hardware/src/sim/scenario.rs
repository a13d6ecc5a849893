//! Built-in scenarios.
//!
//! Small self-contained setups used by the command line front end and by the
//! tests to show the engine's timing behavior with default parameters.

use super::traffic::TraceEntry;
use crate::config::Config;

/// Queue region base used by the scenarios.
pub const QUEUE_BASE: u64 = 0x9000_0000;

/// Names accepted by [`by_name`].
pub const SCENARIOS: &[&str] = &["single-read", "burst"];

fn default_config() -> Config {
    let mut config = Config::default();
    config.engine.queue_base_addr = Some(QUEUE_BASE);
    config
}

/// One 64-byte read at tick 0 with default parameters.
pub fn single_read() -> (Config, Vec<TraceEntry>) {
    (default_config(), vec![TraceEntry::read(0, QUEUE_BASE, 64)])
}

/// `count` back-to-back 64-byte writes at tick 0, to distinct addresses.
pub fn burst(count: u64) -> (Config, Vec<TraceEntry>) {
    let trace = (0..count)
        .map(|i| TraceEntry::write(0, QUEUE_BASE + i * 64, vec![i as u8; 64]))
        .collect();
    (default_config(), trace)
}

/// Looks up a scenario by name.
pub fn by_name(name: &str) -> Option<(Config, Vec<TraceEntry>)> {
    match name {
        "single-read" => Some(single_read()),
        "burst" => Some(burst(1000)),
        _ => None,
    }
}
