//! # Scenario Tests
//!
//! The built-in scenarios run end to end with default parameters.

use cohort_core::config::defaults;
use cohort_core::sim::scenario::{self, SCENARIOS};
use pretty_assertions::assert_eq;

use crate::common::harness::TestContext;

#[test]
fn every_listed_scenario_exists() {
    for name in SCENARIOS {
        assert!(scenario::by_name(name).is_some(), "{name}");
    }
    assert!(scenario::by_name("nope").is_none());
}

#[test]
fn single_read_takes_thirty_nanoseconds() {
    let (config, trace) = scenario::single_read();
    let mut ctx = TestContext::new(&config, trace);
    let _ = ctx.run();
    assert_eq!(ctx.completions().len(), 1);
    assert_eq!(ctx.completions()[0].completed_at, 30_000);
}

#[test]
fn burst_is_limited_by_bandwidth() {
    let count = 1000u64;
    let bw = u128::from(defaults::BANDWIDTH);
    let (config, trace) = scenario::burst(count);
    let mut ctx = TestContext::new(&config, trace);
    let _ = ctx.run();

    let mut ticks: Vec<u128> = ctx
        .completions()
        .iter()
        .map(|c| u128::from(c.completed_at))
        .collect();
    assert_eq!(ticks.len(), count as usize);
    ticks.sort_unstable();

    // Any window of completions carries no more bytes than the channel moves,
    // give or take the rounding of a single transfer.
    for i in (0..ticks.len()).step_by(37) {
        for j in (i + 1..ticks.len()).step_by(53) {
            let bytes = (j - i) as u128 * 64;
            assert!(
                bytes * 1_000_000_000_000 <= (ticks[j] - ticks[i] + 1) * bw,
                "{i}..{j}: {bytes} B in {} ticks",
                ticks[j] - ticks[i]
            );
        }
    }

    let floor = 30_000 + (count as u128 - 1) * 64 * 1_000_000_000_000 / bw;
    assert!(ticks[ticks.len() - 1] + 1 >= floor);

    let stats = ctx.sim.stats();
    assert_eq!(stats.writes, count);
    assert_eq!(stats.bytes_written, count * 64);
    assert_eq!(stats.responses, count);
    assert!(stats.throughput() <= defaults::BANDWIDTH as f64 * 1.001);
}

#[test]
fn burst_data_reaches_the_region() {
    let (config, trace) = scenario::burst(16);
    let mut ctx = TestContext::new(&config, trace);
    let _ = ctx.run();
    let word = ctx.sim.system.read_u64(scenario::QUEUE_BASE + 15 * 64 + 8);
    assert_eq!(word, Some(0x0F0F_0F0F_0F0F_0F0F));
}
