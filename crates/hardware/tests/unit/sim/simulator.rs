//! # Simulator Tests
//!
//! End-to-end runs of traces through the engine and the reference host.

use cohort_core::common::{AddrRange, DeviceError};
use cohort_core::sim::{TraceCmd, TraceEntry};
use cohort_core::soc::packet::{MemCmd, Packet};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::common::harness::{QUEUE_BASE, TestContext, passthrough_config, terminal_config};

#[test]
fn terminal_read_completes_at_base_latency() {
    let mut ctx = TestContext::new(&terminal_config(), vec![TraceEntry::read(0, QUEUE_BASE, 64)]);
    let end = ctx.run();

    let done = ctx.completions();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].completed_at, 30_000);
    assert_eq!(done[0].cmd, MemCmd::ReadResp);
    assert_eq!(done[0].data, vec![0; 64]);
    assert_eq!(end, 30_000);
    assert_eq!(ctx.sim.stats().responses, 1);
}

#[test]
fn passthrough_read_adds_downstream_time() {
    let mut ctx = TestContext::new(&passthrough_config(), vec![TraceEntry::read(0, 0x1000, 64)]);
    let _ = ctx.run();

    let done = ctx.completions();
    assert_eq!(done.len(), 1);
    // 30 ns of shaping, then 42 cycles of downstream memory.
    assert_eq!(done[0].completed_at, 72_000);
    assert_eq!(ctx.sim.stats().forwarded, 1);
    assert_eq!(ctx.sim.system.downstream.as_ref().unwrap().pending(), 0);
}

#[test]
fn passthrough_serves_its_own_region_locally() {
    let mut ctx = TestContext::new(
        &passthrough_config(),
        vec![TraceEntry::read(0, QUEUE_BASE + 0x40, 8)],
    );
    let _ = ctx.run();
    assert_eq!(ctx.completions()[0].completed_at, 30_000);
    assert_eq!(ctx.sim.stats().forwarded, 0);
}

#[test]
fn refused_requests_resume_on_retry() {
    let mut config = terminal_config();
    config.engine.max_outstanding = 1;
    let trace = (0..3)
        .map(|i| TraceEntry::read(0, QUEUE_BASE + i * 64, 64))
        .collect();
    let mut ctx = TestContext::new(&config, trace);
    let _ = ctx.run();

    let done = ctx.by_id();
    let ticks: Vec<_> = done.iter().map(|c| c.completed_at).collect();
    assert_eq!(ticks, vec![30_000, 60_000, 90_000]);
    assert!(done.iter().all(|c| c.service_time() == 30_000));
    assert_eq!(done[1].latency(), 60_000);
    assert_eq!(ctx.sim.requester.retries(), 2);
    assert_eq!(ctx.sim.stats().rejected_outstanding, 2);
    assert_eq!(ctx.sim.stats().retries_sent, 2);
}

#[test]
fn full_requester_stalls_responses() {
    let mut config = terminal_config();
    config.requester.response_slots = Some(1);
    config.requester.consume_latency = 50_000;
    let trace = vec![
        TraceEntry::read(0, QUEUE_BASE, 64),
        TraceEntry::read(0, QUEUE_BASE + 64, 64),
    ];
    let mut ctx = TestContext::new(&config, trace);
    let end = ctx.run();

    let ticks: Vec<_> = ctx.by_id().iter().map(|c| c.completed_at).collect();
    assert_eq!(ticks, vec![30_000, 80_000]);
    assert_eq!(ctx.sim.stats().resp_stalls, 1);
    assert!(!ctx.sim.system.engine.is_stalled());
    assert_eq!(end, 130_000);
}

#[test]
fn functional_read_sees_timed_write() {
    let trace = vec![TraceEntry::write(0, QUEUE_BASE + 8, 0xCAFEu64.to_le_bytes().to_vec())];
    let mut ctx = TestContext::new(&terminal_config(), trace);
    let _ = ctx.run();

    let mut pkt = Packet::read(99, QUEUE_BASE + 8, 8, 0);
    ctx.sim.functional(&mut pkt).unwrap();
    assert_eq!(pkt.get_u64(), Some(0xCAFE));
    assert_eq!(ctx.sim.system.read_u64(QUEUE_BASE + 8), Some(0xCAFE));
}

#[test]
fn passthrough_write_lands_downstream() {
    let trace = vec![TraceEntry::write(0, 0x2000, 0xF00Du64.to_le_bytes().to_vec())];
    let mut ctx = TestContext::new(&passthrough_config(), trace);
    let _ = ctx.run();

    assert_eq!(ctx.completions()[0].cmd, MemCmd::WriteResp);
    assert_eq!(ctx.sim.system.read_u64(0x2000), Some(0xF00D));
}

#[test]
fn terminal_access_outside_region_is_fatal() {
    let mut ctx = TestContext::new(&terminal_config(), vec![TraceEntry::read(0, 0x1000, 8)]);
    let err = ctx.sim.run().unwrap_err();
    assert!(matches!(err, DeviceError::Misrouted { addr: 0x1000, .. }));
}

#[test]
fn forward_range_limits_passthrough() {
    let mut config = passthrough_config();
    config.engine.forward_range = Some(AddrRange::new(0, 0x1000));
    let mut ctx = TestContext::new(&config, vec![TraceEntry::read(0, 0x2000, 8)]);
    assert!(matches!(
        ctx.sim.run(),
        Err(DeviceError::Misrouted { addr: 0x2000, .. })
    ));
}

#[test]
fn oversized_local_read_is_fatal_before_issue() {
    let trace = vec![TraceEntry::read(0, QUEUE_BASE, u64::MAX)];
    let mut ctx = TestContext::new(&terminal_config(), trace);
    assert!(matches!(
        ctx.sim.run(),
        Err(DeviceError::Misrouted { addr: QUEUE_BASE, size: u64::MAX, .. })
    ));
    assert!(ctx.completions().is_empty());
}

#[test]
fn oversized_forwarded_read_is_fatal_before_issue() {
    let trace = vec![TraceEntry::read(0, 0x1000, u64::MAX)];
    let mut ctx = TestContext::new(&passthrough_config(), trace);
    assert_eq!(
        ctx.sim.run(),
        Err(DeviceError::Misrouted {
            device: "bus".to_string(),
            addr: 0x1000,
            size: u64::MAX,
            cmd: MemCmd::ReadReq,
        })
    );
    assert_eq!(ctx.sim.stats().reads, 0);
}

#[test]
fn oversized_zero_fill_write_is_fatal_before_issue() {
    let entry = TraceEntry {
        cmd: TraceCmd::Write,
        ..TraceEntry::read(0, 0x1000, u64::MAX)
    };
    assert_eq!(entry.access_size(), u64::MAX);
    let mut ctx = TestContext::new(&passthrough_config(), vec![entry]);
    assert!(matches!(
        ctx.sim.run(),
        Err(DeviceError::Misrouted { cmd: MemCmd::WriteReq, size: u64::MAX, .. })
    ));
}

#[test]
fn run_without_traffic_processes_queued_entries() {
    let mut config = terminal_config();
    config.engine.cohort.enabled = true;
    let mut ctx = TestContext::new(&config, Vec::new());
    let out = QUEUE_BASE + 0x1000;
    for (addr, value) in [
        (QUEUE_BASE, QUEUE_BASE),
        (QUEUE_BASE + 8, QUEUE_BASE + 16),
        (QUEUE_BASE + 16, 10),
        (QUEUE_BASE + 24, 20),
        (out, out),
        (out + 8, out),
        (QUEUE_BASE + 0x2000, 5),
    ] {
        assert!(ctx.sim.system.load(addr, &value.to_le_bytes()));
    }

    let _ = ctx.run();
    assert_eq!(ctx.sim.stats().entries_processed, 2);
    assert_eq!(ctx.sim.stats().polls, 3);
    assert_eq!(ctx.sim.system.read_u64(out + 16), Some(15));
    assert_eq!(ctx.sim.system.read_u64(out + 24), Some(25));
    assert!(ctx.sim.system.engine.queues_idle());
}

#[test]
fn run_until_stops_at_the_limit() {
    let mut ctx = TestContext::new(&terminal_config(), vec![TraceEntry::read(0, QUEUE_BASE, 8)]);
    ctx.sim.run_until(10_000).unwrap();
    assert!(ctx.completions().is_empty());
    assert_eq!(ctx.sim.now(), 10_000);
    assert!(!ctx.sim.traffic_done());

    let _ = ctx.run();
    assert!(ctx.sim.traffic_done());
    assert_eq!(ctx.completions()[0].completed_at, 30_000);
}

#[test]
fn requests_wait_for_their_issue_tick() {
    let trace = vec![
        TraceEntry::read(0, QUEUE_BASE, 8),
        TraceEntry::read(100_000, QUEUE_BASE + 8, 8),
    ];
    let mut ctx = TestContext::new(&terminal_config(), trace);
    let _ = ctx.run();
    let done = ctx.by_id();
    assert_eq!(done[1].issued_at, 100_000);
    assert_eq!(done[1].completed_at, 130_000);
}

fn same_address_trace(ops: &[(bool, u64)], base: u64) -> Vec<TraceEntry> {
    ops.iter()
        .map(|&(second, value)| {
            let addr = if second { base + 8 } else { base };
            TraceEntry::write(0, addr, value.to_le_bytes().to_vec())
        })
        .collect()
}

fn check_ordering(ctx: &mut TestContext, ops: &[(bool, u64)], base: u64) -> Result<(), TestCaseError> {
    for lane in [false, true] {
        let addr = if lane { base + 8 } else { base };
        let ticks: Vec<_> = ctx
            .by_id()
            .into_iter()
            .filter(|c| c.addr == addr)
            .map(|c| c.completed_at)
            .collect();
        prop_assert!(ticks.windows(2).all(|w| w[0] <= w[1]), "{ticks:?}");

        if let Some(&(_, last)) = ops.iter().rev().find(|(l, _)| *l == lane) {
            let mut pkt = Packet::read(u64::MAX, addr, 8, 0);
            ctx.sim.functional(&mut pkt).unwrap();
            prop_assert_eq!(pkt.get_u64(), Some(last));
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn same_address_requests_complete_in_order(
        ops in prop::collection::vec((any::<bool>(), any::<u64>()), 1..12),
        latency_var in 0u64..50_000,
        seed in any::<u64>(),
        passthrough in any::<bool>(),
    ) {
        let mut config = if passthrough { passthrough_config() } else { terminal_config() };
        config.engine.latency_var = latency_var;
        config.engine.seed = seed;
        let base = if passthrough { 0x1000 } else { QUEUE_BASE };

        let mut ctx = TestContext::new(&config, same_address_trace(&ops, base));
        let _ = ctx.run();
        prop_assert_eq!(ctx.completions().len(), ops.len());
        check_ordering(&mut ctx, &ops, base)?;
    }
}
