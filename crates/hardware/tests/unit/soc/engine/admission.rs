//! # Admission Tests
//!
//! Refusal causes, the single owed retry, and fatal misrouting.

use cohort_core::common::DeviceError;
use cohort_core::config::EngineMode;
use cohort_core::soc::packet::{MemCmd, Packet};
use cohort_core::soc::port::{Admission, EngineEvent};
use cohort_core::soc::traits::RequestReceiver;
use mockall::predicate::always;
use pretty_assertions::assert_eq;

use crate::common::harness::{QUEUE_BASE, engine, fire_next, offer, terminal_config};
use crate::common::mocks::host::{MockHost, RecordingHost};

#[test]
fn full_in_flight_table_refuses_and_hands_the_packet_back() {
    let mut config = terminal_config();
    config.engine.max_outstanding = 2;
    let mut e = engine(&config);
    let mut host = RecordingHost::new();

    assert!(offer(&mut e, &mut host, Packet::read(0, QUEUE_BASE, 8, 0), 0));
    assert!(offer(&mut e, &mut host, Packet::read(1, QUEUE_BASE + 8, 8, 0), 0));

    let third = Packet::read(2, QUEUE_BASE + 16, 8, 0);
    let outcome = e.recv_timing_req(third.clone(), 0, &mut host).unwrap();
    assert_eq!(outcome, Admission::Retry(third));
    assert!(e.retry_owed());
    assert_eq!(e.stats().rejected_outstanding, 1);
    assert_eq!(host.retries, 0);
}

#[test]
fn exactly_one_retry_once_a_slot_frees() {
    let mut config = terminal_config();
    config.engine.max_outstanding = 1;
    let mut e = engine(&config);
    let mut host = RecordingHost::new();

    assert!(offer(&mut e, &mut host, Packet::read(0, QUEUE_BASE, 8, 0), 0));
    assert!(!offer(&mut e, &mut host, Packet::read(1, QUEUE_BASE, 8, 10), 10));
    // Further attempts before the retry are refused without owing a second retry.
    assert!(!offer(&mut e, &mut host, Packet::read(1, QUEUE_BASE, 8, 20), 20));
    assert_eq!(e.stats().rejected_retry_pending, 1);

    let _ = fire_next(&mut e, &mut host);
    assert_eq!(host.retries, 1);
    assert!(!e.retry_owed());

    // The retried request is now accepted.
    assert!(offer(&mut e, &mut host, Packet::read(1, QUEUE_BASE, 8, 30_000), 30_000));
    let _ = fire_next(&mut e, &mut host);
    assert_eq!(host.retries, 1);
}

#[test]
fn bandwidth_backlog_refuses_until_release() {
    let mut config = terminal_config();
    config.engine.max_bandwidth_delay = Some(0);
    let mut e = engine(&config);
    let mut host = RecordingHost::new();

    assert!(offer(&mut e, &mut host, Packet::read(0, QUEUE_BASE, 64, 0), 0));
    assert!(!offer(&mut e, &mut host, Packet::read(1, QUEUE_BASE + 64, 64, 0), 0));
    assert_eq!(e.stats().rejected_bandwidth, 1);
    assert!(host.scheduled.contains(&(4_657, EngineEvent::Release)));

    // Release fires before the first completion.
    assert_eq!(fire_next(&mut e, &mut host), Some(4_657));
    assert_eq!(host.retries, 1);
    assert!(offer(&mut e, &mut host, Packet::read(1, QUEUE_BASE + 64, 64, 4_657), 4_657));
}

#[test]
fn terminal_request_outside_region_is_fatal() {
    let mut e = engine(&terminal_config());
    let mut host = RecordingHost::new();
    let err = e
        .recv_timing_req(Packet::read(0, 0x1000, 64, 0), 0, &mut host)
        .unwrap_err();
    assert_eq!(
        err,
        DeviceError::Misrouted {
            device: "cohort_engine".to_string(),
            addr: 0x1000,
            size: 64,
            cmd: MemCmd::ReadReq,
        }
    );
    assert!(host.scheduled.is_empty());
}

#[test]
fn access_straddling_the_region_end_is_fatal() {
    let mut config = terminal_config();
    config.engine.queue_size = 0x1000;
    let mut e = engine(&config);
    let mut host = RecordingHost::new();
    let pkt = Packet::read(0, QUEUE_BASE + 0xFF8, 16, 0);
    assert!(matches!(
        e.recv_timing_req(pkt, 0, &mut host),
        Err(DeviceError::Misrouted { .. })
    ));
}

#[test]
fn forward_range_limits_passthrough() {
    let mut config = terminal_config();
    config.engine.mode = EngineMode::PassThrough;
    config.engine.forward_range = Some(cohort_core::common::AddrRange::new(0, 0x1000));
    let mut e = engine(&config);
    let mut host = RecordingHost::new();

    assert!(offer(&mut e, &mut host, Packet::read(0, 0x800, 8, 0), 0));
    assert!(matches!(
        e.recv_timing_req(Packet::read(1, 0x2000, 8, 0), 0, &mut host),
        Err(DeviceError::Misrouted { addr: 0x2000, .. })
    ));
}

#[test]
fn responses_are_not_requests() {
    let mut e = engine(&terminal_config());
    let mut host = RecordingHost::new();
    let mut pkt = Packet::read(0, QUEUE_BASE, 8, 0);
    pkt.make_response(0);
    assert!(matches!(
        e.recv_timing_req(pkt, 0, &mut host),
        Err(DeviceError::UnsupportedCommand { .. })
    ));
}

#[test]
fn admission_schedules_exactly_one_completion() {
    let mut e = engine(&terminal_config());
    let mut host = MockHost::new();
    host.expect_schedule()
        .withf(|when, event| *when == 30_000 && *event == EngineEvent::Respond { slot: 0 })
        .times(1)
        .return_const(());
    host.expect_send_retry_req().never();
    host.expect_send_timing_req().with(always()).never();

    let outcome = e
        .recv_timing_req(Packet::write_u64(0, QUEUE_BASE, 7, 0), 0, &mut host)
        .unwrap();
    assert!(outcome.is_accepted());
}
