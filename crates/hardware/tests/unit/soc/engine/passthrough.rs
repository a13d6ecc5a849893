//! # Pass-Through Tests
//!
//! Shaped requests are re-issued downstream; responses find their way back to
//! the requester's own id.

use cohort_core::common::DeviceError;
use cohort_core::soc::packet::{MemCmd, Packet};
use cohort_core::soc::traits::{RequestIssuer, RequestReceiver};
use pretty_assertions::assert_eq;

use crate::common::harness::{QUEUE_BASE, engine, fire_next, offer, passthrough_config};
use crate::common::mocks::host::RecordingHost;

/// Hands the oldest forwarded request back as a completed response.
fn complete_downstream(e: &mut cohort_core::CohortEngine, host: &mut RecordingHost, now: u64) {
    let mut pkt = host.requests.remove(0);
    pkt.make_response(now);
    e.recv_timing_resp(pkt, now, host).unwrap();
}

#[test]
fn shaped_request_is_forwarded_and_answered() {
    let mut e = engine(&passthrough_config());
    let mut host = RecordingHost::new();

    assert!(offer(&mut e, &mut host, Packet::read(77, 0x1000, 64, 0), 0));
    assert_eq!(fire_next(&mut e, &mut host), Some(30_000));
    assert_eq!(host.requests.len(), 1);
    assert_eq!(host.requests[0].addr, 0x1000);
    assert_eq!(host.requests[0].cmd, MemCmd::ReadReq);
    assert!(host.responses.is_empty());

    complete_downstream(&mut e, &mut host, 72_000);
    assert_eq!(host.responses.len(), 1);
    assert_eq!(host.responses[0].id, 77);
    assert_eq!(host.responses[0].ready_at, Some(72_000));
    assert_eq!(e.stats().forwarded, 1);
    assert!(e.is_idle());
}

#[test]
fn same_address_is_held_until_the_earlier_access_returns() {
    let mut e = engine(&passthrough_config());
    let mut host = RecordingHost::new();

    assert!(offer(&mut e, &mut host, Packet::write_u64(0, 0x1000, 1, 0), 0));
    assert!(offer(&mut e, &mut host, Packet::write_u64(1, 0x1000, 2, 0), 0));
    while fire_next(&mut e, &mut host).is_some() {}
    assert_eq!(host.requests.len(), 1);
    assert_eq!(e.stats().parked, 1);

    complete_downstream(&mut e, &mut host, 80_000);
    assert_eq!(host.requests.len(), 1);
    assert_eq!(host.requests[0].get_u64(), Some(2));
    complete_downstream(&mut e, &mut host, 120_000);

    let ids: Vec<_> = host.responses.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![0, 1]);
}

#[test]
fn different_addresses_are_not_held() {
    let mut e = engine(&passthrough_config());
    let mut host = RecordingHost::new();
    assert!(offer(&mut e, &mut host, Packet::read(0, 0x1000, 8, 0), 0));
    assert!(offer(&mut e, &mut host, Packet::read(1, 0x2000, 8, 0), 0));
    while fire_next(&mut e, &mut host).is_some() {}
    assert_eq!(host.requests.len(), 2);
    assert_eq!(e.stats().parked, 0);
}

#[test]
fn downstream_refusal_waits_for_retry() {
    let mut e = engine(&passthrough_config());
    let mut host = RecordingHost::new();
    host.refuse_requests = true;

    assert!(offer(&mut e, &mut host, Packet::read(0, 0x1000, 8, 0), 0));
    assert!(offer(&mut e, &mut host, Packet::read(1, 0x2000, 8, 0), 0));
    while fire_next(&mut e, &mut host).is_some() {}
    assert!(host.requests.is_empty());
    assert_eq!(e.stats().downstream_refusals, 1);

    host.refuse_requests = false;
    e.recv_req_retry(40_000, &mut host).unwrap();
    let addrs: Vec<_> = host.requests.iter().map(|p| p.addr).collect();
    assert_eq!(addrs, vec![0x1000, 0x2000]);
}

#[test]
fn queue_region_is_still_served_locally() {
    let mut e = engine(&passthrough_config());
    let mut host = RecordingHost::new();
    assert!(offer(&mut e, &mut host, Packet::read(0, QUEUE_BASE, 8, 0), 0));
    let _ = fire_next(&mut e, &mut host);
    assert!(host.requests.is_empty());
    assert_eq!(host.responses.len(), 1);
}

#[test]
fn queue_region_is_forwarded_when_not_owned() {
    let mut config = passthrough_config();
    config.engine.own_queue_region = false;
    let mut e = engine(&config);
    let mut host = RecordingHost::new();
    assert!(offer(&mut e, &mut host, Packet::read(0, QUEUE_BASE, 8, 0), 0));
    let _ = fire_next(&mut e, &mut host);
    assert_eq!(host.requests.len(), 1);
    assert!(e.addr_ranges().is_empty());
}

#[test]
fn unknown_downstream_response_is_fatal() {
    let mut e = engine(&passthrough_config());
    let mut host = RecordingHost::new();
    let mut pkt = Packet::read(5, 0x1000, 8, 0);
    pkt.make_response(0);
    assert_eq!(
        e.recv_timing_resp(pkt, 0, &mut host),
        Err(DeviceError::UnknownResponse {
            device: "cohort_engine".to_string(),
            id: 5
        })
    );
}
