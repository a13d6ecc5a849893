//! # Timed Memory Tests
//!
//! Access timing, bounded pending slots and the retry flag.

use cohort_core::common::{AddrRange, DeviceError};
use cohort_core::config::{MemoryConfig, SystemConfig};
use cohort_core::soc::interconnect::Bus;
use cohort_core::soc::memory::{Memory, Offer, TimedMemory};
use cohort_core::soc::packet::{MemCmd, Packet};
use pretty_assertions::assert_eq;

fn memory(max_pending: usize) -> TimedMemory {
    let system = SystemConfig::default();
    let mut bus = Bus::new(system.bus_width, system.bus_latency);
    bus.add_device(Box::new(Memory::new("dram0", AddrRange::new(0, 0x1_0000))))
        .unwrap();
    let config = MemoryConfig {
        max_pending,
        ..MemoryConfig::default()
    };
    TimedMemory::new(bus, &system, &config)
}

fn accepted(offer: Offer) -> Packet {
    match offer {
        Offer::Accepted { response } => response,
        Offer::Busy(pkt) => panic!("request {} refused", pkt.id),
    }
}

#[test]
fn access_time_is_controller_plus_transit() {
    let mut mem = memory(4);
    let resp = accepted(mem.offer(Packet::read(1, 0x40, 64, 0), 5_000).unwrap());
    // (30 controller + 4 bus + 8 beats) cycles at 1 ns.
    assert_eq!(resp.ready_at, Some(5_000 + 42_000));
    assert_eq!(resp.cmd, MemCmd::ReadResp);
    assert_eq!(mem.pending(), 1);
}

#[test]
fn write_is_visible_to_later_reads() {
    let mut mem = memory(4);
    let resp = accepted(
        mem.offer(Packet::write_u64(1, 0x80, 0xDEAD_BEEF, 0), 0)
            .unwrap(),
    );
    assert_eq!(resp.cmd, MemCmd::WriteResp);

    let mut pkt = Packet::read(2, 0x80, 8, 0);
    mem.functional(&mut pkt).unwrap();
    assert_eq!(pkt.get_u64(), Some(0xDEAD_BEEF));
}

#[test]
fn full_queue_refuses_and_asks_for_retry() {
    let mut mem = memory(1);
    let _ = accepted(mem.offer(Packet::read(1, 0, 8, 0), 0).unwrap());

    let refused = mem.offer(Packet::read(2, 8, 8, 0), 0).unwrap();
    assert_eq!(refused, Offer::Busy(Packet::read(2, 8, 8, 0)));

    assert!(mem.complete(), "refusal must be answered with a retry");
    assert!(!mem.complete(), "retry flag is consumed");
    assert_eq!(mem.pending(), 0);
}

#[test]
fn completion_without_refusal_needs_no_retry() {
    let mut mem = memory(2);
    let _ = accepted(mem.offer(Packet::read(1, 0, 8, 0), 0).unwrap());
    assert!(!mem.complete());
}

#[test]
fn unmapped_access_is_an_error() {
    let mut mem = memory(2);
    let err = mem.offer(Packet::read(1, 0x10_0000, 8, 0), 0).unwrap_err();
    assert!(matches!(err, DeviceError::Misrouted { addr: 0x10_0000, .. }));
    assert_eq!(mem.pending(), 0);
}
