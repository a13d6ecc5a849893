//! # Packet Tests

use cohort_core::soc::packet::{MemCmd, Packet};
use rstest::rstest;

#[rstest]
#[case(MemCmd::ReadReq, Some(MemCmd::ReadResp))]
#[case(MemCmd::WriteReq, Some(MemCmd::WriteResp))]
#[case(MemCmd::ReadResp, None)]
#[case(MemCmd::WriteResp, None)]
fn response_commands(#[case] cmd: MemCmd, #[case] resp: Option<MemCmd>) {
    assert_eq!(cmd.response(), resp);
}

#[test]
fn write_takes_its_size_from_the_data() {
    let pkt = Packet::write(1, 0x40, vec![1, 2, 3], 5);
    assert_eq!(pkt.size, 3);
    assert!(pkt.is_write());
    assert!(!pkt.is_response());
    assert_eq!(pkt.issued_at, 5);
}

#[test]
fn write_response_keeps_payload() {
    let mut pkt = Packet::write_u64(9, 0x80, 0xDEAD_BEEF, 0);
    pkt.make_response(100);
    assert_eq!(pkt.cmd, MemCmd::WriteResp);
    assert_eq!(pkt.get_u64(), Some(0xDEAD_BEEF));
    assert_eq!(pkt.range().base, 0x80);
}

#[test]
fn short_payload_has_no_word() {
    let pkt = Packet::write(0, 0, vec![1, 2], 0);
    assert_eq!(pkt.get_u64(), None);
}
