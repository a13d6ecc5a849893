//! Trace-driven traffic source.
//!
//! The [`Requester`] replays a trace in program order on the engine's response
//! port. It provides:
//! 1. **Issue:** Entries go out no earlier than their `at` tick and never overtake each other.
//! 2. **Retry:** A refused request blocks the trace until the engine signals a retry.
//! 3. **Response slots:** Optional bounded buffering that refuses responses when full.
//! 4. **Completions:** A record of every response received.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Deserializer};

use crate::common::Tick;
use crate::common::time::serde_units;
use crate::config::RequesterConfig;
use crate::soc::packet::{MemCmd, Packet};

/// Access kind of a trace entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum TraceCmd {
    /// Read `size` bytes.
    #[serde(alias = "read", alias = "R")]
    Read,
    /// Write `data` (or `size` zero bytes).
    #[serde(alias = "write", alias = "W")]
    Write,
}

/// One request of a trace.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceEntry {
    /// Earliest tick at which the request may be issued.
    #[serde(default, deserialize_with = "serde_units::latency")]
    pub at: Tick,
    /// Read or write.
    pub cmd: TraceCmd,
    /// Start address, as an integer or a `"0x..."` string.
    #[serde(deserialize_with = "address")]
    pub addr: u64,
    /// Access size in bytes; ignored for writes that carry `data`.
    #[serde(default = "TraceEntry::default_size")]
    pub size: u64,
    /// Bytes to write.
    #[serde(default)]
    pub data: Vec<u8>,
}

impl TraceEntry {
    fn default_size() -> u64 {
        8
    }

    /// A read of `size` bytes at `addr`, issued no earlier than `at`.
    pub const fn read(at: Tick, addr: u64, size: u64) -> Self {
        Self {
            at,
            cmd: TraceCmd::Read,
            addr,
            size,
            data: Vec::new(),
        }
    }

    /// A write of `data` at `addr`, issued no earlier than `at`.
    pub fn write(at: Tick, addr: u64, data: Vec<u8>) -> Self {
        Self {
            at,
            cmd: TraceCmd::Write,
            addr,
            size: data.len() as u64,
            data,
        }
    }

    /// Bytes the request touches: the payload length for writes that carry data.
    pub fn access_size(&self) -> u64 {
        match self.cmd {
            TraceCmd::Write if !self.data.is_empty() => self.data.len() as u64,
            _ => self.size,
        }
    }

    /// Request command of the packet this entry becomes.
    pub const fn mem_cmd(&self) -> MemCmd {
        match self.cmd {
            TraceCmd::Read => MemCmd::ReadReq,
            TraceCmd::Write => MemCmd::WriteReq,
        }
    }

    fn to_packet(&self, id: u64, now: Tick) -> Packet {
        match self.cmd {
            TraceCmd::Read => Packet::read(id, self.addr, self.size, now),
            TraceCmd::Write if self.data.is_empty() => {
                Packet::write(id, self.addr, vec![0; self.size as usize], now)
            }
            TraceCmd::Write => Packet::write(id, self.addr, self.data.clone(), now),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAddr {
    Int(u64),
    Text(String),
}

fn address<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    match RawAddr::deserialize(d)? {
        RawAddr::Int(v) => Ok(v),
        RawAddr::Text(s) => {
            let t = s.trim().replace('_', "");
            let parsed = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => t.parse(),
            };
            parsed.map_err(|e| serde::de::Error::custom(format!("invalid address `{s}`: {e}")))
        }
    }
}

/// A response received by the requester.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// Requester-assigned id, equal to the trace index.
    pub id: u64,
    /// Response command.
    pub cmd: MemCmd,
    /// Start address.
    pub addr: u64,
    /// Access size in bytes.
    pub size: u64,
    /// Tick the request was issued.
    pub issued_at: Tick,
    /// Tick the engine accepted the request.
    pub admitted_at: Tick,
    /// Tick the response was received.
    pub completed_at: Tick,
    /// Response payload (read data).
    pub data: Vec<u8>,
}

impl Completion {
    /// Issue-to-response latency.
    pub const fn latency(&self) -> Tick {
        self.completed_at.saturating_sub(self.issued_at)
    }

    /// Admission-to-response latency.
    pub const fn service_time(&self) -> Tick {
        self.completed_at.saturating_sub(self.admitted_at)
    }
}

/// Trace-replaying requester.
#[derive(Debug)]
pub struct Requester {
    trace: VecDeque<TraceEntry>,
    next_id: u64,
    /// Refused request waiting for a retry signal.
    blocked: Option<Packet>,
    waiting_retry: bool,
    /// Admission tick of every accepted request still awaiting its response.
    admitted: HashMap<u64, Tick>,
    response_slots: Option<usize>,
    busy_slots: usize,
    consume_latency: Tick,
    resp_retry_owed: bool,
    retries: u64,
    completions: Vec<Completion>,
}

impl Requester {
    /// Creates a requester replaying `trace`.
    pub fn new(trace: Vec<TraceEntry>, config: &RequesterConfig) -> Self {
        Self {
            trace: trace.into(),
            next_id: 0,
            blocked: None,
            waiting_retry: false,
            admitted: HashMap::new(),
            response_slots: config.response_slots,
            busy_slots: 0,
            consume_latency: config.consume_latency,
            resp_retry_owed: false,
            retries: 0,
            completions: Vec::new(),
        }
    }

    /// Tick at which the next request may go out, or `None` if blocked or finished.
    pub fn next_issue_time(&self, now: Tick) -> Option<Tick> {
        if self.waiting_retry {
            return None;
        }
        if self.blocked.is_some() {
            return Some(now);
        }
        self.trace.front().map(|e| e.at.max(now))
    }

    /// The trace entry `take_next` would turn into a packet, if no refused one is held.
    pub fn next_entry(&self) -> Option<&TraceEntry> {
        if self.blocked.is_some() {
            return None;
        }
        self.trace.front()
    }

    /// Takes the next request to offer: the refused one first, then the trace.
    pub fn take_next(&mut self, now: Tick) -> Option<Packet> {
        if let Some(pkt) = self.blocked.take() {
            return Some(pkt);
        }
        let entry = self.trace.pop_front()?;
        let pkt = entry.to_packet(self.next_id, now);
        self.next_id += 1;
        Some(pkt)
    }

    /// Records that the engine accepted request `id` at `now`.
    pub fn accepted(&mut self, id: u64, now: Tick) {
        let _ = self.admitted.insert(id, now);
    }

    /// Holds a refused request until the engine signals a retry.
    pub fn refused(&mut self, pkt: Packet) {
        tracing::debug!(id = pkt.id, "request refused, waiting for retry");
        self.blocked = Some(pkt);
        self.waiting_retry = true;
    }

    /// Handles the engine's retry signal; returns `true` if issue should resume.
    pub fn retry(&mut self) -> bool {
        self.retries += 1;
        std::mem::take(&mut self.waiting_retry)
    }

    /// Offers a response; hands it back if every response slot is taken.
    pub fn offer_response(&mut self, pkt: Packet, now: Tick) -> Result<(), Packet> {
        if let Some(slots) = self.response_slots {
            if self.busy_slots >= slots {
                self.resp_retry_owed = true;
                return Err(pkt);
            }
            self.busy_slots += 1;
        }
        let admitted_at = self.admitted.remove(&pkt.id).unwrap_or(pkt.issued_at);
        self.completions.push(Completion {
            id: pkt.id,
            cmd: pkt.cmd,
            addr: pkt.addr,
            size: pkt.size,
            issued_at: pkt.issued_at,
            admitted_at,
            completed_at: now,
            data: pkt.data,
        });
        Ok(())
    }

    /// `true` if responses occupy a slot that is freed after `consume_latency`.
    pub const fn has_bounded_slots(&self) -> bool {
        self.response_slots.is_some()
    }

    /// Ticks a response occupies its slot.
    pub const fn consume_latency(&self) -> Tick {
        self.consume_latency
    }

    /// Frees one response slot; returns `true` if a response was refused meanwhile.
    pub fn free_slot(&mut self) -> bool {
        self.busy_slots = self.busy_slots.saturating_sub(1);
        std::mem::take(&mut self.resp_retry_owed)
    }

    /// `true` once the whole trace was issued and answered.
    pub fn is_done(&self) -> bool {
        self.trace.is_empty() && self.blocked.is_none() && self.admitted.is_empty()
    }

    /// Retry signals received.
    pub const fn retries(&self) -> u64 {
        self.retries
    }

    /// Responses received so far, in arrival order.
    pub fn completions(&self) -> &[Completion] {
        &self.completions
    }
}
