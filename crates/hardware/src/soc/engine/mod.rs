//! The Cohort memory-timing engine.
//!
//! [`CohortEngine`] sits on a split request/response memory protocol. Every
//! accepted request is shaped by a fixed-plus-jittered latency and a combined
//! read+write bandwidth ceiling before its response is issued. The engine:
//! 1. **Admission:** Accepts or hands back requests, owing exactly one retry per refusal streak.
//! 2. **Shaping:** Computes each completion tick from the latency model and the bandwidth regulator.
//! 3. **Ordering:** Keeps completions to the same address in admission order.
//! 4. **Response queue:** Buffers refused responses and resends them in order.
//! 5. **Pass-through:** Re-issues shaped requests downstream when configured to do so.
//! 6. **Cohort queues:** Polls an in-memory producer/consumer queue pair.
//!
//! The engine owns no scheduler; every side effect goes through a [`Host`].

/// Cohort producer/consumer queue poller.
pub mod queue;

/// Latency sampling and bandwidth regulation.
pub mod regulator;

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use self::queue::{CohortPoller, WordMemory};
use self::regulator::{BandwidthRegulator, LatencyModel};
use crate::common::{AddrRange, ConfigError, DeviceError, Tick};
use crate::config::{EngineConfig, EngineMode};
use crate::soc::memory::buffer::BackingStore;
use crate::soc::packet::{MemCmd, Packet};
use crate::soc::port::{Admission, EngineEvent, Host};
use crate::soc::traits::{Clocked, RequestIssuer, RequestReceiver};
use crate::stats::EngineStats;

/// Where an admitted access is serviced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route {
    /// Against the engine's own queue region.
    Local,
    /// Re-issued on the request port.
    Forward,
}

/// Progress of an admitted access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    /// Waiting for its completion tick.
    Shaping,
    /// Held behind an earlier forwarded access to the same address.
    Parked,
    /// Refused by downstream, waiting for `recv_req_retry`.
    Blocked,
    /// Owned by downstream.
    Downstream,
}

/// Why a request was handed back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Refusal {
    RetryOwed,
    Outstanding,
    ResponseStalled,
    Bandwidth,
}

#[derive(Debug)]
struct InFlight {
    /// The packet while the engine holds it; `None` while downstream has it.
    pkt: Option<Packet>,
    /// Requester-assigned id, restored on the response.
    id: u64,
    addr: u64,
    route: Route,
    stage: Stage,
    /// Issued by the engine itself; its response is not returned upstream.
    internal: bool,
}

/// The memory-timing device.
pub struct CohortEngine {
    name: String,
    mode: EngineMode,
    region: AddrRange,
    owns_region: bool,
    forward_range: Option<AddrRange>,
    max_outstanding: usize,
    max_bandwidth_delay: Option<Tick>,

    latency: LatencyModel,
    regulator: BandwidthRegulator,
    store: BackingStore,
    poller: Option<CohortPoller>,

    next_slot: u64,
    /// Admitted accesses by slot; slots grow in admission order.
    in_flight: BTreeMap<u64, InFlight>,
    /// Latest completion tick per address, with the slot that holds it.
    last_ready: HashMap<u64, (Tick, u64)>,
    /// Addresses with a forwarded access not yet returned.
    addr_busy: HashSet<u64>,
    /// Forwarded accesses waiting behind an earlier one to the same address.
    parked: HashMap<u64, VecDeque<u64>>,
    /// Forwarded accesses refused by downstream, in send order.
    blocked: VecDeque<u64>,

    resp_queue: VecDeque<Packet>,
    resp_stalled: bool,
    retry_req: bool,
    release_scheduled: bool,
    outstanding: usize,
    draining: bool,
    /// Whether the latest poll moved an entry; `None` before the first poll.
    poll_found_work: Option<bool>,

    stats: EngineStats,
}

impl std::fmt::Debug for CohortEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CohortEngine")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("region", &self.region)
            .field("outstanding", &self.outstanding)
            .field("in_flight", &self.in_flight.len())
            .field("resp_queue", &self.resp_queue.len())
            .field("resp_stalled", &self.resp_stalled)
            .field("retry_req", &self.retry_req)
            .finish_non_exhaustive()
    }
}

impl CohortEngine {
    /// Builds an engine from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] reported by [`EngineConfig::validate`], or
    /// [`ConfigError::InvalidValue`] if the queue region cannot be mapped on this host.
    pub fn new(name: impl Into<String>, config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let region = config.queue_range().ok_or(ConfigError::MissingQueueBase)?;
        let len = usize::try_from(region.size).map_err(|_| ConfigError::InvalidValue {
            kind: "queue_size",
            value: region.size.to_string(),
            reason: "does not fit in the host address space".to_string(),
        })?;
        let poller = config
            .cohort
            .enabled
            .then(|| CohortPoller::new(&config.cohort, region.base));

        Ok(Self {
            name: name.into(),
            mode: config.mode,
            region,
            owns_region: config.owns_queue_region(),
            forward_range: config.forward_range,
            max_outstanding: config.max_outstanding,
            max_bandwidth_delay: config.max_bandwidth_delay,
            latency: LatencyModel::new(config.latency, config.latency_var, config.seed),
            regulator: BandwidthRegulator::new(config.bandwidth),
            store: BackingStore::new(len),
            poller,
            next_slot: 0,
            in_flight: BTreeMap::new(),
            last_ready: HashMap::new(),
            addr_busy: HashSet::new(),
            parked: HashMap::new(),
            blocked: VecDeque::new(),
            resp_queue: VecDeque::new(),
            resp_stalled: false,
            retry_req: false,
            release_scheduled: false,
            outstanding: 0,
            draining: false,
            poll_found_work: None,
            stats: EngineStats::default(),
        })
    }

    /// Device name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Selected variant.
    pub const fn mode(&self) -> EngineMode {
        self.mode
    }

    /// The queue region.
    pub const fn queue_region(&self) -> AddrRange {
        self.region
    }

    /// Collected statistics.
    pub const fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Accepted requests whose response has not yet been delivered.
    pub const fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// `true` while a response is waiting for `recv_resp_retry`.
    pub const fn is_stalled(&self) -> bool {
        self.resp_stalled
    }

    /// `true` if the engine owes the requester a retry signal.
    pub const fn retry_owed(&self) -> bool {
        self.retry_req
    }

    /// `true` once every admitted access has been answered.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty() && self.resp_queue.is_empty()
    }

    /// `true` if polling is disabled or the latest poll found the in queue empty.
    pub const fn queues_idle(&self) -> bool {
        self.poller.is_none() || matches!(self.poll_found_work, Some(false))
    }

    /// Schedules the first cohort queue poll, if polling is enabled.
    pub fn startup(&mut self, now: Tick, host: &mut dyn Host) {
        if let Some(poller) = &self.poller {
            host.schedule(now.saturating_add(poller.startup_delay), EngineEvent::Poll);
        }
    }

    /// Stops polling; in-flight accesses still complete.
    pub fn drain(&mut self) {
        self.draining = true;
    }

    /// Writes `data` directly into the queue region; returns `false` if it does not fit.
    pub fn load(&mut self, addr: u64, data: &[u8]) -> bool {
        if !self.region.contains_access(addr, data.len() as u64) {
            return false;
        }
        self.store.write(addr - self.region.base, data)
    }

    /// Reads a little-endian word from the queue region; `None` if outside it.
    pub fn peek_u64(&self, addr: u64) -> Option<u64> {
        let offset = self.region.offset_of(addr)?;
        if !self.region.contains_access(addr, 8) {
            return None;
        }
        let mut buf = [0u8; 8];
        self.store.read(offset, &mut buf).then(|| u64::from_le_bytes(buf))
    }

    /// Samples the latency for one access and commits its bytes to the
    /// bandwidth regulator, returning the total delay from `now`.
    pub fn compute_delay(&mut self, size: u64, now: Tick) -> Tick {
        let latency = self.latency.sample();
        let bw_delay = self.regulator.reserve(size, now);
        self.stats.bandwidth_delay += bw_delay;
        latency.saturating_add(bw_delay)
    }

    /// Checks where an access would be serviced without admitting it.
    ///
    /// Returns `true` if it would be forwarded downstream.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Misrouted`] for accesses the engine can never service.
    pub fn forwards(&self, addr: u64, size: u64, cmd: MemCmd) -> Result<bool, DeviceError> {
        match self.route(addr, size) {
            Some(route) => Ok(route == Route::Forward),
            None => Err(self.misrouted(addr, size, cmd)),
        }
    }

    fn route(&self, addr: u64, size: u64) -> Option<Route> {
        let access = AddrRange::new(addr, size.max(1));
        if self.owns_region && self.region.overlaps(&access) {
            return self
                .region
                .contains_access(addr, size)
                .then_some(Route::Local);
        }
        match self.mode {
            EngineMode::Terminal => None,
            EngineMode::PassThrough => self
                .forward_range
                .is_none_or(|r| r.contains_access(addr, size))
                .then_some(Route::Forward),
        }
    }

    fn misrouted(&self, addr: u64, size: u64, cmd: MemCmd) -> DeviceError {
        DeviceError::Misrouted {
            device: self.name.clone(),
            addr,
            size,
            cmd,
        }
    }

    fn bandwidth_busy(&self, now: Tick) -> bool {
        self.max_bandwidth_delay
            .is_some_and(|max| self.regulator.projected_delay(now) > max)
    }

    fn refusal(&self, now: Tick) -> Option<Refusal> {
        if self.retry_req {
            Some(Refusal::RetryOwed)
        } else if self.outstanding >= self.max_outstanding {
            Some(Refusal::Outstanding)
        } else if self.resp_stalled {
            Some(Refusal::ResponseStalled)
        } else if self.bandwidth_busy(now) {
            Some(Refusal::Bandwidth)
        } else {
            None
        }
    }

    fn schedule_release(&mut self, host: &mut dyn Host) {
        let Some(max) = self.max_bandwidth_delay else {
            return;
        };
        if !self.release_scheduled {
            self.release_scheduled = true;
            host.schedule(self.regulator.free_at().saturating_sub(max), EngineEvent::Release);
        }
    }

    /// Sends the owed retry once every admission condition holds again.
    fn maybe_retry(&mut self, now: Tick, host: &mut dyn Host) {
        if !self.retry_req || self.resp_stalled || self.outstanding >= self.max_outstanding {
            return;
        }
        if self.bandwidth_busy(now) {
            self.schedule_release(host);
            return;
        }
        self.retry_req = false;
        self.stats.retries_sent += 1;
        tracing::debug!(device = %self.name, now, "sending retry to requester");
        host.send_retry_req();
    }

    fn access_local(&mut self, pkt: &mut Packet) {
        let offset = pkt.addr - self.region.base;
        let ok = if pkt.is_write() {
            self.store.write(offset, &pkt.data)
        } else {
            pkt.data.resize(pkt.size as usize, 0);
            self.store.read(offset, &mut pkt.data)
        };
        if !ok {
            tracing::warn!(device = %self.name, addr = pkt.addr, "queue region access out of bounds");
        }
    }

    fn respond(&mut self, mut pkt: Packet, now: Tick, host: &mut dyn Host) {
        pkt.make_response(now);
        self.resp_queue.push_back(pkt);
        if !self.resp_stalled {
            self.send_responses(now, host);
        }
    }

    fn send_responses(&mut self, now: Tick, host: &mut dyn Host) {
        while let Some(pkt) = self.resp_queue.pop_front() {
            let (id, issued_at) = (pkt.id, pkt.issued_at);
            match host.send_timing_resp(pkt) {
                Ok(()) => {
                    self.outstanding = self.outstanding.saturating_sub(1);
                    self.stats.record_response(issued_at, now);
                    tracing::debug!(device = %self.name, id, now, "response sent");
                }
                Err(pkt) => {
                    self.resp_queue.push_front(pkt);
                    self.resp_stalled = true;
                    self.stats.resp_stalls += 1;
                    tracing::warn!(
                        device = %self.name,
                        id,
                        queued = self.resp_queue.len(),
                        "requester refused response, stalling"
                    );
                    break;
                }
            }
        }
        self.maybe_retry(now, host);
    }

    fn on_ready(&mut self, slot: u64, now: Tick, host: &mut dyn Host) {
        let Some((addr, route)) = self.in_flight.get(&slot).map(|e| (e.addr, e.route)) else {
            tracing::warn!(device = %self.name, slot, "completion for unknown slot");
            return;
        };
        if self.last_ready.get(&addr).is_some_and(|&(_, s)| s == slot) {
            let _ = self.last_ready.remove(&addr);
        }

        match route {
            Route::Local => {
                let pkt = self.in_flight.remove(&slot).and_then(|e| e.pkt);
                if let Some(pkt) = pkt {
                    self.respond(pkt, now, host);
                }
            }
            Route::Forward if self.addr_busy.contains(&addr) => {
                if let Some(entry) = self.in_flight.get_mut(&slot) {
                    entry.stage = Stage::Parked;
                }
                self.parked.entry(addr).or_default().push_back(slot);
                self.stats.parked += 1;
                tracing::debug!(device = %self.name, slot, addr, "parked behind same-address access");
            }
            Route::Forward => {
                let _ = self.addr_busy.insert(addr);
                self.forward(slot, host);
            }
        }
    }

    /// Sends `slot` downstream behind anything already blocked.
    fn forward(&mut self, slot: u64, host: &mut dyn Host) {
        if !self.blocked.is_empty() {
            if let Some(entry) = self.in_flight.get_mut(&slot) {
                entry.stage = Stage::Blocked;
            }
            self.blocked.push_back(slot);
            return;
        }
        if !self.try_send_downstream(slot, host) {
            self.blocked.push_back(slot);
        }
    }

    /// Offers `slot` to downstream; returns `false` if it was refused.
    fn try_send_downstream(&mut self, slot: u64, host: &mut dyn Host) -> bool {
        let Some(entry) = self.in_flight.get_mut(&slot) else {
            return true;
        };
        let Some(mut pkt) = entry.pkt.take() else {
            return true;
        };
        pkt.id = slot;
        match host.send_timing_req(pkt) {
            Ok(()) => {
                entry.stage = Stage::Downstream;
                self.stats.forwarded += 1;
                tracing::debug!(device = %self.name, slot, addr = entry.addr, "forwarded downstream");
                true
            }
            Err(mut pkt) => {
                pkt.id = entry.id;
                entry.pkt = Some(pkt);
                entry.stage = Stage::Blocked;
                self.stats.downstream_refusals += 1;
                false
            }
        }
    }

    /// Issues a queue update as a timed write toward downstream memory.
    ///
    /// The write shares the bandwidth budget and is ordered behind every held
    /// access to the same address.
    fn issue_internal(&mut self, pkt: Packet, now: Tick, host: &mut dyn Host) {
        let slot = self.next_slot;
        self.next_slot += 1;
        let mut ready = now.saturating_add(self.regulator.reserve(pkt.size, now));
        if let Some(&(prev, _)) = self.last_ready.get(&pkt.addr) {
            ready = ready.max(prev);
        }
        let _ = self.last_ready.insert(pkt.addr, (ready, slot));
        self.stats.queue_writes += 1;
        tracing::debug!(device = %self.name, slot, addr = pkt.addr, ready, "queue update issued");

        let _ = self.in_flight.insert(
            slot,
            InFlight {
                id: pkt.id,
                addr: pkt.addr,
                pkt: Some(pkt),
                route: Route::Forward,
                stage: Stage::Shaping,
                internal: true,
            },
        );
        host.schedule(ready, EngineEvent::Respond { slot });
    }
}

impl RequestReceiver for CohortEngine {
    fn recv_timing_req(
        &mut self,
        mut pkt: Packet,
        now: Tick,
        host: &mut dyn Host,
    ) -> Result<Admission, DeviceError> {
        if pkt.is_response() {
            return Err(DeviceError::UnsupportedCommand {
                device: self.name.clone(),
                addr: pkt.addr,
                cmd: pkt.cmd,
            });
        }
        let Some(route) = self.route(pkt.addr, pkt.size) else {
            return Err(self.misrouted(pkt.addr, pkt.size, pkt.cmd));
        };

        if let Some(refusal) = self.refusal(now) {
            match refusal {
                Refusal::RetryOwed => self.stats.rejected_retry_pending += 1,
                Refusal::Outstanding => self.stats.rejected_outstanding += 1,
                Refusal::ResponseStalled => self.stats.rejected_resp_stall += 1,
                Refusal::Bandwidth => {
                    self.stats.rejected_bandwidth += 1;
                    self.schedule_release(host);
                }
            }
            self.retry_req = true;
            tracing::debug!(device = %self.name, id = pkt.id, ?refusal, now, "request refused");
            return Ok(Admission::Retry(pkt));
        }

        let _ = self.stats.first_admit.get_or_insert(now);
        if pkt.is_write() {
            self.stats.writes += 1;
            self.stats.bytes_written += pkt.size;
        } else {
            self.stats.reads += 1;
            self.stats.bytes_read += pkt.size;
        }

        let slot = self.next_slot;
        self.next_slot += 1;
        let mut ready = now.saturating_add(self.compute_delay(pkt.size, now));
        if let Some(&(prev, _)) = self.last_ready.get(&pkt.addr) {
            ready = ready.max(prev);
        }
        let _ = self.last_ready.insert(pkt.addr, (ready, slot));

        if route == Route::Local {
            self.access_local(&mut pkt);
        }
        tracing::debug!(
            device = %self.name,
            id = pkt.id,
            cmd = %pkt.cmd,
            addr = pkt.addr,
            size = pkt.size,
            now,
            ready,
            "request admitted"
        );

        let _ = self.in_flight.insert(
            slot,
            InFlight {
                id: pkt.id,
                addr: pkt.addr,
                pkt: Some(pkt),
                route,
                stage: Stage::Shaping,
                internal: false,
            },
        );
        self.outstanding += 1;
        host.schedule(ready, EngineEvent::Respond { slot });
        Ok(Admission::Accepted)
    }

    fn recv_resp_retry(&mut self, now: Tick, host: &mut dyn Host) -> Result<(), DeviceError> {
        self.resp_stalled = false;
        self.send_responses(now, host);
        Ok(())
    }

    fn recv_functional(
        &mut self,
        pkt: &mut Packet,
        host: &mut dyn Host,
    ) -> Result<(), DeviceError> {
        if pkt.is_response() {
            return Err(DeviceError::UnsupportedCommand {
                device: self.name.clone(),
                addr: pkt.addr,
                cmd: pkt.cmd,
            });
        }
        match self.route(pkt.addr, pkt.size) {
            Some(Route::Local) => self.access_local(pkt),
            Some(Route::Forward) => {
                host.send_functional(pkt)?;
                // Timed writes the engine still holds are newer than what downstream has.
                let held = self
                    .in_flight
                    .values_mut()
                    .filter_map(|e| e.pkt.as_mut())
                    .filter(|p| p.is_write());
                if pkt.is_write() {
                    for pending in held {
                        let _ = pending.overlay_from(pkt);
                    }
                } else {
                    for pending in held {
                        let _ = pkt.overlay_from(pending);
                    }
                }
            }
            None => return Err(self.misrouted(pkt.addr, pkt.size, pkt.cmd)),
        }
        self.stats.functional += 1;
        Ok(())
    }

    fn addr_ranges(&self) -> Vec<AddrRange> {
        let mut ranges = Vec::new();
        if self.owns_region {
            ranges.push(self.region);
        }
        if self.mode == EngineMode::PassThrough {
            ranges.extend(self.forward_range);
        }
        ranges
    }
}

impl RequestIssuer for CohortEngine {
    fn recv_timing_resp(
        &mut self,
        mut pkt: Packet,
        now: Tick,
        host: &mut dyn Host,
    ) -> Result<(), DeviceError> {
        let slot = pkt.id;
        let forwarded = self
            .in_flight
            .get(&slot)
            .is_some_and(|e| e.stage == Stage::Downstream);
        let entry = match self.in_flight.remove(&slot) {
            Some(entry) if forwarded => entry,
            _ => {
                return Err(DeviceError::UnknownResponse {
                    device: self.name.clone(),
                    id: slot,
                });
            }
        };
        pkt.id = entry.id;

        let _ = self.addr_busy.remove(&entry.addr);
        let next = match self.parked.get_mut(&entry.addr) {
            Some(waiting) => {
                let next = waiting.pop_front();
                if waiting.is_empty() {
                    let _ = self.parked.remove(&entry.addr);
                }
                next
            }
            None => None,
        };
        if let Some(next) = next {
            let _ = self.addr_busy.insert(entry.addr);
            self.forward(next, host);
        }

        if entry.internal {
            tracing::debug!(device = %self.name, slot, addr = entry.addr, "queue update completed");
            return Ok(());
        }
        self.respond(pkt, now, host);
        Ok(())
    }

    fn recv_req_retry(&mut self, _now: Tick, host: &mut dyn Host) -> Result<(), DeviceError> {
        while let Some(slot) = self.blocked.pop_front() {
            if !self.try_send_downstream(slot, host) {
                self.blocked.push_front(slot);
                break;
            }
        }
        Ok(())
    }
}

impl Clocked for CohortEngine {
    fn process_event(
        &mut self,
        event: EngineEvent,
        now: Tick,
        host: &mut dyn Host,
    ) -> Result<(), DeviceError> {
        match event {
            EngineEvent::Respond { slot } => self.on_ready(slot, now, host),
            EngineEvent::Release => {
                self.release_scheduled = false;
                self.maybe_retry(now, host);
            }
            EngineEvent::Poll => {
                if self.draining {
                    return Ok(());
                }
                let Some(poller) = &self.poller else {
                    return Ok(());
                };
                let interval = poller.poll_interval;
                let mut mem = QueueMemory {
                    store: &mut self.store,
                    region: self.region,
                    owned: self.owns_region,
                    forward: self.mode == EngineMode::PassThrough,
                    device: &self.name,
                    held: &self.in_flight,
                    writes: Vec::new(),
                    host: &mut *host,
                };
                let processed = poller.poll(&mut mem)?;
                let writes = mem.writes;
                for mut pkt in writes {
                    pkt.issued_at = now;
                    self.issue_internal(pkt, now, host);
                }
                self.stats.polls += 1;
                if processed.is_some() {
                    self.stats.entries_processed += 1;
                }
                self.poll_found_work = Some(processed.is_some());
                host.schedule(now.saturating_add(interval), EngineEvent::Poll);
            }
        }
        Ok(())
    }
}

/// Word access used by the poller: the queue region if owned, downstream otherwise.
///
/// Downstream reads are functional and see every write the engine still holds.
/// Downstream writes are collected and issued as timed requests after the poll.
struct QueueMemory<'a> {
    store: &'a mut BackingStore,
    region: AddrRange,
    owned: bool,
    forward: bool,
    device: &'a str,
    held: &'a BTreeMap<u64, InFlight>,
    writes: Vec<Packet>,
    host: &'a mut dyn Host,
}

impl QueueMemory<'_> {
    fn local_offset(&self, addr: u64) -> Option<u64> {
        (self.owned && self.region.contains_access(addr, 8)).then(|| addr - self.region.base)
    }

    fn unreachable(&self, addr: u64, write: bool) -> DeviceError {
        DeviceError::Misrouted {
            device: self.device.to_string(),
            addr,
            size: 8,
            cmd: if write { MemCmd::WriteReq } else { MemCmd::ReadReq },
        }
    }
}

impl WordMemory for QueueMemory<'_> {
    fn read_word(&mut self, addr: u64) -> Result<u64, DeviceError> {
        if let Some(offset) = self.local_offset(addr) {
            let mut buf = [0u8; 8];
            let _ = self.store.read(offset, &mut buf);
            return Ok(u64::from_le_bytes(buf));
        }
        if !self.forward {
            return Err(self.unreachable(addr, false));
        }
        let mut pkt = Packet::read(0, addr, 8, 0);
        self.host.send_functional(&mut pkt)?;
        let held = self.held.values().filter_map(|e| e.pkt.as_ref());
        for pending in held.chain(&self.writes).filter(|p| p.is_write()) {
            let _ = pkt.overlay_from(pending);
        }
        pkt.get_u64().ok_or_else(|| self.unreachable(addr, false))
    }

    fn write_word(&mut self, addr: u64, value: u64) -> Result<(), DeviceError> {
        if let Some(offset) = self.local_offset(addr) {
            let _ = self.store.write(offset, &value.to_le_bytes());
            return Ok(());
        }
        if !self.forward {
            return Err(self.unreachable(addr, true));
        }
        self.writes.push(Packet::write_u64(0, addr, value, 0));
        Ok(())
    }
}
