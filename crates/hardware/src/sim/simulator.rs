//! Simulator: owns the system, the requester and the event queue side by side.
//!
//! Every device entry point receives a [`Kernel`] that borrows the event queue,
//! the requester and the downstream memory for the duration of one event, so the
//! engine can issue effects without holding references to its peers.

use super::event_queue::EventQueue;
use super::traffic::{Requester, TraceEntry};
use crate::common::{ConfigError, DeviceError, Tick};
use crate::config::Config;
use crate::soc::System;
use crate::soc::engine::CohortEngine;
use crate::soc::memory::{Offer, TimedMemory};
use crate::soc::packet::Packet;
use crate::soc::port::{Admission, EngineEvent, Host};
use crate::soc::traits::{Clocked, RequestIssuer, RequestReceiver};
use crate::stats::EngineStats;

/// Events delivered by the reference host.
#[derive(Debug)]
pub enum SimEvent {
    /// An event the engine scheduled on itself.
    Engine(EngineEvent),
    /// The requester may issue its next request.
    Issue,
    /// Downstream memory finished an access.
    DownstreamResponse(Packet),
    /// The requester consumed a response and freed a slot.
    RequesterFree,
}

/// Host implementation handed to the engine for one event.
pub struct Kernel<'a> {
    /// Pending events.
    pub queue: &'a mut EventQueue<SimEvent>,
    /// Traffic source on the response port.
    pub requester: &'a mut Requester,
    /// Memory on the request port, if any.
    pub downstream: Option<&'a mut TimedMemory>,
    /// Tick of the event being handled.
    pub now: Tick,
    /// First fatal error raised inside a host callback.
    pub fatal: Option<DeviceError>,
}

impl Kernel<'_> {
    fn no_downstream(pkt: &Packet) -> DeviceError {
        DeviceError::Misrouted {
            device: "mem_side".to_string(),
            addr: pkt.addr,
            size: pkt.size,
            cmd: pkt.cmd,
        }
    }
}

impl Host for Kernel<'_> {
    fn schedule(&mut self, when: Tick, event: EngineEvent) {
        self.queue.schedule(when, SimEvent::Engine(event));
    }

    fn send_timing_resp(&mut self, pkt: Packet) -> Result<(), Packet> {
        self.requester.offer_response(pkt, self.now)?;
        if self.requester.has_bounded_slots() {
            let free_at = self.now.saturating_add(self.requester.consume_latency());
            self.queue.schedule(free_at, SimEvent::RequesterFree);
        }
        Ok(())
    }

    fn send_timing_req(&mut self, pkt: Packet) -> Result<(), Packet> {
        let Some(mem) = self.downstream.as_deref_mut() else {
            let _ = self.fatal.get_or_insert(Self::no_downstream(&pkt));
            return Ok(());
        };
        match mem.offer(pkt, self.now) {
            Ok(Offer::Accepted { response }) => {
                let at = response.ready_at.unwrap_or(self.now);
                self.queue.schedule(at, SimEvent::DownstreamResponse(response));
                Ok(())
            }
            Ok(Offer::Busy(pkt)) => Err(pkt),
            Err(e) => {
                let _ = self.fatal.get_or_insert(e);
                Ok(())
            }
        }
    }

    fn send_retry_req(&mut self) {
        if self.requester.retry() {
            self.queue.schedule(self.now, SimEvent::Issue);
        }
    }

    fn send_functional(&mut self, pkt: &mut Packet) -> Result<(), DeviceError> {
        match self.downstream.as_deref_mut() {
            Some(mem) => mem.functional(pkt),
            None => Err(Self::no_downstream(pkt)),
        }
    }
}

/// Rejects a trace entry no device can service, before its payload is built.
fn check_issue(
    engine: &CohortEngine,
    downstream: Option<&TimedMemory>,
    entry: &TraceEntry,
) -> Result<(), DeviceError> {
    let (addr, size, cmd) = (entry.addr, entry.access_size(), entry.mem_cmd());
    if !engine.forwards(addr, size, cmd)? {
        return Ok(());
    }
    let device = match downstream {
        Some(mem) if mem.is_routable(addr, size) => return Ok(()),
        Some(_) => "bus",
        None => "mem_side",
    };
    Err(DeviceError::Misrouted {
        device: device.to_string(),
        addr,
        size,
        cmd,
    })
}

/// Top-level simulator: system, requester and event queue.
#[derive(Debug)]
pub struct Simulator {
    /// Engine and downstream memory.
    pub system: System,
    /// Trace-driven traffic source.
    pub requester: Requester,
    queue: EventQueue<SimEvent>,
}

impl Simulator {
    /// Builds the system described by `config` and prepares `trace` for replay.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the system cannot be built.
    pub fn new(config: &Config, trace: Vec<TraceEntry>) -> Result<Self, ConfigError> {
        let system = System::new(config)?;
        let requester = Requester::new(trace, &config.requester);
        Ok(Self::with_system(system, requester))
    }

    /// Wraps an already built system and schedules start-up.
    pub fn with_system(system: System, requester: Requester) -> Self {
        let mut sim = Self {
            system,
            requester,
            queue: EventQueue::new(),
        };
        let first = sim.requester.next_issue_time(0);
        let mut host = Kernel {
            queue: &mut sim.queue,
            requester: &mut sim.requester,
            downstream: sim.system.downstream.as_mut(),
            now: 0,
            fatal: None,
        };
        sim.system.engine.startup(0, &mut host);
        if let Some(at) = first {
            sim.queue.schedule(at, SimEvent::Issue);
        }
        sim
    }

    /// Current simulated tick.
    pub const fn now(&self) -> Tick {
        self.queue.now()
    }

    /// Engine statistics.
    pub const fn stats(&self) -> &EngineStats {
        self.system.engine.stats()
    }

    /// `true` once the trace is fully answered and the engine holds nothing.
    pub fn traffic_done(&self) -> bool {
        self.requester.is_done() && self.system.engine.is_idle()
    }

    /// Delivers the next event; returns `false` if none was pending.
    ///
    /// # Errors
    ///
    /// Returns the first [`DeviceError`] raised while handling the event.
    pub fn step(&mut self) -> Result<bool, DeviceError> {
        let Some((now, event)) = self.queue.pop() else {
            return Ok(false);
        };
        let engine = &mut self.system.engine;
        let mut host = Kernel {
            queue: &mut self.queue,
            requester: &mut self.requester,
            downstream: self.system.downstream.as_mut(),
            now,
            fatal: None,
        };

        match event {
            SimEvent::Engine(ev) => engine.process_event(ev, now, &mut host)?,
            SimEvent::Issue => {
                while let Some(at) = host.requester.next_issue_time(now) {
                    if at > now {
                        host.queue.schedule(at, SimEvent::Issue);
                        break;
                    }
                    if let Some(entry) = host.requester.next_entry() {
                        check_issue(engine, host.downstream.as_deref(), entry)?;
                    }
                    let Some(pkt) = host.requester.take_next(now) else {
                        break;
                    };
                    let id = pkt.id;
                    match engine.recv_timing_req(pkt, now, &mut host)? {
                        Admission::Accepted => host.requester.accepted(id, now),
                        Admission::Retry(pkt) => {
                            host.requester.refused(pkt);
                            break;
                        }
                    }
                }
            }
            SimEvent::DownstreamResponse(pkt) => {
                let retry = host.downstream.as_deref_mut().is_some_and(TimedMemory::complete);
                engine.recv_timing_resp(pkt, now, &mut host)?;
                if retry {
                    engine.recv_req_retry(now, &mut host)?;
                }
            }
            SimEvent::RequesterFree => {
                if host.requester.free_slot() {
                    engine.recv_resp_retry(now, &mut host)?;
                }
            }
        }

        match host.fatal.take() {
            Some(e) => Err(e),
            None => Ok(true),
        }
    }

    /// Replays the trace to completion, then drains.
    ///
    /// With queue polling enabled the run also continues until a poll finds
    /// the in queue empty, so entries placed before start-up are processed.
    ///
    /// Returns the tick of the last delivered event.
    ///
    /// # Errors
    ///
    /// Returns the first [`DeviceError`] raised during the run.
    pub fn run(&mut self) -> Result<Tick, DeviceError> {
        while !(self.traffic_done() && self.system.engine.queues_idle()) {
            if !self.step()? {
                break;
            }
        }
        self.drain()
    }

    /// Delivers every event scheduled at or before `limit`, then advances time to `limit`.
    ///
    /// # Errors
    ///
    /// Returns the first [`DeviceError`] raised during the run.
    pub fn run_until(&mut self, limit: Tick) -> Result<(), DeviceError> {
        while self.queue.peek_tick().is_some_and(|t| t <= limit) {
            let _ = self.step()?;
        }
        self.queue.advance_to(limit);
        Ok(())
    }

    /// Stops queue polling and lets in-flight work finish.
    ///
    /// Returns the tick of the last delivered event.
    ///
    /// # Errors
    ///
    /// Returns the first [`DeviceError`] raised while draining.
    pub fn drain(&mut self) -> Result<Tick, DeviceError> {
        self.system.engine.drain();
        while self.step()? {}
        tracing::info!(
            now = self.now(),
            responses = self.stats().responses,
            "simulation drained"
        );
        Ok(self.now())
    }

    /// Functional access through the engine, as a debugger or loader would do.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] if the address is neither owned nor forwardable.
    pub fn functional(&mut self, pkt: &mut Packet) -> Result<(), DeviceError> {
        let now = self.queue.now();
        let mut host = Kernel {
            queue: &mut self.queue,
            requester: &mut self.requester,
            downstream: self.system.downstream.as_mut(),
            now,
            fatal: None,
        };
        self.system.engine.recv_functional(pkt, &mut host)
    }
}
