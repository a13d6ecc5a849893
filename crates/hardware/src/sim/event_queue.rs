//! Deterministic discrete-event queue.
//!
//! Events are delivered in non-decreasing tick order. Events scheduled for the
//! same tick are delivered in the order they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::common::Tick;

struct Scheduled<E> {
    when: Tick,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.when == other.when && self.seq == other.seq
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    // Reversed so the max-heap pops the earliest (tick, seq) first.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.when, other.seq).cmp(&(self.when, self.seq))
    }
}

/// Min-heap of events keyed on `(tick, insertion order)`.
pub struct EventQueue<E> {
    heap: BinaryHeap<Scheduled<E>>,
    seq: u64,
    now: Tick,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventQueue<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("now", &self.now)
            .field("pending", &self.heap.len())
            .finish()
    }
}

impl<E> EventQueue<E> {
    /// Creates an empty queue at tick 0.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            seq: 0,
            now: 0,
        }
    }

    /// Tick of the most recently delivered event.
    pub const fn now(&self) -> Tick {
        self.now
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if no events are pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Tick of the next pending event.
    pub fn peek_tick(&self) -> Option<Tick> {
        self.heap.peek().map(|s| s.when)
    }

    /// Schedules `event` at `when`; ticks in the past are clamped to now.
    pub fn schedule(&mut self, when: Tick, event: E) {
        let when = if when < self.now {
            tracing::warn!(when, now = self.now, "event scheduled in the past");
            self.now
        } else {
            when
        };
        self.heap.push(Scheduled {
            when,
            seq: self.seq,
            event,
        });
        self.seq += 1;
    }

    /// Removes the next event and advances time to its tick.
    pub fn pop(&mut self) -> Option<(Tick, E)> {
        let s = self.heap.pop()?;
        self.now = s.when;
        Some((s.when, s.event))
    }

    /// Advances time to `tick` without delivering anything; never moves backwards.
    pub fn advance_to(&mut self, tick: Tick) {
        self.now = self.now.max(tick);
    }
}
