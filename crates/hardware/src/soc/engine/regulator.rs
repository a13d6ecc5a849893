//! Latency sampling and bandwidth regulation.
//!
//! The latency model draws `base + U(0, var)` from a xorshift generator seeded
//! from the configuration, so identical runs produce identical schedules.
//!
//! The bandwidth regulator tracks the bytes committed since the start of the
//! current busy period. A new request waits until the channel has drained every
//! earlier byte; once the channel goes idle the busy period restarts at the next
//! request.

use crate::common::{TICKS_PER_SEC, Tick};

/// Fixed-plus-uniform latency sampler.
#[derive(Clone, Debug)]
pub struct LatencyModel {
    base: Tick,
    var: Tick,
    state: u64,
}

impl LatencyModel {
    /// Creates a sampler for `base + U(0, var)` seeded with `seed`.
    pub const fn new(base: Tick, var: Tick, seed: u64) -> Self {
        // xorshift has a fixed point at zero.
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { base, var, state }
    }

    /// Base latency.
    pub const fn base(&self) -> Tick {
        self.base
    }

    /// Upper bound of the uniform variance.
    pub const fn var(&self) -> Tick {
        self.var
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Draws one latency in `[base, base + var]`.
    pub fn sample(&mut self) -> Tick {
        if self.var == 0 {
            return self.base;
        }
        let jitter = match self.var.checked_add(1) {
            Some(span) => self.next_u64() % span,
            None => self.next_u64(),
        };
        self.base.saturating_add(jitter)
    }
}

/// Combined read+write bandwidth ceiling.
#[derive(Clone, Debug)]
pub struct BandwidthRegulator {
    /// Bytes per second.
    bandwidth: u64,
    /// Start of the current busy period.
    origin: Tick,
    /// Bytes committed since `origin`.
    backlog: u64,
}

impl BandwidthRegulator {
    /// Creates an idle regulator for `bandwidth` bytes per second.
    pub const fn new(bandwidth: u64) -> Self {
        Self {
            bandwidth,
            origin: 0,
            backlog: 0,
        }
    }

    /// Ticks needed to move `bytes` at the configured bandwidth, rounded up.
    pub fn transfer_time(&self, bytes: u64) -> Tick {
        let bw = u128::from(self.bandwidth.max(1));
        let t = (u128::from(bytes) * u128::from(TICKS_PER_SEC)).div_ceil(bw);
        Tick::try_from(t).unwrap_or(Tick::MAX)
    }

    /// Tick at which every committed byte has drained.
    pub fn free_at(&self) -> Tick {
        self.origin.saturating_add(self.transfer_time(self.backlog))
    }

    /// Delay a request arriving at `now` would incur, without committing it.
    pub fn projected_delay(&self, now: Tick) -> Tick {
        self.free_at().saturating_sub(now)
    }

    /// Commits `size` bytes at `now` and returns the delay before they may complete.
    pub fn reserve(&mut self, size: u64, now: Tick) -> Tick {
        let free_at = self.free_at();
        let delay = if free_at <= now {
            self.origin = now;
            self.backlog = 0;
            0
        } else {
            free_at - now
        };
        self.backlog = self.backlog.saturating_add(size);
        delay
    }
}
