//! Engine statistics collection and reporting.
//!
//! This module tracks the behavior of the memory-timing device. It provides:
//! 1. **Traffic:** Reads, writes, bytes moved, forwarded and functional accesses.
//! 2. **Latency:** Issue-to-response latency (min/mean/max) and bandwidth-induced delay.
//! 3. **Backpressure:** Rejections by cause, response stalls, same-address parking.
//! 4. **Cohort queue:** Polls and entries moved between the in and out queues.

use std::fmt::Write as _;

use crate::common::{TICKS_PER_SEC, Tick};

/// Statistics gathered by one engine over a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Timed read requests accepted.
    pub reads: u64,
    /// Timed write requests accepted.
    pub writes: u64,
    /// Bytes carried by accepted reads.
    pub bytes_read: u64,
    /// Bytes carried by accepted writes.
    pub bytes_written: u64,
    /// Responses successfully handed to the requester.
    pub responses: u64,
    /// Requests re-issued downstream (pass-through only).
    pub forwarded: u64,
    /// Functional (untimed) accesses serviced.
    pub functional: u64,

    /// Requests refused because a retry was already owed.
    pub rejected_retry_pending: u64,
    /// Requests refused because `max_outstanding` was reached.
    pub rejected_outstanding: u64,
    /// Requests refused because a response was stalled.
    pub rejected_resp_stall: u64,
    /// Requests refused because the bandwidth regulator was too far behind.
    pub rejected_bandwidth: u64,
    /// Retry signals sent to the requester.
    pub retries_sent: u64,
    /// Times the requester refused a response.
    pub resp_stalls: u64,
    /// Forwarded requests held back behind an earlier same-address access.
    pub parked: u64,
    /// Forwarded requests refused by downstream.
    pub downstream_refusals: u64,

    /// Sum of issue-to-response latencies in ticks.
    pub total_latency: Tick,
    /// Smallest issue-to-response latency seen.
    pub min_latency: Option<Tick>,
    /// Largest issue-to-response latency seen.
    pub max_latency: Tick,
    /// Sum of bandwidth delays added at admission.
    pub bandwidth_delay: Tick,
    /// Tick of the first admission.
    pub first_admit: Option<Tick>,
    /// Tick of the last response sent.
    pub last_response: Tick,

    /// Cohort queue polls performed.
    pub polls: u64,
    /// Entries moved from the in queue to the out queue.
    pub entries_processed: u64,
    /// Queue words written downstream as timed requests.
    pub queue_writes: u64,
}

/// Section names for selective stats output.
///
/// Pass an empty slice to `print_sections` to print all sections.
pub const STATS_SECTIONS: &[&str] = &["summary", "traffic", "latency", "queue"];

impl EngineStats {
    /// Records a response leaving the device at `now` for a request issued at `issued_at`.
    pub fn record_response(&mut self, issued_at: Tick, now: Tick) {
        let lat = now.saturating_sub(issued_at);
        self.responses += 1;
        self.total_latency += lat;
        self.max_latency = self.max_latency.max(lat);
        self.min_latency = Some(self.min_latency.map_or(lat, |m| m.min(lat)));
        self.last_response = self.last_response.max(now);
    }

    /// Mean issue-to-response latency in ticks.
    pub fn mean_latency(&self) -> f64 {
        if self.responses == 0 {
            0.0
        } else {
            self.total_latency as f64 / self.responses as f64
        }
    }

    /// Achieved throughput in bytes per second between first admission and last response.
    pub fn throughput(&self) -> f64 {
        let Some(start) = self.first_admit else {
            return 0.0;
        };
        let span = self.last_response.saturating_sub(start);
        if span == 0 {
            return 0.0;
        }
        (self.bytes_read + self.bytes_written) as f64 * TICKS_PER_SEC as f64 / span as f64
    }

    /// Renders the requested sections as text.
    ///
    /// Each element of `sections` should be one of [`STATS_SECTIONS`]; an empty
    /// slice selects all of them. Unknown names are ignored.
    pub fn render(&self, sections: &[String]) -> String {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let mut out = String::new();
        let rule = "----------------------------------------------------------";

        let _ = writeln!(out, "==========================================================");
        let _ = writeln!(out, "COHORT ENGINE STATISTICS");
        let _ = writeln!(out, "==========================================================");
        if want("summary") {
            let _ = writeln!(out, "sim_ticks                {}", self.last_response);
            let _ = writeln!(out, "requests                 {}", self.reads + self.writes);
            let _ = writeln!(out, "responses                {}", self.responses);
            let _ = writeln!(out, "throughput               {:.2} MB/s", self.throughput() / 1e6);
            let _ = writeln!(out, "{rule}");
        }
        if want("traffic") {
            let _ = writeln!(out, "TRAFFIC");
            let _ = writeln!(out, "  reads                  {} ({} B)", self.reads, self.bytes_read);
            let _ = writeln!(out, "  writes                 {} ({} B)", self.writes, self.bytes_written);
            let _ = writeln!(out, "  forwarded              {}", self.forwarded);
            let _ = writeln!(out, "  functional             {}", self.functional);
            let _ = writeln!(out, "  rejected.retry_owed    {}", self.rejected_retry_pending);
            let _ = writeln!(out, "  rejected.outstanding   {}", self.rejected_outstanding);
            let _ = writeln!(out, "  rejected.resp_stall    {}", self.rejected_resp_stall);
            let _ = writeln!(out, "  rejected.bandwidth     {}", self.rejected_bandwidth);
            let _ = writeln!(out, "  retries_sent           {}", self.retries_sent);
            let _ = writeln!(out, "  resp_stalls            {}", self.resp_stalls);
            let _ = writeln!(out, "  parked                 {}", self.parked);
            let _ = writeln!(out, "  downstream_refusals    {}", self.downstream_refusals);
            let _ = writeln!(out, "{rule}");
        }
        if want("latency") {
            let _ = writeln!(out, "LATENCY (ticks)");
            let _ = writeln!(out, "  min                    {}", self.min_latency.unwrap_or(0));
            let _ = writeln!(out, "  mean                   {:.1}", self.mean_latency());
            let _ = writeln!(out, "  max                    {}", self.max_latency);
            let _ = writeln!(out, "  bandwidth_delay        {}", self.bandwidth_delay);
            let _ = writeln!(out, "{rule}");
        }
        if want("queue") {
            let _ = writeln!(out, "COHORT QUEUE");
            let _ = writeln!(out, "  polls                  {}", self.polls);
            let _ = writeln!(out, "  entries                {}", self.entries_processed);
            let _ = writeln!(out, "  queue_writes           {}", self.queue_writes);
        }
        let _ = writeln!(out, "==========================================================");
        out
    }

    /// Prints only the requested statistics sections to stdout.
    ///
    /// # Arguments
    ///
    /// * `sections` - Slice of section names to print, or empty for all.
    pub fn print_sections(&self, sections: &[String]) {
        print!("{}", self.render(sections));
    }

    /// Prints all statistics sections to stdout.
    ///
    /// Equivalent to `print_sections(&[])`.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
