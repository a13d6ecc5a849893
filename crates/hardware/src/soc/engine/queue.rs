//! Cohort producer/consumer queue poller.
//!
//! A cohort queue lives in memory as two 8-byte pointers followed by a ring of
//! 8-byte entries:
//!
//! ```text
//! base + 0   head (software address of the next entry to pop)
//! base + 8   tail (software address of the next free entry)
//! base + 16  entries[0 .. n]
//! ```
//!
//! Pointers are virtual addresses relative to the queue's `virt_base`; they grow
//! monotonically and are folded onto the ring modulo the entry count.

use crate::common::{DeviceError, Tick};
use crate::config::CohortConfig;

/// Word-granular access to the memory holding the queues.
pub trait WordMemory {
    /// Reads the little-endian word at `addr`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] if the address is not reachable.
    fn read_word(&mut self, addr: u64) -> Result<u64, DeviceError>;

    /// Writes the little-endian word `value` at `addr`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] if the address is not reachable.
    fn write_word(&mut self, addr: u64, value: u64) -> Result<(), DeviceError>;
}

const HEAD: u64 = 0;
const TAIL: u64 = 8;
const ENTRIES: u64 = 16;
const WORD: u64 = 8;

/// One queue's placement in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueLayout {
    /// Which queue this is, for diagnostics.
    pub name: &'static str,
    /// Physical address of the head pointer.
    pub base: u64,
    /// Software address that pointer values are relative to.
    pub virt_base: u64,
    /// Ring size in entries.
    pub entries: u64,
}

impl QueueLayout {
    /// Physical address of the ring slot that pointer `ptr` designates.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::QueuePointer`] if `ptr` lies below `virt_base`.
    pub fn entry_addr(&self, ptr: u64) -> Result<u64, DeviceError> {
        let Some(rel) = ptr.checked_sub(self.virt_base) else {
            return Err(DeviceError::QueuePointer {
                queue: self.name,
                ptr,
                virt_base: self.virt_base,
            });
        };
        let index = (rel / WORD) % self.entries.max(1);
        Ok(self.base + ENTRIES + index * WORD)
    }

    /// Physical address of the head pointer.
    pub const fn head_addr(&self) -> u64 {
        self.base + HEAD
    }

    /// Physical address of the tail pointer.
    pub const fn tail_addr(&self) -> u64 {
        self.base + TAIL
    }
}

/// Result of a poll that found work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Processed {
    /// Entry popped from the in queue.
    pub entry: u64,
    /// Value pushed to the out queue.
    pub value: u64,
}

/// Polls the in queue, applies the accelerator operand and fills the out queue.
#[derive(Clone, Debug)]
pub struct CohortPoller {
    input: QueueLayout,
    output: QueueLayout,
    accel_addr: u64,
    /// Ticks between polls.
    pub poll_interval: Tick,
    /// Ticks from start-up to the first poll.
    pub startup_delay: Tick,
}

impl CohortPoller {
    /// Lays out the queues of `config` relative to the queue region at `queue_base`.
    pub fn new(config: &CohortConfig, queue_base: u64) -> Self {
        let (in_base, in_virt) = config.in_queue(queue_base);
        let (out_base, out_virt) = config.out_queue(queue_base);
        Self {
            input: QueueLayout {
                name: "in",
                base: in_base,
                virt_base: in_virt,
                entries: config.entries,
            },
            output: QueueLayout {
                name: "out",
                base: out_base,
                virt_base: out_virt,
                entries: config.entries,
            },
            accel_addr: config.accel(queue_base),
            poll_interval: config.poll_interval.max(1),
            startup_delay: config.startup_delay,
        }
    }

    /// The in queue layout.
    pub const fn input(&self) -> &QueueLayout {
        &self.input
    }

    /// The out queue layout.
    pub const fn output(&self) -> &QueueLayout {
        &self.output
    }

    /// Address of the accelerator operand word.
    pub const fn accel_addr(&self) -> u64 {
        self.accel_addr
    }

    /// Pops at most one entry and pushes its transformed value.
    ///
    /// Returns `None` when the in queue is empty.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::QueuePointer`] for pointers below their base, or
    /// whatever the memory reports for unreachable addresses.
    pub fn poll(&self, mem: &mut dyn WordMemory) -> Result<Option<Processed>, DeviceError> {
        let head = mem.read_word(self.input.head_addr())?;
        let tail = mem.read_word(self.input.tail_addr())?;
        if head >= tail {
            return Ok(None);
        }

        let entry = mem.read_word(self.input.entry_addr(head)?)?;
        let operand = mem.read_word(self.accel_addr)?;
        let value = entry.wrapping_add(operand);

        let out_tail = mem.read_word(self.output.tail_addr())?;
        mem.write_word(self.output.entry_addr(out_tail)?, value)?;
        mem.write_word(self.output.tail_addr(), out_tail.wrapping_add(WORD))?;
        mem.write_word(self.input.head_addr(), head.wrapping_add(WORD))?;

        tracing::info!(entry, operand, value, in_head = head, out_tail, "cohort entry processed");
        Ok(Some(Processed { entry, value }))
    }
}
