//! Address range type.
//!
//! Devices on the simulated interconnect claim half-open ranges of the physical
//! address space. This module provides:
//! 1. **Containment:** Whether a single address or a whole access falls inside a range.
//! 2. **Overlap:** Detection of two ranges claiming the same bytes (a configuration error).
//! 3. **Offsets:** Translation of an absolute address into a device-relative offset.

use std::fmt;

use serde::Deserialize;

/// A half-open physical address range `[base, base + size)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub struct AddrRange {
    /// First address covered by the range.
    pub base: u64,
    /// Number of bytes covered by the range.
    pub size: u64,
}

impl AddrRange {
    /// Creates a new range starting at `base` covering `size` bytes.
    #[inline]
    pub const fn new(base: u64, size: u64) -> Self {
        Self { base, size }
    }

    /// Returns the first address past the end of the range, or `None` if the
    /// range wraps past the top of the 64-bit address space.
    #[inline]
    pub const fn end(&self) -> Option<u64> {
        self.base.checked_add(self.size)
    }

    /// Returns `true` if `addr` lies inside the range.
    #[inline]
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.size
    }

    /// Returns `true` if every byte of the access `[addr, addr + len)` lies
    /// inside the range.
    ///
    /// A zero-length access is contained if its address is.
    pub const fn contains_access(&self, addr: u64, len: u64) -> bool {
        if !self.contains(addr) {
            return false;
        }
        let offset = addr - self.base;
        len <= self.size - offset
    }

    /// Returns `true` if the two ranges share at least one byte.
    pub const fn overlaps(&self, other: &Self) -> bool {
        if self.size == 0 || other.size == 0 {
            return false;
        }
        self.contains(other.base) || other.contains(self.base)
    }

    /// Returns the offset of `addr` from the start of the range, if it lies inside.
    #[inline]
    pub const fn offset_of(&self, addr: u64) -> Option<u64> {
        if self.contains(addr) {
            Some(addr - self.base)
        } else {
            None
        }
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end() {
            Some(end) => write!(f, "[{:#x}, {:#x})", self.base, end),
            None => write!(f, "[{:#x}, +{:#x})", self.base, self.size),
        }
    }
}
