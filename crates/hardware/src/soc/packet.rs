//! Memory packets.
//!
//! A [`Packet`] carries one memory access through the split request/response
//! protocol. It starts life as a request (`ReadReq`/`WriteReq`), is consumed by a
//! device, and is turned into its response in place with [`Packet::make_response`],
//! so a request and its response are always the same object and can be neither
//! duplicated nor lost by the ports in between.

use std::fmt;

use crate::common::{AddrRange, Tick};

/// Memory command carried by a packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemCmd {
    /// Read request.
    ReadReq,
    /// Write request.
    WriteReq,
    /// Response to a read, carries the data read.
    ReadResp,
    /// Response to a write.
    WriteResp,
}

impl MemCmd {
    /// Returns `true` for reads and read responses.
    #[inline]
    pub const fn is_read(self) -> bool {
        matches!(self, Self::ReadReq | Self::ReadResp)
    }

    /// Returns `true` for writes and write responses.
    #[inline]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::WriteReq | Self::WriteResp)
    }

    /// Returns `true` for response commands.
    #[inline]
    pub const fn is_response(self) -> bool {
        matches!(self, Self::ReadResp | Self::WriteResp)
    }

    /// Returns the response command matching this request, or `None` for responses.
    #[inline]
    pub const fn response(self) -> Option<Self> {
        match self {
            Self::ReadReq => Some(Self::ReadResp),
            Self::WriteReq => Some(Self::WriteResp),
            Self::ReadResp | Self::WriteResp => None,
        }
    }
}

impl fmt::Display for MemCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ReadReq => "ReadReq",
            Self::WriteReq => "WriteReq",
            Self::ReadResp => "ReadResp",
            Self::WriteResp => "WriteResp",
        };
        f.write_str(s)
    }
}

/// A memory access travelling between ports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Requester-assigned identifier, preserved in the response.
    pub id: u64,
    /// Current command; flips from request to response in `make_response`.
    pub cmd: MemCmd,
    /// Start address of the access.
    pub addr: u64,
    /// Access size in bytes.
    pub size: u64,
    /// Payload: the data to write, or the buffer that receives read data.
    pub data: Vec<u8>,
    /// Tick at which the requester created the packet.
    pub issued_at: Tick,
    /// Tick at which the response was issued, `None` while still a request.
    pub ready_at: Option<Tick>,
}

impl Packet {
    /// Creates a read request with a zeroed receive buffer of `size` bytes.
    pub fn read(id: u64, addr: u64, size: u64, issued_at: Tick) -> Self {
        Self {
            id,
            cmd: MemCmd::ReadReq,
            addr,
            size,
            data: vec![0; size as usize],
            issued_at,
            ready_at: None,
        }
    }

    /// Creates a write request carrying `data`.
    pub fn write(id: u64, addr: u64, data: Vec<u8>, issued_at: Tick) -> Self {
        Self {
            id,
            cmd: MemCmd::WriteReq,
            addr,
            size: data.len() as u64,
            data,
            issued_at,
            ready_at: None,
        }
    }

    /// Creates an 8-byte little-endian write request.
    pub fn write_u64(id: u64, addr: u64, value: u64, issued_at: Tick) -> Self {
        Self::write(id, addr, value.to_le_bytes().to_vec(), issued_at)
    }

    /// Returns `true` if this is a read or read response.
    #[inline]
    pub const fn is_read(&self) -> bool {
        self.cmd.is_read()
    }

    /// Returns `true` if this is a write or write response.
    #[inline]
    pub const fn is_write(&self) -> bool {
        self.cmd.is_write()
    }

    /// Returns `true` once the packet has been turned into a response.
    #[inline]
    pub const fn is_response(&self) -> bool {
        self.cmd.is_response()
    }

    /// Returns the byte range touched by this access.
    #[inline]
    pub const fn range(&self) -> AddrRange {
        AddrRange::new(self.addr, self.size)
    }

    /// Turns the request into its response, stamped with the issuing tick.
    ///
    /// Calling this on a packet that already is a response only restamps it.
    pub fn make_response(&mut self, at: Tick) {
        if let Some(resp) = self.cmd.response() {
            self.cmd = resp;
        }
        self.ready_at = Some(at);
    }

    /// Interprets the first eight payload bytes as a little-endian `u64`.
    pub fn get_u64(&self) -> Option<u64> {
        let bytes: [u8; 8] = self.data.get(..8)?.try_into().ok()?;
        Some(u64::from_le_bytes(bytes))
    }

    /// Copies the bytes of `src` that overlap this packet's range into this
    /// packet's payload. Returns `true` if any byte was copied.
    pub fn overlay_from(&mut self, src: &Self) -> bool {
        let lo = self.addr.max(src.addr);
        let hi = self
            .addr
            .saturating_add(self.size)
            .min(src.addr.saturating_add(src.size));
        if lo >= hi {
            return false;
        }
        let len = (hi - lo) as usize;
        let dst_off = (lo - self.addr) as usize;
        let src_off = (lo - src.addr) as usize;
        match (
            self.data.get_mut(dst_off..dst_off + len),
            src.data.get(src_off..src_off + len),
        ) {
            (Some(dst), Some(from)) => {
                dst.copy_from_slice(from);
                true
            }
            _ => false,
        }
    }
}
