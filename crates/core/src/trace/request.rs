//! Last-level-cache request records.
//!
//! The tag controller emits one record per read or write it services. The
//! on-disk layout is packed little-endian:
//!
//! | offset | size | field |
//! |---|---|---|
//! | 0 | 1 | request kind |
//! | 1 | 1 | padding |
//! | 2 | 2 | line size in bytes |
//! | 4 | 2 | tag values |
//! | 6 | 2 | known tags |
//! | 8 | 8 | line address |

use std::fmt;

use super::entry::read_u64;
use super::io::Record;
use crate::common::{PhysAddr, Result, SimError, TagBits};

/// Direction of a controller request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestKind {
    /// Line fetched from tag memory.
    Read = 0,
    /// Line written back to tag memory.
    Write = 1,
}

impl RequestKind {
    /// Decodes the kind byte of a record.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Read),
            1 => Ok(Self::Write),
            other => Err(SimError::InvalidRecord {
                record: "request",
                reason: format!("unknown request type {other}"),
            }),
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
        })
    }
}

/// One request issued by the last-level cache to the tag controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LlcRequest {
    /// Read or write.
    pub kind: RequestKind,
    /// Line size in bytes.
    pub size: u16,
    /// Tags carried (write) or returned (read).
    pub tags: TagBits,
    /// Line address.
    pub addr: PhysAddr,
}

impl LlcRequest {
    /// Builds a read request record.
    pub const fn read(addr: PhysAddr, size: u16, tags: TagBits) -> Self {
        Self {
            kind: RequestKind::Read,
            size,
            tags,
            addr,
        }
    }

    /// Builds a write request record.
    pub const fn write(addr: PhysAddr, size: u16, tags: TagBits) -> Self {
        Self {
            kind: RequestKind::Write,
            size,
            tags,
            addr,
        }
    }
}

impl fmt::Display for LlcRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.addr, self.tags)
    }
}

impl Record for LlcRequest {
    const SIZE: usize = 16;
    const NAME: &'static str = "request";

    fn decode(bytes: &[u8]) -> Result<Self> {
        let kind = RequestKind::from_u8(bytes[0])?;
        let data = u16::from_le_bytes([bytes[4], bytes[5]]);
        let known = u16::from_le_bytes([bytes[6], bytes[7]]);
        let tags = TagBits::new(data, known).map_err(|_| SimError::InvalidRecord {
            record: "request",
            reason: format!("tags {data:#06x} set outside known mask {known:#06x}"),
        })?;
        Ok(Self {
            kind,
            size: u16::from_le_bytes([bytes[2], bytes[3]]),
            tags,
            addr: PhysAddr(read_u64(&bytes[8..16])),
        })
    }

    fn encode(&self, out: &mut [u8]) {
        out[0] = self.kind as u8;
        out[1] = 0;
        out[2..4].copy_from_slice(&self.size.to_le_bytes());
        out[4..6].copy_from_slice(&self.tags.data.to_le_bytes());
        out[6..8].copy_from_slice(&self.tags.known.to_le_bytes());
        out[8..16].copy_from_slice(&self.addr.val().to_le_bytes());
    }
}
