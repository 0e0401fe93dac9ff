//! Access-trace records.
//!
//! One record per memory access observed on the traced core. The on-disk
//! layout is the producer's packed little-endian structure:
//!
//! | offset | size | field |
//! |---|---|---|
//! | 0 | 1 | access kind |
//! | 1 | 1 | capability tag |
//! | 2 | 2 | access size in bytes |
//! | 4 | 4 | padding |
//! | 8 | 8 | virtual address |
//! | 16 | 8 | physical address (0 when unknown) |

use std::fmt;

use super::io::Record;
use crate::common::{Result, SimError};

/// Kind of a traced access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum AccessKind {
    /// Instruction fetch.
    Instr = 0,
    /// Plain data load.
    Load = 1,
    /// Plain data store; clears the tags it overlaps.
    Store = 2,
    /// Capability load; observes the tag.
    CLoad = 3,
    /// Capability store; writes the tag.
    CStore = 4,
}

impl AccessKind {
    /// All kinds, in encoding order.
    pub const ALL: [Self; 5] = [Self::Instr, Self::Load, Self::Store, Self::CLoad, Self::CStore];

    /// Decodes the kind byte of a record.
    pub fn from_u8(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Self::Instr,
            1 => Self::Load,
            2 => Self::Store,
            3 => Self::CLoad,
            4 => Self::CStore,
            other => {
                return Err(SimError::InvalidRecord {
                    record: "access",
                    reason: format!("unknown access type {other}"),
                });
            }
        })
    }

    /// Label used in reports.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Instr => "INSTR",
            Self::Load => "LOAD",
            Self::Store => "STORE",
            Self::CLoad => "CLOAD",
            Self::CStore => "CSTORE",
        }
    }

    /// Returns `true` for kinds that modify memory.
    pub const fn is_store(self) -> bool {
        matches!(self, Self::Store | Self::CStore)
    }

    /// Returns `true` for kinds that go through the instruction cache.
    pub const fn is_instruction(self) -> bool {
        matches!(self, Self::Instr)
    }

    /// Returns `true` if the kind may legitimately carry a set tag.
    pub const fn may_carry_tag(self) -> bool {
        matches!(self, Self::CLoad | Self::CStore)
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single access-trace entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessEntry {
    /// Access kind.
    pub kind: AccessKind,
    /// Tag byte; 0 or 1 for well-formed entries.
    pub tag: u8,
    /// Access size in bytes.
    pub size: u16,
    /// Virtual address, informational only.
    pub vaddr: u64,
    /// Physical address; 0 when the tracer could not translate.
    pub paddr: u64,
}

impl AccessEntry {
    /// Builds an entry.
    pub const fn new(kind: AccessKind, tag: u8, size: u16, vaddr: u64, paddr: u64) -> Self {
        Self {
            kind,
            tag,
            size,
            vaddr,
            paddr,
        }
    }

    /// Returns `true` if the tag byte is valid for the access kind.
    pub const fn tag_is_well_formed(&self) -> bool {
        match self.tag {
            0 => true,
            1 => self.kind.may_carry_tag(),
            _ => false,
        }
    }
}

impl Record for AccessEntry {
    const SIZE: usize = 24;
    const NAME: &'static str = "access";

    fn decode(bytes: &[u8]) -> Result<Self> {
        let kind = AccessKind::from_u8(bytes[0])?;
        Ok(Self {
            kind,
            tag: bytes[1],
            size: u16::from_le_bytes([bytes[2], bytes[3]]),
            vaddr: read_u64(&bytes[8..16]),
            paddr: read_u64(&bytes[16..24]),
        })
    }

    fn encode(&self, out: &mut [u8]) {
        out[0] = self.kind as u8;
        out[1] = self.tag;
        out[2..4].copy_from_slice(&self.size.to_le_bytes());
        out[4..8].fill(0);
        out[8..16].copy_from_slice(&self.vaddr.to_le_bytes());
        out[16..24].copy_from_slice(&self.paddr.to_le_bytes());
    }
}

/// Reads a little-endian `u64` from an eight-byte slice.
pub(crate) fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}
