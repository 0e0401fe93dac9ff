//! Bit-packed tag table.
//!
//! The table holds one tag bit per capability of tagged memory in two parallel
//! planes: `data` (tag values) and `known` (tags whose value was observed).
//! Every operation preserves `data & !known == 0`.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::common::{InvariantViolation, MemoryLayout, PhysAddr, Result, SimError, TagBits, TagState};

/// Authoritative tag state of the whole tagged memory.
#[derive(Clone, Debug)]
pub struct TagTable {
    layout: MemoryLayout,
    data: Vec<u8>,
    known: Vec<u8>,
}

impl TagTable {
    /// Creates a table with every tag unknown.
    pub fn new(layout: MemoryLayout) -> Self {
        let plane = layout.plane_bytes();
        Self {
            layout,
            data: vec![0; plane],
            known: vec![0; plane],
        }
    }

    /// Creates a table from a tag snapshot.
    ///
    /// A snapshot is a single data plane of exactly
    /// [`MemoryLayout::plane_bytes`] bytes. Every tag it describes is treated
    /// as known.
    ///
    /// # Arguments
    ///
    /// * `layout` - Memory layout the snapshot was taken for.
    /// * `reader` - Snapshot bytes.
    pub fn from_snapshot(layout: MemoryLayout, mut reader: impl Read) -> Result<Self> {
        let plane = layout.plane_bytes();
        let mut data = Vec::with_capacity(plane);
        let _ = reader.by_ref().take(plane as u64).read_to_end(&mut data)?;
        if data.len() < plane {
            return Err(SimError::SnapshotSize {
                expected: plane,
                got: data.len(),
            });
        }
        let trailing = io::copy(&mut reader, &mut io::sink())?;
        if trailing != 0 {
            return Err(SimError::SnapshotSize {
                expected: plane,
                got: plane + trailing as usize,
            });
        }
        Ok(Self {
            layout,
            data,
            known: vec![0xFF; plane],
        })
    }

    /// Loads a snapshot file, see [`TagTable::from_snapshot`].
    pub fn from_snapshot_file(layout: MemoryLayout, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SimError::file(path, e))?;
        Self::from_snapshot(layout, BufReader::new(file))
    }

    /// Memory layout the table covers.
    pub const fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    /// Reads the tags of one line.
    ///
    /// # Arguments
    ///
    /// * `line` - Line-aligned address inside tagged memory.
    pub fn read_line(&self, line: PhysAddr) -> Result<TagBits> {
        self.layout.check_line(line)?;
        let start = self.bit_index(line.val());
        let n = self.layout.caps_per_line();
        Ok(TagBits {
            data: read_bits(&self.data, start, n),
            known: read_bits(&self.known, start, n),
        })
    }

    /// Overwrites the tags of one line.
    ///
    /// # Arguments
    ///
    /// * `line` - Line-aligned address inside tagged memory.
    /// * `tags` - New tags; must satisfy `data & !known == 0`.
    pub fn write_line(&mut self, line: PhysAddr, tags: TagBits) -> Result<()> {
        self.layout.check_line(line)?;
        if !tags.is_consistent() {
            return Err(InvariantViolation::InconsistentTags {
                data: tags.data,
                known: tags.known,
            }
            .into());
        }
        let start = self.bit_index(line.val());
        let n = self.layout.caps_per_line();
        write_bits(&mut self.data, start, n, tags.data);
        write_bits(&mut self.known, start, n, tags.known);
        Ok(())
    }

    /// Returns the tag state of the capability containing `addr`.
    pub fn state(&self, addr: PhysAddr) -> Result<TagState> {
        self.check_addr(addr)?;
        let bits = self.read_line_unchecked(addr);
        Ok(bits.state(self.subblock(addr)))
    }

    /// Sets the tag state of the capability containing `addr`.
    pub fn set_state(&mut self, addr: PhysAddr, state: TagState) -> Result<()> {
        self.check_addr(addr)?;
        let mut bits = self.read_line_unchecked(addr);
        bits.set_state(self.subblock(addr), state);
        self.write_line(self.layout.line_of(addr), bits)
    }

    /// Returns `true` if `data & !known == 0` holds across both planes.
    pub fn is_consistent(&self) -> bool {
        self.data
            .iter()
            .zip(&self.known)
            .all(|(d, k)| d & !k == 0)
    }

    /// Number of tags whose value is known.
    pub fn known_count(&self) -> u64 {
        self.known.iter().map(|b| u64::from(b.count_ones())).sum()
    }

    /// Number of tags known to be set.
    pub fn set_count(&self) -> u64 {
        self.data.iter().map(|b| u64::from(b.count_ones())).sum()
    }

    fn check_addr(&self, addr: PhysAddr) -> Result<()> {
        if self.layout.contains(addr.val()) {
            Ok(())
        } else {
            Err(InvariantViolation::OutOfRange { addr: addr.val() }.into())
        }
    }

    fn read_line_unchecked(&self, addr: PhysAddr) -> TagBits {
        let start = self.bit_index(self.layout.line_of(addr).val());
        let n = self.layout.caps_per_line();
        TagBits {
            data: read_bits(&self.data, start, n),
            known: read_bits(&self.known, start, n),
        }
    }

    const fn subblock(&self, addr: PhysAddr) -> u32 {
        ((addr.val() & (self.layout.line_bytes() - 1)) / self.layout.cap_bytes()) as u32
    }

    const fn bit_index(&self, addr: u64) -> u64 {
        (addr - self.layout.base()) / self.layout.cap_bytes()
    }
}

/// Reads `n <= 16` bits starting at bit `start` of a plane.
fn read_bits(plane: &[u8], start: u64, n: u32) -> u16 {
    let byte = (start / 8) as usize;
    let shift = (start % 8) as u32;
    let window = (0..3).fold(0u32, |acc, i| {
        let b = plane.get(byte + i).copied().unwrap_or(0);
        acc | (u32::from(b) << (8 * i))
    });
    ((window >> shift) & ones(n)) as u16
}

/// Writes the low `n <= 16` bits of `value` starting at bit `start` of a plane.
fn write_bits(plane: &mut [u8], start: u64, n: u32, value: u16) {
    let byte = (start / 8) as usize;
    let shift = (start % 8) as u32;
    let mask = ones(n) << shift;
    let bits = (u32::from(value) & ones(n)) << shift;
    for i in 0..3 {
        if let Some(b) = plane.get_mut(byte + i) {
            let m = (mask >> (8 * i)) as u8;
            let v = (bits >> (8 * i)) as u8;
            *b = (*b & !m) | v;
        }
    }
}

const fn ones(n: u32) -> u32 {
    (1u32 << n) - 1
}
