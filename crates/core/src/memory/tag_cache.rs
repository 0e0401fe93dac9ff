//! Uncompressed tag cache.
//!
//! A set-associative cache of tag-table lines placed in front of tag memory.
//! It only tracks which lines are resident; tag values always come from the
//! [`TagTable`] it owns. Replaying an LLC request trace through it measures
//! how well the request stream caches.

use tracing::debug;

use super::tag_table::TagTable;
use crate::cache::SetAssocArray;
use crate::common::{PhysAddr, Result, TagBits};
use crate::config::CacheConfig;

/// Counters of the tag cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TagCacheStats {
    /// Requests for a resident line.
    pub hits: u64,
    /// Requests for a non-resident line.
    pub misses: u64,
    /// Dirty lines evicted to tag memory.
    pub write_backs: u64,
}

impl TagCacheStats {
    /// Misses over total requests, or 0 without requests.
    pub fn miss_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.misses as f64 / total as f64
        }
    }
}

/// Tag cache without compression, usable as a hierarchy root.
#[derive(Clone, Debug)]
pub struct TagCacheDevice {
    name: String,
    size_bytes: u64,
    array: SetAssocArray,
    table: TagTable,
    /// Event counters.
    pub stats: TagCacheStats,
}

impl TagCacheDevice {
    /// Creates an empty tag cache over `table`.
    pub fn new(name: impl Into<String>, config: &CacheConfig, table: TagTable) -> Self {
        let layout = *table.layout();
        Self {
            name: name.into(),
            size_bytes: config.size_bytes,
            array: SetAssocArray::new(
                config.lines(layout.line_bytes()),
                config.ways,
                layout.line_bits(),
            ),
            table,
            stats: TagCacheStats::default(),
        }
    }

    /// Device label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capacity in bytes.
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Associativity.
    pub const fn ways(&self) -> usize {
        self.array.ways()
    }

    /// Tag table behind the cache.
    pub const fn table(&self) -> &TagTable {
        &self.table
    }

    /// Reads a line's tags, recording the access.
    pub fn read(&mut self, line: PhysAddr) -> Result<TagBits> {
        self.table.layout().check_line(line)?;
        self.access(line, false);
        self.table.read_line(line)
    }

    /// Writes a line's tags, recording the access and dirtying the line.
    pub fn write(&mut self, line: PhysAddr, tags: TagBits) -> Result<()> {
        self.table.layout().check_line(line)?;
        self.access(line, true);
        self.table.write_line(line, tags)
    }

    /// Stores tags forwarded by a clean child copy without recording an access.
    pub fn write_invisible(&mut self, line: PhysAddr, tags: TagBits) -> Result<()> {
        let old = self.table.read_line(line)?;
        old.check_invisible_update(tags, line.val())?;
        self.table.write_line(line, tags)
    }

    /// Looks `line` up, filling it on a miss, and updates recency.
    fn access(&mut self, line: PhysAddr, is_write: bool) {
        let index = match self.array.find(line) {
            Some(index) => {
                self.stats.hits += 1;
                index
            }
            None => {
                self.stats.misses += 1;
                let index = self.array.choose_victim(self.array.set_of(line));
                let victim = *self.array.line(index);
                if victim.is_valid() && victim.dirty {
                    self.stats.write_backs += 1;
                    debug!(
                        device = %self.name,
                        victim = %self.array.line_addr(victim.line_tag),
                        "tag cache write-back"
                    );
                }
                let slot = self.array.line_mut(index);
                slot.invalidate();
                slot.line_tag = line.val() >> self.table.layout().line_bits();
                index
            }
        };
        if is_write {
            self.array.line_mut(index).dirty = true;
        }
        self.array.touch(index);
    }
}
