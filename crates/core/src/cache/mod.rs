//! Tag-tracking set-associative cache.
//!
//! This module implements one level of the cache hierarchy. It provides:
//! 1. **Storage:** A [`SetAssocArray`] of [`CacheLine`] slots with true LRU.
//! 2. **Local Write-Backs:** Visible and invisible updates of a held line.
//! 3. **Statistics:** Hits, misses, write-backs and invalidations.
//!
//! Misses, evictions and back-invalidation need the parent and children of
//! the cache and are therefore driven by [`crate::hierarchy::Hierarchy`].

/// Set-associative line storage and LRU.
pub mod array;
/// Cache line slot.
pub mod line;

pub use self::array::SetAssocArray;
pub use self::line::CacheLine;

use crate::common::{InvariantViolation, PhysAddr, TagBits};
use crate::config::CacheConfig;

/// Per-cache event counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests satisfied by a held line.
    pub hits: u64,
    /// Requests that had to fetch from the parent.
    pub misses: u64,
    /// Dirty lines written to the parent.
    pub write_backs: u64,
    /// Lines invalidated by a parent eviction or a coherence flush.
    pub invalidations: u64,
}

impl CacheStats {
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

/// One cache level of the hierarchy.
#[derive(Clone, Debug)]
pub struct CacheDevice {
    name: String,
    size_bytes: u64,
    /// Line storage.
    pub array: SetAssocArray,
    /// Event counters.
    pub stats: CacheStats,
}

impl CacheDevice {
    /// Creates an empty cache.
    ///
    /// # Arguments
    ///
    /// * `name` - Label used in reports and errors.
    /// * `config` - Capacity and associativity.
    /// * `line_bits` - `log2` of the line size shared by the hierarchy.
    pub fn new(name: impl Into<String>, config: &CacheConfig, line_bits: u32) -> Self {
        let lines = config.lines(1 << line_bits);
        Self {
            name: name.into(),
            size_bytes: config.size_bytes,
            array: SetAssocArray::new(lines, config.ways, line_bits),
            stats: CacheStats::default(),
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

    /// Returns the held copy of `line`, if any.
    pub fn peek(&self, line: PhysAddr) -> Option<&CacheLine> {
        self.array.find(line).map(|i| self.array.line(i))
    }

    /// Returns `true` if `line` is held.
    pub fn contains(&self, line: PhysAddr) -> bool {
        self.array.find(line).is_some()
    }

    /// Stores a dirty copy of `line` written back by a child.
    ///
    /// The line must already be held; recency is not updated.
    pub fn write_back(&mut self, line: PhysAddr, tags: TagBits) -> Result<(), InvariantViolation> {
        let index = self.held(line)?;
        let slot = self.array.line_mut(index);
        slot.tags = tags;
        slot.dirty = true;
        Ok(())
    }

    /// Stores tags forwarded by a child whose copy is clean.
    ///
    /// The update may only add knowledge: known bits must not be lost and
    /// known values must not change. The dirty flag is left alone.
    pub fn write_back_invisible(
        &mut self,
        line: PhysAddr,
        tags: TagBits,
    ) -> Result<(), InvariantViolation> {
        let index = self.held(line)?;
        let slot = self.array.line_mut(index);
        slot.tags.check_invisible_update(tags, line.val())?;
        slot.tags = tags;
        Ok(())
    }

    fn held(&self, line: PhysAddr) -> Result<usize, InvariantViolation> {
        self.array
            .find(line)
            .ok_or_else(|| InvariantViolation::LineNotPresent {
                device: self.name.clone(),
                line_addr: line.val(),
            })
    }
}
