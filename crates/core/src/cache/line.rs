//! Cache line slot.

use crate::common::TagBits;
use crate::common::constants::INVALID_LINE_TAG;

/// One (set, way) slot of a set-associative array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheLine {
    /// Line address shifted right by the line-size bits, or [`INVALID_LINE_TAG`].
    pub line_tag: u64,
    /// Recency rank inside the set; 0 is most recently used.
    pub lru_rank: usize,
    /// Tags of the line's capability sub-blocks.
    pub tags: TagBits,
    /// Line was modified since it was filled.
    pub dirty: bool,
}

impl CacheLine {
    /// Creates an empty slot with the given initial rank.
    pub const fn empty(lru_rank: usize) -> Self {
        Self {
            line_tag: INVALID_LINE_TAG,
            lru_rank,
            tags: TagBits::unknown(),
            dirty: false,
        }
    }

    /// Returns `true` if the slot holds a line.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.line_tag != INVALID_LINE_TAG
    }

    /// Empties the slot, keeping its rank.
    pub const fn invalidate(&mut self) {
        self.line_tag = INVALID_LINE_TAG;
        self.tags = TagBits::unknown();
        self.dirty = false;
    }
}
