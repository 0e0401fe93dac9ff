//! Set-associative line storage with true LRU replacement.
//!
//! Lines are stored in a flat vector; the ways of set `s` occupy indices
//! `s * ways .. (s + 1) * ways`. Recency is kept as a rank per slot, and the
//! ranks of every set always form a permutation of `0..ways`.
//!
//! # Performance
//!
//! - **Lookup:** O(W) linear scan of one set.
//! - **Victim choice:** O(W).
//! - **LRU update:** O(W).

use super::line::CacheLine;
use crate::common::PhysAddr;

/// Flat storage of a set-associative cache.
#[derive(Clone, Debug)]
pub struct SetAssocArray {
    lines: Vec<CacheLine>,
    sets: usize,
    ways: usize,
    line_bits: u32,
}

impl SetAssocArray {
    /// Creates an array of empty lines.
    ///
    /// # Arguments
    ///
    /// * `lines` - Total number of lines; a multiple of `ways`.
    /// * `ways` - Associativity.
    /// * `line_bits` - `log2` of the line size.
    pub fn new(lines: usize, ways: usize, line_bits: u32) -> Self {
        let sets = lines / ways;
        let lines = (0..sets * ways).map(|i| CacheLine::empty(i % ways)).collect();
        Self {
            lines,
            sets,
            ways,
            line_bits,
        }
    }

    /// Number of sets.
    pub const fn sets(&self) -> usize {
        self.sets
    }

    /// Associativity.
    pub const fn ways(&self) -> usize {
        self.ways
    }

    /// Total number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if the array has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line tag of a line address.
    #[inline]
    pub const fn line_tag(&self, line: PhysAddr) -> u64 {
        line.val() >> self.line_bits
    }

    /// Line address of a stored line tag.
    #[inline]
    pub const fn line_addr(&self, line_tag: u64) -> PhysAddr {
        PhysAddr(line_tag << self.line_bits)
    }

    /// Set that a line address maps to.
    #[inline]
    pub const fn set_of(&self, line: PhysAddr) -> usize {
        (self.line_tag(line) % self.sets as u64) as usize
    }

    /// Finds the slot holding `line`.
    ///
    /// # Returns
    ///
    /// The slot index, or `None` on a miss.
    pub fn find(&self, line: PhysAddr) -> Option<usize> {
        let tag = self.line_tag(line);
        let base = self.set_of(line) * self.ways;
        (base..base + self.ways).find(|&i| self.lines[i].line_tag == tag)
    }

    /// Chooses the slot of `set` to replace.
    ///
    /// The first empty way wins; otherwise the way with the largest rank.
    pub fn choose_victim(&self, set: usize) -> usize {
        let base = set * self.ways;
        let ways = base..base + self.ways;
        if let Some(free) = ways.clone().find(|&i| !self.lines[i].is_valid()) {
            return free;
        }
        let mut victim = base;
        for i in ways {
            if self.lines[i].lru_rank > self.lines[victim].lru_rank {
                victim = i;
            }
        }
        victim
    }

    /// Makes slot `index` the most recently used of its set.
    ///
    /// Every slot ranked at or below the old rank of `index` ages by one.
    pub fn touch(&mut self, index: usize) {
        let old = self.lines[index].lru_rank;
        if old != 0 {
            let base = (index / self.ways) * self.ways;
            for line in &mut self.lines[base..base + self.ways] {
                if line.lru_rank <= old {
                    line.lru_rank = (line.lru_rank + 1) % self.ways;
                }
            }
        }
        self.lines[index].lru_rank = 0;
    }

    /// Slot at `index`.
    pub fn line(&self, index: usize) -> &CacheLine {
        &self.lines[index]
    }

    /// Mutable slot at `index`.
    pub fn line_mut(&mut self, index: usize) -> &mut CacheLine {
        &mut self.lines[index]
    }

    /// Slots of one set, in way order.
    pub fn set_lines(&self, set: usize) -> &[CacheLine] {
        &self.lines[set * self.ways..(set + 1) * self.ways]
    }

    /// Iterator over the addresses of all valid lines.
    pub fn valid_lines(&self) -> impl Iterator<Item = (PhysAddr, &CacheLine)> + '_ {
        self.lines
            .iter()
            .filter(|l| l.is_valid())
            .map(|l| (self.line_addr(l.line_tag), l))
    }
}
