//! Access-trace replay driver.
//!
//! Feeds access entries one at a time into the leaf caches of a single-core
//! hierarchy. Each entry is split into the cache lines it touches; for every
//! line the driver:
//! 1. **Snoops:** flushes peer copies of the line (invalidating them for stores).
//! 2. **Requests:** obtains the line from the instruction or data cache.
//! 3. **Applies Tags:** checks or learns tags for loads, writes them for stores.

use tracing::{debug, warn};

use crate::common::{InvariantViolation, PhysAddr, Result, TagBits};
use crate::config::Config;
use crate::hierarchy::{CoreCaches, DeviceId, Hierarchy};
use crate::memory::TagTable;
use crate::stats::{EntryClass, TraceStats};
use crate::trace::{AccessEntry, AccessKind, RequestSink};

/// Replays an access trace through a cache hierarchy.
#[derive(Debug)]
pub struct Simulator<S> {
    hierarchy: Hierarchy<S>,
    caches: CoreCaches,
    stats: TraceStats,
}

impl<S: RequestSink> Simulator<S> {
    /// Builds the configured hierarchy over `table`, emitting requests into `sink`.
    pub fn new(config: &Config, table: TagTable, sink: S) -> Result<Self> {
        let (hierarchy, caches) = Hierarchy::from_config(config, table, sink)?;
        Ok(Self::from_hierarchy(hierarchy, caches))
    }

    /// Wraps an already-built hierarchy.
    pub fn from_hierarchy(hierarchy: Hierarchy<S>, caches: CoreCaches) -> Self {
        Self {
            hierarchy,
            caches,
            stats: TraceStats::default(),
        }
    }

    /// The simulated hierarchy.
    pub const fn hierarchy(&self) -> &Hierarchy<S> {
        &self.hierarchy
    }

    /// Ids of the core's caches.
    pub const fn caches(&self) -> CoreCaches {
        self.caches
    }

    /// Statistics so far.
    pub const fn stats(&self) -> &TraceStats {
        &self.stats
    }

    /// Consumes the simulator.
    pub fn into_parts(self) -> (Hierarchy<S>, TraceStats) {
        (self.hierarchy, self.stats)
    }

    /// Replays every entry of `entries` in order.
    ///
    /// Stops at the first read error or invariant violation.
    pub fn run<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<AccessEntry>>,
    {
        for entry in entries {
            self.step(&entry?)?;
        }
        Ok(())
    }

    /// Replays one access entry.
    ///
    /// Entries without a usable physical address or with an impossible tag
    /// byte are counted and skipped.
    pub fn step(&mut self, entry: &AccessEntry) -> Result<()> {
        let layout = *self.hierarchy.layout();
        if self.stats.record(entry, &layout) != EntryClass::Simulated {
            return Ok(());
        }
        if !entry.tag_is_well_formed() {
            self.stats.malformed += 1;
            warn!(kind = %entry.kind, tag = entry.tag, paddr = entry.paddr, "skipping entry with impossible tag");
            return Ok(());
        }

        let start = entry.paddr;
        let end = start + u64::from(entry.size.max(1));
        let mut line = layout.line_of(PhysAddr(start));
        while line.val() < end {
            let mask = layout.subblock_mask(line, start, end);
            self.access_line(entry, line, mask)?;
            line = PhysAddr(line.val() + layout.line_bytes());
        }
        Ok(())
    }

    fn access_line(&mut self, entry: &AccessEntry, line: PhysAddr, mask: u16) -> Result<()> {
        self.stats.line_accesses += 1;
        let target = if entry.kind.is_instruction() {
            self.caches.l1_i
        } else {
            self.caches.l1_d
        };
        let tag = entry.tag == 1;

        self.hierarchy
            .notify_peers_coherence_flush(target, line, entry.kind.is_store())?;
        let slot = self.hierarchy.request(target, line)?;

        match entry.kind {
            AccessKind::Instr => {
                let tagged = slot.tags.data & mask;
                if tagged != 0 {
                    self.stats.tag_mismatches += u64::from(tagged.count_ones());
                    debug!(%line, mask, "instruction fetch from tagged memory");
                }
            }
            AccessKind::Load => {}
            AccessKind::CLoad => {
                let tags = slot.tags;
                self.observe_capability(target, line, mask, tag, tags)?;
            }
            AccessKind::Store | AccessKind::CStore => {
                slot.tags.assign(mask, tag);
                slot.dirty = true;
            }
        }
        Ok(())
    }

    /// Reconciles the tags a capability load observed with the cached copy.
    ///
    /// Unknown tags are learned. Known tags that disagree are corrected and
    /// the line is dirtied so the correction reaches tag memory as a write.
    /// Either way, peer copies are invalidated first so that no stale copy
    /// can later be forwarded over the new state.
    fn observe_capability(
        &mut self,
        target: DeviceId,
        line: PhysAddr,
        mask: u16,
        tag: bool,
        tags: TagBits,
    ) -> Result<()> {
        let expected = if tag { mask } else { 0 };
        let mismatched = (tags.data ^ expected) & tags.known & mask;
        let unknown = mask & !tags.known;
        if mismatched == 0 && unknown == 0 {
            return Ok(());
        }
        self.stats.tag_mismatches += u64::from(mismatched.count_ones());
        self.stats.tags_adopted += u64::from(unknown.count_ones());
        if mismatched != 0 {
            warn!(%line, %tags, observed = expected, "capability load contradicts known tags");
        }

        self.hierarchy
            .notify_peers_coherence_flush(target, line, true)?;
        let name = self.hierarchy.cache(target)?.name().to_owned();
        let slot = self
            .hierarchy
            .line_mut(target, line)?
            .ok_or(InvariantViolation::LineNotPresent {
                device: name,
                line_addr: line.val(),
            })?;
        slot.tags.assign(mask, tag);
        if mismatched != 0 {
            slot.dirty = true;
        }
        Ok(())
    }
}
