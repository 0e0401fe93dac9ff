//! Trace and request statistics.
//!
//! This module tracks what went into and came out of a run. It provides:
//! 1. **Trace Statistics:** Entry counts by kind, entries skipped for a missing
//!    or out-of-range physical address, and tag observations made while replaying.
//! 2. **Request Statistics:** Read/write mix and footprint of an LLC request trace.
//!
//! Per-device counters live with the devices and are printed by
//! [`crate::sim::report`].

use std::collections::HashSet;

use crate::common::MemoryLayout;
use crate::common::constants::PAGE_SIZE;
use crate::trace::{AccessEntry, AccessKind, LlcRequest, RequestKind};

/// How the replay driver treats an access entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryClass {
    /// The entry reaches the cache hierarchy.
    Simulated,
    /// The tracer recorded no physical address.
    Missing,
    /// The access falls outside tagged memory.
    Invalid,
}

impl EntryClass {
    /// Classifies an entry against the memory layout.
    ///
    /// An access is invalid when any of its bytes lies outside tagged memory.
    pub fn of(entry: &AccessEntry, layout: &MemoryLayout) -> Self {
        if entry.paddr == 0 {
            return Self::Missing;
        }
        let len = u64::from(entry.size.max(1));
        match entry.paddr.checked_add(len) {
            Some(end) if layout.contains(entry.paddr) && end <= layout.end() => Self::Simulated,
            _ => Self::Invalid,
        }
    }
}

/// Counters for one access kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KindStats {
    /// Entries of this kind.
    pub total: u64,
    /// Entries without a physical address.
    pub missing: u64,
    /// Entries outside tagged memory.
    pub invalid: u64,
}

/// Statistics of an access trace and its replay.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceStats {
    /// Entries read.
    pub entries: u64,
    /// Entries without a physical address.
    pub missing: u64,
    /// Entries outside tagged memory.
    pub invalid: u64,
    /// Entries whose physical address equals the virtual one.
    pub paddr_equals_vaddr: u64,
    /// Per-kind counters, indexed by `AccessKind as usize`.
    pub by_kind: [KindStats; 5],
    /// Entries skipped for an impossible tag byte.
    pub malformed: u64,
    /// Line accesses issued to the hierarchy.
    pub line_accesses: u64,
    /// Known tags contradicted by an access.
    pub tag_mismatches: u64,
    /// Unknown tags learned from capability loads.
    pub tags_adopted: u64,
}

impl TraceStats {
    /// Counts an entry and classifies it.
    pub fn record(&mut self, entry: &AccessEntry, layout: &MemoryLayout) -> EntryClass {
        let class = EntryClass::of(entry, layout);
        let kind = &mut self.by_kind[entry.kind as usize];
        self.entries += 1;
        kind.total += 1;
        if entry.paddr == entry.vaddr {
            self.paddr_equals_vaddr += 1;
        }
        match class {
            EntryClass::Missing => {
                self.missing += 1;
                kind.missing += 1;
            }
            EntryClass::Invalid => {
                self.invalid += 1;
                kind.invalid += 1;
            }
            EntryClass::Simulated => {}
        }
        class
    }

    /// Counters of one access kind.
    pub const fn kind(&self, kind: AccessKind) -> &KindStats {
        &self.by_kind[kind as usize]
    }

    /// Prints the statistics report to stdout.
    pub fn print(&self) {
        println!("\n==========================================================");
        println!("TRACE STATISTICS");
        println!("==========================================================");
        println!("entries                  {}", self.entries);
        println!(
            "no paddr                 {} ({:.2}%)",
            self.missing,
            percent(self.missing, self.entries)
        );
        println!(
            "invalid paddr            {} ({:.2}%)",
            self.invalid,
            percent(self.invalid, self.entries)
        );
        println!("paddr == vaddr           {}", self.paddr_equals_vaddr);
        println!("malformed                {}", self.malformed);
        println!("----------------------------------------------------------");
        for kind in AccessKind::ALL {
            let k = self.kind(kind);
            println!(
                "  {:<6} entries: {:<10} no paddr: {:<10} invalid paddr: {}",
                kind.name(),
                k.total,
                k.missing,
                k.invalid
            );
        }
        if self.line_accesses > 0 {
            println!("----------------------------------------------------------");
            println!("line accesses            {}", self.line_accesses);
            println!("tag mismatches           {}", self.tag_mismatches);
            println!("tags adopted             {}", self.tags_adopted);
        }
        println!("==========================================================");
    }
}

/// Statistics of an LLC request trace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestStats {
    /// Read requests.
    pub reads: u64,
    /// Write requests.
    pub writes: u64,
    /// Tags set across all requests.
    pub tags_set: u64,
    /// Known tags across all requests.
    pub tags_known: u64,
    lines: HashSet<u64>,
    pages: HashSet<u64>,
}

impl RequestStats {
    /// Counts one request.
    pub fn record(&mut self, request: &LlcRequest) {
        match request.kind {
            RequestKind::Read => self.reads += 1,
            RequestKind::Write => self.writes += 1,
        }
        self.tags_set += u64::from(request.tags.data.count_ones());
        self.tags_known += u64::from(request.tags.known.count_ones());
        let _ = self.lines.insert(request.addr.val());
        let _ = self.pages.insert(request.addr.val() / PAGE_SIZE);
    }

    /// Total requests.
    pub const fn requests(&self) -> u64 {
        self.reads + self.writes
    }

    /// Distinct lines touched.
    pub fn distinct_lines(&self) -> usize {
        self.lines.len()
    }

    /// Distinct pages touched.
    pub fn distinct_pages(&self) -> usize {
        self.pages.len()
    }

    /// Prints the statistics report to stdout.
    pub fn print(&self) {
        println!("\n==========================================================");
        println!("REQUEST STATISTICS");
        println!("==========================================================");
        println!("requests                 {}", self.requests());
        println!(
            "reads                    {} ({:.2}%)",
            self.reads,
            percent(self.reads, self.requests())
        );
        println!(
            "writes                   {} ({:.2}%)",
            self.writes,
            percent(self.writes, self.requests())
        );
        println!("distinct lines           {}", self.distinct_lines());
        println!("distinct pages           {}", self.distinct_pages());
        println!("tags known               {}", self.tags_known);
        println!("tags set                 {}", self.tags_set);
        println!("==========================================================");
    }
}

/// `part` as a percentage of `whole`, 0 when `whole` is 0.
pub(crate) fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
