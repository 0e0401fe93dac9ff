//! Statistics Unit Tests.
//!
//! Verifies entry classification, per-kind counters and request-trace
//! footprint accounting.

use rstest::rstest;
use tagsim_core::common::{PhysAddr, TagBits};
use tagsim_core::stats::{EntryClass, RequestStats, TraceStats};
use tagsim_core::trace::{AccessEntry, AccessKind, LlcRequest};

use crate::common::harness::{BASE, MEMORY, small_layout};

#[rstest]
#[case::no_paddr(0, 8, EntryClass::Missing)]
#[case::inside(BASE, 8, EntryClass::Simulated)]
#[case::last_byte(BASE + MEMORY - 1, 1, EntryClass::Simulated)]
#[case::runs_past_end(BASE + MEMORY - 4, 8, EntryClass::Invalid)]
#[case::below(BASE - 8, 8, EntryClass::Invalid)]
#[case::above(BASE + MEMORY, 8, EntryClass::Invalid)]
#[case::wraps(u64::MAX - 2, 8, EntryClass::Invalid)]
fn entry_classification(#[case] paddr: u64, #[case] size: u16, #[case] class: EntryClass) {
    let entry = AccessEntry::new(AccessKind::Load, 0, size, 1, paddr);
    assert_eq!(EntryClass::of(&entry, &small_layout()), class);
}

#[test]
fn trace_stats_count_per_kind() {
    let layout = small_layout();
    let mut stats = TraceStats::default();
    let entries = [
        AccessEntry::new(AccessKind::Instr, 0, 4, BASE, BASE),
        AccessEntry::new(AccessKind::CLoad, 1, 16, 0x10, 0),
        AccessEntry::new(AccessKind::CLoad, 0, 16, 0x10, BASE - 16),
        AccessEntry::new(AccessKind::Store, 0, 8, 0x20, BASE + 64),
    ];
    for e in &entries {
        let _ = stats.record(e, &layout);
    }

    assert_eq!(stats.entries, 4);
    assert_eq!(stats.missing, 1);
    assert_eq!(stats.invalid, 1);
    assert_eq!(stats.paddr_equals_vaddr, 1);
    assert_eq!(stats.kind(AccessKind::CLoad).total, 2);
    assert_eq!(stats.kind(AccessKind::CLoad).missing, 1);
    assert_eq!(stats.kind(AccessKind::CLoad).invalid, 1);
    assert_eq!(stats.kind(AccessKind::Instr).total, 1);
    assert_eq!(stats.kind(AccessKind::CStore).total, 0);
}

#[test]
fn request_stats_footprint() {
    let mut stats = RequestStats::default();
    let tags = TagBits::new(0b01, 0b11).unwrap();
    for addr in [BASE, BASE, BASE + 128, BASE + 4096] {
        stats.record(&LlcRequest::read(PhysAddr(addr), 128, tags));
    }
    stats.record(&LlcRequest::write(PhysAddr(BASE), 128, tags));

    assert_eq!((stats.reads, stats.writes), (4, 1));
    assert_eq!(stats.requests(), 5);
    assert_eq!(stats.distinct_lines(), 3);
    assert_eq!(stats.distinct_pages(), 2);
    assert_eq!(stats.tags_known, 10);
    assert_eq!(stats.tags_set, 5);
}
