//! Hierarchy Invariant Unit Tests.
//!
//! Random traces over a handful of lines stress eviction, back-invalidation
//! and peer flushing on tiny caches. After every trace the hierarchy must
//! still be inclusive, have at most one dirty copy of a line per parent, keep
//! its LRU ranks a permutation and its tag table consistent. Replaying the
//! emitted request trace must never contradict what tag memory knew.
//!
//! The second half damages a hierarchy on purpose and checks that the
//! self-check notices.

use std::io::Cursor;

use proptest::prelude::*;
use tagsim_core::common::{InvariantViolation, SimError};
use tagsim_core::memory::TagTable;
use tagsim_core::sim::TagCacheReplay;
use tagsim_core::trace::{AccessEntry, AccessKind};

use crate::common::entries::{load, store};
use crate::common::harness::{TestContext, cache, line, line_addr, small_config, small_layout};

const LINES: u64 = 8;

fn arb_entry() -> impl Strategy<Value = AccessEntry> {
    (0usize..5, 0..LINES, 0u64..128, 1u16..=64, any::<bool>()).prop_map(
        |(kind, n, offset, size, tag)| {
            let kind = AccessKind::ALL[kind];
            if kind.may_carry_tag() {
                let paddr = line(n) + (offset & !15);
                AccessEntry::new(kind, u8::from(tag), 16, paddr, paddr)
            } else {
                let paddr = line(n) + offset;
                AccessEntry::new(kind, 0, size, paddr, paddr)
            }
        },
    )
}

fn snapshot(seed: &[u8]) -> TagTable {
    let layout = small_layout();
    let mut bytes = vec![0u8; layout.plane_bytes()];
    bytes[..seed.len()].copy_from_slice(seed);
    TagTable::from_snapshot(layout, Cursor::new(bytes)).unwrap()
}

// ══════════════════════════════════════════════════════════
// 1. Random traces
// ══════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_traces_preserve_invariants(
        trace in prop::collection::vec(arb_entry(), 1..300),
        seed in prop::option::of(prop::collection::vec(any::<u8>(), LINES as usize)),
        with_l2 in any::<bool>(),
    ) {
        let l2 = with_l2.then(|| cache(4, 2));
        let config = small_config(cache(2, 1), l2);
        let table = seed.as_deref().map_or_else(|| TagTable::new(small_layout()), snapshot);
        let initial = table.clone();

        let mut ctx = TestContext::with_table(&config, table);
        ctx.run(&trace);
        prop_assert!(ctx.table().is_consistent());

        let requests = ctx.requests().to_vec();
        let mut replay = TagCacheReplay::new(&config, initial).unwrap();
        replay.run(requests.into_iter().map(Ok)).unwrap();
        prop_assert_eq!(replay.stats().tag_mismatches, 0);
    }

    #[test]
    fn known_tags_in_memory_only_grow_without_writes(
        trace in prop::collection::vec(arb_entry(), 1..200),
    ) {
        let config = small_config(cache(2, 1), Some(cache(4, 2)));
        let reads_only: Vec<AccessEntry> = trace
            .into_iter()
            .filter(|e| !e.kind.is_store())
            .collect();
        let mut ctx = TestContext::new(&config);
        let mut known = 0;
        for entry in &reads_only {
            ctx.run(std::slice::from_ref(entry));
            let now = ctx.table().known_count();
            prop_assert!(now >= known);
            known = now;
        }
    }
}

// ══════════════════════════════════════════════════════════
// 2. Deliberate damage
// ══════════════════════════════════════════════════════════

fn damaged() -> TestContext {
    let mut ctx = TestContext::new(&small_config(cache(4, 2), Some(cache(16, 4))));
    ctx.run(&[load(line(0), 8), store(line(1), 8)]);
    ctx
}

#[test]
fn two_dirty_children_are_detected() {
    let ctx = damaged();
    let caches = ctx.sim.caches();
    let (mut hierarchy, _) = ctx.sim.into_parts();
    let _ = hierarchy.request(caches.l1_i, line_addr(1)).unwrap();
    hierarchy
        .line_mut(caches.l1_i, line_addr(1))
        .unwrap()
        .unwrap()
        .dirty = true;
    hierarchy
        .line_mut(caches.l1_d, line_addr(1))
        .unwrap()
        .unwrap()
        .dirty = true;

    let err = hierarchy.check_invariants().unwrap_err();
    assert!(matches!(
        err,
        SimError::Invariant(InvariantViolation::MultipleDirtyCopies { count: 2, .. })
    ));
}

#[test]
fn missing_parent_copy_is_detected() {
    let ctx = damaged();
    let caches = ctx.sim.caches();
    let (mut hierarchy, _) = ctx.sim.into_parts();
    hierarchy
        .line_mut(caches.l2.unwrap(), line_addr(0))
        .unwrap()
        .unwrap()
        .invalidate();

    let err = hierarchy.check_invariants().unwrap_err();
    assert!(matches!(
        err,
        SimError::Invariant(InvariantViolation::InclusionBroken { .. })
    ));
}

#[test]
fn contradicting_clean_copy_is_detected() {
    let ctx = damaged();
    let caches = ctx.sim.caches();
    let (mut hierarchy, _) = ctx.sim.into_parts();
    hierarchy
        .line_mut(caches.l2.unwrap(), line_addr(0))
        .unwrap()
        .unwrap()
        .tags
        .assign(0b1, true);
    hierarchy
        .line_mut(caches.l1_d, line_addr(0))
        .unwrap()
        .unwrap()
        .tags
        .assign(0b1, false);

    assert!(hierarchy.check_invariants().is_err());
}

#[test]
fn broken_lru_ranks_are_detected() {
    let ctx = damaged();
    let caches = ctx.sim.caches();
    let (mut hierarchy, _) = ctx.sim.into_parts();
    let slot = hierarchy
        .line_mut(caches.l1_d, line_addr(0))
        .unwrap()
        .unwrap();
    slot.lru_rank = 7;

    let err = hierarchy.check_invariants().unwrap_err();
    assert!(matches!(
        err,
        SimError::Invariant(InvariantViolation::LruCorrupted { .. })
    ));
}
