//! Uncompressed Tag Cache Unit Tests.
//!
//! Verifies residency tracking in front of the tag table: hits, misses,
//! dirty write-backs on eviction, and that tag values always come from the
//! table.

use tagsim_core::common::TagBits;
use tagsim_core::memory::{TagCacheDevice, TagTable};

use crate::common::harness::{cache, line_addr, small_layout};

/// One set of two ways.
fn tag_cache() -> TagCacheDevice {
    TagCacheDevice::new("TC", &cache(2, 2), TagTable::new(small_layout()))
}

#[test]
fn reads_count_hits_and_misses() {
    let mut tc = tag_cache();
    let _ = tc.read(line_addr(0)).unwrap();
    let _ = tc.read(line_addr(0)).unwrap();
    let _ = tc.read(line_addr(1)).unwrap();
    assert_eq!((tc.stats.hits, tc.stats.misses), (1, 2));
    assert_eq!(tc.stats.write_backs, 0);
    assert!((tc.stats.miss_rate() - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn evicting_a_written_line_counts_a_write_back() {
    let mut tc = tag_cache();
    let tags = TagBits::new(0b1, 0b1).unwrap();
    tc.write(line_addr(0), tags).unwrap();
    let _ = tc.read(line_addr(1)).unwrap();
    let _ = tc.read(line_addr(2)).unwrap();

    assert_eq!(tc.stats.write_backs, 1);
    assert_eq!(tc.read(line_addr(0)).unwrap(), tags, "values live in the table");
}

#[test]
fn evicting_clean_lines_writes_nothing_back() {
    let mut tc = tag_cache();
    for n in 0..6 {
        let _ = tc.read(line_addr(n)).unwrap();
    }
    assert_eq!(tc.stats.misses, 6);
    assert_eq!(tc.stats.write_backs, 0);
}

#[test]
fn invisible_write_does_not_touch_residency() {
    let mut tc = tag_cache();
    tc.write_invisible(line_addr(3), TagBits::new(0, 0b1).unwrap())
        .unwrap();
    assert_eq!((tc.stats.hits, tc.stats.misses), (0, 0));
    assert_eq!(tc.table().known_count(), 1);
    assert_eq!(tc.ways(), 2);
    assert_eq!(tc.size_bytes(), 256);
}
