//! Memory Layout Unit Tests.
//!
//! Verifies geometry validation, derived sizes and the sub-block masks that
//! map a byte range onto the capabilities of a line.

use rstest::rstest;
use tagsim_core::common::{MemoryLayout, PhysAddr, SimError};

use crate::common::harness::{BASE, LINE, small_layout};

// ══════════════════════════════════════════════════════════
// 1. Validation
// ══════════════════════════════════════════════════════════

#[test]
fn default_layout_matches_tagged_dram() {
    let layout = MemoryLayout::default();
    assert_eq!(layout.base(), 0x8000_0000);
    assert_eq!(layout.size(), 2 * 1024 * 1024 * 1024);
    assert_eq!(layout.caps_per_line(), 8);
    assert_eq!(layout.full_line_mask(), 0xFF);
    assert_eq!(layout.plane_bytes(), (layout.size() / 16 / 8) as usize);
}

#[rstest]
#[case::cap_not_power_of_two(BASE, 1 << 20, 24, 128)]
#[case::line_smaller_than_cap(BASE, 1 << 20, 16, 8)]
#[case::too_many_subblocks(BASE, 1 << 20, 4, 128)]
#[case::size_not_multiple(BASE, 1000, 16, 128)]
#[case::empty_memory(BASE, 0, 16, 128)]
#[case::misaligned_base(BASE + 64, 1 << 20, 16, 128)]
fn new_rejects_bad_geometry(
    #[case] base: u64,
    #[case] size: u64,
    #[case] cap: u64,
    #[case] line: u64,
) {
    let err = MemoryLayout::new(base, size, cap, line).unwrap_err();
    assert!(matches!(err, SimError::Config(_)), "got {err}");
}

#[test]
fn sixteen_subblocks_fill_the_mask() {
    let layout = MemoryLayout::new(BASE, 1 << 20, 8, 128).unwrap();
    assert_eq!(layout.caps_per_line(), 16);
    assert_eq!(layout.full_line_mask(), u16::MAX);
}

// ══════════════════════════════════════════════════════════
// 2. Address helpers
// ══════════════════════════════════════════════════════════

#[test]
fn contains_is_half_open() {
    let layout = small_layout();
    assert!(layout.contains(BASE));
    assert!(layout.contains(layout.end() - 1));
    assert!(!layout.contains(layout.end()));
    assert!(!layout.contains(BASE - 1));
}

#[test]
fn line_of_aligns_down() {
    let layout = small_layout();
    assert_eq!(layout.line_of(PhysAddr(BASE + LINE + 77)), PhysAddr(BASE + LINE));
}

// ══════════════════════════════════════════════════════════
// 3. Sub-block masks
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::first_byte(0, 1, 0b0000_0001)]
#[case::one_capability(16, 32, 0b0000_0010)]
#[case::straddles_two(12, 20, 0b0000_0011)]
#[case::last_capability(120, 128, 0b1000_0000)]
#[case::whole_line(0, 128, 0b1111_1111)]
#[case::beyond_line(100, 300, 0b1100_0000)]
#[case::empty_range(0, 0, 0)]
fn subblock_mask_covers_overlapping_capabilities(
    #[case] start: u64,
    #[case] end: u64,
    #[case] expected: u16,
) {
    let layout = small_layout();
    let line = PhysAddr(BASE);
    assert_eq!(layout.subblock_mask(line, BASE + start, BASE + end), expected);
}

#[test]
fn subblock_mask_of_access_starting_in_previous_line() {
    let layout = small_layout();
    let second = PhysAddr(BASE + LINE);
    assert_eq!(layout.subblock_mask(second, BASE + 120, BASE + 140), 0b0000_0001);
}
