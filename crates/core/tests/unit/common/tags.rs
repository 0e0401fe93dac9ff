//! Tag Bits Unit Tests.
//!
//! Verifies the three-valued tag pair: construction, per-sub-block state,
//! masked assignment and the checks that guard invisible updates.

use tagsim_core::common::{SimError, TagBits, TagState};

// ══════════════════════════════════════════════════════════
// 1. Construction
// ══════════════════════════════════════════════════════════

#[test]
fn new_accepts_data_within_known() {
    let tags = TagBits::new(0b0101, 0b0111).unwrap();
    assert!(tags.is_consistent());
}

#[test]
fn new_rejects_data_outside_known() {
    let err = TagBits::new(0b1000, 0b0111).unwrap_err();
    assert!(err.is_invariant(), "got {err}");
    assert!(matches!(err, SimError::Invariant(_)));
}

#[test]
fn unknown_knows_nothing() {
    let tags = TagBits::unknown();
    assert_eq!(tags.known, 0);
    assert_eq!(tags.data, 0);
    assert_eq!(tags.state(0), TagState::Unknown);
}

// ══════════════════════════════════════════════════════════
// 2. Per-sub-block state
// ══════════════════════════════════════════════════════════

#[test]
fn set_state_moves_between_all_three_values() {
    let mut tags = TagBits::unknown();

    tags.set_state(3, TagState::Set);
    assert_eq!(tags.state(3), TagState::Set);
    assert_eq!((tags.data, tags.known), (0b1000, 0b1000));

    tags.set_state(3, TagState::Clear);
    assert_eq!(tags.state(3), TagState::Clear);
    assert_eq!((tags.data, tags.known), (0, 0b1000));

    tags.set_state(3, TagState::Unknown);
    assert_eq!(tags.state(3), TagState::Unknown);
    assert_eq!((tags.data, tags.known), (0, 0));
}

#[test]
fn assign_marks_mask_known() {
    let mut tags = TagBits::new(0b0001, 0b0001).unwrap();
    tags.assign(0b0110, true);
    assert_eq!((tags.data, tags.known), (0b0111, 0b0111));

    tags.assign(0b0011, false);
    assert_eq!((tags.data, tags.known), (0b0100, 0b0111));
    assert!(tags.is_consistent());
}

#[test]
fn tag_state_from_tag() {
    assert_eq!(TagState::from_tag(true), TagState::Set);
    assert_eq!(TagState::from_tag(false), TagState::Clear);
    assert!(!TagState::Unknown.is_known());
}

// ══════════════════════════════════════════════════════════
// 3. Knowledge comparisons
// ══════════════════════════════════════════════════════════

#[test]
fn covers_requires_superset_of_known_bits() {
    let wide = TagBits::new(0b01, 0b11).unwrap();
    let narrow = TagBits::new(0b01, 0b01).unwrap();
    assert!(wide.covers(narrow));
    assert!(!narrow.covers(wide));
}

#[test]
fn agrees_with_compares_only_own_known_bits() {
    let narrow = TagBits::new(0b01, 0b01).unwrap();
    let other = TagBits::new(0b11, 0b11).unwrap();
    assert!(narrow.agrees_with(other));

    let contradicting = TagBits::new(0b10, 0b11).unwrap();
    assert!(!narrow.agrees_with(contradicting));
}
