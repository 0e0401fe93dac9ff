//! Record Layout Unit Tests.
//!
//! Pins the byte layout of both record kinds to the producer's packed
//! little-endian structures and checks rejection of impossible field values.

use pretty_assertions::assert_eq;
use rstest::rstest;
use tagsim_core::common::{PhysAddr, SimError, TagBits};
use tagsim_core::trace::{AccessEntry, AccessKind, LlcRequest, Record, RequestKind};

// ══════════════════════════════════════════════════════════
// 1. Access entries
// ══════════════════════════════════════════════════════════

#[test]
fn access_entry_layout() {
    let entry = AccessEntry::new(AccessKind::CStore, 1, 0x0010, 0x0000_7FFF_1234_5670, 0x8000_1230);
    let mut bytes = [0xAAu8; 24];
    entry.encode(&mut bytes);

    assert_eq!(
        bytes,
        [
            4, 1, 0x10, 0x00, 0, 0, 0, 0, //
            0x70, 0x56, 0x34, 0x12, 0xFF, 0x7F, 0x00, 0x00, //
            0x30, 0x12, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        ]
    );
    assert_eq!(AccessEntry::decode(&bytes).unwrap(), entry);
    assert_eq!(AccessEntry::SIZE, 24);
}

#[rstest]
#[case(0, AccessKind::Instr)]
#[case(1, AccessKind::Load)]
#[case(2, AccessKind::Store)]
#[case(3, AccessKind::CLoad)]
#[case(4, AccessKind::CStore)]
fn access_kind_codes(#[case] code: u8, #[case] kind: AccessKind) {
    assert_eq!(AccessKind::from_u8(code).unwrap(), kind);
    assert_eq!(kind as u8, code);
}

#[test]
fn unknown_access_kind_is_rejected() {
    let mut bytes = [0u8; 24];
    bytes[0] = 5;
    let err = AccessEntry::decode(&bytes).unwrap_err();
    assert!(matches!(err, SimError::InvalidRecord { record: "access", .. }));
}

#[rstest]
#[case::plain_untagged(AccessKind::Load, 0, true)]
#[case::plain_tagged(AccessKind::Store, 1, false)]
#[case::fetch_tagged(AccessKind::Instr, 1, false)]
#[case::capability_tagged(AccessKind::CLoad, 1, true)]
#[case::capability_untagged(AccessKind::CStore, 0, true)]
#[case::garbage(AccessKind::CStore, 7, false)]
fn tag_byte_validity(#[case] kind: AccessKind, #[case] tag: u8, #[case] ok: bool) {
    let entry = AccessEntry::new(kind, tag, 16, 0, 0x8000_0000);
    assert_eq!(entry.tag_is_well_formed(), ok);
}

#[test]
fn kind_predicates() {
    assert!(AccessKind::Store.is_store() && AccessKind::CStore.is_store());
    assert!(!AccessKind::CLoad.is_store());
    assert!(AccessKind::Instr.is_instruction());
    assert_eq!(AccessKind::CLoad.to_string(), "CLOAD");
}

// ══════════════════════════════════════════════════════════
// 2. LLC requests
// ══════════════════════════════════════════════════════════

#[test]
fn llc_request_layout() {
    let request = LlcRequest::write(
        PhysAddr(0x8000_0080),
        128,
        TagBits::new(0x0081, 0x00C3).unwrap(),
    );
    let mut bytes = [0xAAu8; 16];
    request.encode(&mut bytes);

    assert_eq!(
        bytes,
        [
            1, 0, 0x80, 0x00, 0x81, 0x00, 0xC3, 0x00, //
            0x80, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        ]
    );
    assert_eq!(LlcRequest::decode(&bytes).unwrap(), request);
    assert_eq!(request.kind, RequestKind::Write);
}

#[test]
fn request_with_unknown_set_tag_is_rejected() {
    let mut bytes = [0u8; 16];
    bytes[4] = 0b10;
    bytes[6] = 0b01;
    let err = LlcRequest::decode(&bytes).unwrap_err();
    assert!(matches!(err, SimError::InvalidRecord { record: "request", .. }));
}

#[test]
fn unknown_request_kind_is_rejected() {
    let mut bytes = [0u8; 16];
    bytes[0] = 2;
    assert!(LlcRequest::decode(&bytes).is_err());
}
