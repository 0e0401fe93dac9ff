//! Configuration Unit Tests.
//!
//! Verifies JSON defaults, the optional L2 and geometry validation.

use std::io::Write;

use pretty_assertions::assert_eq;
use tagsim_core::common::SimError;
use tagsim_core::config::{CacheConfig, Config};

use crate::common::harness::{cache, small_config};

// ══════════════════════════════════════════════════════════
// 1. Defaults
// ══════════════════════════════════════════════════════════

#[test]
fn default_geometry() {
    let config = Config::default();
    assert_eq!(config.memory.base_paddr, 0x8000_0000);
    assert_eq!(config.memory.size_bytes, 2 << 30);
    assert_eq!(config.memory.cap_bytes, 16);
    assert_eq!(config.memory.line_bytes, 128);
    assert_eq!(config.hierarchy.l1_i, CacheConfig { size_bytes: 64 * 1024, ways: 4 });
    assert_eq!(config.hierarchy.l1_d, CacheConfig { size_bytes: 64 * 1024, ways: 4 });
    assert_eq!(config.hierarchy.l2, Some(CacheConfig { size_bytes: 1 << 20, ways: 8 }));
    assert_eq!(config.tag_cache, CacheConfig { size_bytes: 32 * 1024, ways: 4 });
    config.validate().unwrap();
}

#[test]
fn empty_json_is_the_default() {
    let config: Config = serde_json::from_str("{}").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let json = r#"{ "memory": { "size_bytes": 1048576 }, "hierarchy": { "l1_d": { "size_bytes": 256, "ways": 2 } } }"#;
    let config: Config = serde_json::from_str(json).unwrap();
    assert_eq!(config.memory.size_bytes, 1 << 20);
    assert_eq!(config.memory.line_bytes, 128);
    assert_eq!(config.hierarchy.l1_d, CacheConfig { size_bytes: 256, ways: 2 });
    assert_eq!(config.hierarchy.l1_i, Config::default().hierarchy.l1_i);
    assert!(config.hierarchy.l2.is_some());
}

#[test]
fn null_l2_disables_it() {
    let config: Config = serde_json::from_str(r#"{ "hierarchy": { "l2": null } }"#).unwrap();
    assert_eq!(config.hierarchy.l2, None);
    config.validate().unwrap();
}

// ══════════════════════════════════════════════════════════
// 2. Validation
// ══════════════════════════════════════════════════════════

#[test]
fn zero_ways_is_rejected() {
    let config = small_config(cache(2, 0), None);
    let err = config.validate().unwrap_err();
    assert!(matches!(err, SimError::Config(ref m) if m.contains("l1_i")), "got {err}");
}

#[test]
fn partial_sets_are_rejected() {
    let config = small_config(cache(2, 1), Some(cache(3, 2)));
    let err = config.validate().unwrap_err();
    assert!(matches!(err, SimError::Config(ref m) if m.contains("l2")), "got {err}");
}

#[test]
fn bad_memory_geometry_is_rejected() {
    let mut config = Config::default();
    config.memory.line_bytes = 96;
    assert!(matches!(config.validate(), Err(SimError::Config(_))));
}

// ══════════════════════════════════════════════════════════
// 3. Files
// ══════════════════════════════════════════════════════════

#[test]
fn from_json_file_round_trips_serialized_config() {
    let config = small_config(cache(2, 2), Some(cache(8, 4)));
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string_pretty(&config).unwrap().as_bytes())
        .unwrap();

    let loaded = Config::from_json_file(file.path()).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn from_json_file_reports_syntax_errors_as_config_errors() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{ \"memory\": ").unwrap();
    let err = Config::from_json_file(file.path()).unwrap_err();
    assert!(matches!(err, SimError::Config(_)), "got {err}");
}

#[test]
fn from_json_file_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_json_file(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, SimError::File { .. }), "got {err}");
}
