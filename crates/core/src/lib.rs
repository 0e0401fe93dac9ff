//! Capability-tag cache hierarchy simulator library.
//!
//! This crate replays memory-access traces through a cache hierarchy that
//! tracks CHERI capability tags as set, clear or unknown. It includes:
//! 1. **Tag Memory:** The bit-packed two-plane tag table and the tag controller
//!    that records every request reaching it.
//! 2. **Caches:** Set-associative levels with true LRU, write-back and
//!    back-invalidation keeping the hierarchy inclusive.
//! 3. **Coherence:** Peer flushing so that at most one cache holds a line dirty.
//! 4. **Traces:** Fixed-size access and request records and their streams.
//! 5. **Simulation:** Replay drivers, configuration and statistics.

/// Common types (addresses, tags, layout, errors).
pub mod common;
/// Configuration structures and defaults.
pub mod config;
/// Tag-tracking cache levels.
pub mod cache;
/// Device arena, miss handling and coherence.
pub mod hierarchy;
/// Tag table and root devices.
pub mod memory;
/// Replay drivers and reports.
pub mod sim;
/// Trace and request statistics.
pub mod stats;
/// Trace records and record streams.
pub mod trace;

/// Root configuration type; use `Config::default()` or load it from JSON.
pub use crate::config::Config;
/// Top-level error type.
pub use crate::common::SimError;
/// Device tree of a run.
pub use crate::hierarchy::Hierarchy;
/// Access-trace replay driver.
pub use crate::sim::Simulator;
