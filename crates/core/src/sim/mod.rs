//! Replay drivers and end-of-run reports.

/// Request-trace replay through the uncompressed tag cache.
pub mod replay;
/// Configuration and device statistics printing.
pub mod report;
/// Access-trace replay through the cache hierarchy.
pub mod simulator;

pub use replay::{ReplayStats, TagCacheReplay};
pub use simulator::Simulator;
