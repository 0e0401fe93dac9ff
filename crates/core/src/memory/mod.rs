//! Tag memory and the devices at the root of a hierarchy.

/// Request-emitting tag controller.
pub mod controller;
/// Uncompressed tag cache.
pub mod tag_cache;
/// Bit-packed tag table.
pub mod tag_table;

pub use controller::{ControllerInterface, ControllerStats};
pub use tag_cache::{TagCacheDevice, TagCacheStats};
pub use tag_table::TagTable;
