//! Global simulator constants.
//!
//! Values here describe the tagged memory the traces were recorded on and the
//! structural limits of the device tree. Sizes that users may tune live in
//! [`crate::config`] and only default to these values.

/// Size of one capability in bytes; one tag bit covers this many bytes.
pub const CAP_SIZE_BYTES: u64 = 16;

/// Default cache line size in bytes.
pub const CACHE_LINE_BYTES: u64 = 128;

/// Physical address where tagged DRAM begins.
pub const BASE_PADDR: u64 = 0x8000_0000;

/// Size of tagged DRAM in bytes (2 GiB).
pub const MEMORY_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Upper bound on capability sub-blocks per line; tag masks are `u16`.
pub const MAX_SUBBLOCKS_PER_LINE: u64 = 16;

/// Maximum number of child devices one device may have.
pub const MAX_CHILDREN: usize = 2;

/// Line tag value marking an empty cache slot.
pub const INVALID_LINE_TAG: u64 = u64::MAX;

/// Bytes per page when reporting page-level statistics.
pub const PAGE_SIZE: u64 = 4096;
