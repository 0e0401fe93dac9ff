//! Physical address type.
//!
//! This module defines a strong type for simulated physical addresses. It provides:
//! 1. **Type Safety:** Keeps trace addresses apart from raw counters and indices.
//! 2. **Alignment Helpers:** Rounds addresses to line or capability granularity.

use std::fmt;

/// A physical address in the simulated tagged memory.
///
/// Trace entries carry physical addresses as plain `u64`; they are wrapped as
/// soon as they enter the hierarchy so that line and capability arithmetic is
/// never confused with set indices or counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    #[inline]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline]
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Rounds the address down to a multiple of `granule`.
    ///
    /// # Arguments
    ///
    /// * `granule` - Alignment in bytes; must be a power of two.
    #[inline]
    pub const fn align_down(self, granule: u64) -> Self {
        Self(self.0 & !(granule - 1))
    }

    /// Rounds the address up to a multiple of `granule`, saturating at the top
    /// of the address space.
    ///
    /// # Arguments
    ///
    /// * `granule` - Alignment in bytes; must be a power of two.
    #[inline]
    pub const fn align_up(self, granule: u64) -> Self {
        Self(self.0.saturating_add(granule - 1) & !(granule - 1))
    }

    /// Returns `true` if the address is a multiple of `granule`.
    #[inline]
    pub const fn is_aligned(self, granule: u64) -> bool {
        self.0 & (granule - 1) == 0
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for PhysAddr {
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}
