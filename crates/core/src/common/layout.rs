//! Geometry of tagged memory.
//!
//! [`MemoryLayout`] is the single source of truth for the address range the
//! tag table covers, the capability granule a tag bit describes, and the cache
//! line size shared by every device of a hierarchy.

use super::addr::PhysAddr;
use super::error::{InvariantViolation, Result, SimError};
use crate::config::MemoryConfig;

/// Address range, capability size and line size of the simulated memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryLayout {
    base: u64,
    size: u64,
    cap_bytes: u64,
    line_bytes: u64,
    line_bits: u32,
}

impl MemoryLayout {
    /// Builds a layout, validating the geometry.
    ///
    /// # Arguments
    ///
    /// * `base` - First physical address of tagged memory.
    /// * `size` - Size of tagged memory in bytes.
    /// * `cap_bytes` - Bytes covered by one tag bit.
    /// * `line_bytes` - Cache line size in bytes.
    ///
    /// # Returns
    ///
    /// The layout, or [`SimError::Config`] describing the first problem found.
    pub fn new(base: u64, size: u64, cap_bytes: u64, line_bytes: u64) -> Result<Self> {
        if !cap_bytes.is_power_of_two() {
            return Err(SimError::Config(format!(
                "capability size {cap_bytes} is not a power of two"
            )));
        }
        if !line_bytes.is_power_of_two() || line_bytes < cap_bytes {
            return Err(SimError::Config(format!(
                "line size {line_bytes} must be a power of two of at least {cap_bytes} bytes"
            )));
        }
        if line_bytes / cap_bytes > super::constants::MAX_SUBBLOCKS_PER_LINE {
            return Err(SimError::Config(format!(
                "line size {line_bytes} holds more than {} capabilities",
                super::constants::MAX_SUBBLOCKS_PER_LINE
            )));
        }
        if size == 0 || size % (line_bytes * 8) != 0 {
            return Err(SimError::Config(format!(
                "memory size {size} must be a non-zero multiple of {}",
                line_bytes * 8
            )));
        }
        if base % line_bytes != 0 || base.checked_add(size).is_none() {
            return Err(SimError::Config(format!(
                "memory base {base:#x} must be line aligned and leave room for {size} bytes"
            )));
        }
        Ok(Self {
            base,
            size,
            cap_bytes,
            line_bytes,
            line_bits: line_bytes.trailing_zeros(),
        })
    }

    /// Builds a layout from the memory section of the configuration.
    pub fn from_config(config: &MemoryConfig) -> Result<Self> {
        Self::new(
            config.base_paddr,
            config.size_bytes,
            config.cap_bytes,
            config.line_bytes,
        )
    }

    /// First physical address of tagged memory.
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Size of tagged memory in bytes.
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// One past the last physical address of tagged memory.
    pub const fn end(&self) -> u64 {
        self.base + self.size
    }

    /// Bytes covered by one tag bit.
    pub const fn cap_bytes(&self) -> u64 {
        self.cap_bytes
    }

    /// Cache line size in bytes.
    pub const fn line_bytes(&self) -> u64 {
        self.line_bytes
    }

    /// `log2(line_bytes)`.
    pub const fn line_bits(&self) -> u32 {
        self.line_bits
    }

    /// Capability sub-blocks per cache line.
    pub const fn caps_per_line(&self) -> u32 {
        (self.line_bytes / self.cap_bytes) as u32
    }

    /// Mask with one bit per sub-block of a full line.
    pub const fn full_line_mask(&self) -> u16 {
        let caps = self.caps_per_line();
        if caps >= 16 { u16::MAX } else { (1u16 << caps) - 1 }
    }

    /// Number of tag bits in the whole memory.
    pub const fn tag_count(&self) -> u64 {
        self.size / self.cap_bytes
    }

    /// Bytes per tag-table plane.
    pub const fn plane_bytes(&self) -> usize {
        (self.tag_count() / 8) as usize
    }

    /// Returns `true` if `addr` lies inside tagged memory.
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.size
    }

    /// Line address containing `addr`.
    pub const fn line_of(&self, addr: PhysAddr) -> PhysAddr {
        addr.align_down(self.line_bytes)
    }

    /// Checks that `addr` is a line address inside tagged memory.
    pub(crate) fn check_line(&self, addr: PhysAddr) -> std::result::Result<(), InvariantViolation> {
        if !addr.is_aligned(self.line_bytes) {
            return Err(InvariantViolation::Misaligned {
                addr: addr.val(),
                granule: self.line_bytes,
            });
        }
        if !self.contains(addr.val()) {
            return Err(InvariantViolation::OutOfRange { addr: addr.val() });
        }
        Ok(())
    }

    /// Sub-block mask of the capabilities of `line` that overlap `[start, end)`.
    ///
    /// # Arguments
    ///
    /// * `line` - Line address.
    /// * `start` - First byte of the access.
    /// * `end` - One past the last byte of the access.
    pub fn subblock_mask(&self, line: PhysAddr, start: u64, end: u64) -> u16 {
        let line_end = line.val() + self.line_bytes;
        let lo = start.max(line.val());
        let hi = end.min(line_end);
        if lo >= hi {
            return 0;
        }
        let first = ((lo - line.val()) / self.cap_bytes) as u32;
        let last = ((hi - 1 - line.val()) / self.cap_bytes) as u32;
        let width = last - first + 1;
        let ones = if width >= 16 { u16::MAX } else { (1u16 << width) - 1 };
        ones << first
    }
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            base: super::constants::BASE_PADDR,
            size: super::constants::MEMORY_SIZE,
            cap_bytes: super::constants::CAP_SIZE_BYTES,
            line_bytes: super::constants::CACHE_LINE_BYTES,
            line_bits: super::constants::CACHE_LINE_BYTES.trailing_zeros(),
        }
    }
}
