//! Configuration system for the tag simulator.
//!
//! This module defines all configuration structures used to parameterize a
//! run. It provides:
//! 1. **Defaults:** Baseline geometry of tagged memory and the cache hierarchy.
//! 2. **Structures:** Memory, hierarchy and tag-cache sections.
//! 3. **Validation:** Rejection of geometries the hierarchy cannot represent.
//!
//! Configuration is read from a JSON file; every field is optional and falls
//! back to [`Config::default()`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{MemoryLayout, Result, SimError};

/// Default configuration constants for the simulator.
mod defaults {
    use crate::common::constants;

    /// Base address of tagged DRAM.
    pub const BASE_PADDR: u64 = constants::BASE_PADDR;

    /// Size of tagged DRAM (2 GiB).
    pub const MEMORY_SIZE: u64 = constants::MEMORY_SIZE;

    /// Bytes covered by one tag bit.
    pub const CAP_BYTES: u64 = constants::CAP_SIZE_BYTES;

    /// Cache line size in bytes, shared by every level.
    pub const LINE_BYTES: u64 = constants::CACHE_LINE_BYTES;

    /// L1 instruction and data cache size (64 KiB each).
    pub const L1_SIZE: u64 = 64 * 1024;

    /// L1 associativity.
    pub const L1_WAYS: usize = 4;

    /// Unified L2 size (1 MiB).
    pub const L2_SIZE: u64 = 1024 * 1024;

    /// L2 associativity.
    pub const L2_WAYS: usize = 8;

    /// Uncompressed tag cache size (32 KiB).
    pub const TAG_CACHE_SIZE: u64 = 32 * 1024;

    /// Uncompressed tag cache associativity.
    pub const TAG_CACHE_WAYS: usize = 4;
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// ```
/// use tagsim_core::config::Config;
///
/// let config: Config = serde_json::from_str(r#"{ "hierarchy": { "l2": null } }"#).unwrap();
/// assert!(config.hierarchy.l2.is_none());
/// assert_eq!(config.hierarchy.l1_d.ways, 4);
/// assert_eq!(config.memory.line_bytes, 128);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tagged memory geometry.
    pub memory: MemoryConfig,
    /// Cache hierarchy in front of the tag controller.
    pub hierarchy: HierarchyConfig,
    /// Uncompressed tag cache used when replaying LLC request traces.
    pub tag_cache: CacheConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// # Arguments
    ///
    /// * `path` - JSON file; missing fields take their defaults.
    ///
    /// # Returns
    ///
    /// The validated configuration.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SimError::file(path, e))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| SimError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the memory layout and every cache geometry are representable.
    pub fn validate(&self) -> Result<()> {
        let layout = self.layout()?;
        self.hierarchy.l1_i.validate("l1_i", &layout)?;
        self.hierarchy.l1_d.validate("l1_d", &layout)?;
        if let Some(l2) = &self.hierarchy.l2 {
            l2.validate("l2", &layout)?;
        }
        self.tag_cache.validate("tag_cache", &layout)
    }

    /// Memory layout described by the `memory` section.
    pub fn layout(&self) -> Result<MemoryLayout> {
        MemoryLayout::from_config(&self.memory)
    }
}

/// Tagged memory geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// First physical address of tagged memory.
    #[serde(default = "MemoryConfig::default_base_paddr")]
    pub base_paddr: u64,

    /// Size of tagged memory in bytes.
    #[serde(default = "MemoryConfig::default_size_bytes")]
    pub size_bytes: u64,

    /// Bytes covered by one tag bit.
    #[serde(default = "MemoryConfig::default_cap_bytes")]
    pub cap_bytes: u64,

    /// Cache line size in bytes for every level.
    #[serde(default = "MemoryConfig::default_line_bytes")]
    pub line_bytes: u64,
}

impl MemoryConfig {
    /// Returns the default tagged memory base.
    const fn default_base_paddr() -> u64 {
        defaults::BASE_PADDR
    }

    /// Returns the default tagged memory size.
    const fn default_size_bytes() -> u64 {
        defaults::MEMORY_SIZE
    }

    /// Returns the default capability size.
    const fn default_cap_bytes() -> u64 {
        defaults::CAP_BYTES
    }

    /// Returns the default cache line size.
    const fn default_line_bytes() -> u64 {
        defaults::LINE_BYTES
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            base_paddr: defaults::BASE_PADDR,
            size_bytes: defaults::MEMORY_SIZE,
            cap_bytes: defaults::CAP_BYTES,
            line_bytes: defaults::LINE_BYTES,
        }
    }
}

/// Cache hierarchy between the trace and the tag controller.
///
/// L1I and L1D always exist; they hang off the L2 when one is configured and
/// directly off the tag controller otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// L1 instruction cache.
    #[serde(default = "HierarchyConfig::default_l1")]
    pub l1_i: CacheConfig,

    /// L1 data cache.
    #[serde(default = "HierarchyConfig::default_l1")]
    pub l1_d: CacheConfig,

    /// Unified L2 cache; `null` attaches the L1s to the controller.
    #[serde(default = "HierarchyConfig::default_l2")]
    pub l2: Option<CacheConfig>,
}

impl HierarchyConfig {
    /// Returns the default L1 geometry.
    const fn default_l1() -> CacheConfig {
        CacheConfig {
            size_bytes: defaults::L1_SIZE,
            ways: defaults::L1_WAYS,
        }
    }

    /// Returns the default L2 geometry.
    const fn default_l2() -> Option<CacheConfig> {
        Some(CacheConfig {
            size_bytes: defaults::L2_SIZE,
            ways: defaults::L2_WAYS,
        })
    }
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            l1_i: Self::default_l1(),
            l1_d: Self::default_l1(),
            l2: Self::default_l2(),
        }
    }
}

/// Geometry of one set-associative cache.
///
/// The default geometry is the uncompressed tag cache's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Total capacity in bytes.
    pub size_bytes: u64,
    /// Associativity.
    pub ways: usize,
}

impl CacheConfig {
    /// Number of lines this cache holds for the given line size.
    pub const fn lines(&self, line_bytes: u64) -> usize {
        (self.size_bytes / line_bytes) as usize
    }

    /// Checks that the cache divides into whole sets of whole lines.
    ///
    /// # Arguments
    ///
    /// * `name` - Section name for the error message.
    /// * `layout` - Memory layout providing the line size.
    pub fn validate(&self, name: &str, layout: &MemoryLayout) -> Result<()> {
        let set_bytes = layout.line_bytes() * self.ways as u64;
        if self.ways == 0 || self.size_bytes == 0 || self.size_bytes % set_bytes != 0 {
            return Err(SimError::Config(format!(
                "{name}: {} bytes cannot be split into {}-way sets of {}-byte lines",
                self.size_bytes,
                self.ways,
                layout.line_bytes()
            )));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size_bytes: defaults::TAG_CACHE_SIZE,
            ways: defaults::TAG_CACHE_WAYS,
        }
    }
}
