//! Hierarchy construction.
//!
//! Builds the single-core hierarchy the replay driver expects:
//!
//! ```text
//! L1I   L1D
//!   \   /
//!    L2          (optional)
//!     |
//!   root         (tag controller or uncompressed tag cache)
//! ```

use super::{DeviceId, Hierarchy};
use crate::common::{Result, SimError};
use crate::config::Config;
use crate::memory::{ControllerInterface, TagCacheDevice, TagTable};
use crate::trace::RequestSink;

/// Name of the L1 instruction cache.
pub const L1I_NAME: &str = "L1I";
/// Name of the L1 data cache.
pub const L1D_NAME: &str = "L1D";
/// Name of the unified L2 cache.
pub const L2_NAME: &str = "L2";
/// Name of the request-emitting tag controller.
pub const CONTROLLER_NAME: &str = "TAG CONTROLLER (INTERFACE)";
/// Name of the uncompressed tag cache.
pub const TAG_CACHE_NAME: &str = "TAG CONTROLLER (UNCOMPRESSED)";

/// Ids of the caches of one core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreCaches {
    /// L1 instruction cache.
    pub l1_i: DeviceId,
    /// L1 data cache.
    pub l1_d: DeviceId,
    /// Unified L2, when configured.
    pub l2: Option<DeviceId>,
}

impl<S: RequestSink> Hierarchy<S> {
    /// Builds the configured hierarchy on top of a tag controller.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration; rejected with [`SimError::Config`] if any
    ///   geometry does not divide into whole sets.
    /// * `table` - Initial tag state; its layout must match `config.memory`.
    /// * `sink` - Destination of the controller's request trace.
    pub fn from_config(config: &Config, table: TagTable, sink: S) -> Result<(Self, CoreCaches)> {
        config.validate()?;
        check_table_layout(config, &table)?;
        let mut hierarchy = Self::with_controller(ControllerInterface::new(CONTROLLER_NAME, table, sink));
        let caches = hierarchy.attach_core(config)?;
        Ok((hierarchy, caches))
    }

    /// Adds L2 (if configured), L1I and L1D below the root.
    pub fn attach_core(&mut self, config: &Config) -> Result<CoreCaches> {
        let l2 = config
            .hierarchy
            .l2
            .as_ref()
            .map(|l2| self.add_cache(L2_NAME, l2, Self::ROOT))
            .transpose()?;
        let parent = l2.unwrap_or(Self::ROOT);
        let l1_i = self.add_cache(L1I_NAME, &config.hierarchy.l1_i, parent)?;
        let l1_d = self.add_cache(L1D_NAME, &config.hierarchy.l1_d, parent)?;
        Ok(CoreCaches { l1_i, l1_d, l2 })
    }

    /// Builds a hierarchy consisting only of an uncompressed tag cache.
    pub fn tag_cache_only(config: &Config, table: TagTable) -> Result<Self> {
        config.validate()?;
        check_table_layout(config, &table)?;
        Ok(Self::with_tag_cache(TagCacheDevice::new(
            TAG_CACHE_NAME,
            &config.tag_cache,
            table,
        )))
    }
}

fn check_table_layout(config: &Config, table: &TagTable) -> Result<()> {
    if *table.layout() == config.layout()? {
        Ok(())
    } else {
        Err(SimError::Config(
            "tag table layout does not match the memory configuration".to_owned(),
        ))
    }
}
