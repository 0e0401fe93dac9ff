//! LLC request replay through the uncompressed tag cache.
//!
//! Replays a request trace produced by [`super::Simulator`] against a tag
//! cache sitting in front of tag memory. Reads are checked against the tag
//! table on the tags both sides know; tags only the request knows are
//! learned. Writes overwrite the table.

use tracing::warn;

use crate::common::{Result, SimError, TagBits};
use crate::config::Config;
use crate::hierarchy::Hierarchy;
use crate::memory::TagTable;
use crate::trace::{LlcRequest, NullSink, RequestKind};

/// Outcome counters of a request replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Requests replayed.
    pub requests: u64,
    /// Known tags a read disagreed with.
    pub tag_mismatches: u64,
    /// Tags learned from reads.
    pub tags_adopted: u64,
}

/// Replays LLC requests through an uncompressed tag cache.
#[derive(Debug)]
pub struct TagCacheReplay {
    hierarchy: Hierarchy<NullSink>,
    stats: ReplayStats,
}

impl TagCacheReplay {
    /// Builds the configured tag cache over `table`.
    pub fn new(config: &Config, table: TagTable) -> Result<Self> {
        Ok(Self {
            hierarchy: Hierarchy::tag_cache_only(config, table)?,
            stats: ReplayStats::default(),
        })
    }

    /// The hierarchy holding the tag cache.
    pub const fn hierarchy(&self) -> &Hierarchy<NullSink> {
        &self.hierarchy
    }

    /// Replay counters so far.
    pub const fn stats(&self) -> &ReplayStats {
        &self.stats
    }

    /// Replays every request of `requests` in order.
    pub fn run<I>(&mut self, requests: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<LlcRequest>>,
    {
        for request in requests {
            self.step(&request?)?;
        }
        Ok(())
    }

    /// Replays one request.
    pub fn step(&mut self, request: &LlcRequest) -> Result<()> {
        let line_bytes = self.hierarchy.layout().line_bytes();
        if u64::from(request.size) != line_bytes {
            return Err(SimError::InvalidRecord {
                record: "request",
                reason: format!(
                    "line size {} does not match the configured {line_bytes}",
                    request.size
                ),
            });
        }
        self.stats.requests += 1;
        let root = Hierarchy::<NullSink>::ROOT;
        match request.kind {
            RequestKind::Read => {
                let held = self.hierarchy.device_read(root, request.addr)?;
                let seen = request.tags;
                let mismatched = (held.data ^ seen.data) & held.known & seen.known;
                if mismatched != 0 {
                    self.stats.tag_mismatches += u64::from(mismatched.count_ones());
                    warn!(addr = %request.addr, %held, %seen, "read returned different tags");
                }
                let adopt = seen.known & !held.known;
                if adopt != 0 {
                    self.stats.tags_adopted += u64::from(adopt.count_ones());
                    let merged = TagBits {
                        data: (held.data & held.known) | (seen.data & adopt),
                        known: held.known | adopt,
                    };
                    self.hierarchy
                        .device_write_invisible(root, request.addr, merged)?;
                }
            }
            RequestKind::Write => {
                self.hierarchy
                    .device_write(root, request.addr, request.tags)?;
            }
        }
        Ok(())
    }
}
