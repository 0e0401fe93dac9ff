//! Peer flushing before conflicting accesses.
//!
//! Before a leaf cache observes or modifies a line, every other cache that
//! may hold a copy pushes that copy one level up: dirty copies are written
//! back, clean copies forward their tags invisibly. Stores additionally
//! invalidate those copies so that only the storing cache holds the line,
//! which is what keeps at most one dirty copy of any line per parent.

use tracing::debug;

use super::{DeviceId, Hierarchy};
use crate::common::{PhysAddr, Result};
use crate::trace::RequestSink;

impl<S: RequestSink> Hierarchy<S> {
    /// Flushes every copy of `line` held outside the path from `device` to
    /// the root.
    ///
    /// Starting at `device`, the subtrees of all its siblings are flushed,
    /// then those of its parent's siblings, and so on up to the root.
    ///
    /// # Arguments
    ///
    /// * `device` - Cache about to access the line.
    /// * `line` - Line-aligned address.
    /// * `should_invalidate` - Also drop the flushed copies.
    pub fn notify_peers_coherence_flush(
        &mut self,
        device: DeviceId,
        line: PhysAddr,
        should_invalidate: bool,
    ) -> Result<()> {
        self.layout.check_line(line)?;
        let mut current = device;
        while let Some(parent) = self.parent(current) {
            for i in 0..self.children(parent).len() {
                let peer = self.children(parent)[i];
                if peer != current {
                    self.flush_subtree(peer, line, should_invalidate)?;
                }
            }
            current = parent;
        }
        Ok(())
    }

    /// Flushes `line` out of `node` and its descendants, deepest first.
    fn flush_subtree(&mut self, node: DeviceId, line: PhysAddr, invalidate: bool) -> Result<()> {
        for i in 0..self.children(node).len() {
            let child = self.children(node)[i];
            self.flush_subtree(child, line, invalidate)?;
        }

        let Some(parent) = self.parent(node) else {
            return Ok(());
        };
        let Some(cache) = self.nodes[node.0].device.as_cache_mut() else {
            return Ok(());
        };
        let Some(index) = cache.array.find(line) else {
            return Ok(());
        };

        let copy = *cache.array.line(index);
        if copy.dirty {
            cache.array.line_mut(index).dirty = false;
            cache.stats.write_backs += 1;
        }
        if invalidate {
            cache.array.line_mut(index).invalidate();
            cache.stats.invalidations += 1;
        }
        debug!(
            device = cache.name(),
            %line,
            dirty = copy.dirty,
            invalidate,
            "coherence flush"
        );

        if copy.dirty {
            self.device_write(parent, line, copy.tags)
        } else {
            self.device_write_invisible(parent, line, copy.tags)
        }
    }
}
