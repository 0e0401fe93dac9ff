//! Device tree of the cache hierarchy.
//!
//! This module owns every device of a run and implements the protocol that
//! moves lines between them. It provides:
//! 1. **Arena:** Devices live in one vector and refer to their parent and
//!    children through [`DeviceId`] indices.
//! 2. **Dispatch:** [`Hierarchy::device_read`], [`Hierarchy::device_write`] and
//!    [`Hierarchy::device_write_invisible`] route by device kind.
//! 3. **Lookup and Fill:** [`Hierarchy::request`] with victim eviction and
//!    back-invalidation of children, keeping parents inclusive of children.
//! 4. **Coherence:** Peer flushing before an access (see [`coherence`]).
//! 5. **Self-Checks:** [`Hierarchy::check_invariants`] verifies inclusion,
//!    single-writer and LRU permutation across the whole tree.

/// Building the standard hierarchy from configuration.
pub mod builder;
/// Peer flushing before conflicting accesses.
pub mod coherence;

use std::fmt;

use tracing::{debug, trace};

use crate::cache::{CacheDevice, CacheLine};
use crate::common::constants::MAX_CHILDREN;
use crate::common::{InvariantViolation, MemoryLayout, PhysAddr, Result, TagBits};
use crate::config::CacheConfig;
use crate::memory::{ControllerInterface, TagCacheDevice};
use crate::trace::RequestSink;

pub use builder::CoreCaches;

/// Index of a device inside its [`Hierarchy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub usize);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A device of the hierarchy.
#[derive(Debug)]
pub enum Device<S> {
    /// Tag-tracking cache level.
    Cache(CacheDevice),
    /// Request-emitting tag controller (root).
    Controller(ControllerInterface<S>),
    /// Uncompressed tag cache (root).
    TagCache(TagCacheDevice),
}

impl<S: RequestSink> Device<S> {
    /// Device label.
    pub fn name(&self) -> &str {
        match self {
            Self::Cache(c) => c.name(),
            Self::Controller(c) => c.name(),
            Self::TagCache(t) => t.name(),
        }
    }

    /// The cache payload, if this is a cache.
    pub fn as_cache(&self) -> Option<&CacheDevice> {
        match self {
            Self::Cache(c) => Some(c),
            _ => None,
        }
    }

    /// The mutable cache payload, if this is a cache.
    pub fn as_cache_mut(&mut self) -> Option<&mut CacheDevice> {
        match self {
            Self::Cache(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Node<S> {
    device: Device<S>,
    parent: Option<DeviceId>,
    children: Vec<DeviceId>,
}

/// Arena of devices forming a tree rooted at a controller or tag cache.
#[derive(Debug)]
pub struct Hierarchy<S> {
    nodes: Vec<Node<S>>,
    layout: MemoryLayout,
}

impl<S: RequestSink> Hierarchy<S> {
    /// Id of the root device.
    pub const ROOT: DeviceId = DeviceId(0);

    /// Creates a hierarchy whose root is a tag controller.
    pub fn with_controller(controller: ControllerInterface<S>) -> Self {
        let layout = *controller.table().layout();
        Self::with_root(Device::Controller(controller), layout)
    }

    /// Creates a hierarchy whose root is an uncompressed tag cache.
    pub fn with_tag_cache(tag_cache: TagCacheDevice) -> Self {
        let layout = *tag_cache.table().layout();
        Self::with_root(Device::TagCache(tag_cache), layout)
    }

    fn with_root(root: Device<S>, layout: MemoryLayout) -> Self {
        Self {
            nodes: vec![Node {
                device: root,
                parent: None,
                children: Vec::new(),
            }],
            layout,
        }
    }

    /// Adds a cache level below `parent`.
    ///
    /// # Arguments
    ///
    /// * `name` - Label used in reports.
    /// * `config` - Capacity and associativity.
    /// * `parent` - Device the new cache forwards misses to.
    ///
    /// # Returns
    ///
    /// The new cache's id, [`InvariantViolation::TooManyChildren`], or
    /// [`crate::common::SimError::Config`] if `config` cannot form whole sets.
    pub fn add_cache(
        &mut self,
        name: impl Into<String>,
        config: &CacheConfig,
        parent: DeviceId,
    ) -> Result<DeviceId> {
        let name = name.into();
        config.validate(&name, &self.layout)?;
        let siblings = &self.nodes[parent.0].children;
        if siblings.len() >= MAX_CHILDREN {
            return Err(InvariantViolation::TooManyChildren {
                device: self.nodes[parent.0].device.name().to_owned(),
                max: MAX_CHILDREN,
            }
            .into());
        }
        let id = DeviceId(self.nodes.len());
        self.nodes.push(Node {
            device: Device::Cache(CacheDevice::new(name, config, self.layout.line_bits())),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Memory layout shared by every device.
    pub const fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; a hierarchy has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Device `id`.
    pub fn device(&self, id: DeviceId) -> &Device<S> {
        &self.nodes[id.0].device
    }

    /// Parent of `id`; `None` for the root.
    pub fn parent(&self, id: DeviceId) -> Option<DeviceId> {
        self.nodes[id.0].parent
    }

    /// Children of `id`.
    pub fn children(&self, id: DeviceId) -> &[DeviceId] {
        &self.nodes[id.0].children
    }

    /// Cache payload of `id`.
    pub fn cache(&self, id: DeviceId) -> Result<&CacheDevice> {
        let device = &self.nodes[id.0].device;
        device.as_cache().ok_or_else(|| not_a_cache(device))
    }

    fn cache_mut(&mut self, id: DeviceId) -> Result<&mut CacheDevice> {
        match &mut self.nodes[id.0].device {
            Device::Cache(c) => Ok(c),
            other => Err(not_a_cache(other)),
        }
    }

    /// Root controller, if the root is one.
    pub fn controller(&self) -> Option<&ControllerInterface<S>> {
        match self.device(Self::ROOT) {
            Device::Controller(c) => Some(c),
            _ => None,
        }
    }

    /// Root tag cache, if the root is one.
    pub fn tag_cache(&self) -> Option<&TagCacheDevice> {
        match self.device(Self::ROOT) {
            Device::TagCache(t) => Some(t),
            _ => None,
        }
    }

    /// Consumes the hierarchy, returning the controller's request sink.
    pub fn into_sink(mut self) -> Option<S> {
        match self.nodes.swap_remove(Self::ROOT.0).device {
            Device::Controller(c) => Some(c.into_sink()),
            _ => None,
        }
    }

    /// All device ids, children before their parents.
    pub fn leaf_first_order(&self) -> Vec<DeviceId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        self.post_order(Self::ROOT, &mut order);
        order
    }

    fn post_order(&self, id: DeviceId, order: &mut Vec<DeviceId>) {
        for &child in &self.nodes[id.0].children {
            self.post_order(child, order);
        }
        order.push(id);
    }

    /// Reads a line from any device.
    ///
    /// Caches go through [`Hierarchy::request`]; roots serve the read from
    /// their tag table.
    pub fn device_read(&mut self, id: DeviceId, line: PhysAddr) -> Result<TagBits> {
        match &mut self.nodes[id.0].device {
            Device::Cache(_) => Ok(self.request(id, line)?.tags),
            Device::Controller(c) => c.read(line),
            Device::TagCache(t) => t.read(line),
        }
    }

    /// Writes a dirty line into any device.
    pub fn device_write(&mut self, id: DeviceId, line: PhysAddr, tags: TagBits) -> Result<()> {
        let tags = TagBits::new(tags.data, tags.known)?;
        match &mut self.nodes[id.0].device {
            Device::Cache(c) => Ok(c.write_back(line, tags)?),
            Device::Controller(c) => c.write(line, tags),
            Device::TagCache(t) => t.write(line, tags),
        }
    }

    /// Forwards the tags of a clean line into any device.
    pub fn device_write_invisible(
        &mut self,
        id: DeviceId,
        line: PhysAddr,
        tags: TagBits,
    ) -> Result<()> {
        let tags = TagBits::new(tags.data, tags.known)?;
        match &mut self.nodes[id.0].device {
            Device::Cache(c) => Ok(c.write_back_invisible(line, tags)?),
            Device::Controller(c) => c.write_invisible(line, tags),
            Device::TagCache(t) => t.write_invisible(line, tags),
        }
    }

    /// Looks up `line` in cache `id`, filling it from the parent on a miss.
    ///
    /// On a miss the victim slot is emptied before the parent is asked for
    /// the new line: copies of the victim held by children are pulled back
    /// first, then the victim is written to the parent, dirty or not.
    ///
    /// # Arguments
    ///
    /// * `id` - A cache device.
    /// * `line` - Line-aligned address inside tagged memory.
    ///
    /// # Returns
    ///
    /// The slot now holding `line`, promoted to most recently used.
    pub fn request(&mut self, id: DeviceId, line: PhysAddr) -> Result<&mut CacheLine> {
        self.layout.check_line(line)?;
        let parent = self.parent_of_cache(id)?;
        let found = self.cache(id)?.array.find(line);
        let index = match found {
            Some(index) => {
                let cache = self.cache_mut(id)?;
                cache.stats.hits += 1;
                trace!(device = cache.name(), %line, "hit");
                index
            }
            None => self.fill(id, parent, line)?,
        };
        let cache = self.cache_mut(id)?;
        cache.array.touch(index);
        Ok(cache.array.line_mut(index))
    }

    /// Returns the held copy of `line` in cache `id` without counting an access.
    pub fn line_mut(&mut self, id: DeviceId, line: PhysAddr) -> Result<Option<&mut CacheLine>> {
        let cache = self.cache_mut(id)?;
        Ok(cache.array.find(line).map(|i| cache.array.line_mut(i)))
    }

    fn parent_of_cache(&self, id: DeviceId) -> Result<DeviceId> {
        let cache = self.cache(id)?;
        self.nodes[id.0].parent.ok_or_else(|| {
            InvariantViolation::NoParent {
                device: cache.name().to_owned(),
            }
            .into()
        })
    }

    /// Handles a miss of `line` in cache `id`.
    ///
    /// # Returns
    ///
    /// Index of the filled slot.
    fn fill(&mut self, id: DeviceId, parent: DeviceId, line: PhysAddr) -> Result<usize> {
        let (index, victim) = {
            let cache = self.cache_mut(id)?;
            cache.stats.misses += 1;
            trace!(device = cache.name(), %line, "miss");
            let index = cache.array.choose_victim(cache.array.set_of(line));
            (index, *cache.array.line(index))
        };

        if victim.is_valid() {
            let victim_addr = self.cache(id)?.array.line_addr(victim.line_tag);
            self.back_invalidate(id, victim_addr)?;

            let cache = self.cache_mut(id)?;
            let victim = *cache.array.line(index);
            cache.array.line_mut(index).invalidate();
            if victim.dirty {
                cache.stats.write_backs += 1;
                debug!(device = cache.name(), victim = %victim_addr, tags = %victim.tags, "dirty eviction");
                self.device_write(parent, victim_addr, victim.tags)?;
            } else {
                debug!(device = cache.name(), victim = %victim_addr, "clean eviction");
                self.device_write_invisible(parent, victim_addr, victim.tags)?;
            }
        }

        let tags = self.device_read(parent, line)?;
        let cache = self.cache_mut(id)?;
        let line_tag = cache.array.line_tag(line);
        let slot = cache.array.line_mut(index);
        slot.line_tag = line_tag;
        slot.tags = tags;
        slot.dirty = false;
        Ok(index)
    }

    /// Pulls every child copy of `line` back into cache `id` and invalidates it.
    ///
    /// Grandchildren are drained into children first. A dirty child copy is
    /// written back, a clean one forwarded invisibly. At most one child may
    /// hold the line dirty.
    fn back_invalidate(&mut self, id: DeviceId, line: PhysAddr) -> Result<()> {
        let mut dirty_copies = 0;
        for i in 0..self.nodes[id.0].children.len() {
            let child = self.nodes[id.0].children[i];
            self.back_invalidate(child, line)?;

            let Some(cache) = self.nodes[child.0].device.as_cache_mut() else {
                continue;
            };
            let Some(index) = cache.array.find(line) else {
                continue;
            };
            let copy = *cache.array.line(index);
            cache.array.line_mut(index).invalidate();
            cache.stats.invalidations += 1;
            if copy.dirty {
                cache.stats.write_backs += 1;
                dirty_copies += 1;
            }
            debug!(device = cache.name(), %line, dirty = copy.dirty, "back-invalidated");

            let target = self.cache_mut(id)?;
            if dirty_copies > 1 {
                return Err(InvariantViolation::MultipleDirtyCopies {
                    device: target.name().to_owned(),
                    line_addr: line.val(),
                    count: dirty_copies,
                }
                .into());
            }
            if copy.dirty {
                target.write_back(line, copy.tags)?;
            } else {
                target.write_back_invisible(line, copy.tags)?;
            }
        }
        Ok(())
    }

    /// Verifies the structural invariants of every cache.
    ///
    /// Checks, in order: LRU ranks of each set form a permutation, every
    /// valid line is held by a parent cache and clean copies agree with it on
    /// the tags both know, and no two children of a device hold the same line
    /// dirty.
    pub fn check_invariants(&self) -> Result<()> {
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Some(cache) = node.device.as_cache() {
                check_lru(cache)?;
                if let Some(Device::Cache(parent)) = node.parent.map(|p| &self.nodes[p.0].device) {
                    check_inclusion(cache, parent)?;
                }
            }

            let children: Vec<&CacheDevice> = node
                .children
                .iter()
                .filter_map(|c| self.nodes[c.0].device.as_cache())
                .collect();
            for (i, child) in children.iter().enumerate() {
                for (addr, _) in child.array.valid_lines().filter(|(_, s)| s.dirty) {
                    let count = 1 + children[i + 1..]
                        .iter()
                        .filter(|other| other.peek(addr).is_some_and(|s| s.dirty))
                        .count();
                    if count > 1 {
                        return Err(InvariantViolation::MultipleDirtyCopies {
                            device: self.nodes[idx].device.name().to_owned(),
                            line_addr: addr.val(),
                            count,
                        }
                        .into());
                    }
                }
            }
        }
        Ok(())
    }
}

/// Checks that the LRU ranks of every set of `cache` are a permutation.
fn check_lru(cache: &CacheDevice) -> Result<()> {
    let ways = cache.array.ways();
    for set in 0..cache.array.sets() {
        let mut seen = vec![false; ways];
        for slot in cache.array.set_lines(set) {
            if slot.lru_rank >= ways || std::mem::replace(&mut seen[slot.lru_rank], true) {
                return Err(InvariantViolation::LruCorrupted {
                    device: cache.name().to_owned(),
                    set,
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Checks that `parent` holds every valid line of `cache` and that clean
/// copies agree with it on the tags both know.
fn check_inclusion(cache: &CacheDevice, parent: &CacheDevice) -> Result<()> {
    for (addr, slot) in cache.array.valid_lines() {
        let consistent = parent.peek(addr).is_some_and(|held| {
            let shared = held.tags.known & slot.tags.known;
            slot.dirty || (held.tags.data ^ slot.tags.data) & shared == 0
        });
        if !consistent {
            return Err(InvariantViolation::InclusionBroken {
                device: cache.name().to_owned(),
                parent: parent.name().to_owned(),
                line_addr: addr.val(),
            }
            .into());
        }
    }
    Ok(())
}

fn not_a_cache<S: RequestSink>(device: &Device<S>) -> crate::common::SimError {
    InvariantViolation::NotACache {
        device: device.name().to_owned(),
    }
    .into()
}
