//! Tag controller interface.
//!
//! The controller is the root of a hierarchy. It owns the authoritative
//! [`TagTable`], answers line reads and writes from its children and records
//! every request it services in its [`RequestSink`]. Writes are emitted before
//! they are applied; reads are emitted with the value that was read.

use tracing::trace;

use super::tag_table::TagTable;
use crate::common::{PhysAddr, Result, TagBits};
use crate::trace::{LlcRequest, RequestSink};

/// Request counters of the controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Lines read by the last-level cache.
    pub reads: u64,
    /// Lines written back by the last-level cache.
    pub writes: u64,
}

/// Last-level view of tag memory.
#[derive(Debug)]
pub struct ControllerInterface<S> {
    name: String,
    table: TagTable,
    sink: S,
    /// Request counters.
    pub stats: ControllerStats,
}

impl<S: RequestSink> ControllerInterface<S> {
    /// Creates a controller over `table` emitting into `sink`.
    pub fn new(name: impl Into<String>, table: TagTable, sink: S) -> Self {
        Self {
            name: name.into(),
            table,
            sink,
            stats: ControllerStats::default(),
        }
    }

    /// Device label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Authoritative tag table.
    pub const fn table(&self) -> &TagTable {
        &self.table
    }

    /// Request sink.
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the controller, returning its sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Services a line read.
    ///
    /// # Returns
    ///
    /// The line's tags, after a READ record carrying them was emitted.
    pub fn read(&mut self, line: PhysAddr) -> Result<TagBits> {
        let tags = self.table.read_line(line)?;
        self.stats.reads += 1;
        self.sink
            .emit(&LlcRequest::read(line, self.line_size(), tags))?;
        trace!(device = %self.name, %line, %tags, "controller read");
        Ok(tags)
    }

    /// Services a line write: emits a WRITE record, then stores the tags.
    pub fn write(&mut self, line: PhysAddr, tags: TagBits) -> Result<()> {
        self.table.layout().check_line(line)?;
        let tags = TagBits::new(tags.data, tags.known)?;
        self.stats.writes += 1;
        self.sink
            .emit(&LlcRequest::write(line, self.line_size(), tags))?;
        trace!(device = %self.name, %line, %tags, "controller write");
        self.table.write_line(line, tags)
    }

    /// Stores tags forwarded by a clean child copy without emitting a request.
    ///
    /// The update may only add knowledge to the table.
    pub fn write_invisible(&mut self, line: PhysAddr, tags: TagBits) -> Result<()> {
        let old = self.table.read_line(line)?;
        old.check_invisible_update(tags, line.val())?;
        self.table.write_line(line, tags)
    }

    fn line_size(&self) -> u16 {
        self.table.layout().line_bytes() as u16
    }
}
