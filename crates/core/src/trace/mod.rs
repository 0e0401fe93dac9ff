//! Trace records and record streams.
//!
//! Two record kinds flow through the simulator: access entries recorded on
//! the traced core (input) and requests reaching the tag controller (output).

/// Access-trace entries.
pub mod entry;
/// Record stream readers, writers and codec selection.
pub mod io;
/// LLC request records.
pub mod request;

pub use entry::{AccessEntry, AccessKind};
pub use io::{Codec, NullSink, Record, RequestSink, TraceReader, TraceWriter};
pub use request::{LlcRequest, RequestKind};
