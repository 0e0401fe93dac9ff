//! Simulator error definitions.
//!
//! This module defines the error handling for the simulator. It provides:
//! 1. **Resource Errors:** Failures opening, reading or writing trace and snapshot files.
//! 2. **Input Errors:** Malformed records, bad configuration and refused overwrites.
//! 3. **Invariant Violations:** Structural breaches of the cache hierarchy's rules.
//!
//! Invariant violations indicate a bug in the hierarchy or an inconsistent
//! trace/snapshot pair; callers are expected to abort the run on them.
//! Data-quality problems in individual trace entries are not errors at all and
//! are only counted in [`crate::stats::TraceStats`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level simulator error.
#[derive(Debug, Error)]
pub enum SimError {
    /// An I/O operation on a named file failed.
    #[error("{path}: {source}")]
    File {
        /// The file being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An I/O operation on an anonymous stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file extension selects a codec that is not built in.
    #[error("{path}: {codec} streams are not supported, decompress the file first")]
    UnsupportedCodec {
        /// The offending file.
        path: PathBuf,
        /// Codec name selected from the extension.
        codec: &'static str,
    },

    /// Refused to replace an existing output file.
    #[error("output file {0} already exists")]
    OutputExists(PathBuf),

    /// The stream ended in the middle of a fixed-size record.
    #[error("truncated record: expected {expected} bytes, got {got}")]
    TruncatedRecord {
        /// Record size in bytes.
        expected: usize,
        /// Bytes available before end-of-stream.
        got: usize,
    },

    /// A record field holds a value outside its encoding.
    #[error("invalid {record} record: {reason}")]
    InvalidRecord {
        /// Record kind being decoded.
        record: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A tag snapshot does not match the configured memory size.
    #[error("tag snapshot holds {got} bytes, expected {expected}")]
    SnapshotSize {
        /// Plane size required by the memory layout.
        expected: usize,
        /// Bytes actually read.
        got: usize,
    },

    /// Configuration is unreadable or describes an impossible geometry.
    #[error("configuration error: {0}")]
    Config(String),

    /// A structural invariant of the hierarchy was violated.
    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl SimError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for structural invariant violations.
    pub const fn is_invariant(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}

/// Structural invariant violations of the cache hierarchy.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// More than one child held a dirty copy of the same line.
    #[error("{device}: {count} children hold dirty copies of line {line_addr:#x}")]
    MultipleDirtyCopies {
        /// Parent device name.
        device: String,
        /// Line address.
        line_addr: u64,
        /// Number of dirty copies found.
        count: usize,
    },

    /// A write-back targeted a line the device does not hold.
    #[error("{device}: write-back to line {line_addr:#x} which is not present")]
    LineNotPresent {
        /// Target device name.
        device: String,
        /// Line address.
        line_addr: u64,
    },

    /// An invisible write would forget previously known tag bits.
    #[error(
        "line {line_addr:#x}: known tags regressed from {old_known:#06x} to {new_known:#06x}"
    )]
    KnownBitsRegressed {
        /// Line address.
        line_addr: u64,
        /// Known mask before the write.
        old_known: u16,
        /// Known mask carried by the write.
        new_known: u16,
    },

    /// An invisible write would change a previously known tag value.
    #[error(
        "line {line_addr:#x}: known tag values changed from {old_data:#06x} to {new_data:#06x}"
    )]
    KnownValueChanged {
        /// Line address.
        line_addr: u64,
        /// Tag values before the write.
        old_data: u16,
        /// Tag values carried by the write.
        new_data: u16,
    },

    /// Tag value bits set where the tag is not known.
    #[error("tag bits {data:#06x} are not covered by known mask {known:#06x}")]
    InconsistentTags {
        /// Tag value mask.
        data: u16,
        /// Known mask.
        known: u16,
    },

    /// An address that must be line aligned is not.
    #[error("address {addr:#x} is not aligned to {granule} bytes")]
    Misaligned {
        /// Offending address.
        addr: u64,
        /// Required alignment.
        granule: u64,
    },

    /// An address outside tagged memory reached the hierarchy.
    #[error("address {addr:#x} is outside tagged memory")]
    OutOfRange {
        /// Offending address.
        addr: u64,
    },

    /// A device already has the maximum number of children.
    #[error("{device} cannot take more than {max} children")]
    TooManyChildren {
        /// Parent device name.
        device: String,
        /// Child limit.
        max: usize,
    },

    /// A cache-only operation was applied to another kind of device.
    #[error("{device} is not a cache")]
    NotACache {
        /// Device name.
        device: String,
    },

    /// A child holds a line its parent does not hold, or holds it with
    /// contradicting known tags.
    #[error("{device} holds line {line_addr:#x} which its parent {parent} does not hold consistently")]
    InclusionBroken {
        /// Child device name.
        device: String,
        /// Parent device name.
        parent: String,
        /// Line address.
        line_addr: u64,
    },

    /// The LRU ranks of a set are not a permutation of `0..ways`.
    #[error("{device}: LRU ranks of set {set} are not a permutation")]
    LruCorrupted {
        /// Device name.
        device: String,
        /// Set index.
        set: usize,
    },

    /// A cache was found without a parent to forward misses to.
    #[error("{device} has no parent")]
    NoParent {
        /// Device name.
        device: String,
    },
}
