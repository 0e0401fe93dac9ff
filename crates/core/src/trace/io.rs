//! Fixed-size record streams.
//!
//! This module provides the sequential byte-record channel used for both
//! trace kinds. It provides:
//! 1. **Codec Selection:** The file extension picks the stream codec.
//! 2. **Reading:** [`TraceReader`] yields whole records and distinguishes a
//!    clean end-of-stream from a truncated record.
//! 3. **Writing:** [`TraceWriter`] appends records and must be closed with
//!    [`TraceWriter::finish`] so that flush errors are reported.
//! 4. **Request Sinks:** [`RequestSink`] is how the tag controller emits its
//!    request trace, either to a file or to memory.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::marker::PhantomData;
use std::path::Path;

use tracing::warn;

use super::request::LlcRequest;
use crate::common::{Result, SimError};

/// A fixed-size binary record.
pub trait Record: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;
    /// Record name used in diagnostics.
    const NAME: &'static str;

    /// Decodes a record from exactly [`Self::SIZE`] bytes.
    fn decode(bytes: &[u8]) -> Result<Self>;

    /// Encodes the record into exactly [`Self::SIZE`] bytes.
    fn encode(&self, out: &mut [u8]);
}

/// Stream codec selected from a file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    /// Uncompressed records.
    Plain,
    /// gzip-compressed stream (`.gz`).
    Gzip,
    /// LZ4 frame stream (`.lz4`).
    Lz4,
}

impl Codec {
    /// Picks the codec from the extension of `path`.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Self::Gzip,
            Some("lz4") => Self::Lz4,
            _ => Self::Plain,
        }
    }

    /// Codec name for diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Gzip => "gzip",
            Self::Lz4 => "lz4",
        }
    }

    /// Fails unless the codec can be read and written by this build.
    fn ensure_supported(self, path: &Path) -> Result<()> {
        match self {
            Self::Plain => Ok(()),
            other => Err(SimError::UnsupportedCodec {
                path: path.to_path_buf(),
                codec: other.name(),
            }),
        }
    }
}

/// Sequential reader of fixed-size records.
#[derive(Debug)]
pub struct TraceReader<T, R> {
    inner: R,
    buf: Vec<u8>,
    records: u64,
    _record: PhantomData<T>,
}

impl<T: Record> TraceReader<T, BufReader<File>> {
    /// Opens a record file for reading.
    ///
    /// # Arguments
    ///
    /// * `path` - Input file; its extension selects the codec.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Codec::from_path(path).ensure_supported(path)?;
        let file = File::open(path).map_err(|e| SimError::file(path, e))?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<T: Record, R: Read> TraceReader<T, R> {
    /// Wraps an already-open byte stream.
    pub fn from_reader(inner: R) -> Self {
        Self {
            inner,
            buf: vec![0; T::SIZE],
            records: 0,
            _record: PhantomData,
        }
    }

    /// Reads the next record.
    ///
    /// # Returns
    ///
    /// `Ok(None)` at a clean end-of-stream, [`SimError::TruncatedRecord`] if the
    /// stream ends inside a record.
    pub fn get(&mut self) -> Result<Option<T>> {
        let mut filled = 0;
        while filled < T::SIZE {
            match self.inner.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(SimError::Io(e)),
            }
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < T::SIZE {
            return Err(SimError::TruncatedRecord {
                expected: T::SIZE,
                got: filled,
            });
        }
        self.records += 1;
        T::decode(&self.buf).map(Some)
    }

    /// Number of records read so far.
    pub const fn records_read(&self) -> u64 {
        self.records
    }
}

impl<T: Record, R: Read> Iterator for TraceReader<T, R> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.get().transpose()
    }
}

/// Sequential writer of fixed-size records.
///
/// Dropping a writer without calling [`TraceWriter::finish`] flushes on a
/// best-effort basis and logs a warning, since flush errors are lost.
#[derive(Debug)]
pub struct TraceWriter<T, W: Write> {
    inner: Option<W>,
    buf: Vec<u8>,
    records: u64,
    _record: PhantomData<T>,
}

impl<T: Record> TraceWriter<T, BufWriter<File>> {
    /// Creates a record file.
    ///
    /// # Arguments
    ///
    /// * `path` - Output file; its extension selects the codec.
    /// * `overwrite` - Replace the file if it already exists.
    ///
    /// # Returns
    ///
    /// The writer, or [`SimError::OutputExists`] if the file exists and
    /// `overwrite` is false.
    pub fn create(path: impl AsRef<Path>, overwrite: bool) -> Result<Self> {
        let path = path.as_ref();
        Codec::from_path(path).ensure_supported(path)?;
        if !overwrite && path.exists() {
            return Err(SimError::OutputExists(path.to_path_buf()));
        }
        let file = File::create(path).map_err(|e| SimError::file(path, e))?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<T: Record, W: Write> TraceWriter<T, W> {
    /// Wraps an already-open byte sink.
    pub fn from_writer(inner: W) -> Self {
        Self {
            inner: Some(inner),
            buf: vec![0; T::SIZE],
            records: 0,
            _record: PhantomData,
        }
    }

    /// Appends one record.
    pub fn emit(&mut self, record: &T) -> Result<()> {
        let inner = self.inner.as_mut().ok_or_else(closed_stream)?;
        record.encode(&mut self.buf);
        inner.write_all(&self.buf)?;
        self.records += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub const fn records_written(&self) -> u64 {
        self.records
    }

    /// Flushes and closes the stream.
    ///
    /// # Returns
    ///
    /// The underlying sink.
    pub fn finish(mut self) -> Result<W> {
        let mut inner = self.inner.take().ok_or_else(closed_stream)?;
        inner.flush()?;
        Ok(inner)
    }
}

impl<T, W: Write> Drop for TraceWriter<T, W> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.as_mut() {
            warn!(
                records = self.records,
                "record stream dropped without being finished"
            );
            if let Err(e) = inner.flush() {
                warn!(error = %e, "flushing unfinished record stream failed");
            }
        }
    }
}

/// Error for operations on a stream that was already finished.
fn closed_stream() -> SimError {
    SimError::Io(io::Error::new(ErrorKind::BrokenPipe, "record stream already closed"))
}

/// Destination of the tag controller's request trace.
pub trait RequestSink {
    /// Records one controller request.
    fn emit(&mut self, request: &LlcRequest) -> Result<()>;
}

impl<W: Write> RequestSink for TraceWriter<LlcRequest, W> {
    fn emit(&mut self, request: &LlcRequest) -> Result<()> {
        Self::emit(self, request)
    }
}

/// Sink that discards every request.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl RequestSink for NullSink {
    fn emit(&mut self, _request: &LlcRequest) -> Result<()> {
        Ok(())
    }
}

impl RequestSink for Vec<LlcRequest> {
    fn emit(&mut self, request: &LlcRequest) -> Result<()> {
        self.push(*request);
        Ok(())
    }
}
