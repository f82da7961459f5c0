//! Purpose: Receive response bytes chunk by chunk from a blocking transfer.
//! Exports: `WriteSink`, `ResponseAccumulator`, `ChunkPrinter`, `StreamSink`.
//! Role: Callback side of a transfer; the engine pushes, sinks store or print.
//! Invariants: A sink accepts a chunk only by returning exactly its length.
//! Invariants: Accumulated bytes are the in-order concatenation of accepted chunks.
//! Notes: Any other return value aborts the transfer with a write error.
use std::borrow::Cow;
use std::io::{self, Write};

use bstr::ByteSlice;

/// Destination for received bytes.
///
/// `on_chunk` returns how many bytes it consumed. Returning anything other
/// than `chunk.len()` tells the transfer engine to stop.
pub trait WriteSink {
    fn on_chunk(&mut self, chunk: &[u8]) -> usize;
}

impl<F> WriteSink for F
where
    F: FnMut(&[u8]) -> usize,
{
    fn on_chunk(&mut self, chunk: &[u8]) -> usize {
        self(chunk)
    }
}

/// Growing response buffer tagged with the URL it was fetched from.
#[derive(Clone, Debug, Default)]
pub struct ResponseAccumulator {
    token: String,
    buf: Vec<u8>,
    limit: Option<usize>,
}

impl ResponseAccumulator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            buf: Vec::new(),
            limit: None,
        }
    }

    /// Refuse chunks that would grow the buffer past `max` bytes.
    pub fn with_limit(mut self, max: usize) -> Self {
        self.limit = Some(max);
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Display view; invalid UTF-8 sequences are replaced, the bytes are untouched.
    pub fn text(&self) -> Cow<'_, str> {
        self.buf.to_str_lossy()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl WriteSink for ResponseAccumulator {
    fn on_chunk(&mut self, chunk: &[u8]) -> usize {
        if let Some(limit) = self.limit {
            if self.buf.len().saturating_add(chunk.len()) > limit {
                tracing::warn!(
                    token = %self.token,
                    held = self.buf.len(),
                    chunk = chunk.len(),
                    limit,
                    "response exceeds accumulator limit"
                );
                return 0;
            }
        }
        self.buf.extend_from_slice(chunk);
        chunk.len()
    }
}

/// Sink that echoes every chunk to a writer between separator lines.
pub struct ChunkPrinter<W: Write> {
    out: W,
    calls: u64,
    error: Option<io::Error>,
}

const SEPARATOR: &str = "====================";

impl<W: Write> ChunkPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            calls: 0,
            error: None,
        }
    }

    /// Number of chunks received, including a refused one.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// First write failure, if any. A failure also aborts the transfer.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn print(&mut self, chunk: &[u8]) -> io::Result<()> {
        writeln!(
            self.out,
            "chunk {} ({} bytes):\n{SEPARATOR}\n",
            self.calls,
            chunk.len()
        )?;
        writeln!(self.out, "{}\n", chunk.to_str_lossy())?;
        writeln!(self.out, "{SEPARATOR}\nend of chunk")?;
        self.out.flush()
    }
}

impl<W: Write> WriteSink for ChunkPrinter<W> {
    fn on_chunk(&mut self, chunk: &[u8]) -> usize {
        self.calls += 1;
        match self.print(chunk) {
            Ok(()) => chunk.len(),
            Err(err) => {
                self.error.get_or_insert(err);
                0
            }
        }
    }
}

/// Sink that copies the body verbatim to a writer.
pub struct StreamSink<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> StreamSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    /// First write failure, if any. A failure also aborts the transfer.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> WriteSink for StreamSink<W> {
    fn on_chunk(&mut self, chunk: &[u8]) -> usize {
        match self.out.write_all(chunk) {
            Ok(()) => chunk.len(),
            Err(err) => {
                self.error.get_or_insert(err);
                0
            }
        }
    }
}
