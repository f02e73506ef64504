#![forbid(unsafe_code)]

use std::io::{self, Read};

/// Result of one low-level read against a backing source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were written to the front of the buffer (`n > 0`).
    Bytes(usize),
    /// The source has no more data at the current position.
    EndOfStream,
}

/// Factory for forward-only byte streams over one backing resource.
///
/// Every call to [`open`](Self::open) yields an independent stream positioned at
/// byte 0. Streams are never rewound; a handle pool opens another one when it
/// needs to go back.
///
/// Normative:
/// - `Ok(0)` from the stream, or an `UnexpectedEof` error, is end-of-stream.
/// - `type_name` groups creators that must share one loader thread. Two
///   creators with the same name never have their streams read concurrently.
pub trait StreamCreator: Send + Sync + 'static {
    type Stream: Read + Send + 'static;

    fn open(&self) -> io::Result<Self::Stream>;

    /// Total length of the resource in bytes.
    fn length(&self) -> io::Result<u64>;

    fn type_name(&self) -> &str;

    /// Transfer size the transport works best with, if it has one.
    fn preferred_chunk_size(&self) -> Option<usize> {
        None
    }
}

/// Factory for seekable handles over one backing resource.
///
/// A seekable source is used through exactly one handle for the lifetime of a
/// cache, so the creator is also the place where reads and seeks are routed.
pub trait SeekableCreator: Send + Sync + 'static {
    type Handle: Send + 'static;

    fn open(&self) -> io::Result<Self::Handle>;

    /// Total length of the resource in bytes.
    fn length(&self) -> io::Result<u64>;

    /// Move `handle` to the absolute byte `position`.
    fn seek(&self, handle: &mut Self::Handle, position: u64) -> io::Result<()>;

    /// Read into `buf` at the handle's current position.
    fn read(&self, handle: &mut Self::Handle, buf: &mut [u8]) -> io::Result<ReadOutcome>;

    fn close(&self, handle: Self::Handle) -> io::Result<()> {
        drop(handle);
        Ok(())
    }

    fn type_name(&self) -> &str;

    /// Transfer size the transport works best with, if it has one.
    fn preferred_chunk_size(&self) -> Option<usize> {
        None
    }
}

impl ReadOutcome {
    /// Classify the result of a plain [`Read::read`] call.
    pub fn from_read(result: io::Result<usize>) -> io::Result<Self> {
        match result {
            Ok(0) => Ok(Self::EndOfStream),
            Ok(n) => Ok(Self::Bytes(n)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(Self::EndOfStream),
            Err(e) => Err(e),
        }
    }
}
