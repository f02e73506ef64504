#![forbid(unsafe_code)]

use std::{
    io::{self, Read},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use seekbuf_core::{CacheError, CacheResult};
use tracing::{trace, warn};

use crate::creator::{ReadOutcome, SeekableCreator, StreamCreator};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

fn next_handle_id() -> u64 {
    NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// One open conduit to a backing source.
///
/// A handle is owned by its pool while idle and by the loader while a block is
/// being filled; it is never shared.
pub trait SourceHandle: Send {
    /// Process-unique id, used in logs.
    fn id(&self) -> u64;

    /// Byte position the next [`read`](Self::read) starts at.
    fn position(&self) -> u64;

    /// Fill `buf` completely, or stop at end-of-stream and return the short count.
    fn read(&mut self, buf: &mut [u8]) -> CacheResult<usize>;

    /// Move to `target`.
    ///
    /// Forward-only handles discard bytes up to `target` and fail with
    /// [`CacheError::UnexpectedEof`] if the stream ends first.
    fn skip_to(&mut self, target: u64) -> CacheResult<()>;

    /// `false` once the handle can no longer serve reads (end-of-stream reached on a
    /// forward-only stream, or a failed transfer). Pools close such handles on checkin.
    fn is_usable(&self) -> bool;

    fn close(self: Box<Self>);
}

/// Forward-only handle over a stream produced by a [`StreamCreator`].
pub struct StreamHandle<C: StreamCreator> {
    id: u64,
    stream: C::Stream,
    position: u64,
    usable: bool,
}

impl<C: StreamCreator> StreamHandle<C> {
    pub fn open(creator: &C) -> CacheResult<Self> {
        let stream = creator.open()?;
        let id = next_handle_id();
        trace!(handle = id, type_name = creator.type_name(), "stream handle opened");
        Ok(Self {
            id,
            stream,
            position: 0,
            usable: true,
        })
    }

    fn fail(&mut self, err: io::Error) -> CacheError {
        self.usable = false;
        err.into()
    }
}

impl<C: StreamCreator> SourceHandle for StreamHandle<C> {
    fn id(&self) -> u64 {
        self.id
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn read(&mut self, buf: &mut [u8]) -> CacheResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let result = self.stream.read(&mut buf[filled..]);
            match ReadOutcome::from_read(result) {
                Ok(ReadOutcome::Bytes(n)) => filled += n,
                Ok(ReadOutcome::EndOfStream) => {
                    self.usable = false;
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.position += filled as u64;
                    return Err(self.fail(e));
                }
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }

    fn skip_to(&mut self, target: u64) -> CacheResult<()> {
        let position = self.position;
        if target < position {
            return Err(self.fail(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot rewind stream handle from {position} to {target}"),
            )));
        }

        let wanted = target - position;
        let copied = io::copy(&mut (&mut self.stream).take(wanted), &mut io::sink());
        let skipped = match copied {
            Ok(n) => n,
            Err(e) => return Err(self.fail(e)),
        };
        self.position += skipped;

        if skipped < wanted {
            self.usable = false;
            return Err(CacheError::UnexpectedEof { position, target });
        }
        trace!(handle = self.id, from = position, to = target, "stream handle skipped");
        Ok(())
    }

    fn is_usable(&self) -> bool {
        self.usable
    }

    fn close(self: Box<Self>) {
        trace!(handle = self.id, position = self.position, "stream handle closed");
    }
}

/// The single bidirectional handle of a [`SeekableCreator`].
pub struct SeekableHandle<C: SeekableCreator> {
    id: u64,
    creator: Arc<C>,
    handle: C::Handle,
    position: u64,
    /// Cleared after a failed transfer: the transport position is unknown and
    /// the next skip must seek unconditionally.
    in_sync: bool,
}

impl<C: SeekableCreator> SeekableHandle<C> {
    pub fn open(creator: Arc<C>) -> CacheResult<Self> {
        let handle = creator.open()?;
        let id = next_handle_id();
        trace!(handle = id, type_name = creator.type_name(), "seekable handle opened");
        Ok(Self {
            id,
            creator,
            handle,
            position: 0,
            in_sync: true,
        })
    }
}

impl<C: SeekableCreator> SourceHandle for SeekableHandle<C> {
    fn id(&self) -> u64 {
        self.id
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn read(&mut self, buf: &mut [u8]) -> CacheResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.creator.read(&mut self.handle, &mut buf[filled..]) {
                Ok(ReadOutcome::Bytes(0) | ReadOutcome::EndOfStream) => break,
                Ok(ReadOutcome::Bytes(n)) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.in_sync = false;
                    return Err(e.into());
                }
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }

    fn skip_to(&mut self, target: u64) -> CacheResult<()> {
        if self.in_sync && target == self.position {
            return Ok(());
        }
        if let Err(e) = self.creator.seek(&mut self.handle, target) {
            self.in_sync = false;
            return Err(e.into());
        }
        self.position = target;
        self.in_sync = true;
        Ok(())
    }

    fn is_usable(&self) -> bool {
        true
    }

    fn close(self: Box<Self>) {
        let Self {
            id,
            creator,
            handle,
            ..
        } = *self;
        match creator.close(handle) {
            Ok(()) => trace!(handle = id, "seekable handle closed"),
            Err(e) => warn!(handle = id, err = %e, "failed to close seekable handle"),
        }
    }
}
