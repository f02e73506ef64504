#![forbid(unsafe_code)]

use std::{cmp::Reverse, sync::Arc};

use seekbuf_core::{CacheError, CacheResult};
use tracing::debug;

use crate::{
    creator::{SeekableCreator, StreamCreator},
    handle::{SeekableHandle, SourceHandle, StreamHandle},
};

/// Owner of the open [`SourceHandle`]s of one cache.
///
/// The loader checks a handle out under the cache lock, positions it and reads
/// the block without holding the lock, then checks it back in.
pub trait HandlePool: Send {
    /// Take a handle that can be moved to the start of block `index`.
    ///
    /// The returned handle is not yet positioned; callers `skip_to` the block start.
    fn checkout(&mut self, index: u64) -> CacheResult<Box<dyn SourceHandle>>;

    /// Return a handle. Unusable handles, and any handle returned after
    /// [`close_all`](Self::close_all), are closed instead of kept.
    fn checkin(&mut self, handle: Box<dyn SourceHandle>);

    /// Close every idle handle. Later checkouts fail with [`CacheError::Closed`].
    fn close_all(&mut self);

    /// Number of idle handles held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pool of forward-only handles for a [`StreamCreator`].
pub struct StreamPool<C: StreamCreator> {
    creator: Arc<C>,
    buffer_size: u64,
    /// Sorted by descending position at each checkout.
    idle: Vec<Box<dyn SourceHandle>>,
    closed: bool,
}

impl<C: StreamCreator> StreamPool<C> {
    /// Create the pool and open its first handle at byte 0.
    pub fn new(creator: Arc<C>, buffer_size: usize) -> CacheResult<Self> {
        let first = StreamHandle::open(creator.as_ref())?;
        Ok(Self {
            creator,
            buffer_size: buffer_size as u64,
            idle: vec![Box::new(first)],
            closed: false,
        })
    }

    fn block_of(&self, handle: &dyn SourceHandle) -> u64 {
        handle.position() / self.buffer_size
    }

    fn drop_duplicates(&mut self) {
        let mut i = 1;
        while i < self.idle.len() {
            if self.block_of(self.idle[i - 1].as_ref()) == self.block_of(self.idle[i].as_ref()) {
                let duplicate = self.idle.remove(i);
                debug!(
                    handle = duplicate.id(),
                    position = duplicate.position(),
                    "closing duplicate stream handle"
                );
                duplicate.close();
            } else {
                i += 1;
            }
        }
    }
}

impl<C: StreamCreator> HandlePool for StreamPool<C> {
    fn checkout(&mut self, index: u64) -> CacheResult<Box<dyn SourceHandle>> {
        if self.closed {
            return Err(CacheError::Closed);
        }

        self.idle.sort_by_key(|h| Reverse(h.position()));
        self.drop_duplicates();

        let target = index.saturating_mul(self.buffer_size);
        if let Some(at) = self.idle.iter().position(|h| h.position() <= target) {
            return Ok(self.idle.remove(at));
        }

        let handle = StreamHandle::open(self.creator.as_ref())?;
        debug!(
            block = index,
            handle = handle.id(),
            idle = self.idle.len(),
            "no stream handle at or before block, opened a new one"
        );
        Ok(Box::new(handle))
    }

    fn checkin(&mut self, handle: Box<dyn SourceHandle>) {
        if self.closed || !handle.is_usable() {
            handle.close();
        } else {
            self.idle.push(handle);
        }
    }

    fn close_all(&mut self) {
        self.closed = true;
        for handle in self.idle.drain(..) {
            handle.close();
        }
    }

    fn len(&self) -> usize {
        self.idle.len()
    }
}

impl<C: StreamCreator> Drop for StreamPool<C> {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// Holder of the single handle of a [`SeekableCreator`].
pub struct SeekablePool<C: SeekableCreator> {
    creator: Arc<C>,
    handle: Option<Box<dyn SourceHandle>>,
    closed: bool,
}

impl<C: SeekableCreator> SeekablePool<C> {
    /// Create the pool and open its handle.
    pub fn new(creator: Arc<C>) -> CacheResult<Self> {
        let handle = SeekableHandle::open(Arc::clone(&creator))?;
        Ok(Self {
            creator,
            handle: Some(Box::new(handle)),
            closed: false,
        })
    }
}

impl<C: SeekableCreator> HandlePool for SeekablePool<C> {
    fn checkout(&mut self, _index: u64) -> CacheResult<Box<dyn SourceHandle>> {
        if self.closed {
            return Err(CacheError::Closed);
        }
        if let Some(handle) = self.handle.take() {
            return Ok(handle);
        }
        // Only reachable if a previous checkout was never returned.
        let handle = SeekableHandle::open(Arc::clone(&self.creator))?;
        debug!(handle = handle.id(), "reopened seekable handle");
        Ok(Box::new(handle))
    }

    fn checkin(&mut self, handle: Box<dyn SourceHandle>) {
        if self.closed || self.handle.is_some() {
            handle.close();
        } else {
            self.handle = Some(handle);
        }
    }

    fn close_all(&mut self) {
        self.closed = true;
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
    }

    fn len(&self) -> usize {
        usize::from(self.handle.is_some())
    }
}

impl<C: SeekableCreator> Drop for SeekablePool<C> {
    fn drop(&mut self) {
        self.close_all();
    }
}
