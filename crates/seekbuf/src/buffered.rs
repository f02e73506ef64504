#![forbid(unsafe_code)]

use std::{
    collections::BTreeMap,
    fmt, io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::Mutex;
use seekbuf_cache::{BlockCache, LoadReport};
use seekbuf_core::{BufferConfig, CacheError, CacheResult};
use seekbuf_source::{HandlePool, SeekableCreator, SeekablePool, StreamCreator, StreamPool};
use tracing::debug;

use crate::config::SourceConfig;

type LengthFn = Box<dyn Fn() -> io::Result<u64> + Send + Sync>;

/// Randomly addressable view of one backing resource.
///
/// Owns a [`BlockCache`], the handle pool that feeds it and a registration with
/// the loader thread of the creator's type. Safe to share between threads.
///
/// ## Normative
/// - `read_at` returns fewer bytes than asked only at end-of-stream.
/// - `size` queries the creator at most once successfully.
/// - After `close` (or drop) no handle or loader registration remains.
pub struct BufferedSource {
    cache: BlockCache,
    length: LengthFn,
    size: Mutex<Option<u64>>,
    closed: AtomicBool,
}

impl BufferedSource {
    /// Cache over a forward-only transport.
    ///
    /// Opens the first stream immediately, so an unreachable resource fails here.
    pub fn from_stream<C: StreamCreator>(creator: C, config: SourceConfig) -> CacheResult<Self> {
        let creator = Arc::new(creator);
        let buffer = config.resolve_buffer(creator.preferred_chunk_size());
        buffer.validate()?;
        let pool = StreamPool::new(Arc::clone(&creator), buffer.buffer_size)?;
        let length = {
            let creator = Arc::clone(&creator);
            Box::new(move || creator.length())
        };
        Self::build(buffer, Box::new(pool), creator.type_name(), &config, length)
    }

    /// Cache over a seekable transport, read through a single handle.
    pub fn from_seekable<C: SeekableCreator>(creator: C, config: SourceConfig) -> CacheResult<Self> {
        let creator = Arc::new(creator);
        let buffer = config.resolve_buffer(creator.preferred_chunk_size());
        buffer.validate()?;
        let pool = SeekablePool::new(Arc::clone(&creator))?;
        let length = {
            let creator = Arc::clone(&creator);
            Box::new(move || creator.length())
        };
        Self::build(buffer, Box::new(pool), creator.type_name(), &config, length)
    }

    fn build(
        buffer: BufferConfig,
        pool: Box<dyn HandlePool>,
        type_name: &str,
        config: &SourceConfig,
        length: LengthFn,
    ) -> CacheResult<Self> {
        let cache = BlockCache::new(buffer, pool, type_name, &config.resolve_registry())?;
        Ok(Self {
            cache,
            length,
            size: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Copy bytes starting at `position` into `buf`.
    ///
    /// Returns the number of bytes copied, short only at end-of-stream. Blocks
    /// while a missing block is filled; never blocks on prefetch.
    pub fn read_at(&self, position: u64, buf: &mut [u8]) -> CacheResult<usize> {
        self.cache.read_at(position, buf)
    }

    /// Total length of the resource.
    ///
    /// The first successful answer is kept; failures are not cached.
    pub fn size(&self) -> CacheResult<u64> {
        let mut size = self.size.lock();
        if let Some(size) = *size {
            return Ok(size);
        }
        if self.is_closed() {
            return Err(CacheError::Closed);
        }
        let len = (self.length)()?;
        debug!(type_name = self.type_name(), len, "source size resolved");
        *size = Some(len);
        Ok(len)
    }

    /// Block size, for callers that want to align their reads.
    pub fn buffer_size(&self) -> usize {
        self.cache.config().buffer_size
    }

    pub fn config(&self) -> &BufferConfig {
        self.cache.config()
    }

    pub fn type_name(&self) -> &str {
        self.cache.type_name()
    }

    /// Physical fills per block index so far.
    pub fn load_counts(&self) -> BTreeMap<u64, u32> {
        self.cache.load_counts()
    }

    pub fn report(&self) -> LoadReport {
        self.cache.report()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Release every resource. Waits for a fill of this source that is in
    /// progress; requests not yet started are abandoned. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cache.close();
        debug!(type_name = self.type_name(), "buffered source closed");
    }
}

impl Drop for BufferedSource {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for BufferedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedSource")
            .field("cache", &self.cache)
            .field("size", &*self.size.lock())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
