#![forbid(unsafe_code)]

use crate::{CacheError, CacheResult};

/// Default block size (128 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;
/// Default upper bound on blocks held by one cache.
pub const DEFAULT_MAX_USED_BUFFERS: usize = 64;
/// Default number of blocks prefetched after the one just served.
pub const DEFAULT_CACHE_AHEAD_COUNT: usize = 8;

/// Block layout and memory bound of one cache instance.
///
/// ## Normative
/// - `buffer_size > 0` and `max_used_buffers > 0`; checked by [`validate`](Self::validate).
/// - `cache_ahead_count` may be zero (prefetch disabled).
/// - Immutable once a cache is constructed from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferConfig {
    /// Size of one block in bytes.
    pub buffer_size: usize,
    /// Maximum number of blocks kept after any read returns.
    pub max_used_buffers: usize,
    /// Number of blocks after the current one to prefetch.
    pub cache_ahead_count: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_used_buffers: DEFAULT_MAX_USED_BUFFERS,
            cache_ahead_count: DEFAULT_CACHE_AHEAD_COUNT,
        }
    }
}

impl BufferConfig {
    /// Create a config with explicit values.
    #[must_use]
    pub fn new(buffer_size: usize, max_used_buffers: usize, cache_ahead_count: usize) -> Self {
        Self {
            buffer_size,
            max_used_buffers,
            cache_ahead_count,
        }
    }

    /// Default config with the block size matched to a transport's preferred chunk.
    #[must_use]
    pub fn for_chunk_size(chunk_size: usize) -> Self {
        Self::default().with_buffer_size(chunk_size)
    }

    /// Set block size.
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set the store bound.
    #[must_use]
    pub fn with_max_used_buffers(mut self, max_used_buffers: usize) -> Self {
        self.max_used_buffers = max_used_buffers;
        self
    }

    /// Set prefetch depth.
    #[must_use]
    pub fn with_cache_ahead_count(mut self, cache_ahead_count: usize) -> Self {
        self.cache_ahead_count = cache_ahead_count;
        self
    }

    pub fn validate(&self) -> CacheResult<()> {
        if self.buffer_size == 0 {
            return Err(CacheError::InvalidConfig("buffer_size must be > 0"));
        }
        if self.max_used_buffers == 0 {
            return Err(CacheError::InvalidConfig("max_used_buffers must be > 0"));
        }
        Ok(())
    }

    /// Index of the block containing `position`.
    #[must_use]
    pub fn block_index(&self, position: u64) -> u64 {
        position / self.buffer_size as u64
    }

    /// Byte offset of `position` inside its block.
    #[must_use]
    pub fn block_offset(&self, position: u64) -> usize {
        #[expect(clippy::cast_possible_truncation)] // remainder < buffer_size
        let offset = (position % self.buffer_size as u64) as usize;
        offset
    }

    /// First byte position of block `index`.
    #[must_use]
    pub fn block_start(&self, index: u64) -> u64 {
        index.saturating_mul(self.buffer_size as u64)
    }
}
