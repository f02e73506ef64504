#![forbid(unsafe_code)]

use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use bytes::Bytes;
use parking_lot::Mutex;
use seekbuf_core::{BufferConfig, CacheError, CacheResult};
use seekbuf_source::{HandlePool, SourceHandle};
use seekbuf_worker::{BlockLoader, Client, WorkerRegistry};
use tracing::{debug, trace};

use crate::{report::LoadReport, stats::EvictionStats};

struct CacheState {
    store: BTreeMap<u64, Bytes>,
    stats: EvictionStats,
    pool: Box<dyn HandlePool>,
    /// Index of the short block that ended the stream, once seen.
    max_valid: Option<u64>,
    /// Prefetched or prefetching blocks not read since.
    speculative: HashSet<u64>,
    closed: bool,
}

impl CacheState {
    fn pin_end(&mut self, last_block: u64) {
        let pinned = self.max_valid.map_or(last_block, |m| m.min(last_block));
        if self.max_valid != Some(pinned) {
            debug!(last_block = pinned, "end of stream pinned");
            self.max_valid = Some(pinned);
            self.store.retain(|&index, _| index <= pinned);
        }
    }

    fn check_in_range(&self, index: u64) -> CacheResult<()> {
        match self.max_valid {
            Some(last_block) if index > last_block => Err(CacheError::PastEnd {
                block: index,
                last_block,
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
struct Counters {
    loads: AtomicU64,
    bytes_loaded: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// State shared between readers and the loader thread.
struct CacheCore {
    config: BufferConfig,
    state: Mutex<CacheState>,
    counters: Counters,
}

impl CacheCore {
    fn fill(&self, handle: &mut dyn SourceHandle, index: u64) -> CacheResult<Bytes> {
        handle.skip_to(self.config.block_start(index))?;
        let mut buf = vec![0u8; self.config.buffer_size];
        let n = handle.read(&mut buf)?;
        buf.truncate(n);
        Ok(Bytes::from(buf))
    }

    fn evict_over_bound(&self, state: &mut CacheState, loading: u64) {
        let now = Instant::now();
        while state.store.len() > self.config.max_used_buffers {
            let candidates = state.store.keys().copied();
            let Some(victim) = state.stats.select_purge_candidate(candidates, loading, now) else {
                break;
            };
            // The speculative flag stays until the block is read.
            state.store.remove(&victim);
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            trace!(block = victim, loading, "evicted");
        }
    }
}

impl BlockLoader for CacheCore {
    fn load_block(&self, index: u64) -> CacheResult<Bytes> {
        let mut handle = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(CacheError::Closed);
            }
            state.check_in_range(index)?;
            // Duplicate of a fill that already landed.
            if let Some(block) = state.store.get(&index) {
                return Ok(block.clone());
            }
            state.pool.checkout(index)?
        };

        let filled = self.fill(handle.as_mut(), index);
        let end = handle.position();

        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.pool.checkin(handle);

        let block = match filled {
            Ok(block) => block,
            Err(CacheError::UnexpectedEof { .. }) => {
                // The stream ended before the block start.
                let last_block = self.config.block_index(end);
                state.pin_end(last_block);
                return Err(CacheError::PastEnd {
                    block: index,
                    last_block,
                });
            }
            Err(e) => return Err(e),
        };

        if block.len() < self.config.buffer_size {
            state.pin_end(index);
        }
        state.store.insert(index, block.clone());
        if block.is_empty() {
            // End marker only; a seekable source reports one for any block
            // at or past the end, so it is not counted as a load.
            trace!(block = index, "empty block at end of stream");
        } else {
            state.stats.block_loaded(index);
            self.counters.loads.fetch_add(1, Ordering::Relaxed);
            self.counters
                .bytes_loaded
                .fetch_add(block.len() as u64, Ordering::Relaxed);
            trace!(block = index, len = block.len(), "block loaded");
        }

        self.evict_over_bound(state, index);
        Ok(block)
    }
}

/// Fixed-size block cache in front of one backing source.
///
/// Reads are served from an in-memory store of at most
/// `max_used_buffers` blocks. Misses are filled by the loader thread of the
/// source's type, and every read schedules speculative fills of the
/// `cache_ahead_count` blocks that follow.
///
/// ## Normative
/// - `read_at` returns fewer bytes than requested only at end-of-stream.
/// - After a short block is seen, no block past it is ever filled.
/// - No lock is held while a reader waits for a fill.
pub struct BlockCache {
    core: Arc<CacheCore>,
    client: Client,
}

impl BlockCache {
    /// Build a cache over `pool` and register it with the worker for `type_name`.
    pub fn new(
        config: BufferConfig,
        pool: Box<dyn HandlePool>,
        type_name: &str,
        registry: &WorkerRegistry,
    ) -> CacheResult<Self> {
        config.validate()?;
        let core = Arc::new(CacheCore {
            config,
            state: Mutex::new(CacheState {
                store: BTreeMap::new(),
                stats: EvictionStats::new(),
                pool,
                max_valid: None,
                speculative: HashSet::new(),
                closed: false,
            }),
            counters: Counters::default(),
        });
        let client = registry.register(type_name, Arc::clone(&core) as Arc<dyn BlockLoader>)?;
        debug!(
            type_name,
            client = client.id(),
            buffer_size = config.buffer_size,
            max_used_buffers = config.max_used_buffers,
            cache_ahead_count = config.cache_ahead_count,
            "block cache created"
        );
        Ok(Self { core, client })
    }

    pub fn config(&self) -> &BufferConfig {
        &self.core.config
    }

    pub fn type_name(&self) -> &str {
        self.client.type_name()
    }

    /// Copy bytes starting at `position` into `buf`.
    ///
    /// Returns the number of bytes copied; less than `buf.len()` only at
    /// end-of-stream, and `0` when `position` is exactly the end. Reading
    /// beyond the end fails with [`CacheError::PastEnd`] once the end is known.
    pub fn read_at(&self, position: u64, buf: &mut [u8]) -> CacheResult<usize> {
        let config = self.core.config;
        let mut copied = 0;
        let mut position = position;

        while copied < buf.len() {
            let index = config.block_index(position);
            let offset = config.block_offset(position);

            let block = self.block_for_read(index)?;
            self.prefetch_after(index);

            if offset > block.len() {
                return Err(CacheError::PastEnd {
                    block: index,
                    last_block: index,
                });
            }
            let n = (buf.len() - copied).min(block.len() - offset);
            buf[copied..copied + n].copy_from_slice(&block[offset..offset + n]);
            copied += n;
            position += n as u64;

            if block.len() < config.buffer_size {
                break;
            }
        }
        Ok(copied)
    }

    fn block_for_read(&self, index: u64) -> CacheResult<Bytes> {
        let ticket = {
            let mut state = self.core.state.lock();
            if state.closed {
                return Err(CacheError::Closed);
            }
            state.check_in_range(index)?;
            state.stats.block_used(index);
            state.speculative.remove(&index);

            if let Some(block) = state.store.get(&index) {
                self.core.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(block.clone());
            }
            self.core.counters.misses.fetch_add(1, Ordering::Relaxed);
            // Queued under the cache lock so a fill cannot land between the
            // store lookup and the request.
            self.client.request_load(index)?
        };
        trace!(block = index, "waiting for fill");
        ticket.wait()
    }

    fn prefetch_after(&self, index: u64) {
        let ahead = self.core.config.cache_ahead_count as u64;
        if ahead == 0 {
            return;
        }

        let mut state = self.core.state.lock();
        if state.closed {
            return;
        }
        for next in index + 1..=index.saturating_add(ahead) {
            if state.check_in_range(next).is_err() {
                break;
            }
            if state.store.contains_key(&next)
                || state.speculative.contains(&next)
                || self.client.has_request_for(next)
            {
                continue;
            }
            if self.client.request_prefetch(next).is_err() {
                break;
            }
            state.speculative.insert(next);
        }
    }

    /// Physical fills per block index. Empty after [`close`](Self::close).
    pub fn load_counts(&self) -> BTreeMap<u64, u32> {
        self.core.state.lock().stats.load_counts()
    }

    pub fn cached_blocks(&self) -> usize {
        self.core.state.lock().store.len()
    }

    pub fn report(&self) -> LoadReport {
        let state = self.core.state.lock();
        let counters = &self.core.counters;
        LoadReport {
            load_counts: state.stats.load_counts(),
            loads: counters.loads.load(Ordering::Relaxed),
            bytes_loaded: counters.bytes_loaded.load(Ordering::Relaxed),
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            evictions: counters.evictions.load(Ordering::Relaxed),
            cached_blocks: state.store.len(),
            open_handles: state.pool.len(),
            last_block: state.max_valid,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.core.state.lock().closed
    }

    /// Deregister from the loader, wait for an in-flight fill, then drop every
    /// block and close every handle. Idempotent.
    pub fn close(&self) {
        self.client.close();

        let mut state = self.core.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.pool.close_all();
        state.store.clear();
        state.stats.clear();
        state.speculative.clear();
        debug!(client = self.client.id(), type_name = self.client.type_name(), "block cache closed");
    }
}

impl Drop for BlockCache {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for BlockCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockCache")
            .field("type_name", &self.type_name())
            .field("config", &self.core.config)
            .finish_non_exhaustive()
    }
}
