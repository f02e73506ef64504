#![forbid(unsafe_code)]

use std::{collections::BTreeMap, fmt};

use seekbuf_core::format_file_size;

/// Snapshot of a cache's load activity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Physical fills per block index. Empty end-of-stream blocks are not fills.
    pub load_counts: BTreeMap<u64, u32>,
    /// Total physical fills.
    pub loads: u64,
    pub bytes_loaded: u64,
    /// Block reads served from the store.
    pub hits: u64,
    /// Block reads that had to wait for a fill.
    pub misses: u64,
    pub evictions: u64,
    pub cached_blocks: usize,
    pub open_handles: usize,
    /// Index of the last block, once end-of-stream has been seen.
    pub last_block: Option<u64>,
}

impl LoadReport {
    /// Fraction of block reads served without waiting, in `[0, 1]`.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        #[expect(clippy::cast_precision_loss)]
        let ratio = self.hits as f64 / total as f64;
        ratio
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} loads ({}), {} hits, {} misses, {} evictions, {} cached, {} open handles",
            self.loads,
            format_file_size(self.bytes_loaded),
            self.hits,
            self.misses,
            self.evictions,
            self.cached_blocks,
            self.open_handles,
        )
    }
}
