#![forbid(unsafe_code)]

use std::{
    collections::{BTreeMap, HashMap},
    time::{Duration, Instant},
};

#[derive(Clone, Copy, Debug, Default)]
struct Record {
    load_count: u32,
    last_load: Option<Instant>,
    last_used: Option<Instant>,
}

impl Record {
    fn last_touch(&self) -> Option<Instant> {
        match (self.last_load, self.last_used) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Idle time divided by load count: blocks that were cheap to get once and
    /// are not being read score highest.
    fn score(&self, now: Instant) -> f64 {
        let idle = self
            .last_touch()
            .map_or(Duration::ZERO, |t| now.saturating_duration_since(t));
        idle.as_secs_f64() / f64::from(self.load_count.max(1))
    }
}

/// Per-block load and use history used to pick eviction victims.
///
/// ## Normative
/// - `block_used` is recorded on every read of a block, hit or miss.
/// - `block_loaded` is recorded only for a physical fill.
/// - Records outlive eviction of their block, so a block that keeps being
///   re-fetched accumulates load count and becomes less likely to be evicted.
#[derive(Debug, Default)]
pub struct EvictionStats {
    records: HashMap<u64, Record>,
}

impl EvictionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_loaded(&mut self, index: u64) {
        self.block_loaded_at(index, Instant::now());
    }

    pub fn block_loaded_at(&mut self, index: u64, now: Instant) {
        let record = self.records.entry(index).or_default();
        record.load_count = record.load_count.saturating_add(1);
        record.last_load = Some(now);
    }

    pub fn block_used(&mut self, index: u64) {
        self.block_used_at(index, Instant::now());
    }

    pub fn block_used_at(&mut self, index: u64, now: Instant) {
        self.records.entry(index).or_default().last_used = Some(now);
    }

    /// Number of physical fills of block `index` so far.
    pub fn load_count(&self, index: u64) -> u32 {
        self.records.get(&index).map_or(0, |r| r.load_count)
    }

    /// Load counts of every block that was filled at least once.
    pub fn load_counts(&self) -> BTreeMap<u64, u32> {
        self.records
            .iter()
            .filter(|(_, r)| r.load_count > 0)
            .map(|(&index, r)| (index, r.load_count))
            .collect()
    }

    /// Highest-scoring block of `cached`, never `loading`.
    ///
    /// Ties go to the block encountered first. Returns `None` only when there is
    /// no candidate besides `loading`.
    pub fn select_purge_candidate(
        &self,
        cached: impl IntoIterator<Item = u64>,
        loading: u64,
        now: Instant,
    ) -> Option<u64> {
        let mut best: Option<(u64, f64)> = None;
        for index in cached {
            if index == loading {
                continue;
            }
            let score = self
                .records
                .get(&index)
                .map_or(f64::INFINITY, |r| r.score(now));
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((index, score));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Whether block `index` has any load or use history.
    pub fn is_tracked(&self, index: u64) -> bool {
        self.records.contains_key(&index)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
