#![forbid(unsafe_code)]

//! `seekbuf-cache`
//!
//! The block cache proper: a bounded block store keyed by block index, filled
//! on demand by the worker of the source's type, with cache-ahead and
//! score-based eviction.

mod cache;
mod report;
mod stats;

pub use cache::BlockCache;
pub use report::LoadReport;
pub use stats::EvictionStats;
