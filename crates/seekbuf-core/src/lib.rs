#![forbid(unsafe_code)]

//! `seekbuf-core`
//!
//! Types shared by every seekbuf crate:
//! - [`CacheError`] / [`CacheResult`]: the single error type surfaced by reads
//! - [`BufferConfig`]: block size, store bound and cache-ahead depth
//! - [`format_file_size`] / [`format_duration`]: human-readable diagnostics

mod config;
mod error;
mod format;

pub use config::{
    BufferConfig, DEFAULT_BUFFER_SIZE, DEFAULT_CACHE_AHEAD_COUNT, DEFAULT_MAX_USED_BUFFERS,
};
pub use error::{CacheError, CacheResult};
pub use format::{format_duration, format_file_size};
