#![forbid(unsafe_code)]

use std::{io, sync::Arc};

use thiserror::Error;

/// Result type used across seekbuf.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors produced by the block cache and its collaborators.
///
/// The type is `Clone`: a single failed fill is delivered to every caller
/// waiting on that block, so I/O errors are shared behind an `Arc`.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[source] Arc<io::Error>),

    #[error("unexpected end of stream skipping from {position} to {target}")]
    UnexpectedEof { position: u64, target: u64 },

    #[error("block {block} is past end of stream (last block {last_block})")]
    PastEnd { block: u64, last_block: u64 },

    #[error("invalid buffer config: {0}")]
    InvalidConfig(&'static str),

    #[error("source closed")]
    Closed,

    #[error("load of block {block} abandoned before completion")]
    Abandoned { block: u64 },

    #[error("failed to spawn loader thread: {0}")]
    Spawn(#[source] Arc<io::Error>),
}

impl From<io::Error> for CacheError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl CacheError {
    /// Returns `true` for failures of the backing transport.
    ///
    /// These are reported to the waiters of the affected block only and do not
    /// poison the cache: a later read of the same block retries the fill.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::UnexpectedEof { .. })
    }
}
