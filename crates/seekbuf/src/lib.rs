#![forbid(unsafe_code)]

//! # Seekbuf
//!
//! Random-access reads over sources that are only cheap to read forward and
//! in bulk.
//!
//! ## Quick start
//!
//! ```ignore
//! use seekbuf::prelude::*;
//!
//! let creator = FileStreamCreator::new("/media/song.flac");
//! let source = BufferedSource::from_stream(creator, SourceConfig::default())?;
//!
//! let mut buf = [0u8; 4096];
//! let n = source.read_at(1_000_000, &mut buf)?;
//!
//! // Or as `Read + Seek`
//! let mut reader = SourceReader::new(Arc::new(source));
//! ```

// ── Re-export sub-crates ────────────────────────────────────────────────

pub mod common {
    pub use seekbuf_core::*;
}

pub mod source {
    pub use seekbuf_source::*;
}

pub mod worker {
    pub use seekbuf_worker::*;
}

pub mod cache {
    pub use seekbuf_cache::*;
}

// ── Buffered source ─────────────────────────────────────────────────────

mod buffered;
mod config;
mod reader;

pub use buffered::BufferedSource;
pub use config::SourceConfig;
pub use reader::SourceReader;

// ── Prelude ─────────────────────────────────────────────────────────────

pub mod prelude {
    pub use seekbuf_cache::LoadReport;
    pub use seekbuf_core::{BufferConfig, CacheError, CacheResult};
    pub use seekbuf_source::{
        FileSeekableCreator, FileStreamCreator, ReadOutcome, SeekableCreator, StreamCreator,
    };
    pub use seekbuf_worker::WorkerRegistry;

    pub use crate::{BufferedSource, SourceConfig, SourceReader};
}
