#![forbid(unsafe_code)]

//! `seekbuf-source`
//!
//! Everything below the block cache that touches the backing resource:
//! - [`StreamCreator`] / [`SeekableCreator`]: the two transport contracts
//! - [`SourceHandle`]: one open conduit with a known position
//! - [`HandlePool`]: picks or opens a handle for a block, per transport mode
//! - file-backed creators for local paths

mod creator;
mod file;
mod handle;
mod pool;

pub use creator::{ReadOutcome, SeekableCreator, StreamCreator};
pub use file::{FileSeekableCreator, FileStreamCreator};
pub use handle::{SeekableHandle, SourceHandle, StreamHandle};
pub use pool::{HandlePool, SeekablePool, StreamPool};
