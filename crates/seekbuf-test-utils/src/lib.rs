#![forbid(unsafe_code)]
#![expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    reason = "test utility crate — numeric casts are acceptable for pattern and delay generation"
)]
#![expect(
    clippy::missing_panics_doc,
    reason = "test utility crate — panic documentation not needed"
)]

//! Shared test utilities for the seekbuf workspace.

pub mod delay;
pub mod fixtures;
pub mod pattern;
pub mod rng;
pub mod stats;

pub use delay::{Delay, Latency};
pub use fixtures::*;
pub use pattern::{PatternSeekableCreator, PatternStreamCreator, pattern_byte, pattern_bytes};
pub use rng::*;
pub use stats::TransferStats;
