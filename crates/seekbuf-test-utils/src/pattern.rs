//! Fake transports serving a deterministic byte pattern.
//!
//! `byte[i] = (i & 0xFF) ^ ((i >> 8) & 0xFF)` never repeats with a period that
//! lines up with common block sizes, so a misplaced block shows up immediately.

use std::{
    io::{self, Read},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use parking_lot::Mutex;
use seekbuf_source::{ReadOutcome, SeekableCreator, StreamCreator};

use crate::{delay::Latency, rng::Xorshift64, stats::TransferStats};

#[must_use]
pub fn pattern_byte(index: u64) -> u8 {
    ((index & 0xFF) ^ ((index >> 8) & 0xFF)) as u8
}

/// `len` pattern bytes starting at absolute offset `start`.
#[must_use]
pub fn pattern_bytes(start: u64, len: usize) -> Vec<u8> {
    (start..start + len as u64).map(pattern_byte).collect()
}

/// Behaviour shared by both creators and every handle they open.
#[derive(Debug)]
struct Pattern {
    len: u64,
    latency: Latency,
    rng: Mutex<Xorshift64>,
    /// Reads covering this offset fail while `failures_left > 0`.
    fail_at: Option<u64>,
    failures_left: AtomicUsize,
    fail_open: bool,
    stats: TransferStats,
}

impl Pattern {
    fn new(len: u64) -> Self {
        Self {
            len,
            latency: Latency::default(),
            rng: Mutex::new(Xorshift64::new(len)),
            fail_at: None,
            failures_left: AtomicUsize::new(0),
            fail_open: false,
            stats: TransferStats::new(),
        }
    }

    fn open(&self) -> io::Result<()> {
        if self.fail_open {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "pattern source unavailable",
            ));
        }
        self.stats.record_open();
        Ok(())
    }

    fn emulate(&self, loaded: usize, skipped: u64) {
        if self.latency.is_zero() {
            return;
        }
        let delay = self
            .latency
            .cost(&mut self.rng.lock(), loaded as u64, skipped);
        self.stats.record_delay(delay);
        thread::sleep(delay);
    }

    fn check_failure(&self, position: u64, len: usize) -> io::Result<()> {
        let Some(at) = self.fail_at else {
            return Ok(());
        };
        let covers = position <= at && at < position + len as u64;
        if covers
            && self
                .failures_left
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                .is_ok()
        {
            self.stats.record_failure();
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                format!("injected failure at byte {at}"),
            ));
        }
        Ok(())
    }

    /// Fill `buf` from `position`; `0` at the end.
    fn read(&self, position: u64, buf: &mut [u8]) -> io::Result<usize> {
        let n = (self.len.saturating_sub(position)).min(buf.len() as u64) as usize;
        self.check_failure(position, n)?;
        self.emulate(n, 0);
        for (i, byte) in buf[..n].iter_mut().enumerate() {
            *byte = pattern_byte(position + i as u64);
        }
        self.stats.record_read(n);
        Ok(n)
    }

    fn configure(mut self: Arc<Self>, f: impl FnOnce(&mut Self)) -> Arc<Self> {
        if let Some(pattern) = Arc::get_mut(&mut self) {
            f(pattern);
            return self;
        }
        let mut fresh = Self::new(self.len);
        fresh.latency = self.latency;
        fresh.fail_at = self.fail_at;
        fresh.failures_left = AtomicUsize::new(self.failures_left.load(Ordering::Acquire));
        fresh.fail_open = self.fail_open;
        fresh.stats = self.stats.clone();
        f(&mut fresh);
        Arc::new(fresh)
    }
}

macro_rules! pattern_builders {
    ($creator:ty) => {
        impl $creator {
            /// Label the creator; caches sharing it share one loader thread.
            #[must_use]
            pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
                self.type_name = type_name.into();
                self
            }

            #[must_use]
            pub fn with_latency(mut self, latency: Latency) -> Self {
                self.pattern = self.pattern.configure(|p| p.latency = latency);
                self
            }

            #[must_use]
            pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
                self.chunk_size = Some(chunk_size);
                self
            }

            /// Fail the next `times` reads that cover byte `offset`.
            #[must_use]
            pub fn with_failure(mut self, offset: u64, times: usize) -> Self {
                self.pattern = self.pattern.configure(|p| {
                    p.fail_at = Some(offset);
                    p.failures_left = AtomicUsize::new(times);
                });
                self
            }

            /// Every `open` fails with `NotFound`.
            #[must_use]
            pub fn failing_open(mut self) -> Self {
                self.pattern = self.pattern.configure(|p| p.fail_open = true);
                self
            }

            pub fn stats(&self) -> TransferStats {
                self.pattern.stats.clone()
            }

            pub fn len(&self) -> u64 {
                self.pattern.len
            }

            pub fn is_empty(&self) -> bool {
                self.pattern.len == 0
            }
        }
    };
}

/// Forward-only pattern streams of a fixed length.
#[derive(Debug)]
pub struct PatternStreamCreator {
    pattern: Arc<Pattern>,
    type_name: String,
    chunk_size: Option<usize>,
}

impl PatternStreamCreator {
    #[must_use]
    pub fn new(len: u64) -> Self {
        Self {
            pattern: Arc::new(Pattern::new(len)),
            type_name: "pattern".to_owned(),
            chunk_size: None,
        }
    }
}

pattern_builders!(PatternStreamCreator);

/// One open forward-only stream.
#[derive(Debug)]
pub struct PatternStream {
    pattern: Arc<Pattern>,
    position: u64,
}

impl Read for PatternStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.pattern.read(self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Drop for PatternStream {
    fn drop(&mut self) {
        self.pattern.stats.record_close();
    }
}

impl StreamCreator for PatternStreamCreator {
    type Stream = PatternStream;

    fn open(&self) -> io::Result<PatternStream> {
        self.pattern.open()?;
        Ok(PatternStream {
            pattern: Arc::clone(&self.pattern),
            position: 0,
        })
    }

    fn length(&self) -> io::Result<u64> {
        Ok(self.pattern.len)
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn preferred_chunk_size(&self) -> Option<usize> {
        self.chunk_size
    }
}

/// Seekable pattern source; seeks are charged the per-MiB skip delay.
#[derive(Debug)]
pub struct PatternSeekableCreator {
    pattern: Arc<Pattern>,
    type_name: String,
    chunk_size: Option<usize>,
}

impl PatternSeekableCreator {
    #[must_use]
    pub fn new(len: u64) -> Self {
        Self {
            pattern: Arc::new(Pattern::new(len)),
            type_name: "pattern-seekable".to_owned(),
            chunk_size: None,
        }
    }
}

pattern_builders!(PatternSeekableCreator);

/// Position of one open seekable handle.
#[derive(Debug)]
pub struct PatternCursor {
    position: u64,
}

impl SeekableCreator for PatternSeekableCreator {
    type Handle = PatternCursor;

    fn open(&self) -> io::Result<PatternCursor> {
        self.pattern.open()?;
        Ok(PatternCursor { position: 0 })
    }

    fn length(&self) -> io::Result<u64> {
        Ok(self.pattern.len)
    }

    fn seek(&self, handle: &mut PatternCursor, position: u64) -> io::Result<()> {
        let target = position.min(self.pattern.len);
        let skipped = target.abs_diff(handle.position);
        self.pattern.emulate(0, skipped);
        self.pattern.stats.record_seek(skipped);
        handle.position = target;
        Ok(())
    }

    fn read(&self, handle: &mut PatternCursor, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        let result = self.pattern.read(handle.position, buf);
        if let Ok(n) = result {
            handle.position += n as u64;
        }
        ReadOutcome::from_read(result)
    }

    fn close(&self, handle: PatternCursor) -> io::Result<()> {
        drop(handle);
        self.pattern.stats.record_close();
        Ok(())
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn preferred_chunk_size(&self) -> Option<usize> {
        self.chunk_size
    }
}
