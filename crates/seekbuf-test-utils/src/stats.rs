//! Transfer counters shared by a fake creator and every handle it opens.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use seekbuf_core::{format_duration, format_file_size};

#[derive(Debug, Default)]
struct Counters {
    calls: AtomicU64,
    opens: AtomicU64,
    closes: AtomicU64,
    seeks: AtomicU64,
    failures: AtomicU64,
    bytes_loaded: AtomicU64,
    bytes_skipped: AtomicU64,
    delay_nanos: AtomicU64,
}

/// Cheaply cloneable view of the counters; clones observe the same values.
#[derive(Clone, Debug, Default)]
pub struct TransferStats(Arc<Counters>);

impl TransferStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Low-level read and seek calls.
    pub fn calls(&self) -> u64 {
        self.0.calls.load(Ordering::Relaxed)
    }

    pub fn opens(&self) -> u64 {
        self.0.opens.load(Ordering::Relaxed)
    }

    pub fn closes(&self) -> u64 {
        self.0.closes.load(Ordering::Relaxed)
    }

    pub fn seeks(&self) -> u64 {
        self.0.seeks.load(Ordering::Relaxed)
    }

    /// Injected failures served so far.
    pub fn failures(&self) -> u64 {
        self.0.failures.load(Ordering::Relaxed)
    }

    pub fn bytes_loaded(&self) -> u64 {
        self.0.bytes_loaded.load(Ordering::Relaxed)
    }

    /// Bytes jumped over by seeks. Forward skips on a stream are reads and
    /// count as loaded.
    pub fn bytes_skipped(&self) -> u64 {
        self.0.bytes_skipped.load(Ordering::Relaxed)
    }

    /// Total emulated latency slept.
    pub fn delay(&self) -> Duration {
        Duration::from_nanos(self.0.delay_nanos.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        for counter in [
            &self.0.calls,
            &self.0.opens,
            &self.0.closes,
            &self.0.seeks,
            &self.0.failures,
            &self.0.bytes_loaded,
            &self.0.bytes_skipped,
            &self.0.delay_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_open(&self) {
        self.0.opens.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_close(&self) {
        self.0.closes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.0.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read(&self, loaded: usize) {
        self.0.calls.fetch_add(1, Ordering::Relaxed);
        self.0
            .bytes_loaded
            .fetch_add(loaded as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_seek(&self, skipped: u64) {
        self.0.calls.fetch_add(1, Ordering::Relaxed);
        self.0.seeks.fetch_add(1, Ordering::Relaxed);
        self.0.bytes_skipped.fetch_add(skipped, Ordering::Relaxed);
    }

    pub(crate) fn record_delay(&self, delay: Duration) {
        self.0
            .delay_nanos
            .fetch_add(delay.as_nanos() as u64, Ordering::Relaxed);
    }
}

impl fmt::Display for TransferStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "calls: {}, opens: {}, loaded: {}, skipped: {}, delay: {}",
            self.calls(),
            self.opens(),
            format_file_size(self.bytes_loaded()),
            format_file_size(self.bytes_skipped()),
            format_duration(self.delay()),
        )
    }
}
