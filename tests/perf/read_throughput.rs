//! Performance tests for buffered reads over slow sources.
//!
//! Run with: `cargo test --test read_throughput --features perf --release -- --ignored --nocapture`

#![cfg(feature = "perf")]
#![expect(clippy::unwrap_used, reason = "perf test — unwraps are acceptable")]

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use seekbuf::{BufferedSource, SourceConfig, common::BufferConfig, common::format_duration};
use seekbuf_test_utils::{Delay, Latency, PatternStreamCreator, TransferStats, Xorshift64};

const LEN: u64 = 16 * 1024 * 1024;

fn network_latency() -> Latency {
    Latency {
        per_call: Delay::millis(1, 2),
        per_mib_load: Delay::millis(4, 8),
        per_mib_skip: Delay::millis(1, 3),
    }
}

fn open(buffer: BufferConfig) -> (Arc<BufferedSource>, TransferStats) {
    let creator = PatternStreamCreator::new(LEN).with_latency(network_latency());
    let stats = creator.stats();
    let source = BufferedSource::from_stream(creator, SourceConfig::default().with_buffer(buffer))
        .unwrap();
    (Arc::new(source), stats)
}

fn report(name: &str, elapsed: Duration, source: &BufferedSource, stats: &TransferStats) {
    println!("\n{:=<60}", "");
    println!("{name}");
    println!("Elapsed: {}", format_duration(elapsed));
    println!("Cache: {}", source.report());
    println!("Transport: {stats}");
    println!("{:=<60}\n", "");
}

#[test]
#[ignore]
fn perf_sequential_4k_reads() {
    for cache_ahead_count in [0, 2, 8] {
        let (source, stats) = open(BufferConfig::new(128 * 1024, 16, cache_ahead_count));
        let mut buf = vec![0u8; 4096];
        let start = Instant::now();
        let mut position = 0;
        while position < LEN {
            position += source.read_at(position, &mut buf).unwrap() as u64;
        }
        report(
            &format!("Sequential 4 KiB reads, cache-ahead {cache_ahead_count}"),
            start.elapsed(),
            &source,
            &stats,
        );
    }
}

#[test]
#[ignore]
fn perf_random_reads() {
    for buffer_size in [16 * 1024, 64 * 1024, 256 * 1024] {
        let (source, stats) = open(BufferConfig::new(buffer_size, 32, 2));
        let mut rng = Xorshift64::new(99);
        let mut buf = vec![0u8; 8192];
        let start = Instant::now();
        for _ in 0..2000 {
            source.read_at(rng.range_u64(0, LEN), &mut buf).unwrap();
        }
        report(
            &format!("Random 8 KiB reads, {buffer_size} byte blocks"),
            start.elapsed(),
            &source,
            &stats,
        );
    }
}

#[test]
#[ignore]
fn perf_threads_sharing_one_source() {
    let (source, stats) = open(BufferConfig::new(128 * 1024, 32, 4));
    let start = Instant::now();
    let readers: Vec<_> = (0..8u64)
        .map(|t| {
            let source = Arc::clone(&source);
            thread::spawn(move || {
                let mut rng = Xorshift64::new(t + 1);
                let mut buf = vec![0u8; 16 * 1024];
                let mut position = rng.range_u64(0, LEN);
                for _ in 0..500 {
                    let n = source.read_at(position, &mut buf).unwrap();
                    position = if n < buf.len() { 0 } else { position + n as u64 };
                }
            })
        })
        .collect();
    for reader in readers {
        reader.join().unwrap();
    }
    report("8 threads, 16 KiB reads", start.elapsed(), &source, &stats);
}
