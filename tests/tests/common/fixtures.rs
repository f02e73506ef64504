use std::time::Duration;

use rstest::*;
use seekbuf::{BufferedSource, SourceConfig, common::BufferConfig, worker::WorkerRegistry};
use seekbuf_test_utils::pattern_bytes;
use tempfile::TempDir;

pub use seekbuf_test_utils::tracing_setup;

/// Grace period short enough that worker teardown is observable in a test.
pub const TEST_GRACE: Duration = Duration::from_millis(30);

/// Common fixture for temporary directory
#[fixture]
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Isolated registry so tests never share loader threads.
#[fixture]
pub fn registry() -> WorkerRegistry {
    WorkerRegistry::with_grace(TEST_GRACE)
}

pub fn source_config(registry: &WorkerRegistry, buffer: BufferConfig) -> SourceConfig {
    SourceConfig::default()
        .with_buffer(buffer)
        .with_registry(registry.clone())
}

/// Read `source` front to back in `chunk`-sized reads.
pub fn read_sequential(source: &BufferedSource, chunk: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = vec![0u8; chunk];
    loop {
        let n = source.read_at(out.len() as u64, &mut buf).unwrap();
        out.extend_from_slice(&buf[..n]);
        if n < chunk {
            return out;
        }
    }
}

/// Panics with the first mismatching offset instead of dumping both buffers.
pub fn assert_pattern(data: &[u8], start: u64) {
    let expected = pattern_bytes(start, data.len());
    if let Some(at) = data.iter().zip(&expected).position(|(a, b)| a != b) {
        panic!(
            "byte {} differs: got {:#04x}, expected {:#04x}",
            start + at as u64,
            data[at],
            expected[at]
        );
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while !cond() {
        if std::time::Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    true
}
