//! Transport failures reach the reader that needed the block, and only it.

use std::time::Duration;

use rstest::rstest;
use seekbuf::{
    BufferedSource,
    common::{BufferConfig, CacheError},
    worker::WorkerRegistry,
};
use seekbuf_test_utils::{PatternSeekableCreator, PatternStreamCreator};

use crate::common::{assert_pattern, registry, source_config, wait_until};

#[rstest]
#[case::stream(true)]
#[case::seekable(false)]
#[timeout(Duration::from_secs(10))]
#[test]
fn transient_failure_is_reported_then_retried(registry: WorkerRegistry, #[case] stream: bool) {
    let config = source_config(&registry, BufferConfig::new(1000, 4, 0));
    let source = if stream {
        BufferedSource::from_stream(PatternStreamCreator::new(10_000).with_failure(3500, 1), config)
    } else {
        BufferedSource::from_seekable(
            PatternSeekableCreator::new(10_000).with_failure(3500, 1),
            config,
        )
    }
    .unwrap();
    let mut buf = [0u8; 100];

    let err = source.read_at(3000, &mut buf).unwrap_err();
    assert!(err.is_io(), "got {err}");
    assert!(matches!(err, CacheError::Io(_)));

    assert_eq!(source.read_at(3000, &mut buf).unwrap(), 100);
    assert_pattern(&buf, 3000);
    assert_eq!(source.load_counts().get(&3), Some(&1));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[test]
fn failed_prefetch_is_refilled_on_demand(registry: WorkerRegistry) {
    let creator = PatternSeekableCreator::new(10_000).with_failure(2500, 1);
    let stats = creator.stats();
    let source = BufferedSource::from_seekable(
        creator,
        source_config(&registry, BufferConfig::new(1000, 8, 2)),
    )
    .unwrap();
    let mut buf = [0u8; 100];

    // Block 2 fails as a prefetch of the read of block 0.
    source.read_at(0, &mut buf).unwrap();
    assert!(wait_until(Duration::from_secs(5), || stats.failures() == 1));
    // Let the worker finish with the failed request before asking again.
    std::thread::sleep(Duration::from_millis(20));

    assert_eq!(source.read_at(2400, &mut buf).unwrap(), 100);
    assert_pattern(&buf, 2400);
}

#[rstest]
#[case::stream(true)]
#[case::seekable(false)]
#[test]
fn unreachable_source_fails_construction(registry: WorkerRegistry, #[case] stream: bool) {
    let config = source_config(&registry, BufferConfig::default());
    let err = if stream {
        BufferedSource::from_stream(
            PatternStreamCreator::new(100)
                .with_type_name("down")
                .failing_open(),
            config,
        )
    } else {
        BufferedSource::from_seekable(
            PatternSeekableCreator::new(100)
                .with_type_name("down")
                .failing_open(),
            config,
        )
    }
    .unwrap_err();

    assert!(err.is_io());
    assert_eq!(registry.worker_count(), 0);
}
