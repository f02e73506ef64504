//! Loader threads live exactly as long as they have sources, plus a grace period.

use std::time::Duration;

use rstest::rstest;
use seekbuf::{BufferedSource, common::BufferConfig, worker::WorkerRegistry};
use seekbuf_test_utils::PatternStreamCreator;

use crate::common::{TEST_GRACE, registry, source_config, wait_until};

fn source(registry: &WorkerRegistry) -> BufferedSource {
    BufferedSource::from_stream(
        PatternStreamCreator::new(10_000).with_type_name("lifecycle"),
        source_config(registry, BufferConfig::new(1000, 4, 2)),
    )
    .unwrap()
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[test]
fn worker_retires_after_last_source_closes(registry: WorkerRegistry) {
    let first = source(&registry);
    let second = source(&registry);
    let mut buf = [0u8; 64];
    first.read_at(0, &mut buf).unwrap();
    second.read_at(5000, &mut buf).unwrap();

    drop(first);
    assert!(registry.has_worker("lifecycle"));
    assert_eq!(registry.client_count("lifecycle"), 1);

    second.close();
    assert!(wait_until(TEST_GRACE * 20, || !registry.has_worker("lifecycle")));
    assert_eq!(registry.worker_count(), 0);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[test]
fn new_source_within_grace_keeps_worker() {
    let registry = WorkerRegistry::with_grace(Duration::from_secs(5));
    let first = source(&registry);
    first.close();
    assert!(registry.has_worker("lifecycle"));

    let second = source(&registry);
    let mut buf = [0u8; 64];
    assert_eq!(second.read_at(9990, &mut buf).unwrap(), 10);
    assert_eq!(registry.worker_count(), 1);
    assert_eq!(registry.client_count("lifecycle"), 1);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[test]
fn worker_is_recreated_after_retiring(registry: WorkerRegistry) {
    drop(source(&registry));
    assert!(wait_until(TEST_GRACE * 20, || registry.worker_count() == 0));

    let again = source(&registry);
    let mut buf = [0u8; 64];
    assert_eq!(again.read_at(0, &mut buf).unwrap(), 64);
    assert!(registry.has_worker("lifecycle"));
}
