//! Several sources of one type share a loader thread without interfering.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use rstest::rstest;
use seekbuf::{
    BufferedSource,
    common::{BufferConfig, CacheError},
    worker::WorkerRegistry,
};
use seekbuf_test_utils::{Delay, Latency, PatternStreamCreator};

use crate::common::{assert_pattern, read_sequential, registry, source_config, tracing_setup};

fn slow_creator(len: u64) -> PatternStreamCreator {
    PatternStreamCreator::new(len)
        .with_type_name("share")
        .with_latency(Latency {
            per_call: Delay::millis(1, 2),
            ..Latency::default()
        })
}

#[rstest]
#[timeout(Duration::from_secs(30))]
#[test]
fn closing_one_source_mid_read_leaves_the_other_intact(
    _tracing_setup: (),
    registry: WorkerRegistry,
) {
    let buffer = BufferConfig::new(2048, 4, 2);
    let survivor = Arc::new(
        BufferedSource::from_stream(slow_creator(200_000), source_config(&registry, buffer))
            .unwrap(),
    );
    let victim = Arc::new(
        BufferedSource::from_stream(slow_creator(200_000), source_config(&registry, buffer))
            .unwrap(),
    );
    assert_eq!(registry.worker_count(), 1);
    assert_eq!(registry.client_count("share"), 2);

    let stop = Arc::new(AtomicBool::new(false));
    let victim_reader = {
        let victim = Arc::clone(&victim);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut buf = [0u8; 1000];
            let mut position = 0u64;
            while !stop.load(Ordering::Relaxed) {
                match victim.read_at(position, &mut buf) {
                    Ok(n) => {
                        assert_pattern(&buf[..n], position);
                        position = (position + n as u64) % 199_000;
                    }
                    Err(CacheError::Closed | CacheError::Abandoned { .. }) => return,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        })
    };

    let survivor_reader = {
        let survivor = Arc::clone(&survivor);
        thread::spawn(move || read_sequential(&survivor, 1500))
    };

    thread::sleep(Duration::from_millis(30));
    victim.close();
    stop.store(true, Ordering::Relaxed);
    victim_reader.join().unwrap();

    let data = survivor_reader.join().unwrap();
    assert_eq!(data.len(), 200_000);
    assert_pattern(&data, 0);
    assert_eq!(registry.client_count("share"), 1);
    assert!(!survivor.is_closed());
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[test]
fn distinct_types_get_distinct_workers(registry: WorkerRegistry) {
    let buffer = BufferConfig::new(1000, 4, 1);
    let a = BufferedSource::from_stream(
        PatternStreamCreator::new(5000).with_type_name("smb"),
        source_config(&registry, buffer),
    )
    .unwrap();
    let b = BufferedSource::from_stream(
        PatternStreamCreator::new(5000).with_type_name("http"),
        source_config(&registry, buffer),
    )
    .unwrap();

    assert_eq!(registry.worker_count(), 2);
    assert!(registry.has_worker("smb") && registry.has_worker("http"));
    assert_eq!(a.type_name(), "smb");
    assert_eq!(b.type_name(), "http");

    let mut buf = [0u8; 1000];
    assert_eq!(a.read_at(0, &mut buf).unwrap(), 1000);
    assert_eq!(b.read_at(4000, &mut buf).unwrap(), 1000);
    assert_pattern(&buf, 4000);
}
