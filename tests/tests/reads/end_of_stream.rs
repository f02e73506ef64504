//! Behaviour at and beyond the end of the source.

use std::time::Duration;

use rstest::rstest;
use seekbuf::{
    BufferedSource,
    common::{BufferConfig, CacheError},
    worker::WorkerRegistry,
};
use seekbuf_test_utils::{PatternSeekableCreator, PatternStreamCreator, Xorshift64};

use crate::common::{assert_pattern, read_sequential, registry, source_config};

fn open(stream: bool, len: u64, buffer: BufferConfig, registry: &WorkerRegistry) -> BufferedSource {
    let config = source_config(registry, buffer);
    if stream {
        BufferedSource::from_stream(PatternStreamCreator::new(len), config).unwrap()
    } else {
        BufferedSource::from_seekable(PatternSeekableCreator::new(len), config).unwrap()
    }
}

#[rstest]
#[timeout(Duration::from_secs(20))]
#[test]
fn no_block_past_the_end_is_loaded(
    registry: WorkerRegistry,
    #[values(true, false)] stream: bool,
) {
    let source = open(stream, 10_500, BufferConfig::new(1000, 16, 8), &registry);
    let mut rng = Xorshift64::new(11);
    let mut buf = [0u8; 700];
    assert_eq!(source.read_at(10_400, &mut buf).unwrap(), 100);

    for _ in 0..200 {
        let position = rng.range_u64(0, 20_000);
        match source.read_at(position, &mut buf) {
            Ok(n) => assert_pattern(&buf[..n], position),
            Err(CacheError::PastEnd { last_block, .. }) => assert_eq!(last_block, 10),
            Err(e) => panic!("unexpected error at {position}: {e}"),
        }
    }
    std::thread::sleep(Duration::from_millis(50));

    let report = source.report();
    assert_eq!(report.last_block, Some(10));
    assert!(
        report.load_counts.keys().all(|&index| index <= 10),
        "loaded past the end: {:?}",
        report.load_counts
    );
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[test]
fn read_at_end_is_empty_and_beyond_is_an_error(
    registry: WorkerRegistry,
    #[values(true, false)] stream: bool,
) {
    let source = open(stream, 2500, BufferConfig::new(1000, 4, 0), &registry);
    let mut buf = [0u8; 100];

    assert_eq!(source.read_at(2450, &mut buf).unwrap(), 50);
    assert_eq!(source.read_at(2500, &mut buf).unwrap(), 0);
    assert!(matches!(
        source.read_at(2600, &mut buf),
        Err(CacheError::PastEnd { .. })
    ));
    assert!(matches!(
        source.read_at(9000, &mut buf),
        Err(CacheError::PastEnd {
            block: 9,
            last_block: 2
        })
    ));
}

#[rstest]
#[case::exact_multiple(4000, 1000)]
#[case::one_byte(1, 1000)]
#[case::empty(0, 1000)]
#[case::one_byte_blocks(10, 1)]
#[timeout(Duration::from_secs(10))]
#[test]
fn boundary_lengths(registry: WorkerRegistry, #[case] len: u64, #[case] buffer_size: usize) {
    let source = open(true, len, BufferConfig::new(buffer_size, 4, 2), &registry);
    let data = read_sequential(&source, 333);
    assert_eq!(data.len() as u64, len);
    assert_pattern(&data, 0);
}
