//! Reads at arbitrary offsets and lengths.

use std::time::Duration;

use rstest::rstest;
use seekbuf::{BufferedSource, common::BufferConfig, worker::WorkerRegistry};
use seekbuf_test_utils::{PatternSeekableCreator, PatternStreamCreator, Xorshift64};

use crate::common::{assert_pattern, registry, source_config};

const LEN: u64 = 250_000;

#[rstest]
#[case::small_blocks(BufferConfig::new(1024, 8, 2))]
#[case::large_blocks(BufferConfig::new(64 * 1024, 2, 1))]
#[case::single_block_store(BufferConfig::new(4096, 1, 0))]
#[timeout(Duration::from_secs(30))]
#[test]
fn random_reads_return_source_bytes(
    registry: WorkerRegistry,
    #[case] buffer: BufferConfig,
    #[values(true, false)] stream: bool,
) {
    let config = source_config(&registry, buffer);
    let source = if stream {
        BufferedSource::from_stream(PatternStreamCreator::new(LEN), config)
    } else {
        BufferedSource::from_seekable(PatternSeekableCreator::new(LEN), config)
    }
    .unwrap();

    let mut rng = Xorshift64::new(0x5EEB);
    let mut buf = vec![0u8; 20_000];
    for _ in 0..300 {
        let position = rng.range_u64(0, LEN + 1);
        let len = rng.range_usize(1, buf.len());
        let n = source.read_at(position, &mut buf[..len]).unwrap();

        let expected = LEN.saturating_sub(position).min(len as u64) as usize;
        assert_eq!(n, expected, "read of {len} at {position}");
        assert_pattern(&buf[..n], position);
        assert!(source.report().cached_blocks <= buffer.max_used_buffers);
    }
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[test]
fn backward_reads_open_extra_streams(registry: WorkerRegistry) {
    let creator = PatternStreamCreator::new(LEN);
    let stats = creator.stats();
    let source =
        BufferedSource::from_stream(creator, source_config(&registry, BufferConfig::new(1000, 4, 0)))
            .unwrap();
    let mut buf = [0u8; 100];

    source.read_at(200_000, &mut buf).unwrap();
    assert_eq!(stats.opens(), 1);
    source.read_at(1_000, &mut buf).unwrap();
    assert_eq!(stats.opens(), 2);
    // Each stream continues forward from where it stopped.
    source.read_at(201_000, &mut buf).unwrap();
    source.read_at(2_000, &mut buf).unwrap();
    assert_eq!(stats.opens(), 2);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[test]
fn seekable_source_uses_one_handle(registry: WorkerRegistry) {
    let creator = PatternSeekableCreator::new(LEN);
    let stats = creator.stats();
    let source = BufferedSource::from_seekable(
        creator,
        source_config(&registry, BufferConfig::new(1000, 4, 0)),
    )
    .unwrap();
    let mut buf = [0u8; 100];

    for position in [200_000u64, 1_000, 150_000, 0] {
        source.read_at(position, &mut buf).unwrap();
    }
    assert_eq!(stats.opens(), 1);
    assert_eq!(source.report().open_handles, 1);
}
