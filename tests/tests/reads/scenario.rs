//! The reference workload: a one-megabyte stream read in 4 KiB steps.

use std::time::Duration;

use rstest::rstest;
use seekbuf::{BufferedSource, common::BufferConfig, worker::WorkerRegistry};
use seekbuf_test_utils::{PatternSeekableCreator, PatternStreamCreator};
use tracing::info;

use crate::common::{assert_pattern, read_sequential, registry, source_config, tracing_setup};

const STREAM_LEN: u64 = 1_000_000;

#[rstest]
#[case::stream(true)]
#[case::seekable(false)]
#[timeout(Duration::from_secs(30))]
#[test]
fn one_megabyte_in_4k_reads_loads_eight_blocks(
    _tracing_setup: (),
    registry: WorkerRegistry,
    #[case] stream: bool,
) {
    let config = source_config(&registry, BufferConfig::new(131_072, 4, 2));
    let source = if stream {
        BufferedSource::from_stream(PatternStreamCreator::new(STREAM_LEN), config)
    } else {
        BufferedSource::from_seekable(PatternSeekableCreator::new(STREAM_LEN), config)
    }
    .unwrap();

    let data = read_sequential(&source, 4096);
    assert_eq!(data.len() as u64, STREAM_LEN);
    assert_pattern(&data, 0);

    let report = source.report();
    info!(%report, "scenario finished");
    assert_eq!(report.loads, 8);
    assert_eq!(report.last_block, Some(7));
    assert!(report.cached_blocks <= 4);
    assert_eq!(source.size().unwrap(), STREAM_LEN);
}
