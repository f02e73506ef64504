use rstest::fixture;
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber at `warn`, or whatever `RUST_LOG` asks for.
#[fixture]
pub fn tracing_setup() {
    init_tracing("warn");
}

/// Later calls are no-ops once a global subscriber exists.
pub fn init_tracing(default_directives: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
