//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "vinscan=info";

/// Install a fmt subscriber filtered by `RUST_LOG` (default `vinscan=info`)
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
