//! tracing subscriber set-up

use crate::config::Verbosity;
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` when set, else the verbosity default
#[must_use]
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.filter()))
}

/// Install the global subscriber, logging to stderr.
///
/// A second call is a no-op.
pub fn init(verbosity: Verbosity, use_color: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_writer(std::io::stderr)
        .with_ansi(use_color)
        .with_target(verbosity.is_verbose())
        .without_time()
        .try_init();
}
