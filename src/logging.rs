//! Tracing subscriber setup for console output.
//!
//! All user-visible output goes through [`tracing`] macros; this module only
//! wires up the subscriber. The default level is `info`, raised to `debug` by
//! the `--verbose` flag, and overridable with `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; only the first call installs a subscriber
/// (subsequent calls are ignored, which keeps unit tests independent).
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .compact()
        .with_writer(std::io::stderr)
        .try_init();
}
