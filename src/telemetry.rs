//! Logging setup.
//!
//! Verbosity comes from the `LOG_LEVEL` environment variable, parsed as
//! a `tracing_subscriber` directive string (`info`, `debug`,
//! `send_plugin=trace`, ...). Falls back to `info` when unset or
//! malformed.

use tracing_subscriber::EnvFilter;

/// Environment variable controlling log verbosity.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Install the global tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
