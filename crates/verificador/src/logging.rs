//! Log subscriber setup
//!
//! Logs go to stderr so reports on stdout stay machine-readable. `RUST_LOG`
//! overrides the level derived from `-q`/`-v`.

use tracing_subscriber::EnvFilter;

use crate::config::Verbosity;

/// Install the global subscriber; a second call is a no-op
pub fn init_logging(verbosity: Verbosity, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_filter()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
