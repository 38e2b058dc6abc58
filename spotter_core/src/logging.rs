//! Tracing setup for the `spotter` binary.
//!
//! Diagnostics go to stderr so they never interleave with the session
//! display on stdout.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber at INFO; `RUST_LOG` overrides it
pub fn init() {
    init_with_level("info")
}

/// Install the global subscriber with `default_level` as the fallback filter
/// when `RUST_LOG` is unset. The CLI uses "warn" to keep the session quiet.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Route debug output through the test harness; safe to call from every test
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
