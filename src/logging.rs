//! Tracing subscriber setup

use tracing_subscriber::{EnvFilter, fmt};

/// Install a global fmt subscriber
///
/// `RUST_LOG` takes precedence over `default_directive`
/// (e.g. `RUST_LOG=monetize=debug,tower_http=debug`).
///
/// ```no_run
/// monetize::logging::init("info");
/// ```
pub fn init(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    fmt().with_env_filter(filter).with_target(true).init();
}

/// Subscriber for tests, safe to call more than once
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
