//! Logging initialization.
//!
//! Sessions, matchers and shims log through `tracing`, tagged with the
//! session ID so output from concurrently running scenarios can be told
//! apart. Nothing is printed until a subscriber is installed here.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "e2e_harness=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize logging to stdout, filtered by `RUST_LOG`.
///
/// Defaults to `e2e_harness=info` when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global tracing subscriber has already been set.
pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().compact())
        .init();
}

/// Try to initialize logging through the test writer.
///
/// Returns `Err` if a subscriber is already installed, so every test in a
/// suite can call it and ignore the result.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().compact().with_test_writer())
        .try_init()
}

/// Try to initialize logging to stderr with an explicit level.
///
/// `level` is either a bare level (`debug`), applied to this crate, or a
/// full filter directive (`e2e_harness=trace,tokio=warn`).
pub fn try_init_with_level(level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(level_filter(level))
        .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()
}

fn level_filter(level: &str) -> EnvFilter {
    let directive = if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("e2e_harness={}", level)
    };
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
