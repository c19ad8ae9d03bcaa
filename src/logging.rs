//! Logging initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "shell_bridge=info";

fn build_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) if level.contains('=') => EnvFilter::new(level),
        Some(level) => EnvFilter::new(format!("shell_bridge={level},tower_http={level}")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    }
}

/// Initialize logging from `RUST_LOG`, defaulting to `shell_bridge=info`.
///
/// # Panics
///
/// Panics if a global tracing subscriber has already been set.
pub fn init() {
    init_with_filter(None);
}

/// Initialize logging with an explicit level or filter directive.
///
/// A bare level such as `debug` applies to this crate and the HTTP trace
/// layer; anything containing `=` is used as a full `EnvFilter` directive.
/// `None` falls back to `RUST_LOG`.
///
/// # Panics
///
/// Panics if a global tracing subscriber has already been set.
pub fn init_with_filter(level: Option<&str>) {
    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Try to initialize logging.
///
/// Returns `Err` if a subscriber is already installed.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(build_filter(None))
        .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()
}
