use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

/// Builds the log filter: `RUST_LOG` wins when set, then the configured `level`. An unknown level
/// falls back to `info`.
pub fn filter(level: &str) -> EnvFilter {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);

    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()))
}

/// Installs the global `fmt` subscriber. Calling it again is a no-op.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));
}
