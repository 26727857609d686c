//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber, honouring `RUST_LOG`.
///
/// # Errors
///
/// Returns [`ServiceError::Telemetry`](crate::error::ServiceError::Telemetry)
/// if a global subscriber is already installed.
pub fn init() -> crate::error::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .try_init()
        .map_err(|e| crate::error::ServiceError::Telemetry(e.to_string()))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
