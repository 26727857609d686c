//! Error types for the pricehound service.

/// Errors raised while configuring or running the HTTP service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Invalid environment configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Logging could not be initialised.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ServiceError>;
