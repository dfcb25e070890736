//! Error types for the Tripgate service.

use thiserror::Error;

/// Main error type for Tripgate operations.
///
/// The rate limiter itself never fails; these cover configuration and startup.
#[derive(Error, Debug)]
pub enum TripgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid rate limit policy values
    #[error("Invalid policy: {0}")]
    Policy(String),

    /// Errors raised while layering configuration sources
    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Tripgate operations.
pub type Result<T> = std::result::Result<T, TripgateError>;
