//! Configuration error types.

use thiserror::Error;

/// Errors reported while validating or assembling a pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The sizing fields violate `min_idle <= max_idle <= max_active` or
    /// `initial_size <= max_active`.
    #[error("invalid pool sizing: {0}")]
    InvalidSizing(String),

    /// Idle testing was requested without an eviction run to perform it.
    #[error("test_while_idle requires a non-zero eviction interval")]
    EvictionRequired,

    /// Abandonment detection is enabled with a zero timeout.
    #[error("remove_abandoned requires a timeout of at least one second")]
    AbandonedTimeout,

    /// A required field is empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// An override source could not be parsed.
    #[error("invalid override at line {line}: {message}")]
    InvalidOverride {
        /// 1-based line number in the override source.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// Process-wide startup options were already installed.
    #[error("startup options already installed")]
    StartupAlreadyInstalled,
}
