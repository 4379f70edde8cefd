//! Pool engine error types.

use std::time::Duration;

use poolwatch_config::ConfigError;
use poolwatch_intercept::ConnectionId;
use thiserror::Error;

/// Errors raised by the in-memory pool engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The configuration failed validation at construction.
    #[error("invalid pool configuration: {0}")]
    Configuration(#[from] ConfigError),

    /// The pool has been closed.
    #[error("pool is closed")]
    PoolClosed,

    /// No connection became available within the configured wait.
    #[error("timed out after {0:?} waiting for a connection")]
    Timeout(Duration),

    /// The connection has been closed.
    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    /// Closing the pool failed.
    #[error("pool close failed: {0}")]
    Close(String),
}
