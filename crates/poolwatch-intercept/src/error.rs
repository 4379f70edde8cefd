//! Statement error types.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by statements.
///
/// Only underlying statements produce these. A [`StatementProxy`] returns
/// them to its caller exactly as received.
///
/// [`StatementProxy`]: crate::proxy::StatementProxy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum StatementError {
    /// The statement was used after being closed.
    #[error("statement is closed")]
    Closed,

    /// The driver reported a failure.
    #[error("driver error: {0}")]
    Driver(String),

    /// The statement did not complete in time.
    #[error("statement timed out after {0:?}")]
    Timeout(Duration),
}

impl StatementError {
    /// Create a driver error.
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }

    /// Whether this error reports use after close.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
