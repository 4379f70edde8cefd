//! Statement abstraction shared by pool engines and the interceptor.

use std::fmt;

use async_trait::async_trait;

use crate::error::StatementError;

/// One result row; `None` is SQL `NULL`.
pub type Row = Vec<Option<String>>;

/// Identifier of the pooled connection that created a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A statement created from a pooled connection.
#[async_trait]
pub trait Statement: Send + Sync {
    /// SQL text the statement was created from.
    fn sql(&self) -> &str;

    /// Execute with the given parameters, returning the affected row count.
    async fn execute(&self, params: &[String]) -> Result<u64, StatementError>;

    /// Execute with the given parameters, returning the result rows.
    async fn query(&self, params: &[String]) -> Result<Vec<Row>, StatementError>;

    /// Release the statement.
    async fn close(&self) -> Result<(), StatementError>;

    /// Whether the statement has been closed.
    fn is_closed(&self) -> bool;
}

/// What observers learn about a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementInfo {
    /// Identifier unique within the wrapping decorator or interceptor.
    pub id: u64,
    /// SQL text the statement was created from.
    pub sql: String,
    /// Connection that created the statement.
    pub connection: ConnectionId,
}

impl StatementInfo {
    /// Describe a statement.
    pub fn new(id: u64, sql: impl Into<String>, connection: ConnectionId) -> Self {
        Self {
            id,
            sql: sql.into(),
            connection,
        }
    }
}
