//! In-memory connections and statements.
//!
//! These stand in for a database driver. A [`MockConnection`] owns every
//! statement it has handed out until the statement is closed, the way a
//! driver connection does, so closing or resetting the connection closes
//! whatever the caller left open.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use poolwatch_intercept::{ConnectionId, Row, Statement, StatementError, StatementLifecycleInterceptor};

use crate::error::PoolError;

/// A driver statement that keeps no state beyond its closed flag.
#[derive(Debug)]
pub struct MockStatement {
    sql: String,
    closed: AtomicBool,
    executions: AtomicU64,
    failure: Option<StatementError>,
}

impl MockStatement {
    /// Create a statement for `sql`.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            closed: AtomicBool::new(false),
            executions: AtomicU64::new(0),
            failure: None,
        }
    }

    /// Create a statement whose every execution fails with `error`.
    pub fn failing(sql: impl Into<String>, error: StatementError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(sql)
        }
    }

    /// Number of executions attempted while open.
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    fn check_usable(&self) -> Result<(), StatementError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StatementError::Closed);
        }
        self.executions.fetch_add(1, Ordering::Relaxed);
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Statement for MockStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    async fn execute(&self, params: &[String]) -> Result<u64, StatementError> {
        self.check_usable()?;
        Ok(params.len() as u64)
    }

    async fn query(&self, params: &[String]) -> Result<Vec<Row>, StatementError> {
        self.check_usable()?;
        Ok(vec![params.iter().cloned().map(Some).collect()])
    }

    async fn close(&self) -> Result<(), StatementError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// A pooled physical connection.
pub struct MockConnection {
    id: ConnectionId,
    interceptor: Option<Arc<StatementLifecycleInterceptor>>,
    statements: Mutex<Vec<Arc<dyn Statement>>>,
    closed: AtomicBool,
}

impl MockConnection {
    /// Create an open connection.
    ///
    /// With an interceptor, every statement is created through it.
    pub fn new(id: ConnectionId, interceptor: Option<Arc<StatementLifecycleInterceptor>>) -> Self {
        Self {
            id,
            interceptor,
            statements: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Connection identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stand-in for running the validation query.
    pub fn is_valid(&self) -> bool {
        !self.is_closed()
    }

    /// Create a statement for `sql`.
    pub fn prepare(&self, sql: &str) -> Result<Arc<dyn Statement>, PoolError> {
        self.register(MockStatement::new(sql))
    }

    /// Create a statement that fails every execution with `error`.
    pub fn prepare_failing(
        &self,
        sql: &str,
        error: StatementError,
    ) -> Result<Arc<dyn Statement>, PoolError> {
        self.register(MockStatement::failing(sql, error))
    }

    fn register(&self, raw: MockStatement) -> Result<Arc<dyn Statement>, PoolError> {
        if self.is_closed() {
            return Err(PoolError::ConnectionClosed(self.id));
        }

        let sql = raw.sql().to_string();
        let statement: Arc<dyn Statement> = match &self.interceptor {
            Some(interceptor) => {
                Arc::new(interceptor.on_statement_created(Box::new(raw), sql, self.id))
            }
            None => Arc::new(raw),
        };

        let mut statements = self.statements.lock();
        statements.retain(|s| !s.is_closed());
        statements.push(statement.clone());
        Ok(statement)
    }

    /// Statements handed out and not yet closed.
    pub fn open_statements(&self) -> usize {
        self.statements
            .lock()
            .iter()
            .filter(|s| !s.is_closed())
            .count()
    }

    /// Close every statement the caller left open. The connection stays
    /// usable.
    pub async fn reset(&self) {
        let outstanding: Vec<_> = self.statements.lock().drain(..).collect();
        for statement in outstanding {
            if statement.is_closed() {
                continue;
            }
            if let Err(e) = statement.close().await {
                tracing::warn!(
                    connection = %self.id,
                    error = %e,
                    "failed to close statement during reset"
                );
            }
        }
    }

    /// Close the connection and every statement it still owns.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.reset().await;
        tracing::trace!(connection = %self.id, "connection closed");
    }
}

impl std::fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnection")
            .field("id", &self.id)
            .field("open_statements", &self.open_statements())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_statement_errors_after_close() {
        let stmt = MockStatement::new("SELECT 1");
        assert_eq!(stmt.execute(&["x".to_string()]).await, Ok(1));
        stmt.close().await.unwrap();
        stmt.close().await.unwrap();
        assert_eq!(stmt.execute(&[]).await, Err(StatementError::Closed));
        assert_eq!(stmt.executions(), 1);
    }

    #[tokio::test]
    async fn test_failing_statement() {
        let stmt = MockStatement::failing("SELECT 1", StatementError::driver("deadlock"));
        assert_eq!(
            stmt.query(&[]).await,
            Err(StatementError::driver("deadlock"))
        );
    }

    #[tokio::test]
    async fn test_reset_closes_outstanding_statements() {
        let interceptor = Arc::new(StatementLifecycleInterceptor::new());
        let conn = MockConnection::new(ConnectionId(1), Some(interceptor.clone()));

        let a = conn.prepare("SELECT 1").unwrap();
        let _b = conn.prepare("SELECT 2").unwrap();
        a.close().await.unwrap();
        assert_eq!(conn.open_statements(), 1);
        assert_eq!(interceptor.active_count(), 1);

        conn.reset().await;
        assert_eq!(conn.open_statements(), 0);
        assert_eq!(interceptor.active_count(), 0);
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_prepare() {
        let conn = MockConnection::new(ConnectionId(4), None);
        let stmt = conn.prepare("SELECT 1").unwrap();

        conn.close().await;
        assert!(stmt.is_closed());
        assert!(matches!(
            conn.prepare("SELECT 1"),
            Err(PoolError::ConnectionClosed(ConnectionId(4)))
        ));
    }
}
