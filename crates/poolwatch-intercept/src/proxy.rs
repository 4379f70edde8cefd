//! Counting statement proxies.
//!
//! A [`StatementProxy`] stands in for the statement a pool engine created.
//! Every operation goes straight to the wrapped statement; results and
//! errors come back untouched. The proxy only adds one thing: the first
//! `close()` is reported to its observer.
//!
//! ```text
//! Open --close()--> Closed (terminal)
//! ```
//!
//! Closure is guarded by a compare-and-set flag, so a statement closed twice
//! is reported once no matter how the wrapped statement treats a second
//! close. Operations after close are still delegated; the wrapped
//! statement's own closed-state error is what the caller sees.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use crate::error::StatementError;
use crate::observer::StatementObserver;
use crate::statement::{ConnectionId, Row, Statement, StatementInfo};

/// A statement wrapper that reports its closure exactly once.
pub struct StatementProxy {
    inner: Box<dyn Statement>,
    info: StatementInfo,
    observer: Arc<dyn StatementObserver>,
    closed: AtomicBool,
}

impl StatementProxy {
    /// Wrap an already-announced statement.
    ///
    /// The caller is responsible for having reported the open.
    pub(crate) fn new(
        inner: Box<dyn Statement>,
        info: StatementInfo,
        observer: Arc<dyn StatementObserver>,
    ) -> Self {
        Self {
            inner,
            info,
            observer,
            closed: AtomicBool::new(false),
        }
    }

    /// What the observer was told about this statement.
    pub fn info(&self) -> &StatementInfo {
        &self.info
    }

    /// Connection that created the statement.
    pub fn connection(&self) -> ConnectionId {
        self.info.connection
    }

    /// Whether closure has been reported to the observer.
    pub fn is_close_reported(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Report closure if nobody has yet. Returns whether this call did.
    fn report_close(&self) -> bool {
        let first = self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            self.observer.on_close(&self.info);
        }
        first
    }
}

impl std::fmt::Debug for StatementProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementProxy")
            .field("info", &self.info)
            .field("closed", &self.is_close_reported())
            .finish()
    }
}

#[async_trait]
impl Statement for StatementProxy {
    fn sql(&self) -> &str {
        self.inner.sql()
    }

    async fn execute(&self, params: &[String]) -> Result<u64, StatementError> {
        self.inner.execute(params).await
    }

    async fn query(&self, params: &[String]) -> Result<Vec<Row>, StatementError> {
        self.inner.query(params).await
    }

    async fn close(&self) -> Result<(), StatementError> {
        if !self.report_close() {
            tracing::trace!(statement_id = self.info.id, "statement closed again");
        }
        self.inner.close().await
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl Drop for StatementProxy {
    fn drop(&mut self) {
        // Dropping is not closing; the open stays counted.
        if !self.is_close_reported() {
            tracing::warn!(
                statement_id = self.info.id,
                connection = %self.info.connection,
                sql = %self.info.sql,
                "statement dropped without being closed"
            );
        }
    }
}

/// Wraps statements in [`StatementProxy`]s reporting to one observer.
pub struct StatementDecorator {
    observer: Arc<dyn StatementObserver>,
    next_id: AtomicU64,
}

impl StatementDecorator {
    /// Create a decorator reporting to `observer`.
    pub fn new(observer: Arc<dyn StatementObserver>) -> Self {
        Self {
            observer,
            next_id: AtomicU64::new(1),
        }
    }

    /// Announce a new statement and return its proxy.
    pub fn wrap(
        &self,
        statement: Box<dyn Statement>,
        sql: impl Into<String>,
        connection: ConnectionId,
    ) -> StatementProxy {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let info = StatementInfo::new(id, sql, connection);
        self.observer.on_open(&info);
        StatementProxy::new(statement, info, self.observer.clone())
    }
}

impl std::fmt::Debug for StatementDecorator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementDecorator")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeStatement {
        sql: String,
        closed: AtomicBool,
    }

    impl FakeStatement {
        fn boxed(sql: &str) -> Box<dyn Statement> {
            Box::new(Self {
                sql: sql.to_string(),
                closed: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl Statement for FakeStatement {
        fn sql(&self) -> &str {
            &self.sql
        }

        async fn execute(&self, params: &[String]) -> Result<u64, StatementError> {
            if self.closed.load(Ordering::Acquire) {
                return Err(StatementError::Closed);
            }
            if params.iter().any(|p| p == "boom") {
                return Err(StatementError::driver("constraint violated"));
            }
            Ok(params.len() as u64)
        }

        async fn query(&self, _params: &[String]) -> Result<Vec<Row>, StatementError> {
            if self.closed.load(Ordering::Acquire) {
                return Err(StatementError::Closed);
            }
            Ok(vec![vec![Some("1".to_string()), None]])
        }

        async fn close(&self) -> Result<(), StatementError> {
            // Second close is an error here so the proxy guard is observable.
            if self.closed.swap(true, Ordering::AcqRel) {
                return Err(StatementError::driver("already closed"));
            }
            Ok(())
        }

        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::Acquire)
        }
    }

    #[derive(Default)]
    struct Log(Mutex<Vec<(&'static str, u64)>>);

    /// Formatted log output collected by a test subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn warn_subscriber(logs: &CapturedLogs) -> impl tracing::Subscriber + Send + Sync {
        let writer = logs.clone();
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish()
    }

    impl StatementObserver for Log {
        fn on_open(&self, info: &StatementInfo) {
            self.0.lock().unwrap().push(("open", info.id));
        }

        fn on_close(&self, info: &StatementInfo) {
            self.0.lock().unwrap().push(("close", info.id));
        }
    }

    #[tokio::test]
    async fn test_wrap_reports_open_then_close_once() {
        let log = Arc::new(Log::default());
        let decorator = StatementDecorator::new(log.clone());

        let proxy = decorator.wrap(FakeStatement::boxed("SELECT 1"), "SELECT 1", ConnectionId(3));
        assert_eq!(proxy.info().id, 1);
        assert_eq!(proxy.connection(), ConnectionId(3));
        assert!(!proxy.is_close_reported());

        proxy.close().await.unwrap();
        // Underlying error on the second close passes through unchanged.
        assert_eq!(
            proxy.close().await,
            Err(StatementError::driver("already closed"))
        );

        assert!(proxy.is_close_reported());
        assert_eq!(*log.0.lock().unwrap(), vec![("open", 1), ("close", 1)]);
    }

    #[tokio::test]
    async fn test_operations_delegate_verbatim() {
        let decorator = StatementDecorator::new(Arc::new(Log::default()));
        let proxy = decorator.wrap(FakeStatement::boxed("UPDATE t"), "UPDATE t", ConnectionId(1));

        assert_eq!(proxy.sql(), "UPDATE t");
        assert_eq!(proxy.execute(&["a".to_string(), "b".to_string()]).await, Ok(2));
        assert_eq!(
            proxy.execute(&["boom".to_string()]).await,
            Err(StatementError::driver("constraint violated"))
        );
        assert_eq!(
            proxy.query(&[]).await,
            Ok(vec![vec![Some("1".to_string()), None]])
        );
    }

    #[tokio::test]
    async fn test_use_after_close_hits_underlying_error() {
        let decorator = StatementDecorator::new(Arc::new(Log::default()));
        let proxy = decorator.wrap(FakeStatement::boxed("SELECT 1"), "SELECT 1", ConnectionId(1));

        proxy.close().await.unwrap();
        assert!(proxy.is_closed());
        assert_eq!(proxy.execute(&[]).await, Err(StatementError::Closed));
        assert_eq!(proxy.query(&[]).await, Err(StatementError::Closed));
    }

    #[test]
    fn test_drop_without_close_is_not_reported() {
        let log = Arc::new(Log::default());
        let decorator = StatementDecorator::new(log.clone());
        let logs = CapturedLogs::default();

        tracing::subscriber::with_default(warn_subscriber(&logs), || {
            drop(decorator.wrap(FakeStatement::boxed("SELECT 1"), "SELECT 1", ConnectionId(7)));
        });

        assert_eq!(*log.0.lock().unwrap(), vec![("open", 1)]);
        let output = logs.text();
        assert_eq!(output.matches("statement dropped without being closed").count(), 1);
        assert!(output.contains("conn-7"));
    }

    #[test]
    fn test_drop_after_close_is_silent() {
        let decorator = StatementDecorator::new(Arc::new(Log::default()));
        let logs = CapturedLogs::default();

        tracing::subscriber::with_default(warn_subscriber(&logs), || {
            let proxy = decorator.wrap(FakeStatement::boxed("SELECT 1"), "SELECT 1", ConnectionId(1));
            tokio_test::block_on(proxy.close()).unwrap();
            drop(proxy);
        });

        assert!(logs.text().is_empty());
    }

    #[test]
    fn test_ids_increase() {
        let decorator = StatementDecorator::new(Arc::new(Log::default()));
        let a = decorator.wrap(FakeStatement::boxed("a"), "a", ConnectionId(1));
        let b = decorator.wrap(FakeStatement::boxed("b"), "b", ConnectionId(1));
        assert!(b.info().id > a.info().id);
    }
}
