//! Statement lifecycle interceptor.
//!
//! One interceptor is installed per pool. The pool routes every statement it
//! creates through [`StatementLifecycleInterceptor::on_statement_created`]
//! and hands the returned proxy to its caller. The interceptor counts opens
//! and closes; their difference is the number of statements still live,
//! which a test expects to return to zero once it has cleaned up.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::observer::StatementObserver;
use crate::proxy::StatementProxy;
use crate::statement::{ConnectionId, Statement, StatementInfo};

/// Counts statements opened and closed through a pool.
///
/// Counters only grow and are never reset; recreate the interceptor to
/// start over.
#[derive(Debug, Default)]
pub struct StatementLifecycleInterceptor {
    opened: AtomicU64,
    closed: AtomicU64,
    next_id: AtomicU64,
}

/// Point-in-time copy of the interceptor counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatementCounts {
    /// Statements created.
    pub opened: u64,
    /// Statements closed.
    pub closed: u64,
}

impl StatementCounts {
    /// Statements created but not yet closed.
    #[must_use]
    pub fn active(&self) -> i64 {
        self.opened as i64 - self.closed as i64
    }
}

impl StatementLifecycleInterceptor {
    /// Create an interceptor with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a newly created statement and wrap it.
    ///
    /// The returned proxy reports its closure back to this interceptor.
    pub fn on_statement_created(
        self: &Arc<Self>,
        statement: Box<dyn Statement>,
        sql: impl Into<String>,
        connection: ConnectionId,
    ) -> StatementProxy {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let info = StatementInfo::new(id, sql, connection);
        self.on_open(&info);
        StatementProxy::new(statement, info, self.clone())
    }

    /// Count a closed statement.
    ///
    /// Proxies call this at most once each; no duplicate check happens here.
    pub fn on_statement_closed(&self, info: &StatementInfo) {
        self.closed.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(statement_id = info.id, "statement close counted");
    }

    /// Statements created and not yet closed.
    ///
    /// The close counter is read first: a close is only counted after its
    /// open, so the result is never negative.
    pub fn active_count(&self) -> i64 {
        self.snapshot().active()
    }

    /// Statements created so far.
    pub fn open_count(&self) -> u64 {
        self.opened.load(Ordering::Acquire)
    }

    /// Statements closed so far.
    pub fn close_count(&self) -> u64 {
        self.closed.load(Ordering::Acquire)
    }

    /// Read both counters.
    pub fn snapshot(&self) -> StatementCounts {
        let closed = self.closed.load(Ordering::Acquire);
        let opened = self.opened.load(Ordering::Acquire);
        StatementCounts { opened, closed }
    }
}

impl StatementObserver for StatementLifecycleInterceptor {
    fn on_open(&self, info: &StatementInfo) {
        self.opened.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(statement_id = info.id, "statement open counted");
    }

    fn on_close(&self, info: &StatementInfo) {
        self.on_statement_closed(info);
    }
}
