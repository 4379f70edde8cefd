//! Statement observers.
//!
//! An observer is told when a statement is opened and when it is closed.
//! Both hooks run on the caller's thread in the middle of statement
//! creation or closure, so implementations must not block.

use std::sync::Arc;

use crate::statement::StatementInfo;

/// Receives statement lifecycle events.
pub trait StatementObserver: Send + Sync {
    /// A statement was created and is about to be handed to its caller.
    fn on_open(&self, info: &StatementInfo);

    /// A statement was closed. Called at most once per statement.
    fn on_close(&self, info: &StatementInfo);
}

/// Forwards every event to several observers in registration order.
#[derive(Default, Clone)]
pub struct ObserverChain {
    observers: Vec<Arc<dyn StatementObserver>>,
}

impl ObserverChain {
    /// Create an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer.
    #[must_use]
    pub fn with(mut self, observer: Arc<dyn StatementObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Number of observers in the chain.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether the chain has no observers.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for ObserverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverChain")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl StatementObserver for ObserverChain {
    fn on_open(&self, info: &StatementInfo) {
        for observer in &self.observers {
            observer.on_open(info);
        }
    }

    fn on_close(&self, info: &StatementInfo) {
        for observer in &self.observers {
            observer.on_close(info);
        }
    }
}

/// Logs statement events at `trace` level.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    max_sql_length: usize,
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self {
            max_sql_length: 256,
        }
    }
}

impl TracingObserver {
    /// Create an observer that truncates logged SQL to 256 bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of SQL bytes to log.
    #[must_use]
    pub fn max_sql_length(mut self, length: usize) -> Self {
        self.max_sql_length = length;
        self
    }
}

impl StatementObserver for TracingObserver {
    fn on_open(&self, info: &StatementInfo) {
        tracing::trace!(
            statement_id = info.id,
            connection = %info.connection,
            sql = %truncate_sql(&info.sql, self.max_sql_length),
            "statement opened"
        );
    }

    fn on_close(&self, info: &StatementInfo) {
        tracing::trace!(
            statement_id = info.id,
            connection = %info.connection,
            "statement closed"
        );
    }
}

/// Truncate SQL to at most `max_len` bytes, ending on a char boundary.
fn truncate_sql(sql: &str, max_len: usize) -> String {
    if sql.len() <= max_len {
        return sql.to_string();
    }

    let budget = max_len.saturating_sub(3);
    let end = sql
        .char_indices()
        .map(|(idx, ch)| idx + ch.len_utf8())
        .take_while(|end| *end <= budget)
        .last()
        .unwrap_or(0);
    format!("{}...", &sql[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::ConnectionId;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl StatementObserver for Recorder {
        fn on_open(&self, info: &StatementInfo) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:open:{}", self.name, info.id));
        }

        fn on_close(&self, info: &StatementInfo) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:close:{}", self.name, info.id));
        }
    }

    #[test]
    fn test_chain_preserves_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let chain = ObserverChain::new()
            .with(Arc::new(Recorder {
                name: "first",
                events: events.clone(),
            }))
            .with(Arc::new(Recorder {
                name: "second",
                events: events.clone(),
            }));
        assert_eq!(chain.len(), 2);

        let info = StatementInfo::new(7, "SELECT 1", ConnectionId(1));
        chain.on_open(&info);
        chain.on_close(&info);

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "first:open:7",
                "second:open:7",
                "first:close:7",
                "second:close:7"
            ]
        );
    }

    #[test]
    fn test_empty_chain_is_noop() {
        let chain = ObserverChain::new();
        assert!(chain.is_empty());
        chain.on_open(&StatementInfo::new(1, "SELECT 1", ConnectionId(1)));
    }

    #[test]
    fn test_truncate_sql() {
        assert_eq!(truncate_sql("SELECT 1", 100), "SELECT 1");
        assert_eq!(truncate_sql("SELECT * FROM users", 10), "SELECT ...");
        // Multi-byte characters are never split.
        assert_eq!(truncate_sql("SELECT 'ééééé'", 13), "SELECT 'é...");
        assert_eq!(truncate_sql("SELECT 'ééééé'", 12), "SELECT '...");
    }
}
