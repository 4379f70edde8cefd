//! End-to-end tests: fixture, pool engine and interceptor together

use std::sync::{Arc, Mutex};
use std::time::Duration;

use poolwatch_config::PoolConfig;
use poolwatch_intercept::StatementError;
use poolwatch_testing::{PoolError, PoolFixture, wait_for_active_count};

const SETTLE: Duration = Duration::from_secs(5);

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

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_statements_settle_to_zero() {
    let mut fixture = PoolFixture::new();
    let pool = fixture.create_default_pool().await.unwrap();

    let mut handles = Vec::new();
    for task in 0..10 {
        let conn = pool.get().await.unwrap();
        handles.push(tokio::spawn(async move {
            for i in 0..5 {
                let stmt = conn.prepare(&format!("SELECT {task}, {i}")).unwrap();
                stmt.execute(&[]).await.unwrap();
                tokio::task::yield_now().await;
                stmt.close().await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let interceptor = fixture.interceptor();
    assert_eq!(wait_for_active_count(interceptor, 0, SETTLE).await, 0);
    assert_eq!(interceptor.open_count(), 50);
    assert_eq!(interceptor.close_count(), 50);

    fixture.teardown().await;
}

#[tokio::test]
async fn test_pool_without_borrowing_has_no_statements() {
    let mut fixture = PoolFixture::with_thread_count(4);
    let pool = fixture.create_default_pool().await.unwrap();
    assert_eq!(pool.status().total, 4);
    pool.close().await.unwrap();

    assert_eq!(fixture.interceptor().active_count(), 0);
    assert_eq!(fixture.interceptor().open_count(), 0);
}

#[tokio::test]
async fn test_leak_is_visible_until_connection_closes() {
    let mut fixture = PoolFixture::with_thread_count(2);
    let pool = fixture.create_default_pool().await.unwrap();

    let conn = pool.get().await.unwrap();
    let _leaked = conn.prepare("SELECT 1").unwrap();
    drop(conn);

    let interceptor = fixture.interceptor().clone();
    assert_eq!(
        wait_for_active_count(&interceptor, 0, Duration::from_millis(50)).await,
        1
    );

    fixture.teardown().await;
    assert_eq!(interceptor.active_count(), 0);
}

#[tokio::test]
async fn test_reset_closes_statements_indirectly() {
    let mut fixture = PoolFixture::with_thread_count(2);
    let interceptor = fixture.interceptor().clone();
    let pool = fixture.create_default_pool().await.unwrap();

    let conn = pool.get().await.unwrap();
    let a = conn.prepare("SELECT 1").unwrap();
    let _b = conn.prepare("SELECT 2").unwrap();
    conn.reset().await;

    assert!(a.is_closed());
    assert_eq!(interceptor.active_count(), 0);
    // Closing again after the reset is not counted twice.
    a.close().await.unwrap();
    assert_eq!(interceptor.close_count(), 2);
    assert_eq!(pool.metrics().resets_performed, 1);
}

#[tokio::test]
async fn test_statement_errors_pass_through() {
    let mut fixture = PoolFixture::with_thread_count(1);
    let pool = fixture.create_default_pool().await.unwrap();
    let conn = pool.get().await.unwrap();

    let stmt = conn
        .prepare_failing("UPDATE t SET x = 1", StatementError::driver("lock timeout"))
        .unwrap();
    assert_eq!(
        stmt.execute(&[]).await,
        Err(StatementError::driver("lock timeout"))
    );

    stmt.close().await.unwrap();
    assert_eq!(stmt.execute(&[]).await, Err(StatementError::Closed));
    assert_eq!(fixture.interceptor().active_count(), 0);
}

#[tokio::test]
async fn test_invalid_config_fails_construction() {
    let mut fixture = PoolFixture::new();
    let mut config = fixture.create_default_config();
    config.set_test_while_idle(true).set_eviction_interval(Duration::ZERO);

    let err = fixture.create_pool(config).await.unwrap_err();
    assert!(matches!(err, PoolError::Configuration(_)));
    assert!(fixture.pool().is_none());
}

#[tokio::test]
async fn test_teardown_swallows_close_failure() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut fixture = PoolFixture::with_thread_count(2);
    fixture.create_default_pool().await.unwrap().fail_next_close();

    fixture.teardown().await;
    assert!(fixture.pool().is_none());
    assert!(logs.text().contains("ignoring pool close failure"));
}

#[tokio::test]
async fn test_replacing_pool_closes_previous_one() {
    let mut fixture = PoolFixture::with_thread_count(2);
    let interceptor = fixture.interceptor().clone();

    let pool = fixture.create_default_pool().await.unwrap();
    let conn = pool.get().await.unwrap();
    let leaked = conn.prepare("SELECT 1").unwrap();
    drop(conn);
    assert_eq!(interceptor.active_count(), 1);

    let replacement = fixture.create_default_pool().await.unwrap();
    assert!(!replacement.is_closed());
    assert!(leaked.is_closed());
    assert_eq!(interceptor.active_count(), 0);
    assert_eq!(interceptor.close_count(), 1);

    fixture.teardown().await;
}

#[tokio::test]
async fn test_borrow_waits_then_times_out() {
    let mut config = PoolConfig::test_profile(1);
    config.set_max_wait_millis(20);

    let mut fixture = PoolFixture::with_thread_count(1);
    let pool = fixture.create_pool(config).await.unwrap();

    let held = pool.get().await.unwrap();
    assert!(matches!(pool.get().await, Err(PoolError::Timeout(_))));

    drop(held);
    assert!(pool.get().await.is_ok());
}
