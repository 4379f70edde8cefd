//! Per-test pool fixture and leak polling.

use std::sync::Arc;
use std::time::Duration;

use poolwatch_config::{ConfigOverrides, PoolConfig, profile::test_defaults};
use poolwatch_intercept::StatementLifecycleInterceptor;

use crate::error::PoolError;
use crate::pool::MockPool;

/// Interval between polls in [`wait_for_active_count`].
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Poll `interceptor` until its active count equals `expected` or
/// `timeout` elapses. Returns the last count observed.
///
/// Statements closed on other tasks may not be visible the instant a test
/// checks, so assertions on the count should go through here.
pub async fn wait_for_active_count(
    interceptor: &StatementLifecycleInterceptor,
    expected: i64,
    timeout: Duration,
) -> i64 {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let active = interceptor.active_count();
        if active == expected || tokio::time::Instant::now() >= deadline {
            return active;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Setup and teardown shared by pool tests.
///
/// Each fixture owns one interceptor, so counts never bleed between tests.
///
/// ```rust,ignore
/// let mut fixture = PoolFixture::new();
/// let pool = fixture.create_default_pool().await?;
/// // exercise the pool ...
/// fixture.teardown().await;
/// ```
#[derive(Debug)]
pub struct PoolFixture {
    thread_count: u32,
    interceptor: Arc<StatementLifecycleInterceptor>,
    pool: Option<MockPool>,
}

impl Default for PoolFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolFixture {
    /// Fixture sized for the default thread count.
    pub fn new() -> Self {
        Self::with_thread_count(test_defaults::THREAD_COUNT)
    }

    /// Fixture whose pools hold exactly `thread_count` connections.
    pub fn with_thread_count(thread_count: u32) -> Self {
        Self {
            thread_count,
            interceptor: Arc::new(StatementLifecycleInterceptor::new()),
            pool: None,
        }
    }

    /// Configured concurrency level.
    pub fn thread_count(&self) -> u32 {
        self.thread_count
    }

    /// The fixture's interceptor.
    pub fn interceptor(&self) -> &Arc<StatementLifecycleInterceptor> {
        &self.interceptor
    }

    /// The pool created by [`create_default_pool`](Self::create_default_pool),
    /// if any.
    pub fn pool(&self) -> Option<&MockPool> {
        self.pool.as_ref()
    }

    /// Test profile for this fixture, with connection overrides taken from
    /// the environment.
    pub fn create_default_config(&self) -> PoolConfig {
        PoolConfig::test_profile_with(self.thread_count, &ConfigOverrides::from_env())
    }

    /// Build a pool from [`create_default_config`](Self::create_default_config)
    /// wired to this fixture's interceptor.
    pub async fn create_default_pool(&mut self) -> Result<&MockPool, PoolError> {
        self.create_pool(self.create_default_config()).await
    }

    /// Build a pool from `config` wired to this fixture's interceptor.
    ///
    /// A pool created earlier is closed first, so statements it still owns
    /// are closed and counted before the new pool takes over.
    pub async fn create_pool(&mut self, config: PoolConfig) -> Result<&MockPool, PoolError> {
        let pool = MockPool::builder()
            .config(config)
            .interceptor(self.interceptor.clone())
            .build()?;
        self.release_pool().await;
        Ok(self.pool.insert(pool))
    }

    /// Close and release the pool. Close failures are logged, never
    /// propagated, so teardown always completes.
    pub async fn teardown(&mut self) {
        self.release_pool().await;
        tokio::task::yield_now().await;
    }

    async fn release_pool(&mut self) {
        if let Some(pool) = self.pool.take() {
            if let Err(e) = pool.close().await {
                tracing::warn!(error = %e, "ignoring pool close failure");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thread_count() {
        let fixture = PoolFixture::default();
        assert_eq!(fixture.thread_count(), 10);
        assert!(fixture.pool().is_none());
    }

    #[test]
    fn test_default_config_is_sized_to_thread_count() {
        let fixture = PoolFixture::with_thread_count(3);
        let config = fixture.create_default_config();
        assert_eq!(config.max_active(), 3);
        assert_eq!(config.initial_size(), 3);
        assert!(!config.remove_abandoned());
    }

    #[tokio::test]
    async fn test_wait_returns_last_seen_on_timeout() {
        let interceptor = StatementLifecycleInterceptor::new();
        let seen = wait_for_active_count(&interceptor, 1, Duration::from_millis(30)).await;
        assert_eq!(seen, 0);
    }

    #[tokio::test]
    async fn test_teardown_without_pool() {
        let mut fixture = PoolFixture::new();
        fixture.teardown().await;
        assert!(fixture.pool().is_none());
    }
}
