//! In-memory pool engine.
//!
//! [`MockPool`] honors the configuration contract a real engine must: it
//! validates the [`PoolConfig`] at construction, opens `initial_size`
//! connections up front, lends at most `max_active` at once, waits per
//! `max_wait`, validates on borrow and return when asked, and routes every
//! statement through the configured interceptor. It does no eviction or
//! abandonment reaping; those belong to the production engine.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use poolwatch_config::{PoolConfig, StartupOptions};
use poolwatch_intercept::{ConnectionId, StatementLifecycleInterceptor};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::PoolError;
use crate::mock::MockConnection;

/// A connection pool backed by [`MockConnection`]s.
///
/// # Example
///
/// ```rust,ignore
/// use poolwatch_config::PoolConfig;
/// use poolwatch_testing::MockPool;
///
/// let interceptor = Arc::new(StatementLifecycleInterceptor::new());
/// let pool = MockPool::builder()
///     .config(PoolConfig::test_profile(10))
///     .interceptor(interceptor.clone())
///     .build()?;
///
/// let conn = pool.get().await?;
/// let stmt = conn.prepare("SELECT 1")?;
/// stmt.close().await?;
/// ```
pub struct MockPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    config: Arc<PoolConfig>,

    /// Process-wide startup properties overlaid with the pool's own.
    driver_properties: BTreeMap<String, String>,

    /// Statement hook, if any.
    interceptor: Option<Arc<StatementLifecycleInterceptor>>,

    /// Whether the pool is closed.
    closed: AtomicBool,

    /// Counter for generating connection IDs.
    next_connection_id: AtomicU64,

    /// Connections waiting to be borrowed.
    idle: Mutex<Vec<Arc<MockConnection>>>,

    /// Every open connection, idle or borrowed.
    connections: Mutex<Vec<Arc<MockConnection>>>,

    /// One permit per connection that may be borrowed.
    permits: Arc<Semaphore>,

    /// Makes the next `close()` report a failure.
    fail_next_close: AtomicBool,

    /// When the pool was created.
    created_at: Instant,

    /// Pool metrics.
    metrics: Mutex<PoolMetricsInner>,
}

/// Internal metrics tracking.
#[derive(Debug, Default)]
struct PoolMetricsInner {
    connections_created: u64,
    connections_closed: u64,
    checkouts_successful: u64,
    checkouts_failed: u64,
    validations_performed: u64,
    validations_failed: u64,
    resets_performed: u64,
}

impl PoolInner {
    fn open_connection(&self) -> Arc<MockConnection> {
        let id = ConnectionId(self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        let conn = Arc::new(MockConnection::new(id, self.interceptor.clone()));
        self.connections.lock().push(conn.clone());
        self.metrics.lock().connections_created += 1;
        tracing::trace!(connection = %id, "connection opened");
        conn
    }

    /// Run the validation stand-in, counting the outcome.
    fn validate(&self, conn: &MockConnection) -> bool {
        let valid = conn.is_valid();
        let mut metrics = self.metrics.lock();
        metrics.validations_performed += 1;
        if !valid {
            metrics.validations_failed += 1;
        }
        valid
    }

    fn forget(&self, conn: &Arc<MockConnection>) {
        self.connections.lock().retain(|c| !Arc::ptr_eq(c, conn));
        self.metrics.lock().connections_closed += 1;
    }

    fn checkin(&self, conn: Arc<MockConnection>) {
        if self.closed.load(Ordering::Acquire) {
            // close() already shut it down
            return;
        }
        if self.config.test_on_return() && !self.validate(&conn) {
            tracing::debug!(connection = %conn.id(), "discarding connection that failed validation on return");
            self.forget(&conn);
            return;
        }

        let mut idle = self.idle.lock();
        if idle.len() < self.config.max_idle() as usize {
            idle.push(conn);
        } else {
            drop(idle);
            // The statements it still owns stay open: leaks remain visible.
            tracing::trace!(connection = %conn.id(), "idle limit reached, dropping connection");
            self.forget(&conn);
        }
    }
}

impl MockPool {
    /// Create a new pool builder.
    #[must_use]
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Create a pool, validating `config` first.
    pub fn new(
        config: PoolConfig,
        interceptor: Option<Arc<StatementLifecycleInterceptor>>,
    ) -> Result<Self, PoolError> {
        config.validate()?;

        let mut driver_properties = StartupOptions::global().properties();
        driver_properties.extend(config.effective_driver_properties());

        let config = Arc::new(config);
        let inner = Arc::new(PoolInner {
            driver_properties,
            permits: Arc::new(Semaphore::new(config.max_active() as usize)),
            config: config.clone(),
            interceptor,
            closed: AtomicBool::new(false),
            next_connection_id: AtomicU64::new(1),
            idle: Mutex::new(Vec::with_capacity(config.max_idle() as usize)),
            connections: Mutex::new(Vec::with_capacity(config.max_active() as usize)),
            fail_next_close: AtomicBool::new(false),
            created_at: Instant::now(),
            metrics: Mutex::new(PoolMetricsInner::default()),
        });

        for _ in 0..config.initial_size() {
            let conn = inner.open_connection();
            inner.idle.lock().push(conn);
        }

        tracing::info!(
            initial = config.initial_size(),
            max = config.max_active(),
            url = config.url(),
            driver_properties = inner.driver_properties.len(),
            "mock pool created"
        );

        Ok(Self { inner })
    }

    /// Borrow a connection.
    ///
    /// Waits for a free slot per the configured `max_wait`.
    pub async fn get(&self) -> Result<PooledConnection, PoolError> {
        if self.is_closed() {
            return Err(PoolError::PoolClosed);
        }

        tracing::trace!("acquiring connection from pool");

        let acquire = self.inner.permits.clone().acquire_owned();
        let permit = match self.inner.config.max_wait().timeout() {
            None => acquire.await.map_err(|_| PoolError::PoolClosed)?,
            Some(limit) => match tokio::time::timeout(limit, acquire).await {
                Ok(permit) => permit.map_err(|_| PoolError::PoolClosed)?,
                Err(_) => {
                    self.inner.metrics.lock().checkouts_failed += 1;
                    return Err(PoolError::Timeout(limit));
                }
            },
        };

        let conn = loop {
            let candidate = self.inner.idle.lock().pop();
            match candidate {
                Some(conn) => {
                    if self.inner.config.test_on_borrow() && !self.inner.validate(&conn) {
                        self.inner.forget(&conn);
                        continue;
                    }
                    break conn;
                }
                None => break self.inner.open_connection(),
            }
        };

        self.inner.metrics.lock().checkouts_successful += 1;
        Ok(PooledConnection {
            conn: Some(conn),
            pool: self.inner.clone(),
            _permit: permit,
        })
    }

    /// Get the current pool status.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let max = self.inner.config.max_active();
        let available = self.inner.idle.lock().len() as u32;
        let total = self.inner.connections.lock().len() as u32;
        let in_use = max.saturating_sub(self.inner.permits.available_permits() as u32);
        PoolStatus {
            available,
            in_use,
            total,
            max,
        }
    }

    /// Get pool metrics.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        let inner = self.inner.metrics.lock();
        PoolMetrics {
            connections_created: inner.connections_created,
            connections_closed: inner.connections_closed,
            checkouts_successful: inner.checkouts_successful,
            checkouts_failed: inner.checkouts_failed,
            validations_performed: inner.validations_performed,
            validations_failed: inner.validations_failed,
            resets_performed: inner.resets_performed,
            uptime: self.inner.created_at.elapsed(),
        }
    }

    /// Make the next [`close`](Self::close) report a failure after it has
    /// released everything.
    pub fn fail_next_close(&self) {
        self.inner.fail_next_close.store(true, Ordering::Release);
    }

    /// Close the pool, closing every connection and the statements they own.
    ///
    /// Borrowed connections are closed too; returning them later is a no-op.
    pub async fn close(&self) -> Result<(), PoolError> {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            self.inner.permits.close();
            self.inner.idle.lock().clear();
            let connections: Vec<_> = self.inner.connections.lock().drain(..).collect();
            let count = connections.len() as u64;
            for conn in connections {
                conn.close().await;
            }
            self.inner.metrics.lock().connections_closed += count;
            tracing::info!(connections = count, "mock pool closed");
        }

        if self.inner.fail_next_close.swap(false, Ordering::AcqRel) {
            return Err(PoolError::Close("injected close failure".into()));
        }
        Ok(())
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Get the pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Properties handed to the driver when opening connections.
    ///
    /// Startup options come first; the configuration's own properties and
    /// credentials override them.
    #[must_use]
    pub fn driver_properties(&self) -> &BTreeMap<String, String> {
        &self.inner.driver_properties
    }

    /// The statement interceptor, if one is installed.
    #[must_use]
    pub fn interceptor(&self) -> Option<&Arc<StatementLifecycleInterceptor>> {
        self.inner.interceptor.as_ref()
    }
}

impl std::fmt::Debug for MockPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPool")
            .field("status", &self.status())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Builder for creating a [`MockPool`].
///
/// # Example
///
/// ```rust,ignore
/// let pool = MockPool::builder()
///     .config(PoolConfig::test_profile(4))
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct PoolBuilder {
    config: Option<PoolConfig>,
    interceptor: Option<Arc<StatementLifecycleInterceptor>>,
}

impl PoolBuilder {
    /// Create a builder using the default profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pool configuration.
    #[must_use]
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Route statement creation through `interceptor`.
    #[must_use]
    pub fn interceptor(mut self, interceptor: Arc<StatementLifecycleInterceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Build the pool.
    pub fn build(self) -> Result<MockPool, PoolError> {
        MockPool::new(self.config.unwrap_or_default(), self.interceptor)
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Number of idle connections available.
    pub available: u32,
    /// Number of connections currently borrowed.
    pub in_use: u32,
    /// Total number of open connections.
    pub total: u32,
    /// Maximum borrowed connections.
    pub max: u32,
}

impl PoolStatus {
    /// Calculate the utilization percentage.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        (self.in_use as f64 / self.max as f64) * 100.0
    }

    /// Check if every connection slot is borrowed.
    #[must_use]
    pub fn is_at_capacity(&self) -> bool {
        self.in_use >= self.max
    }
}

/// Metrics collected from the pool.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Connections opened since pool start.
    pub connections_created: u64,
    /// Connections closed since pool start.
    pub connections_closed: u64,
    /// Successful borrows.
    pub checkouts_successful: u64,
    /// Borrows that timed out.
    pub checkouts_failed: u64,
    /// Borrow/return validations run.
    pub validations_performed: u64,
    /// Validations that failed.
    pub validations_failed: u64,
    /// Connection resets performed.
    pub resets_performed: u64,
    /// Time since pool creation.
    pub uptime: std::time::Duration,
}

impl PoolMetrics {
    /// Calculate checkout success rate (0.0 to 1.0).
    #[must_use]
    pub fn checkout_success_rate(&self) -> f64 {
        let total = self.checkouts_successful + self.checkouts_failed;
        if total == 0 {
            return 1.0;
        }
        self.checkouts_successful as f64 / total as f64
    }
}

/// A connection borrowed from the pool.
///
/// When dropped, the connection goes back to the pool. Statements it still
/// owns stay open until it is reset or closed.
pub struct PooledConnection {
    conn: Option<Arc<MockConnection>>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    /// Close every statement still open on this connection.
    pub async fn reset(&self) {
        self.connection().reset().await;
        self.pool.metrics.lock().resets_performed += 1;
    }

    fn connection(&self) -> &MockConnection {
        // Only taken in drop.
        match &self.conn {
            Some(conn) => conn,
            None => unreachable!("pooled connection used after return"),
        }
    }
}

impl Deref for PooledConnection {
    type Target = MockConnection;

    fn deref(&self) -> &Self::Target {
        self.connection()
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("conn", &self.conn)
            .finish()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::trace!(connection = %conn.id(), "returning connection to pool");
            self.pool.checkin(conn);
        }
    }
}
