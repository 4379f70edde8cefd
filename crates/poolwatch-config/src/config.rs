//! Pool configuration.
//!
//! [`PoolConfig`] is a plain bundle of tuning parameters. Setters only do
//! what their own field needs; the cross-field invariants are checked by
//! [`PoolConfig::validate`], which a pool engine calls once the object is
//! complete. Callers may therefore set fields in any order.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

/// How long a borrower waits for a connection when the pool is exhausted.
///
/// The pool-property encoding uses `0` milliseconds for "wait forever".
/// That case is [`MaxWait::Indefinite`]; a zero [`MaxWait::Bounded`] means
/// "do not wait at all" and is never produced by [`MaxWait::from_millis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MaxWait {
    /// Block until a connection is returned.
    Indefinite,
    /// Give up after the given duration.
    Bounded(Duration),
}

impl MaxWait {
    /// Interpret a pool-property millisecond value.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        if millis == 0 {
            Self::Indefinite
        } else {
            Self::Bounded(Duration::from_millis(millis))
        }
    }

    /// The wait limit, or `None` when borrowers wait indefinitely.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Self::Indefinite => None,
            Self::Bounded(limit) => Some(*limit),
        }
    }
}

/// How often a connection is re-validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationInterval {
    /// Validate on every check; results are never cached.
    Always,
    /// Skip validation if the connection passed within this interval.
    Cached(Duration),
}

impl ValidationInterval {
    /// Interpret a pool-property millisecond value; `0` means always.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        if millis == 0 {
            Self::Always
        } else {
            Self::Cached(Duration::from_millis(millis))
        }
    }

    /// How long a successful validation may be reused.
    #[must_use]
    pub fn cache_for(&self) -> Option<Duration> {
        match self {
            Self::Cached(interval) if !interval.is_zero() => Some(*interval),
            _ => None,
        }
    }
}

/// Transaction isolation applied to new connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IsolationLevel {
    /// Dirty reads possible.
    ReadUncommitted,
    /// No dirty reads.
    ReadCommitted,
    /// No non-repeatable reads.
    RepeatableRead,
    /// Full isolation.
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling used in `SET TRANSACTION ISOLATION LEVEL`.
    #[must_use]
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql())
    }
}

/// Username and password used to open physical connections.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: String,
}

impl Credentials {
    /// Create a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keep passwords out of logs.
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Configuration handed to a pool engine at startup.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolConfig {
    pub(crate) url: String,
    pub(crate) driver: String,
    pub(crate) credentials: Credentials,
    pub(crate) validation_query: String,

    pub(crate) initial_size: u32,
    pub(crate) max_active: u32,
    pub(crate) max_idle: u32,
    pub(crate) min_idle: u32,
    pub(crate) max_wait: MaxWait,

    pub(crate) test_on_borrow: bool,
    pub(crate) test_on_return: bool,
    pub(crate) test_while_idle: bool,
    pub(crate) test_on_connect: bool,
    pub(crate) validation_interval: ValidationInterval,

    pub(crate) eviction_interval: Duration,
    pub(crate) min_evictable_idle: Duration,
    pub(crate) num_tests_per_eviction_run: u32,

    pub(crate) remove_abandoned: bool,
    pub(crate) remove_abandoned_timeout_secs: u32,
    pub(crate) log_abandoned: bool,

    pub(crate) fair_queue: bool,
    pub(crate) management_enabled: bool,
    pub(crate) init_sql: Option<String>,
    pub(crate) default_auto_commit: Option<bool>,
    pub(crate) default_read_only: Option<bool>,
    pub(crate) default_isolation: Option<IsolationLevel>,
    pub(crate) default_catalog: Option<String>,
    pub(crate) driver_properties: BTreeMap<String, String>,
}

impl PoolConfig {
    /// Create a configuration from the default profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default_profile()
    }

    /// Connection URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Set the connection URL.
    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.url = url.into();
        self
    }

    /// Driver identifier.
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Set the driver identifier.
    pub fn set_driver(&mut self, driver: impl Into<String>) -> &mut Self {
        self.driver = driver.into();
        self
    }

    /// Login credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Set the login credentials.
    pub fn set_credentials(&mut self, credentials: Credentials) -> &mut Self {
        self.credentials = credentials;
        self
    }

    /// Query used to validate connections.
    pub fn validation_query(&self) -> &str {
        &self.validation_query
    }

    /// Set the validation query.
    pub fn set_validation_query(&mut self, query: impl Into<String>) -> &mut Self {
        self.validation_query = query.into();
        self
    }

    /// Connections opened when the pool starts.
    pub fn initial_size(&self) -> u32 {
        self.initial_size
    }

    /// Set the number of connections opened at startup.
    pub fn set_initial_size(&mut self, size: u32) -> &mut Self {
        self.initial_size = size;
        self
    }

    /// Upper bound on connections handed out at once.
    pub fn max_active(&self) -> u32 {
        self.max_active
    }

    /// Set the upper bound on borrowed connections.
    pub fn set_max_active(&mut self, size: u32) -> &mut Self {
        self.max_active = size;
        self
    }

    /// Idle connections kept before extras are closed.
    pub fn max_idle(&self) -> u32 {
        self.max_idle
    }

    /// Set the maximum idle connection count.
    pub fn set_max_idle(&mut self, size: u32) -> &mut Self {
        self.max_idle = size;
        self
    }

    /// Idle connections the evictor never goes below.
    pub fn min_idle(&self) -> u32 {
        self.min_idle
    }

    /// Set the minimum idle connection count.
    pub fn set_min_idle(&mut self, size: u32) -> &mut Self {
        self.min_idle = size;
        self
    }

    /// Borrow wait policy.
    pub fn max_wait(&self) -> MaxWait {
        self.max_wait
    }

    /// Set the borrow wait policy.
    pub fn set_max_wait(&mut self, wait: MaxWait) -> &mut Self {
        self.max_wait = wait;
        self
    }

    /// Set the borrow wait from milliseconds; `0` waits indefinitely.
    pub fn set_max_wait_millis(&mut self, millis: u64) -> &mut Self {
        self.max_wait = MaxWait::from_millis(millis);
        self
    }

    /// Whether connections are validated before being lent out.
    pub fn test_on_borrow(&self) -> bool {
        self.test_on_borrow
    }

    /// Enable or disable validation on borrow.
    pub fn set_test_on_borrow(&mut self, enabled: bool) -> &mut Self {
        self.test_on_borrow = enabled;
        self
    }

    /// Whether connections are validated when returned.
    pub fn test_on_return(&self) -> bool {
        self.test_on_return
    }

    /// Enable or disable validation on return.
    pub fn set_test_on_return(&mut self, enabled: bool) -> &mut Self {
        self.test_on_return = enabled;
        self
    }

    /// Whether the evictor validates idle connections.
    pub fn test_while_idle(&self) -> bool {
        self.test_while_idle
    }

    /// Enable or disable idle validation.
    pub fn set_test_while_idle(&mut self, enabled: bool) -> &mut Self {
        self.test_while_idle = enabled;
        self
    }

    /// Whether new physical connections are validated once opened.
    pub fn test_on_connect(&self) -> bool {
        self.test_on_connect
    }

    /// Enable or disable validation of fresh connections.
    pub fn set_test_on_connect(&mut self, enabled: bool) -> &mut Self {
        self.test_on_connect = enabled;
        self
    }

    /// Validation caching policy.
    pub fn validation_interval(&self) -> ValidationInterval {
        self.validation_interval
    }

    /// Set the validation caching policy.
    pub fn set_validation_interval(&mut self, interval: ValidationInterval) -> &mut Self {
        self.validation_interval = interval;
        self
    }

    /// Set the validation interval from milliseconds; `0` always validates.
    pub fn set_validation_interval_millis(&mut self, millis: u64) -> &mut Self {
        self.validation_interval = ValidationInterval::from_millis(millis);
        self
    }

    /// Time between idle evictor runs. Zero disables the evictor.
    pub fn eviction_interval(&self) -> Duration {
        self.eviction_interval
    }

    /// Set the idle evictor period.
    pub fn set_eviction_interval(&mut self, interval: Duration) -> &mut Self {
        self.eviction_interval = interval;
        self
    }

    /// Whether an idle evictor runs at all.
    pub fn is_evictor_enabled(&self) -> bool {
        !self.eviction_interval.is_zero()
    }

    /// Idle time after which a connection becomes evictable.
    pub fn min_evictable_idle(&self) -> Duration {
        self.min_evictable_idle
    }

    /// Set the idle time threshold for eviction.
    pub fn set_min_evictable_idle(&mut self, idle: Duration) -> &mut Self {
        self.min_evictable_idle = idle;
        self
    }

    /// Connections examined per evictor run; `0` examines all.
    pub fn num_tests_per_eviction_run(&self) -> u32 {
        self.num_tests_per_eviction_run
    }

    /// Set the number of connections examined per evictor run.
    pub fn set_num_tests_per_eviction_run(&mut self, count: u32) -> &mut Self {
        self.num_tests_per_eviction_run = count;
        self
    }

    /// Whether abandoned connections are reclaimed.
    pub fn remove_abandoned(&self) -> bool {
        self.remove_abandoned
    }

    /// Enable or disable abandonment detection.
    pub fn set_remove_abandoned(&mut self, enabled: bool) -> &mut Self {
        self.remove_abandoned = enabled;
        self
    }

    /// Configured abandonment timeout in whole seconds.
    pub fn remove_abandoned_timeout_secs(&self) -> u32 {
        self.remove_abandoned_timeout_secs
    }

    /// Set the abandonment timeout in whole seconds.
    pub fn set_remove_abandoned_timeout_secs(&mut self, secs: u32) -> &mut Self {
        self.remove_abandoned_timeout_secs = secs;
        self
    }

    /// The abandonment timeout, present only when detection is enabled.
    pub fn abandoned_timeout(&self) -> Option<Duration> {
        self.remove_abandoned
            .then(|| Duration::from_secs(u64::from(self.remove_abandoned_timeout_secs)))
    }

    /// Whether the stack of an abandoning borrower is logged.
    pub fn log_abandoned(&self) -> bool {
        self.log_abandoned
    }

    /// Enable or disable logging of abandoned connections.
    pub fn set_log_abandoned(&mut self, enabled: bool) -> &mut Self {
        self.log_abandoned = enabled;
        self
    }

    /// Whether waiting borrowers are served in arrival order.
    pub fn fair_queue(&self) -> bool {
        self.fair_queue
    }

    /// Enable or disable the fair borrow queue.
    pub fn set_fair_queue(&mut self, enabled: bool) -> &mut Self {
        self.fair_queue = enabled;
        self
    }

    /// Whether the engine registers a management endpoint.
    pub fn management_enabled(&self) -> bool {
        self.management_enabled
    }

    /// Enable or disable the management endpoint.
    pub fn set_management_enabled(&mut self, enabled: bool) -> &mut Self {
        self.management_enabled = enabled;
        self
    }

    /// SQL run once on every new physical connection.
    pub fn init_sql(&self) -> Option<&str> {
        self.init_sql.as_deref()
    }

    /// Set the per-connection initialization SQL.
    pub fn set_init_sql(&mut self, sql: Option<String>) -> &mut Self {
        self.init_sql = sql;
        self
    }

    /// Auto-commit state applied to new connections; `None` keeps the driver's.
    pub fn default_auto_commit(&self) -> Option<bool> {
        self.default_auto_commit
    }

    /// Set the default auto-commit state.
    pub fn set_default_auto_commit(&mut self, auto_commit: Option<bool>) -> &mut Self {
        self.default_auto_commit = auto_commit;
        self
    }

    /// Read-only state applied to new connections; `None` keeps the driver's.
    pub fn default_read_only(&self) -> Option<bool> {
        self.default_read_only
    }

    /// Set the default read-only state.
    pub fn set_default_read_only(&mut self, read_only: Option<bool>) -> &mut Self {
        self.default_read_only = read_only;
        self
    }

    /// Isolation applied to new connections; `None` keeps the driver's.
    pub fn default_isolation(&self) -> Option<IsolationLevel> {
        self.default_isolation
    }

    /// Set the default isolation level.
    pub fn set_default_isolation(&mut self, level: Option<IsolationLevel>) -> &mut Self {
        self.default_isolation = level;
        self
    }

    /// Catalog selected on new connections.
    pub fn default_catalog(&self) -> Option<&str> {
        self.default_catalog.as_deref()
    }

    /// Set the default catalog.
    pub fn set_default_catalog(&mut self, catalog: Option<String>) -> &mut Self {
        self.default_catalog = catalog;
        self
    }

    /// Extra properties passed to the driver, as explicitly configured.
    pub fn driver_properties(&self) -> &BTreeMap<String, String> {
        &self.driver_properties
    }

    /// Add or replace a driver property.
    pub fn set_driver_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.driver_properties.insert(key.into(), value.into());
        self
    }

    /// Driver properties with `user` and `password` taken from the
    /// current credentials.
    pub fn effective_driver_properties(&self) -> BTreeMap<String, String> {
        let mut properties = self.driver_properties.clone();
        properties.insert("user".into(), self.credentials.username.clone());
        properties.insert("password".into(), self.credentials.password.clone());
        properties
    }

    /// Check the cross-field invariants.
    ///
    /// Pool engines call this once the configuration is complete; a
    /// violation is a construction failure of the engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_active == 0 {
            return Err(ConfigError::InvalidSizing(
                "max_active must be greater than 0".into(),
            ));
        }
        if self.min_idle > self.max_idle {
            return Err(ConfigError::InvalidSizing(format!(
                "min_idle ({}) cannot be greater than max_idle ({})",
                self.min_idle, self.max_idle
            )));
        }
        if self.max_idle > self.max_active {
            return Err(ConfigError::InvalidSizing(format!(
                "max_idle ({}) cannot be greater than max_active ({})",
                self.max_idle, self.max_active
            )));
        }
        if self.initial_size > self.max_active {
            return Err(ConfigError::InvalidSizing(format!(
                "initial_size ({}) cannot be greater than max_active ({})",
                self.initial_size, self.max_active
            )));
        }
        if self.test_while_idle && !self.is_evictor_enabled() {
            return Err(ConfigError::EvictionRequired);
        }
        if self.remove_abandoned && self.remove_abandoned_timeout_secs == 0 {
            return Err(ConfigError::AbandonedTimeout);
        }
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingField("url"));
        }
        if self.driver.trim().is_empty() {
            return Err(ConfigError::MissingField("driver"));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::default_profile()
    }
}
