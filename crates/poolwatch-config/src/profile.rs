//! Preset configuration profiles.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::{Credentials, MaxWait, PoolConfig, ValidationInterval};
use crate::overrides::ConfigOverrides;
use crate::startup::StartupOptions;

/// Values of the default profile.
pub mod defaults {
    /// Local embedded test database.
    pub const URL: &str = "sqlite://target/poolwatch/test.db?mode=rwc";
    /// Driver for [`URL`].
    pub const DRIVER: &str = "sqlite";
    /// Login name.
    pub const USERNAME: &str = "root";
    /// Login password.
    pub const PASSWORD: &str = "password";
    /// Validation query.
    pub const VALIDATION_QUERY: &str = "SELECT 1";

    /// Connections opened at startup; also the idle bounds.
    pub const INITIAL_SIZE: u32 = 10;
    /// Maximum borrowed connections.
    pub const MAX_ACTIVE: u32 = 100;
    /// Borrow wait.
    pub const MAX_WAIT_MILLIS: u64 = 10_000;
    /// Idle evictor period.
    pub const EVICTION_INTERVAL_MILLIS: u64 = 5_000;
    /// Idle time before eviction.
    pub const MIN_EVICTABLE_IDLE_MILLIS: u64 = 1_000;
    /// Abandonment timeout.
    pub const REMOVE_ABANDONED_TIMEOUT_SECS: u32 = 5;
}

/// Values the test profile applies on top of the default profile.
pub mod test_defaults {
    /// Validation cache window.
    pub const VALIDATION_INTERVAL_MILLIS: u64 = 30_000;
    /// Idle evictor period.
    pub const EVICTION_INTERVAL_MILLIS: u64 = 30_000;
    /// Borrow wait.
    pub const MAX_WAIT_MILLIS: u64 = 10_000;
    /// Idle time before eviction.
    pub const MIN_EVICTABLE_IDLE_MILLIS: u64 = 10_000;
    /// Abandonment timeout, inert while detection is off.
    pub const REMOVE_ABANDONED_TIMEOUT_SECS: u32 = 10;
    /// Concurrency level used when a test does not pick one.
    pub const THREAD_COUNT: u32 = 10;
}

impl PoolConfig {
    /// Production-like settings: validation on borrow and while idle,
    /// abandonment detection on.
    #[must_use]
    pub fn default_profile() -> Self {
        Self::default_profile_with(&ConfigOverrides::new())
    }

    /// The default profile with connection overrides applied.
    #[must_use]
    pub fn default_profile_with(overrides: &ConfigOverrides) -> Self {
        StartupOptions::global();

        let mut config = Self {
            url: defaults::URL.into(),
            driver: defaults::DRIVER.into(),
            credentials: Credentials::new(defaults::USERNAME, defaults::PASSWORD),
            validation_query: defaults::VALIDATION_QUERY.into(),

            initial_size: defaults::INITIAL_SIZE,
            max_active: defaults::MAX_ACTIVE,
            max_idle: defaults::INITIAL_SIZE,
            min_idle: defaults::INITIAL_SIZE,
            max_wait: MaxWait::from_millis(defaults::MAX_WAIT_MILLIS),

            test_on_borrow: true,
            test_on_return: false,
            test_while_idle: true,
            test_on_connect: false,
            validation_interval: ValidationInterval::Always,

            eviction_interval: Duration::from_millis(defaults::EVICTION_INTERVAL_MILLIS),
            min_evictable_idle: Duration::from_millis(defaults::MIN_EVICTABLE_IDLE_MILLIS),
            num_tests_per_eviction_run: 0,

            remove_abandoned: true,
            remove_abandoned_timeout_secs: defaults::REMOVE_ABANDONED_TIMEOUT_SECS,
            log_abandoned: true,

            fair_queue: true,
            management_enabled: true,
            init_sql: None,
            default_auto_commit: Some(true),
            default_read_only: Some(false),
            default_isolation: None,
            default_catalog: None,
            driver_properties: BTreeMap::new(),
        };

        overrides.apply(&mut config);
        config
    }

    /// Settings for deterministic tests: no validation, no eviction work,
    /// no abandonment detection, and a pool sized to exactly
    /// `thread_count` connections.
    #[must_use]
    pub fn test_profile(thread_count: u32) -> Self {
        Self::test_profile_with(thread_count, &ConfigOverrides::new())
    }

    /// The test profile with connection overrides applied.
    #[must_use]
    pub fn test_profile_with(thread_count: u32, overrides: &ConfigOverrides) -> Self {
        let mut config = Self::default_profile_with(overrides);
        config
            .set_fair_queue(false)
            .set_management_enabled(false)
            .set_test_while_idle(false)
            .set_test_on_borrow(false)
            .set_test_on_return(false)
            .set_validation_interval_millis(test_defaults::VALIDATION_INTERVAL_MILLIS)
            .set_eviction_interval(Duration::from_millis(
                test_defaults::EVICTION_INTERVAL_MILLIS,
            ))
            .set_max_active(thread_count)
            .set_initial_size(thread_count)
            .set_max_wait_millis(test_defaults::MAX_WAIT_MILLIS)
            .set_remove_abandoned_timeout_secs(test_defaults::REMOVE_ABANDONED_TIMEOUT_SECS)
            .set_min_evictable_idle(Duration::from_millis(
                test_defaults::MIN_EVICTABLE_IDLE_MILLIS,
            ))
            .set_min_idle(thread_count)
            .set_max_idle(thread_count)
            .set_log_abandoned(false)
            .set_remove_abandoned(false);
        config
    }
}
