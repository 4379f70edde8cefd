//! Tests for poolwatch-config profiles and validation

use std::time::Duration;

use poolwatch_config::{ConfigError, ConfigOverrides, MaxWait, PoolConfig};
use proptest::prelude::*;

// ==================== Profile Tests ====================

#[test]
fn test_default_profile_is_valid() {
    let config = PoolConfig::default();
    assert_eq!(config, PoolConfig::new());
    assert!(config.validate().is_ok());
}

#[test]
fn test_test_profile_for_ten_threads() {
    let config = PoolConfig::test_profile(10);

    assert_eq!(config.initial_size(), 10);
    assert_eq!(config.max_active(), 10);
    assert_eq!(config.min_idle(), 10);
    assert!(!config.remove_abandoned());
    assert!(!config.log_abandoned());
    assert_eq!(config.max_wait(), MaxWait::Bounded(Duration::from_secs(10)));
}

#[test]
fn test_zero_threads_fails_validation() {
    let config = PoolConfig::test_profile(0);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidSizing(_))
    ));
}

#[test]
fn test_env_overrides_do_not_touch_sizing() {
    let overrides = ConfigOverrides::from_lookup(|name| {
        (name == "POOLWATCH_URL").then(|| "sqlite::memory:".to_string())
    });

    let config = PoolConfig::default_profile_with(&overrides);
    assert_eq!(config.url(), "sqlite::memory:");
    assert_eq!(config.max_active(), 100);
    assert_eq!(config.initial_size(), 10);
}

#[test]
fn test_indefinite_wait_survives_validation() {
    let mut config = PoolConfig::test_profile(4);
    config.set_max_wait_millis(0);

    assert_eq!(config.max_wait(), MaxWait::Indefinite);
    assert!(config.validate().is_ok());
}

#[cfg(feature = "serde")]
#[test]
fn test_config_serde() {
    let config = PoolConfig::test_profile(3);
    let json = serde_json::to_string(&config).unwrap();
    let parsed: PoolConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}

// ==================== Property Tests ====================

proptest! {
    #[test]
    fn prop_test_profile_always_valid(threads in 1u32..=1024) {
        let config = PoolConfig::test_profile(threads);
        prop_assert!(config.validate().is_ok());
        prop_assert_eq!(config.initial_size(), threads);
        prop_assert_eq!(config.max_active(), threads);
        prop_assert_eq!(config.min_idle(), threads);
    }

    #[test]
    fn prop_sizing_invariant_matches_validate(
        min_idle in 0u32..200,
        max_idle in 0u32..200,
        max_active in 1u32..200,
        initial_size in 0u32..200,
    ) {
        let mut config = PoolConfig::default();
        config
            .set_min_idle(min_idle)
            .set_max_idle(max_idle)
            .set_max_active(max_active)
            .set_initial_size(initial_size);

        let expected = min_idle <= max_idle && max_idle <= max_active && initial_size <= max_active;
        prop_assert_eq!(config.validate().is_ok(), expected);
    }
}
