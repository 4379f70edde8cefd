//! # poolwatch-config
//!
//! Configuration contract for a connection pool under test.
//!
//! A [`PoolConfig`] bundles sizing, validation, eviction and abandonment
//! settings. It is built once, usually from a profile, and handed to a pool
//! engine which calls [`PoolConfig::validate`] before starting.
//!
//! ## Example
//!
//! ```rust
//! use poolwatch_config::{ConfigOverrides, PoolConfig};
//!
//! // Production-like defaults
//! let config = PoolConfig::default_profile();
//! assert_eq!(config.max_active(), 100);
//!
//! // Sized for a test running ten workers, pointed at another database
//! let mut overrides = ConfigOverrides::new();
//! overrides.set("url", "postgres://localhost/test");
//! let config = PoolConfig::test_profile_with(10, &overrides);
//! assert_eq!(config.max_active(), 10);
//! assert!(config.validate().is_ok());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod overrides;
pub mod profile;
pub mod startup;

pub use config::{Credentials, IsolationLevel, MaxWait, PoolConfig, ValidationInterval};
pub use error::ConfigError;
pub use overrides::ConfigOverrides;
pub use startup::StartupOptions;
