//! Externally supplied overrides for connection settings.
//!
//! Only the settings that point a profile at a concrete database can be
//! overridden: URL, driver, username, password and validation query. Every
//! other field is owned by the profile.

use std::collections::BTreeMap;

use crate::config::PoolConfig;
use crate::error::ConfigError;

/// Override keys understood by [`ConfigOverrides`].
pub mod keys {
    /// Connection URL.
    pub const URL: &str = "url";
    /// Driver identifier.
    pub const DRIVER: &str = "driver";
    /// Login name.
    pub const USERNAME: &str = "username";
    /// Login password.
    pub const PASSWORD: &str = "password";
    /// Validation query.
    pub const VALIDATION_QUERY: &str = "validation_query";

    /// All recognised keys.
    pub const ALL: [&str; 5] = [URL, DRIVER, USERNAME, PASSWORD, VALIDATION_QUERY];
}

/// Prefix of the environment variables read by [`ConfigOverrides::from_env`].
pub const ENV_PREFIX: &str = "POOLWATCH_";

/// Key/value overrides applied when a profile is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    values: BTreeMap<String, String>,
}

impl ConfigOverrides {
    /// Create an empty override set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from `POOLWATCH_URL`, `POOLWATCH_DRIVER`,
    /// `POOLWATCH_USERNAME`, `POOLWATCH_PASSWORD` and
    /// `POOLWATCH_VALIDATION_QUERY`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read overrides through an arbitrary variable lookup.
    ///
    /// The lookup receives the prefixed, upper-cased variable name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut overrides = Self::new();
        for key in keys::ALL {
            let name = format!("{ENV_PREFIX}{}", key.to_uppercase());
            if let Some(value) = lookup(&name) {
                overrides.set(key, value);
            }
        }
        overrides
    }

    /// Parse properties-style `key=value` lines.
    ///
    /// Blank lines and lines starting with `#` or `!` are skipped. Keys and
    /// values are trimmed; the value may itself contain `=`.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut overrides = Self::new();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| ConfigError::InvalidOverride {
                    line: index + 1,
                    message: format!("expected key=value, got {line:?}"),
                })?;

            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::InvalidOverride {
                    line: index + 1,
                    message: "empty key".into(),
                });
            }

            overrides.set(key, value.trim());
        }

        Ok(overrides)
    }

    /// Set a single override.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Look up an override.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Number of overrides present.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no overrides are present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Apply the overrides to a configuration.
    pub(crate) fn apply(&self, config: &mut PoolConfig) {
        for (key, value) in &self.values {
            match key.as_str() {
                keys::URL => {
                    config.set_url(value.as_str());
                }
                keys::DRIVER => {
                    config.set_driver(value.as_str());
                }
                keys::USERNAME => {
                    config.credentials.username = value.clone();
                }
                keys::PASSWORD => {
                    config.credentials.password = value.clone();
                }
                keys::VALIDATION_QUERY => {
                    config.set_validation_query(value.as_str());
                }
                _ => {
                    // Ignore unknown keys for forward compatibility
                    tracing::debug!(key = key.as_str(), "ignoring unknown configuration override");
                }
            }
        }
    }
}
