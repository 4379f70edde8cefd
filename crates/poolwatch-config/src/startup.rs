//! Process-wide startup options.
//!
//! Some embedded database drivers read tuning knobs from process-global
//! state. Those knobs live here and are installed exactly once per process:
//! either explicitly through [`StartupOptions::install`] before the first
//! profile is built, or implicitly with defaults by the first call to
//! [`StartupOptions::global`].

use std::collections::BTreeMap;

use once_cell::sync::OnceCell;

use crate::error::ConfigError;

static STARTUP: OnceCell<StartupOptions> = OnceCell::new();

/// Property name carrying [`StartupOptions::embedded_cached_objects`].
pub const EMBEDDED_CACHED_OBJECTS: &str = "embedded.server_cached_objects";

/// Driver tuning shared by every pool in the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupOptions {
    /// Objects cached per session by an embedded database server.
    pub embedded_cached_objects: u32,
    /// Additional process-wide driver properties.
    pub driver_properties: BTreeMap<String, String>,
}

impl Default for StartupOptions {
    fn default() -> Self {
        Self {
            embedded_cached_objects: 10_000,
            driver_properties: BTreeMap::new(),
        }
    }
}

impl StartupOptions {
    /// Install these options for the rest of the process.
    ///
    /// Fails with [`ConfigError::StartupAlreadyInstalled`] if options were
    /// already installed, explicitly or by [`StartupOptions::global`].
    pub fn install(self) -> Result<&'static StartupOptions, ConfigError> {
        let mut installed = false;
        let options = STARTUP.get_or_init(|| {
            installed = true;
            self
        });

        if !installed {
            return Err(ConfigError::StartupAlreadyInstalled);
        }

        tracing::info!(
            embedded_cached_objects = options.embedded_cached_objects,
            "startup options installed"
        );
        Ok(options)
    }

    /// The installed options, installing the defaults on first use.
    pub fn global() -> &'static StartupOptions {
        STARTUP.get_or_init(|| {
            tracing::debug!("installing default startup options");
            Self::default()
        })
    }

    /// Whether options have been installed yet.
    pub fn is_installed() -> bool {
        STARTUP.get().is_some()
    }

    /// The options rendered as driver property pairs.
    pub fn properties(&self) -> BTreeMap<String, String> {
        let mut properties = self.driver_properties.clone();
        properties.insert(
            EMBEDDED_CACHED_OBJECTS.into(),
            self.embedded_cached_objects.to_string(),
        );
        properties
    }
}
