//! Fuzz target for the connection overrides parser.
//!
//! Parsing must never panic, and anything it accepts must apply cleanly to
//! both profiles.

#![no_main]

use libfuzzer_sys::fuzz_target;
use poolwatch_config::{ConfigOverrides, PoolConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(overrides) = ConfigOverrides::parse(text) {
        let config = PoolConfig::test_profile_with(4, &overrides);
        let _ = config.validate();
        let _ = PoolConfig::default_profile_with(&overrides).effective_driver_properties();
    }
});
