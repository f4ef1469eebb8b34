//! Rig Configuration Module
//!
//! Provides per-deployment configuration loaded from TOML files, replacing
//! hardcoded sensor thresholds and lifetime parameters with operator-tunable
//! values.
//!
//! ## Loading Order
//!
//! 1. `FERTISENSE_CONFIG` environment variable (path to TOML file)
//! 2. `rig_config.toml` in the current working directory
//! 3. Built-in defaults (matching the original commissioning values)
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(RigConfig::load()?);
//!
//! // Anywhere in the codebase:
//! let window = config::get().anomaly.statistical_window;
//! ```

mod rig_config;

pub use rig_config::*;

use std::sync::OnceLock;

/// Global rig configuration, initialized once at startup.
static RIG_CONFIG: OnceLock<RigConfig> = OnceLock::new();

/// Initialize the global rig configuration.
///
/// Must be called exactly once before any calls to `get()`.
pub fn init(config: RigConfig) {
    if RIG_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global rig configuration.
///
/// Panics if `init()` has not been called. This is by design — a missing
/// config is a fatal startup error, not a recoverable condition.
pub fn get() -> &'static RigConfig {
    RIG_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

/// Check whether the config has been initialized.
///
/// Useful for tests and optional config paths.
pub fn is_initialized() -> bool {
    RIG_CONFIG.get().is_some()
}
