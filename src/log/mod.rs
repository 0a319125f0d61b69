//! Console logging for model runs.
//!
//! This is diagnostics output, separate from the CSV reports in `crate::report`. The
//! five `log` macros are re-exported here; use them anywhere in the crate:
//!
//! ```rust
//! use chitwan_abm::log::{info, warn};
//!
//! info!("starting timestep {}", 12);
//! warn!("household {} has no members", 7);
//! ```
//!
//! Logging is off until a level is set, either with `--log-level <level>` on the
//! command line or in code with `set_log_level`. Individual modules can be filtered by
//! path:
//!
//! ```rust
//! use chitwan_abm::log::{set_log_level, set_module_filter, LevelFilter};
//!
//! set_log_level(LevelFilter::Info);
//! // Per-person debug lines from the event processors are very noisy.
//! set_module_filter("chitwan_abm::demography", LevelFilter::Warn);
//! ```
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

#[cfg(all(feature = "logging", feature = "progress_bar"))]
mod progress_bar_encoder;

use std::sync::{LazyLock, Mutex, MutexGuard};

pub use log::{debug, error, info, trace, warn, LevelFilter};
#[cfg(feature = "logging")]
use log4rs::Handle;

use crate::hashing::HashMap;

static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// Global level plus per-module overrides, and the handle of the installed logger.
///
/// Only the free functions below touch it; they rebuild the logger configuration after
/// every change that alters the effective filters.
#[derive(Debug)]
pub(in crate::log) struct LogConfiguration {
    /// `LevelFilter::Off` (the default) disables logging.
    pub(in crate::log) global_log_level: LevelFilter,
    /// Module path to maximum level.
    pub(in crate::log) module_levels: HashMap<String, LevelFilter>,

    #[cfg(feature = "logging")]
    root_handle: Option<Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            global_log_level: LevelFilter::Off,
            module_levels: HashMap::default(),
            #[cfg(feature = "logging")]
            root_handle: None,
        }
    }
}

impl LogConfiguration {
    fn set_log_level(&mut self, level: LevelFilter) {
        self.global_log_level = level;
        self.set_config();
    }

    /// Returns whether anything changed.
    fn insert_module_filter(&mut self, module: String, level: LevelFilter) -> bool {
        self.module_levels.insert(module, level) != Some(level)
    }

    fn set_module_filters<S: ToString>(&mut self, filters: &[(&S, LevelFilter)]) {
        let mut changed = false;
        for (module, level) in filters {
            changed |= self.insert_module_filter(module.to_string(), *level);
        }
        if changed {
            self.set_config();
        }
    }

    fn remove_module_filter(&mut self, module: &str) {
        if self.module_levels.remove(module).is_some() {
            self.set_config();
        }
    }
}

/// Equivalent to `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Equivalent to `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the level for every module without its own filter.
pub fn set_log_level(level: LevelFilter) {
    get_log_configuration().set_log_level(level);
}

/// Sets the maximum level for one module path, e.g. `"chitwan_abm::validation"`.
pub fn set_module_filter(module_path: &str, level_filter: LevelFilter) {
    get_log_configuration().set_module_filters(&[(&module_path, level_filter)]);
}

/// Sets several module filters at once.
#[allow(clippy::implicit_hasher)]
pub fn set_module_filters<S: ToString>(module_filters: &[(&S, LevelFilter)]) {
    get_log_configuration().set_module_filters(module_filters);
}

/// The global level applies to `module_path` again.
pub fn remove_module_filter(module_path: &str) {
    get_log_configuration().remove_module_filter(module_path);
}

fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION.lock().expect("Mutex poisoned")
}
