//! Stand-in used when the `logging` feature is off: nothing is printed, but the
//! configuration functions still work.
use crate::log::LogConfiguration;

impl LogConfiguration {
    pub(in crate::log) fn set_config(&mut self) {
        log::set_max_level(self.global_log_level);
    }
}
