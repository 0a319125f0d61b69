use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::encode::Encode;
use log4rs::Config;

#[cfg(feature = "progress_bar")]
use super::progress_bar_encoder::LineClearingEncoder;
use crate::log::LogConfiguration;

// ISO 8601 timestamp, colored level, module path.
const LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";

fn console_encoder() -> Box<dyn Encode> {
    let encoder: Box<dyn Encode> = Box::new(PatternEncoder::new(LOG_PATTERN));
    #[cfg(feature = "progress_bar")]
    let encoder: Box<dyn Encode> = Box::new(LineClearingEncoder::new(encoder));
    encoder
}

impl LogConfiguration {
    /// Installs (or reconfigures) the log4rs console logger to match `self`.
    pub(in crate::log) fn set_config(&mut self) {
        let console = ConsoleAppender::builder().encoder(console_encoder()).build();
        let mut builder =
            Config::builder().appender(Appender::builder().build("console", Box::new(console)));
        for (module, level) in &self.module_levels {
            builder = builder.logger(Logger::builder().build(module.clone(), *level));
        }

        let root = Root::builder()
            .appender("console")
            .build(self.global_log_level);
        let config = match builder.build(root) {
            Ok(config) => config,
            Err(e) => panic!("invalid logger configuration: {e}"),
        };

        if let Some(handle) = &self.root_handle {
            handle.set_config(config);
        } else {
            match log4rs::init_config(config) {
                Ok(handle) => self.root_handle = Some(handle),
                // Another logger owns the process (e.g. a test harness); keep the level in sync.
                Err(_) => log::set_max_level(self.global_log_level),
            }
        }
    }
}
