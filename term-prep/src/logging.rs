//! Logging configuration for term-prep.
//!
//! Profiling and loading touch every row of a potentially large file, so the
//! noisy messages (per-cell data errors, per-stage pipeline chatter) can be
//! switched off on their own. Installing a subscriber is left to binaries;
//! see [`setup`].

/// What the profiler and the loading pipeline log beyond the essentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Log every rejected cell as a warning
    pub log_data_errors: bool,
    /// Log each pipeline stage as it is added
    pub log_pipeline_stages: bool,
    /// Longest message logged in full
    pub max_message_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_data_errors: true,
            log_pipeline_stages: true,
            max_message_length: 256,
        }
    }
}

impl LogConfig {
    /// Everything, with long messages kept nearly whole.
    pub fn verbose() -> Self {
        Self {
            max_message_length: 4096,
            ..Self::default()
        }
    }

    /// Only what is needed to diagnose a failed run.
    pub fn quiet() -> Self {
        Self {
            log_data_errors: false,
            log_pipeline_stages: false,
            max_message_length: 128,
        }
    }
}

/// Logs a pipeline stage at debug level when the configuration asks for it.
#[macro_export]
macro_rules! log_stage {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_pipeline_stages {
            tracing::debug!($($arg)*);
        }
    };
}

/// Shortens `message` to at most `max_len` bytes, on a char boundary.
pub fn truncate_message(message: &str, max_len: usize) -> std::borrow::Cow<'_, str> {
    if message.len() <= max_len {
        return message.into();
    }
    let mut end = max_len;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...({} bytes)", &message[..end], message.len()).into()
}

/// Installing the process-wide `tracing` subscriber.
pub mod setup {
    use tracing::Level;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    /// Output format of the fmt layer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum LogFormat {
        #[default]
        Text,
        Json,
    }

    /// Subscriber settings. `RUST_LOG` takes precedence when set.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Level for every crate but term-prep
        pub level: Level,
        /// Level for term-prep itself
        pub prep_level: Level,
        pub format: LogFormat,
        /// Complete filter directive replacing the two levels
        pub directive: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::WARN,
                prep_level: Level::INFO,
                format: LogFormat::Text,
                directive: None,
            }
        }
    }

    impl LoggingConfig {
        /// Debug output from term-prep, warnings from everything else.
        pub fn debug() -> Self {
            Self {
                prep_level: Level::DEBUG,
                ..Self::default()
            }
        }

        /// Warnings and errors only.
        pub fn quiet() -> Self {
            Self {
                prep_level: Level::WARN,
                ..Self::default()
            }
        }

        pub fn with_format(mut self, format: LogFormat) -> Self {
            self.format = format;
            self
        }

        pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
            self.directive = Some(directive.into());
            self
        }

        /// Filter directive used when `RUST_LOG` is unset.
        pub fn directive(&self) -> String {
            match &self.directive {
                Some(d) => d.clone(),
                None => format!(
                    "{},term_prep={}",
                    self.level.as_str().to_lowercase(),
                    self.prep_level.as_str().to_lowercase()
                ),
            }
        }
    }

    /// Installs a subscriber writing to stderr, leaving stdout to the
    /// command's own output.
    ///
    /// ```rust,no_run
    /// use term_prep::logging::setup::{init_logging, LogFormat, LoggingConfig};
    ///
    /// init_logging(&LoggingConfig::debug().with_format(LogFormat::Json)).unwrap();
    /// ```
    pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(config.directive()))?;

        let layer = match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed(),
            LogFormat::Text => tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed(),
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::setup::LoggingConfig;
    use super::*;

    #[test]
    fn test_quiet_config_disables_noise() {
        let config = LogConfig::quiet();
        assert!(!config.log_data_errors);
        assert!(!config.log_pipeline_stages);
        assert!(LogConfig::default().log_pipeline_stages);
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("short", 10), "short");
        assert_eq!(
            truncate_message("a rather long message", 8),
            "a rather...(21 bytes)"
        );
        // 'é' is two bytes; a cut at 2 would split it
        assert_eq!(truncate_message("aéb", 2), "a...(4 bytes)");
    }

    #[test]
    fn test_directive() {
        assert_eq!(LoggingConfig::default().directive(), "warn,term_prep=info");
        assert_eq!(LoggingConfig::debug().directive(), "warn,term_prep=debug");
        assert_eq!(
            LoggingConfig::quiet().with_directive("off").directive(),
            "off"
        );
    }
}
