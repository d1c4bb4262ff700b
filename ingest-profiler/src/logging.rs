//! Logging utilities and configuration.
//!
//! The library only emits `tracing` events. Installing a subscriber is left to
//! binaries through [`setup::init_logging`].

use tracing::Level;

/// Runtime logging behaviour for the profiling pipeline.
///
/// Carried by [`PipelineConfig`](crate::config::PipelineConfig) so every
/// runner decides for itself how chatty it is; nothing here is global.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level the binary installs for the `ingest_profiler` target
    pub base_level: Level,
    /// Log truncated excerpts of LLM responses at debug level
    pub log_payloads: bool,
    /// Log object store and repository writes at info level
    pub log_data_operations: bool,
    /// Excerpts longer than this many bytes are cut
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_payloads: false,
            log_data_operations: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Debug level with payload excerpts.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_payloads: true,
            max_field_length: 1024,
            ..Self::default()
        }
    }

    /// Warnings only, no per-operation logs.
    pub fn quiet() -> Self {
        Self {
            base_level: Level::WARN,
            log_data_operations: false,
            max_field_length: 128,
            ..Self::default()
        }
    }

    /// Cuts `value` to [`max_field_length`](Self::max_field_length).
    pub fn excerpt(&self, value: &str) -> String {
        truncate_field(value, self.max_field_length)
    }
}

/// Macro for conditional data operation logging.
#[macro_export]
macro_rules! log_data_op {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_data_operations {
            tracing::info!($($arg)*);
        }
    };
}

/// Truncates a string to the maximum field length if needed.
///
/// Cuts on a character boundary so multi-byte text never panics.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Utilities for setting up structured logging.
pub mod setup {
    use tracing::Level;

    /// Configuration for the process-wide subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        pub level: Level,
        pub profiler_level: Level,
        /// One JSON object per event instead of the human readable layout
        pub json_format: bool,
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                profiler_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Sets the default level for other crates.
        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Sets the level for `ingest_profiler` targets.
        pub fn with_profiler_level(mut self, level: Level) -> Self {
            self.profiler_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Replaces the generated directive string entirely.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Directive string used when `RUST_LOG` is unset.
        pub fn env_filter(&self) -> String {
            match &self.env_filter {
                Some(filter) => filter.clone(),
                None => format!(
                    "{},ingest_profiler={}",
                    self.level.as_str().to_lowercase(),
                    self.profiler_level.as_str().to_lowercase()
                ),
            }
        }
    }

    /// Installs the global subscriber. `RUST_LOG` takes precedence over the config.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use ingest_profiler::logging::setup::{LoggingConfig, init_logging};
    ///
    /// let config = LoggingConfig::default().with_json_format(true);
    /// init_logging(config).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}
