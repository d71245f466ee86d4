//! Logging utilities and configuration for Strata.
//!
//! Strata emits structured `tracing` events: one `debug` event per scheme
//! group dispatched and per cube rejected by a callback, an `info` summary
//! per load call and a `warn` event when a load mode's cardinality check
//! fails. Installing a subscriber is left to the application; [`setup`]
//! provides a ready-made one.

/// Controls how much the loading pipeline logs.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether to log the constraint text of failed cardinality checks
    pub log_constraint_details: bool,
    /// Whether to emit a summary event for every load call
    pub log_data_operations: bool,
    /// Maximum length for logged field values (to prevent huge logs)
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_constraint_details: false,
            log_data_operations: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            log_constraint_details: true,
            log_data_operations: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production with lowest overhead.
    pub fn production() -> Self {
        Self {
            log_constraint_details: false,
            log_data_operations: false,
            max_field_length: 128,
        }
    }
}

/// Truncates a string to at most `max_length` characters.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    match value.char_indices().nth(max_length) {
        None => value.to_string(),
        Some((end, _)) => format!("{}...(truncated)", &value[..end]),
    }
}

/// Utilities for installing a `tracing` subscriber.
pub mod setup {
    use crate::config::SiteConfig;
    use tracing::Level;

    /// Configuration for Strata's logging setup.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for the application
        pub level: Level,
        /// Log level for Strata components specifically
        pub strata_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                strata_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for production use.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                strata_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                strata_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Sets whether to use JSON output format.
        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Sets a custom environment filter.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},strata={}",
                    self.level.as_str().to_lowercase(),
                    self.strata_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Installs a global subscriber and records the library version.
    ///
    /// `RUST_LOG` takes precedence over the configured filter. Fails if a
    /// global subscriber is already installed.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use strata::logging::setup::{LoggingConfig, init_logging};
    ///
    /// let config = LoggingConfig::development().with_json_format(true);
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

        log_import(SiteConfig::global());
        Ok(())
    }

    /// Records the library version for the site's import logger, if one is
    /// configured. Returns whether an event was emitted.
    pub fn log_import(site: &SiteConfig) -> bool {
        match site.import_logger.as_deref() {
            Some(logger) => {
                tracing::info!(target: "strata::import", logger, version = crate::VERSION, "strata {}", crate::VERSION);
                true
            }
            None => false,
        }
    }
}
