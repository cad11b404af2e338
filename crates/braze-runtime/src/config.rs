//! Configuration schema and loader.
//!
//! Configuration is layered with figment, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. `braze.toml` (or an explicitly given file)
//! 3. Environment variables (`BRAZE_*`, `__` as section separator)
//! 4. Programmatic overrides via [`ConfigLoader::merge`]
//!
//! # Environment Variable Mapping
//!
//! - `BRAZE_HTTP__PORT=9090` → `http.port = 9090`
//! - `BRAZE_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//!
//! # Example
//!
//! ```rust,ignore
//! use braze_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new().load()?;
//!
//! let config = ConfigLoader::new()
//!     .file("config/braze.toml")
//!     .load()?;
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Default configuration file searched in the working directory.
const DEFAULT_CONFIG_FILE: &str = "braze.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrazeConfig {
    /// Webhook HTTP server settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Webhook HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether the webhook server may start at all.
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
}

impl HttpConfig {
    /// The bind address as `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enabled: default_http_enabled(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_http_enabled() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base log level.
    pub level: LogLevel,

    /// Output format.
    pub format: LogFormat,

    /// Output destination.
    pub output: LogOutput,

    /// Log file path, for [`LogOutput::File`].
    pub file_path: Option<PathBuf>,

    /// Per-module level overrides, e.g. `braze_core = "debug"`.
    pub filters: HashMap<String, LogLevel>,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level (default).
    #[default]
    Info,
    /// Warn level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the level as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact single-line format (default).
    #[default]
    Compact,
    /// Full format with all fields.
    Full,
    /// Multi-line human-readable format.
    Pretty,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output (default).
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
    /// A log file; requires `file_path`.
    File,
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: bool,
    overrides: Option<BrazeConfig>,
}

impl ConfigLoader {
    /// Creates a loader with default sources.
    pub fn new() -> Self {
        Self {
            file: None,
            env: true,
            overrides: None,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Merges additional configuration programmatically; highest priority.
    pub fn merge(mut self, config: BrazeConfig) -> Self {
        self.overrides = Some(config);
        self
    }

    /// Loads and merges all configured sources.
    pub fn load(self) -> ConfigResult<BrazeConfig> {
        let mut figment = Figment::from(Serialized::defaults(BrazeConfig::default()));

        match &self.file {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration file");
                figment = figment.merge(Toml::file(path));
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    debug!(path = %path.display(), "loading configuration file");
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        if self.env {
            figment = figment.merge(Env::prefixed("BRAZE_").split("__"));
        }

        if let Some(overrides) = self.overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        figment
            .extract()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Loads configuration from the default sources.
pub fn load_config() -> ConfigResult<BrazeConfig> {
    ConfigLoader::new().load()
}
