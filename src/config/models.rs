//! Configuration data structures for crawlgate.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files. They are
//! serde‑friendly and carry defaults so that a minimal config can be empty.
//! File based configuration only expresses literal rules; embed the library and use
//! [`RobotsConfig`](crate::config::RobotsConfig) for dynamic values and producers.
use std::path::PathBuf;

use serde::Deserialize;

use crate::core::rule::RuleSpecification;

/// Ten minutes, in milliseconds.
pub const DEFAULT_CACHE_TIME_MS: u64 = 1000 * 60 * 10;

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_cache_time() -> u64 {
    DEFAULT_CACHE_TIME_MS
}

fn default_dot() -> String {
    ".".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_generate_dir() -> String {
    "dist".to_string()
}

fn default_file_name() -> String {
    "robots.txt".to_string()
}

/// Logging options, applied when the binary initializes tracing.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Rule specification; omitted means `{UserAgent: '*', Disallow: '/'}`.
    #[serde(default)]
    pub robots: Option<RuleSpecification>,
    /// Lifetime of the per-request specification cache, in milliseconds.
    /// `0` keeps the first loaded specification for the life of the process.
    #[serde(default = "default_cache_time")]
    pub cache_time: u64,
    /// Directory the generated file is written under (joined with `generate_dir`).
    #[serde(default = "default_dot")]
    pub root_dir: String,
    /// Directory holding `static_dir`.
    #[serde(default = "default_dot")]
    pub src_dir: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    #[serde(default = "default_generate_dir")]
    pub generate_dir: String,
    /// File name of both the static source and the generated output, and the
    /// path the document is served under.
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Create a new server configuration builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// `<src_dir>/<static_dir>/<file_name>`
    pub fn static_file_path(&self) -> PathBuf {
        PathBuf::from(&self.src_dir)
            .join(&self.static_dir)
            .join(&self.file_name)
    }

    /// `<root_dir>/<generate_dir>/<file_name>`
    pub fn output_file_path(&self) -> PathBuf {
        PathBuf::from(&self.root_dir)
            .join(&self.generate_dir)
            .join(&self.file_name)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            robots: None,
            cache_time: DEFAULT_CACHE_TIME_MS,
            root_dir: default_dot(),
            src_dir: default_dot(),
            static_dir: default_static_dir(),
            generate_dir: default_generate_dir(),
            file_name: default_file_name(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Builder for ServerConfig to allow for cleaner configuration creation
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the literal rule specification
    pub fn robots(mut self, robots: impl Into<RuleSpecification>) -> Self {
        self.config.robots = Some(robots.into());
        self
    }

    /// Set the cache lifetime in milliseconds
    pub fn cache_time(mut self, millis: u64) -> Self {
        self.config.cache_time = millis;
        self
    }

    pub fn root_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.root_dir = dir.into();
        self
    }

    pub fn src_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.src_dir = dir.into();
        self
    }

    pub fn static_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.static_dir = dir.into();
        self
    }

    pub fn generate_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.generate_dir = dir.into();
        self
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.config.file_name = name.into();
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Build the final ServerConfig
    pub fn build(self) -> ServerConfig {
        self.config
    }
}
