//! Runtime configuration for the robots service.
//!
//! [`RobotsConfig`] is built once, from a [`ServerConfig`] or programmatically,
//! and shared by `Arc` with every component. Unlike the file format it can hold
//! dynamic values and a producer for the whole specification.
use std::{fmt, future::Future, path::PathBuf, sync::Arc, time::Duration};

use futures_util::future::{BoxFuture, FutureExt};

use crate::{
    config::models::{DEFAULT_CACHE_TIME_MS, ServerConfig},
    core::rule::{DynamicError, RuleItem, RuleSpecification},
};

type ProducerFn =
    dyn Fn() -> BoxFuture<'static, Result<RuleSpecification, DynamicError>> + Send + Sync;

/// Computes the whole rule specification. Invoked once for the build-time
/// pass and again on every cache load.
#[derive(Clone)]
pub struct SpecProducer(Arc<ProducerFn>);

impl SpecProducer {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RuleSpecification, DynamicError>> + Send + 'static,
    {
        Self(Arc::new(move || f().boxed()))
    }

    pub fn produce(&self) -> BoxFuture<'static, Result<RuleSpecification, DynamicError>> {
        (self.0)()
    }
}

impl fmt::Debug for SpecProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpecProducer(..)")
    }
}

/// The configured `robots` option.
#[derive(Debug, Clone, Default)]
pub enum RobotsOption {
    /// Not configured: block everything for every crawler.
    #[default]
    Omitted,
    /// One mapping, laid over the defaults.
    Mapping(RuleItem),
    /// Independent items; never merged with defaults.
    List(Vec<RuleItem>),
    Producer(SpecProducer),
}

impl From<RuleSpecification> for RobotsOption {
    fn from(spec: RuleSpecification) -> Self {
        match spec {
            RuleSpecification::Single(item) => RobotsOption::Mapping(item),
            RuleSpecification::List(items) => RobotsOption::List(items),
        }
    }
}

impl From<RuleItem> for RobotsOption {
    fn from(item: RuleItem) -> Self {
        RobotsOption::Mapping(item)
    }
}

impl From<Vec<RuleItem>> for RobotsOption {
    fn from(items: Vec<RuleItem>) -> Self {
        RobotsOption::List(items)
    }
}

impl From<SpecProducer> for RobotsOption {
    fn from(producer: SpecProducer) -> Self {
        RobotsOption::Producer(producer)
    }
}

/// Immutable settings consumed by [`RobotsService`](crate::core::RobotsService).
#[derive(Debug, Clone)]
pub struct RobotsConfig {
    pub robots: RobotsOption,
    pub cache_time: Duration,
    /// Optional hand-written rules, read before the build.
    pub static_file: PathBuf,
    /// Where `generate` writes the rendered document.
    pub output_file: PathBuf,
    pub file_name: String,
}

impl RobotsConfig {
    pub fn builder() -> RobotsConfigBuilder {
        RobotsConfigBuilder::default()
    }

    /// Path the document is served under, e.g. `/robots.txt`.
    pub fn serve_path(&self) -> String {
        format!("/{}", self.file_name.trim_start_matches('/'))
    }
}

impl Default for RobotsConfig {
    fn default() -> Self {
        RobotsConfig::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for RobotsConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            robots: config
                .robots
                .clone()
                .map(RobotsOption::from)
                .unwrap_or_default(),
            cache_time: Duration::from_millis(config.cache_time),
            static_file: config.static_file_path(),
            output_file: config.output_file_path(),
            file_name: config.file_name.clone(),
        }
    }
}

/// Builder for [`RobotsConfig`]. Paths default to those of an empty
/// [`ServerConfig`].
pub struct RobotsConfigBuilder {
    config: RobotsConfig,
}

impl Default for RobotsConfigBuilder {
    fn default() -> Self {
        Self {
            config: RobotsConfig {
                robots: RobotsOption::Omitted,
                cache_time: Duration::from_millis(DEFAULT_CACHE_TIME_MS),
                static_file: PathBuf::from("./static/robots.txt"),
                output_file: PathBuf::from("./dist/robots.txt"),
                file_name: "robots.txt".to_string(),
            },
        }
    }
}

impl RobotsConfigBuilder {
    pub fn robots(mut self, robots: impl Into<RobotsOption>) -> Self {
        self.config.robots = robots.into();
        self
    }

    /// Shorthand for a [`SpecProducer`].
    pub fn producer<F, Fut>(self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RuleSpecification, DynamicError>> + Send + 'static,
    {
        self.robots(SpecProducer::new(f))
    }

    pub fn cache_time(mut self, cache_time: Duration) -> Self {
        self.config.cache_time = cache_time;
        self
    }

    pub fn static_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.static_file = path.into();
        self
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_file = path.into();
        self
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.config.file_name = name.into();
        self
    }

    pub fn build(self) -> RobotsConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_server_config() {
        let server = ServerConfig::builder()
            .robots(RuleItem::new().with("Disallow", "/admin"))
            .cache_time(5_000)
            .file_name("robots-dev.txt")
            .build();
        let config = RobotsConfig::from(&server);

        assert!(matches!(config.robots, RobotsOption::Mapping(ref item) if item.len() == 1));
        assert_eq!(config.cache_time, Duration::from_secs(5));
        assert_eq!(config.serve_path(), "/robots-dev.txt");
        assert_eq!(config.output_file, PathBuf::from("./dist/robots-dev.txt"));
    }

    #[test]
    fn test_omitted_by_default() {
        let config = RobotsConfig::default();
        assert!(matches!(config.robots, RobotsOption::Omitted));
        assert_eq!(config.cache_time, Duration::from_millis(600_000));
        assert_eq!(config.serve_path(), "/robots.txt");
    }

    #[test]
    fn test_list_specification_maps_to_list_option() {
        let spec = RuleSpecification::List(vec![RuleItem::new().with("Allow", "/")]);
        assert!(matches!(RobotsOption::from(spec), RobotsOption::List(items) if items.len() == 1));
    }
}
