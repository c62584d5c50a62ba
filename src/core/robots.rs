//! The robots service: ties the static rules file, the configured
//! specification, the resolver and the single-flight cache together.
//!
//! Two passes share one configuration:
//!
//! - the **build pass** resolves the specification once with no request
//!   context and writes `static + dynamic` rules to the output file;
//! - the **serve pass** resolves the cached specification for every request,
//!   so dynamic values see the request, and answers with the same layout.
use std::{path::PathBuf, sync::Arc};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use eyre::WrapErr;
use thiserror::Error;

use crate::{
    config::robots::{RobotsConfig, RobotsOption},
    core::{
        cache::{BoxError, CacheError, SingleFlightCache},
        render::render,
        resolver::{ResolveError, RuleResolver},
        rule::{DynamicError, RequestContext, ResolvedRule, RuleItem, RuleSet, RuleSpecification},
        static_file::parse_static_file,
    },
    ports::{
        file_system::{FileReader, FileSystemError, FileWriter},
        lifecycle::BuildLifecycle,
    },
};

/// The one key the specification is cached under.
pub const ROBOTS_CACHE_KEY: &str = "robots";

/// A specification producer failed.
#[derive(Error, Debug)]
#[error("failed to produce rule specification: {0}")]
pub struct LoadError(#[source] pub DynamicError);

/// Errors surfaced by [`RobotsService`]
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RobotsError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("file system error: {0}")]
    FileSystem(#[from] FileSystemError),
}

/// Turn the configured option into a concrete specification.
///
/// A single mapping, configured or produced, is laid over the defaults. A list
/// is taken as is. An omitted option yields exactly the defaults.
pub async fn load_specification(option: &RobotsOption) -> Result<RuleSpecification, LoadError> {
    let spec = match option {
        RobotsOption::Omitted => return Ok(RuleSpecification::Single(RuleItem::defaults())),
        RobotsOption::Mapping(item) => RuleSpecification::Single(item.clone()),
        RobotsOption::List(items) => RuleSpecification::List(items.clone()),
        RobotsOption::Producer(producer) => producer.produce().await.map_err(LoadError)?,
    };

    Ok(match spec {
        RuleSpecification::Single(item) => RuleSpecification::Single(item.merged_over_defaults()),
        list @ RuleSpecification::List(_) => list,
    })
}

pub struct RobotsService {
    config: Arc<RobotsConfig>,
    resolver: RuleResolver,
    build_spec: Arc<RuleSpecification>,
    static_rules: ArcSwap<RuleSet>,
    cache: SingleFlightCache<&'static str, Arc<RuleSpecification>>,
    reader: Arc<dyn FileReader>,
    writer: Arc<dyn FileWriter>,
}

impl RobotsService {
    /// Load the build-time specification and set up the request cache.
    ///
    /// A producer runs here once, then again on every cache load.
    pub async fn initialize(
        config: impl Into<Arc<RobotsConfig>>,
        reader: Arc<dyn FileReader>,
        writer: Arc<dyn FileWriter>,
    ) -> Result<Self, RobotsError> {
        let config = config.into();
        let build_spec = Arc::new(load_specification(&config.robots).await?);

        let robots = config.robots.clone();
        let cache = SingleFlightCache::new(config.cache_time, move |_key: &'static str| {
            let robots = robots.clone();
            async move {
                load_specification(&robots)
                    .await
                    .map(Arc::new)
                    .map_err(|e| Box::new(e) as BoxError)
            }
        });

        tracing::info!(
            items = build_spec.items().len(),
            cache_time = ?config.cache_time,
            serve_path = %config.serve_path(),
            "robots service initialized"
        );

        Ok(Self {
            config,
            resolver: RuleResolver::new(),
            build_spec,
            static_rules: ArcSwap::from_pointee(RuleSet::new()),
            cache,
            reader,
            writer,
        })
    }

    pub fn config(&self) -> &RobotsConfig {
        &self.config
    }

    /// Rules from the static file, as of the last [`load_static_rules`](Self::load_static_rules).
    pub fn static_rules(&self) -> Arc<RuleSet> {
        self.static_rules.load_full()
    }

    /// Read, parse and resolve the static rules file. A missing file leaves
    /// no static rules. Returns the number of rules loaded.
    pub async fn load_static_rules(&self) -> Result<usize, RobotsError> {
        let path = &self.config.static_file;
        let rules = match self.reader.read_text(path).await? {
            Some(content) => {
                let items = parse_static_file(&content);
                self.resolver.resolve_items(&items, None).await?
            }
            None => {
                tracing::debug!(path = %path.display(), "no static rules file");
                RuleSet::new()
            }
        };

        let count = rules.len();
        self.static_rules.store(Arc::new(rules));
        tracing::info!(path = %path.display(), rules = count, "static rules loaded");
        Ok(count)
    }

    /// The build-time document: static rules, then the specification resolved
    /// without a request.
    pub async fn render_build(&self) -> Result<String, RobotsError> {
        let rules = self.resolver.resolve(&self.build_spec, None).await?;
        Ok(self.compose(&rules))
    }

    /// Render the build-time document and write it to the output file.
    pub async fn generate(&self) -> Result<PathBuf, RobotsError> {
        let document = self.render_build().await?;
        let path = self.config.output_file.clone();
        self.writer.write_text(&path, &document).await?;
        tracing::info!(path = %path.display(), bytes = document.len(), "robots file generated");
        Ok(path)
    }

    /// The document for one request. Any failure fails the whole document.
    pub async fn render_for_request(&self, context: &RequestContext) -> Result<String, RobotsError> {
        let spec = self.cache.get(&ROBOTS_CACHE_KEY).await?;
        let rules = self.resolver.resolve(&spec, Some(context)).await?;
        Ok(self.compose(&rules))
    }

    /// Drop the cached specification so the next request reloads it.
    pub async fn invalidate(&self) -> bool {
        self.cache.invalidate(&ROBOTS_CACHE_KEY).await
    }

    fn compose(&self, dynamic: &[ResolvedRule]) -> String {
        let static_rules = self.static_rules.load();
        let mut rules = Vec::with_capacity(static_rules.len() + dynamic.len());
        rules.extend(static_rules.iter().cloned());
        rules.extend_from_slice(dynamic);
        render(&rules)
    }
}

#[async_trait]
impl BuildLifecycle for RobotsService {
    async fn on_before_build(&self) -> eyre::Result<()> {
        self.load_static_rules().await.wrap_err_with(|| {
            format!(
                "Failed to load static rules from {}",
                self.config.static_file.display()
            )
        })?;
        Ok(())
    }

    async fn on_generate_done(&self) -> eyre::Result<()> {
        self.generate().await.wrap_err_with(|| {
            format!(
                "Failed to generate {}",
                self.config.output_file.display()
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        path::Path,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use super::*;
    use crate::{
        core::rule::RuleValue,
        ports::file_system::FileSystemResult,
    };

    #[derive(Default)]
    struct MemoryFs {
        files: Mutex<HashMap<PathBuf, String>>,
    }

    impl MemoryFs {
        fn with_file(path: &str, content: &str) -> Arc<Self> {
            let fs = Self::default();
            fs.files
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), content.to_string());
            Arc::new(fs)
        }

        fn get(&self, path: &Path) -> Option<String> {
            self.files.lock().unwrap().get(path).cloned()
        }
    }

    #[async_trait]
    impl FileReader for MemoryFs {
        async fn read_text(&self, path: &Path) -> FileSystemResult<Option<String>> {
            Ok(self.get(path))
        }
    }

    #[async_trait]
    impl FileWriter for MemoryFs {
        async fn write_text(&self, path: &Path, content: &str) -> FileSystemResult<()> {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), content.to_string());
            Ok(())
        }
    }

    async fn service(config: RobotsConfig, fs: Arc<MemoryFs>) -> RobotsService {
        RobotsService::initialize(config, fs.clone(), fs)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_omitted_blocks_everything() {
        let svc = service(RobotsConfig::default(), Arc::new(MemoryFs::default())).await;
        assert_eq!(
            svc.render_build().await.unwrap(),
            "User-agent: *\nDisallow: /"
        );
    }

    #[tokio::test]
    async fn test_mapping_is_merged_over_defaults() {
        let config = RobotsConfig::builder()
            .robots(RuleItem::new().with("Disallow", "/admin"))
            .build();
        let svc = service(config, Arc::new(MemoryFs::default())).await;
        assert_eq!(
            svc.render_build().await.unwrap(),
            "User-agent: *\nDisallow: /admin"
        );
    }

    #[tokio::test]
    async fn test_list_gets_no_defaults() {
        let config = RobotsConfig::builder()
            .robots(vec![
                RuleItem::new().with("Disallow", "/admin"),
                RuleItem::new().with("Allow", vec!["/css", "/js"]),
            ])
            .build();
        let svc = service(config, Arc::new(MemoryFs::default())).await;
        assert_eq!(
            svc.render_build().await.unwrap(),
            "Disallow: /admin\nAllow: /css\nAllow: /js"
        );
    }

    #[tokio::test]
    async fn test_static_rules_come_first() {
        let fs = MemoryFs::with_file(
            "./static/robots.txt",
            "User-agent: *\nDisallow: /private\nnot a rule\n",
        );
        let config = RobotsConfig::builder()
            .robots(vec![RuleItem::new().with("Sitemap", "https://example.com/sitemap.xml")])
            .build();
        let svc = service(config, fs).await;

        assert_eq!(svc.load_static_rules().await.unwrap(), 2);
        assert_eq!(
            svc.render_build().await.unwrap(),
            "User-agent: *\nDisallow: /private\nSitemap: https://example.com/sitemap.xml"
        );
    }

    #[tokio::test]
    async fn test_missing_static_file_is_empty() {
        let svc = service(RobotsConfig::default(), Arc::new(MemoryFs::default())).await;
        assert_eq!(svc.load_static_rules().await.unwrap(), 0);
        assert!(svc.static_rules().is_empty());
    }

    #[tokio::test]
    async fn test_lifecycle_generates_output_file() {
        let fs = MemoryFs::with_file("./static/robots.txt", "Disallow: /tmp");
        let config = RobotsConfig::builder()
            .robots(vec![RuleItem::new().with("Host", "example.com")])
            .output_file("out/robots.txt")
            .build();
        let svc = service(config, fs.clone()).await;

        svc.on_before_build().await.unwrap();
        svc.on_generate_done().await.unwrap();

        assert_eq!(
            fs.get(Path::new("out/robots.txt")).as_deref(),
            Some("Disallow: /tmp\nHost: example.com")
        );
    }

    #[tokio::test]
    async fn test_request_context_reaches_dynamic_values() {
        let sitemap = RuleValue::from_fn(|context: Option<&RequestContext>| {
            let host = context
                .and_then(|c| c.host.clone())
                .unwrap_or_else(|| "example.com".to_string());
            format!("https://{host}/sitemap.xml")
        });
        let config = RobotsConfig::builder()
            .robots(vec![RuleItem::new().with("Sitemap", sitemap)])
            .build();
        let svc = service(config, Arc::new(MemoryFs::default())).await;

        assert_eq!(
            svc.render_build().await.unwrap(),
            "Sitemap: https://example.com/sitemap.xml"
        );
        let context = RequestContext::new("/robots.txt").with_host("shop.test");
        assert_eq!(
            svc.render_for_request(&context).await.unwrap(),
            "Sitemap: https://shop.test/sitemap.xml"
        );
    }

    #[tokio::test]
    async fn test_failing_dynamic_value_fails_request() {
        let broken = RuleValue::dynamic(|_context| async {
            Err::<RuleValue, DynamicError>("backend down".into())
        });
        let config = RobotsConfig::builder()
            .robots(vec![RuleItem::new().with("Disallow", broken)])
            .build();
        let svc = service(config, Arc::new(MemoryFs::default())).await;

        let err = svc
            .render_for_request(&RequestContext::new("/robots.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, RobotsError::Resolve(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_producer_runs_per_cache_load() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let config = RobotsConfig::builder()
            .producer(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Ok(RuleSpecification::Single(
                        RuleItem::new().with("CrawlDelay", n as u64),
                    ))
                }
            })
            .cache_time(Duration::from_secs(60))
            .build();
        let svc = service(config, Arc::new(MemoryFs::default())).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let context = RequestContext::new("/robots.txt");
        let first = svc.render_for_request(&context).await.unwrap();
        let second = svc.render_for_request(&context).await.unwrap();
        assert_eq!(first, "User-agent: *\nCrawl-delay: 2\nDisallow: /");
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tokio::time::advance(Duration::from_secs(61)).await;
        let third = svc.render_for_request(&context).await.unwrap();
        assert_eq!(third, "User-agent: *\nCrawl-delay: 3\nDisallow: /");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_reloads_never_expiring_spec() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let config = RobotsConfig::builder()
            .producer(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Ok(RuleSpecification::Single(
                        RuleItem::new().with("CrawlDelay", n as u64),
                    ))
                }
            })
            .cache_time(Duration::ZERO)
            .build();
        let svc = service(config, Arc::new(MemoryFs::default())).await;
        let context = RequestContext::new("/robots.txt");

        let first = svc.render_for_request(&context).await.unwrap();
        tokio::time::advance(Duration::from_secs(60 * 60 * 24 * 30)).await;
        assert_eq!(svc.render_for_request(&context).await.unwrap(), first);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(svc.invalidate().await);
        assert!(!svc.invalidate().await);
        let reloaded = svc.render_for_request(&context).await.unwrap();
        assert_eq!(reloaded, "User-agent: *\nCrawl-delay: 3\nDisallow: /");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failing_producer_fails_initialize() {
        let config = RobotsConfig::builder()
            .producer(|| async { Err::<RuleSpecification, DynamicError>("no spec".into()) })
            .build();
        let fs = Arc::new(MemoryFs::default());
        let result = RobotsService::initialize(config, fs.clone(), fs).await;
        assert!(matches!(result, Err(RobotsError::Load(_))));
    }
}
