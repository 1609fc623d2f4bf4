use crate::error::{Result, ScanError};
use crate::fetch::Fetcher;
use crate::links::LinkExtractor;
use crate::page::PageNode;
use crate::registry::PathRegistry;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

pub type ProgressCallback = Arc<dyn Fn(CrawlProgress) + Send + Sync>;

/// What happens to the run when a single page cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// The first fetch failure aborts the whole crawl.
    #[default]
    FailFast,
    /// The failed page is kept in the tree with its error and no children.
    Isolate,
}

/// Counters reported after every fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlProgress {
    pub discovered: usize,
    pub in_flight: usize,
    pub completed: usize,
}

#[derive(Default)]
struct Counters {
    in_flight: AtomicUsize,
    completed: AtomicUsize,
}

/// Recursive, concurrent link-discovery crawler.
///
/// Cloning is cheap; clones share the registry, the fetch permits and the
/// progress counters.
#[derive(Clone)]
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    registry: Arc<PathRegistry>,
    permits: Arc<Semaphore>,
    max_in_flight: usize,
    failure_policy: FailurePolicy,
    progress_callback: Option<ProgressCallback>,
    counters: Arc<Counters>,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn Fetcher>, extractor: Arc<dyn LinkExtractor>) -> Self {
        Self {
            fetcher,
            extractor,
            registry: Arc::new(PathRegistry::new()),
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_IN_FLIGHT)),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            failure_policy: FailurePolicy::default(),
            progress_callback: None,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_registry(mut self, registry: Arc<PathRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Caps the number of fetches running at once. Zero is treated as one.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self.permits = Arc::new(Semaphore::new(self.max_in_flight));
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn registry(&self) -> &Arc<PathRegistry> {
        &self.registry
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Crawls the whole site starting from the root page (the empty path).
    pub async fn crawl_site(&self) -> Result<PageNode> {
        info!(
            "Starting crawl with at most {} fetches in flight",
            self.max_in_flight
        );

        self.registry.add("");
        let root = self.crawl("").await?;

        info!(
            "Crawl complete. Discovered {} pages, {} in tree",
            self.registry.count(),
            root.page_count()
        );
        Ok(root)
    }

    /// Fetches `path`, then crawls every newly discovered link concurrently.
    ///
    /// `path` itself is expected to be registered already; children are
    /// registered here before their tasks are spawned.
    pub fn crawl(&self, path: impl Into<String>) -> BoxFuture<'static, Result<PageNode>> {
        let crawler = self.clone();
        let path = path.into();
        Box::pin(async move { crawler.crawl_page(path).await })
    }

    async fn crawl_page(self, path: String) -> Result<PageNode> {
        let mut node = PageNode::new(path);

        let body = match self.fetch_bounded(&node.path).await {
            Ok(body) => body,
            Err(e) if self.failure_policy == FailurePolicy::Isolate => {
                warn!("Crawl error for '{}': {}", node.path, e);
                node.error = Some(e.to_string());
                return Ok(node);
            }
            Err(e) => return Err(e),
        };

        let targets = self.claim_links(&body);
        node.content = Some(body);

        if targets.is_empty() {
            return Ok(node);
        }

        debug!("'{}' spawning {} child crawls", node.path, targets.len());

        let mut tasks = JoinSet::new();
        for target in targets {
            tasks.spawn(self.crawl(target));
        }

        // Dropping `tasks` on an early return aborts the remaining siblings.
        while let Some(joined) = tasks.join_next().await {
            let child = joined??;
            node.children.push(child);
        }

        Ok(node)
    }

    /// Extracts links from `document` and registers the ones nobody has
    /// claimed yet. Only the returned paths may be crawled by the caller.
    fn claim_links(&self, document: &str) -> Vec<String> {
        let mut seen_on_page = HashSet::new();

        self.extractor
            .extract_links(document)
            .into_iter()
            .filter(|link| !link.is_empty())
            .filter(|link| seen_on_page.insert(link.clone()))
            .filter(|link| self.registry.insert_if_absent(link))
            .collect()
    }

    async fn fetch_bounded(&self, path: &str) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ScanError::Other(format!("fetch permits closed: {}", e)))?;

        self.counters.in_flight.fetch_add(1, Ordering::SeqCst);
        let result = self.fetcher.fetch(path).await;
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.counters.completed.fetch_add(1, Ordering::SeqCst);

        self.report_progress();
        result
    }

    fn report_progress(&self) {
        if let Some(ref callback) = self.progress_callback {
            callback(CrawlProgress {
                discovered: self.registry.count(),
                in_flight: self.counters.in_flight.load(Ordering::SeqCst),
                completed: self.counters.completed.load(Ordering::SeqCst),
            });
        }
    }
}
