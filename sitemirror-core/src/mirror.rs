use crate::error::{MirrorError, Result};
use crate::index::DirectoryIndex;
use crate::materialize::{Materializer, WriteProgress};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use sitemirror_scanner::{
    CrawlProgress, Crawler, FailurePolicy, HrefExtractor, HttpFetcher, PageNode, ScanError,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Options for configuring a mirror run
#[derive(Debug)]
pub struct MirrorOptions {
    pub base_url: String,
    pub output_dir: PathBuf,
    pub max_in_flight: usize,
    pub timeout_secs: u64,
    pub failure_policy: FailurePolicy,
    pub show_progress_bars: bool,
}

/// Callback for reporting phase changes of a mirror run
pub type MirrorProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorSummary {
    pub base_url: String,
    pub output_dir: PathBuf,
    pub root: PageNode,
    pub pages_discovered: usize,
    /// Every Link Path the crawl registered, sorted
    pub discovered_paths: Vec<String>,
    pub directories_created: usize,
    pub files_written: usize,
    pub recovered_directories: usize,
    /// Pages whose target file was already claimed by another path
    pub skipped_collisions: usize,
    pub failed_paths: Vec<String>,
    pub crawl_duration: Duration,
    pub write_duration: Duration,
}

/// Every page in the tree that has content, as `(path, content)` pairs
/// sorted by path.
///
/// Child order in the tree depends on which fetch finished first; sorting
/// keeps the index, and so the inferred directory kinds, stable across runs.
pub fn collect_pages(root: &PageNode) -> Vec<(String, String)> {
    let mut pages: Vec<(String, String)> = root
        .flatten()
        .into_iter()
        .filter_map(|node| {
            node.content
                .as_ref()
                .map(|content| (node.path.clone(), content.clone()))
        })
        .collect();
    pages.sort_by(|a, b| a.0.cmp(&b.0));
    pages
}

/// Crawl, index and write the site described by `options`.
pub async fn execute_mirror(
    options: MirrorOptions,
    progress_callback: Option<MirrorProgressCallback>,
) -> Result<MirrorSummary> {
    let MirrorOptions {
        base_url,
        output_dir,
        max_in_flight,
        timeout_secs,
        failure_policy,
        show_progress_bars,
    } = options;

    // A bad base URL is a configuration mistake, not a crawl failure.
    let fetcher = HttpFetcher::new(&base_url, timeout_secs).map_err(|e| match e {
        ScanError::InvalidUrl(reason) => MirrorError::Config(reason),
        other => MirrorError::Fetch(other),
    })?;
    let extractor = HrefExtractor::new(fetcher.base_url().clone());

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let mut crawler = Crawler::new(Arc::new(fetcher), Arc::new(extractor))
        .with_max_in_flight(max_in_flight)
        .with_failure_policy(failure_policy);
    let mut materializer = Materializer::new(output_dir).with_max_in_flight(max_in_flight);

    if let Some(ref pb) = progress_bar {
        let pb_crawl = pb.clone();
        crawler = crawler.with_progress_callback(Arc::new(move |p: CrawlProgress| {
            pb_crawl.set_message(format!(
                "Crawling... {} fetched, {} discovered, {} in flight",
                p.completed, p.discovered, p.in_flight
            ));
        }));

        let pb_write = pb.clone();
        materializer = materializer.with_progress_callback(Arc::new(move |p: WriteProgress| {
            pb_write.set_message(format!("Writing... {}/{} files", p.written, p.total));
        }));
    }

    let result = run_mirror(&base_url, &crawler, &materializer, progress_callback).await;

    if let Some(ref pb) = progress_bar {
        match result {
            Ok(ref summary) => pb.finish_with_message(format!(
                "Mirror complete! {} files written",
                summary.files_written
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    result
}

/// Runs the mirror pipeline with an already configured crawler and
/// materializer.
///
/// Every directory in the index is created before the first page write
/// starts.
pub async fn run_mirror(
    base_url: &str,
    crawler: &Crawler,
    materializer: &Materializer,
    progress_callback: Option<MirrorProgressCallback>,
) -> Result<MirrorSummary> {
    let report = |msg: String| {
        if let Some(ref callback) = progress_callback {
            callback(msg);
        }
    };

    report(format!("Fetching all pages under {}", base_url));
    let crawl_timer = Instant::now();
    let root = crawler.crawl_site().await?;
    let crawl_duration = crawl_timer.elapsed();
    report(format!(
        "Finished fetching {} pages in {}ms",
        root.page_count(),
        crawl_duration.as_millis()
    ));

    let pages = collect_pages(&root);
    report(format!("Indexing {} paths", pages.len()));
    let index = DirectoryIndex::build(pages.iter().map(|(path, _)| path.as_str()))?;

    report(format!(
        "Writing {} files to {}",
        pages.len(),
        materializer.output_root().display()
    ));
    let write_timer = Instant::now();
    let directories_created = materializer.ensure_directories(&index).await?;
    let stats = materializer.write_pages(pages).await?;
    let write_duration = write_timer.elapsed();
    report(format!(
        "Finished writing {} files in {}ms",
        stats.files_written,
        write_duration.as_millis()
    ));

    info!(
        "Mirrored {} pages from {} into {}",
        stats.files_written,
        base_url,
        materializer.output_root().display()
    );

    let discovered_paths = crawler.registry().snapshot();

    Ok(MirrorSummary {
        base_url: base_url.to_string(),
        output_dir: materializer.output_root().to_path_buf(),
        failed_paths: root.failed_paths(),
        pages_discovered: discovered_paths.len(),
        discovered_paths,
        root,
        directories_created,
        files_written: stats.files_written,
        recovered_directories: stats.recovered_directories,
        skipped_collisions: stats.skipped_collisions,
        crawl_duration,
        write_duration,
    })
}
