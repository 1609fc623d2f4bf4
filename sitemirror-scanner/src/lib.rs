pub mod crawler;
pub mod error;
pub mod fetch;
pub mod links;
pub mod page;
pub mod registry;

pub use crawler::{CrawlProgress, Crawler, FailurePolicy, ProgressCallback};
pub use error::ScanError;
pub use fetch::{Fetcher, HttpFetcher};
pub use links::{HrefExtractor, LinkExtractor};
pub use page::PageNode;
pub use registry::PathRegistry;
