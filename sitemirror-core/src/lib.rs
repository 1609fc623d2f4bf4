pub mod config;
pub mod error;
pub mod index;
pub mod materialize;
pub mod mirror;
pub mod report;

pub use config::MirrorConfig;
pub use error::{MirrorError, Phase};
pub use index::{DirectoryIndex, IndexEntry, IndexKind};
pub use materialize::{MaterializeStats, Materializer, WriteOutcome, WriteProgress};
pub use mirror::{MirrorOptions, MirrorProgressCallback, MirrorSummary, execute_mirror, run_mirror};
pub use report::ReportFormat;
