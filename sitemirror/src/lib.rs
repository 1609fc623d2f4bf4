// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{MirrorArgs, describe_failure, parse_url_line, resolve_config};

// Re-export mirror functionality from sitemirror-core
pub use sitemirror_core::mirror::{
    MirrorOptions, MirrorProgressCallback, MirrorSummary, execute_mirror,
};
