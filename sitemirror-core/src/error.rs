use sitemirror_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

/// Stage of a mirror run an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Crawl,
    Index,
    Directories,
    Write,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Crawl => "crawl",
            Phase::Index => "index",
            Phase::Directories => "directory creation",
            Phase::Write => "write",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("crawl phase failed: {0}")]
    Fetch(#[from] ScanError),

    #[error("index consistency error during {phase} of '{path}': {reason}")]
    IndexConsistency {
        phase: Phase,
        path: String,
        reason: String,
    },

    #[error("{phase} phase failed for {}: {source}", path.display())]
    Write {
        phase: Phase,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Other error: {0}")]
    Other(String),
}

impl MirrorError {
    pub fn phase(&self) -> Option<Phase> {
        match self {
            MirrorError::Fetch(_) => Some(Phase::Crawl),
            MirrorError::IndexConsistency { phase, .. } => Some(*phase),
            MirrorError::Write { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
