use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to fetch '{path}': {source}")]
    Fetch {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to fetch '{path}': server responded with {status}")]
    Status { path: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Other error: {0}")]
    Other(String),
}

impl ScanError {
    /// The Link Path the error is attributed to, when there is one.
    pub fn path(&self) -> Option<&str> {
        match self {
            ScanError::Fetch { path, .. } | ScanError::Status { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
