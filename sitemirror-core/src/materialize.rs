use crate::error::{MirrorError, Phase, Result};
use crate::index::DirectoryIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_OPEN_WRITES: usize = 16;

/// Callback invoked after each page lands on disk.
pub type WriteProgressCallback = Arc<dyn Fn(WriteProgress) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteProgress {
    pub written: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub file: PathBuf,
    /// Directories created on demand because the file's parent was missing.
    pub recovered_dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeStats {
    pub directories_created: usize,
    pub files_written: usize,
    pub recovered_directories: usize,
    /// Pages not written because an earlier page maps to the same file.
    pub skipped_collisions: usize,
}

/// Writes a page tree to disk below `output_root`.
#[derive(Clone)]
pub struct Materializer {
    output_root: PathBuf,
    max_in_flight: usize,
    progress_callback: Option<WriteProgressCallback>,
}

impl Materializer {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            max_in_flight: DEFAULT_MAX_OPEN_WRITES,
            progress_callback: None,
        }
    }

    /// Caps the number of files open for writing at once. Zero is treated as one.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn with_progress_callback(mut self, callback: WriteProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// On-disk file for a Link Path. The root page becomes `index.html`.
    pub fn target_file(&self, path: &str) -> PathBuf {
        let relative = path.trim_matches('/');
        let mut file = if relative.is_empty() {
            "index".to_string()
        } else {
            relative.to_string()
        };
        if !file.ends_with(".html") {
            file.push_str(".html");
        }
        self.output_root.join(file)
    }

    pub async fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.output_root)
            .await
            .map_err(|source| MirrorError::Write {
                phase: Phase::Directories,
                path: self.output_root.clone(),
                source,
            })
    }

    /// Creates every directory entry of `index`, parents first.
    ///
    /// Existing directories are left alone. Returns how many were created.
    pub async fn ensure_directories(&self, index: &DirectoryIndex) -> Result<usize> {
        self.ensure_root().await?;

        let mut created = 0;
        for entry in index.directories() {
            let target = self.output_root.join(entry.full_path());
            if is_dir(&target).await {
                continue;
            }

            fs::create_dir_all(&target)
                .await
                .map_err(|source| MirrorError::Write {
                    phase: Phase::Directories,
                    path: target.clone(),
                    source,
                })?;
            debug!("Created {}", target.display());
            created += 1;
        }

        info!("Ensured {} directories ({} new)", index.directories().len(), created);
        Ok(created)
    }

    /// Writes `content` for the page at `path`.
    ///
    /// A write that fails because the parent directory is missing is retried
    /// once after the missing ancestors have been created.
    pub async fn write_page(&self, path: &str, content: &str) -> Result<WriteOutcome> {
        let file = self.target_file(path);

        match fs::write(&file, content).await {
            Ok(()) => {
                return Ok(WriteOutcome {
                    file,
                    recovered_dirs: Vec::new(),
                });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Parent of {} missing, recovering", file.display());
            }
            Err(source) => {
                return Err(MirrorError::Write {
                    phase: Phase::Write,
                    path: file,
                    source,
                });
            }
        }

        let recovered_dirs = self.recover_missing_parent(path, &file).await?;

        fs::write(&file, content)
            .await
            .map_err(|source| MirrorError::Write {
                phase: Phase::Write,
                path: file.clone(),
                source,
            })?;

        Ok(WriteOutcome {
            file,
            recovered_dirs,
        })
    }

    /// Walks up from the file's parent to the nearest existing ancestor, then
    /// creates the missing directories below it.
    async fn recover_missing_parent(&self, path: &str, file: &Path) -> Result<Vec<PathBuf>> {
        let relative = file.strip_prefix(&self.output_root).unwrap_or(file);
        let ancestors: Vec<&std::ffi::OsStr> = relative
            .parent()
            .map(|parent| parent.iter().collect())
            .unwrap_or_default();

        // Depth 0 is the output root itself.
        let mut depth = ancestors.len();
        loop {
            let candidate = self.ancestor_at(&ancestors, depth);
            if is_dir(&candidate).await {
                break;
            }
            depth = depth
                .checked_sub(1)
                .ok_or_else(|| MirrorError::IndexConsistency {
                    phase: Phase::Write,
                    path: path.to_string(),
                    reason: format!(
                        "impossible depth: no existing ancestor under {}",
                        self.output_root.display()
                    ),
                })?;
        }

        let mut created = Vec::new();
        for missing in depth + 1..=ancestors.len() {
            let dir = self.ancestor_at(&ancestors, missing);
            match fs::create_dir(&dir).await {
                Ok(()) => {
                    debug!("Recovered missing directory {}", dir.display());
                    created.push(dir);
                }
                // Another write recovered it first.
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(source) => {
                    return Err(MirrorError::Write {
                        phase: Phase::Write,
                        path: dir,
                        source,
                    });
                }
            }
        }

        Ok(created)
    }

    fn ancestor_at(&self, ancestors: &[&std::ffi::OsStr], depth: usize) -> PathBuf {
        ancestors[..depth]
            .iter()
            .fold(self.output_root.clone(), |dir, segment| dir.join(segment))
    }

    /// Writes every `(path, content)` pair concurrently, at most
    /// `max_in_flight` at a time. The first failure aborts the remaining writes.
    ///
    /// Each target file is written once. When several paths map to the same
    /// file (`""` and `index.html`, `about` and `about.html`) the first one in
    /// `pages` wins and the rest are skipped.
    pub async fn write_pages(&self, pages: Vec<(String, String)>) -> Result<MaterializeStats> {
        let mut claimed: HashMap<PathBuf, String> = HashMap::new();
        let mut skipped_collisions = 0;
        let mut writes = Vec::with_capacity(pages.len());

        for (path, content) in pages {
            let file = self.target_file(&path);
            if let Some(owner) = claimed.get(&file) {
                warn!(
                    "'{}' maps to {} which is already taken by '{}', skipping",
                    path,
                    file.display(),
                    owner
                );
                skipped_collisions += 1;
                continue;
            }
            claimed.insert(file, path.clone());
            writes.push((path, content));
        }

        let total = writes.len();
        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        let mut tasks = JoinSet::new();

        for (path, content) in writes {
            let materializer = self.clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let _permit = permits
                    .acquire()
                    .await
                    .map_err(|e| MirrorError::Other(format!("write permits closed: {}", e)))?;
                materializer.write_page(&path, &content).await
            });
        }

        let mut stats = MaterializeStats {
            skipped_collisions,
            ..MaterializeStats::default()
        };
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined??;
            stats.files_written += 1;
            stats.recovered_directories += outcome.recovered_dirs.len();

            if let Some(ref callback) = self.progress_callback {
                callback(WriteProgress {
                    written: stats.files_written,
                    total,
                });
            }
        }

        info!(
            "Wrote {} files to {} ({} directories recovered)",
            stats.files_written,
            self.output_root.display(),
            stats.recovered_directories
        );
        Ok(stats)
    }
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}
