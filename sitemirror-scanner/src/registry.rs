use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// Set of Link Paths already discovered during one crawl run.
///
/// Shared between crawl branches behind an `Arc`. It only ever grows; there
/// is no removal.
#[derive(Debug, Default)]
pub struct PathRegistry {
    seen: Mutex<HashSet<String>>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().contains(path)
    }

    pub fn add(&self, path: impl Into<String>) {
        self.lock().insert(path.into());
    }

    /// Registers `path` and reports whether this call inserted it.
    ///
    /// The check and the insert happen under one lock, so among any number of
    /// concurrent callers exactly one sees `true` for a given path.
    pub fn insert_if_absent(&self, path: &str) -> bool {
        let mut seen = self.lock();
        if seen.contains(path) {
            false
        } else {
            seen.insert(path.to_string())
        }
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Sorted copy of every registered path.
    pub fn snapshot(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.lock().iter().cloned().collect();
        paths.sort();
        paths
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // A panic while holding the lock cannot leave the set half-updated.
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
