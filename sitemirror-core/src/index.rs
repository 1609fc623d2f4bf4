// Reconstructs the directory hierarchy implied by a flat list of Link Paths.

use crate::error::{MirrorError, Phase, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    File,
    Directory,
}

/// One path segment placed in the reconstructed tree.
///
/// Identity is `(name, depth)`: two entries with the same name at the same
/// depth are the same node, whatever their lineage or kind.
#[derive(Debug)]
pub struct IndexEntry {
    parent: Option<Weak<IndexEntry>>,
    name: String,
    depth: usize,
    kind: IndexKind,
}

impl IndexEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn parent(&self) -> Option<Arc<IndexEntry>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Segment names from the root down to this entry, joined with `/`.
    pub fn full_path(&self) -> String {
        let mut segments = vec![self.name.clone()];
        let mut current = self.parent();
        while let Some(entry) = current {
            segments.push(entry.name.clone());
            current = entry.parent();
        }
        segments.reverse();
        segments.join("/")
    }
}

impl PartialEq for IndexEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.depth == other.depth
    }
}

impl Eq for IndexEntry {}

impl Hash for IndexEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.depth.hash(state);
    }
}

/// Kind of the segment at `position` in a path of `segment_count` segments.
///
/// A leading segment is a file only when it is the whole path. Any later
/// segment is a file when it carries an extension or ends the path.
pub fn infer_kind(segment: &str, position: usize, segment_count: usize) -> IndexKind {
    let is_last = position + 1 == segment_count;
    if position == 0 {
        if segment_count == 1 {
            IndexKind::File
        } else {
            IndexKind::Directory
        }
    } else if segment.contains('.') || is_last {
        IndexKind::File
    } else {
        IndexKind::Directory
    }
}

/// Set-union of the segment chains of every indexed path.
#[derive(Debug, Default)]
pub struct DirectoryIndex {
    entries: Vec<Arc<IndexEntry>>,
    positions: HashMap<(String, usize), usize>,
}

impl DirectoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes every path in order. The empty root path is skipped.
    pub fn build<I, S>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::new();
        for path in paths {
            index.insert_path(path.as_ref())?;
        }
        Ok(index)
    }

    /// Adds the segment chain of one path. Segments already present under
    /// their `(name, depth)` identity are left untouched.
    pub fn insert_path(&mut self, path: &str) -> Result<()> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        for (depth, segment) in segments.iter().enumerate() {
            if self.get(segment, depth).is_some() {
                continue;
            }

            let parent = match depth.checked_sub(1) {
                None => None,
                Some(parent_depth) => {
                    // Parent is looked up by its full identity, not by name
                    // alone, so a name repeated at another depth cannot be
                    // picked as the parent.
                    let parent_name = segments[parent_depth];
                    let parent = self.get(parent_name, parent_depth).ok_or_else(|| {
                        MirrorError::IndexConsistency {
                            phase: Phase::Index,
                            path: path.to_string(),
                            reason: format!(
                                "segment '{}' at depth {} has no indexed parent '{}'",
                                segment, depth, parent_name
                            ),
                        }
                    })?;
                    Some(Arc::downgrade(parent))
                }
            };

            let entry = IndexEntry {
                parent,
                name: segment.to_string(),
                depth,
                kind: infer_kind(segment, depth, segments.len()),
            };
            self.positions
                .insert((entry.name.clone(), depth), self.entries.len());
            self.entries.push(Arc::new(entry));
        }

        Ok(())
    }

    pub fn get(&self, name: &str, depth: usize) -> Option<&Arc<IndexEntry>> {
        self.positions
            .get(&(name.to_string(), depth))
            .map(|&position| &self.entries[position])
    }

    /// Entries in the order they were first derived.
    pub fn entries(&self) -> &[Arc<IndexEntry>] {
        &self.entries
    }

    /// Directory entries, shallowest first, so parents precede children.
    pub fn directories(&self) -> Vec<Arc<IndexEntry>> {
        let mut directories: Vec<Arc<IndexEntry>> = self
            .entries
            .iter()
            .filter(|entry| entry.kind == IndexKind::Directory)
            .cloned()
            .collect();
        directories.sort_by_key(|entry| entry.depth);
        directories
    }

    pub fn files(&self) -> Vec<Arc<IndexEntry>> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == IndexKind::File)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
