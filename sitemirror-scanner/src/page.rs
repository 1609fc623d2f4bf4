use serde::{Deserialize, Serialize};

/// One crawled page and the pages first discovered from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageNode {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PageNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
            children: Vec::new(),
            error: None,
        }
    }

    pub fn with_error(path: impl Into<String>, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(path)
        }
    }

    /// Every node in the tree, parents before their children.
    pub fn flatten(&self) -> Vec<&PageNode> {
        let mut nodes = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            nodes.push(node);
            stack.extend(node.children.iter().rev());
        }
        nodes
    }

    /// Number of pages in the tree, this one included.
    pub fn page_count(&self) -> usize {
        1 + self.children.iter().map(PageNode::page_count).sum::<usize>()
    }

    /// Height of the tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(PageNode::depth).max().unwrap_or(0)
    }

    pub fn failed_paths(&self) -> Vec<String> {
        self.flatten()
            .into_iter()
            .filter(|node| node.error.is_some())
            .map(|node| node.path.clone())
            .collect()
    }

    pub fn find(&self, path: &str) -> Option<&PageNode> {
        self.flatten().into_iter().find(|node| node.path == path)
    }
}
