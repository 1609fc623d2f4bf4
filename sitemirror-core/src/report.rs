// Report generation from a finished mirror run

use crate::mirror::MirrorSummary;
use serde::{Deserialize, Serialize};
use sitemirror_scanner::PageNode;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

pub fn generate_report(summary: &MirrorSummary, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(summary)),
        ReportFormat::Json => generate_json_report(summary),
    }
}

pub fn generate_text_report(summary: &MirrorSummary) -> String {
    let mut report = String::new();
    report.push_str(DIVIDER);
    report.push_str("\n\n# Summary:\n");
    report.push_str(&format!("  Site: {}\n", summary.base_url));
    report.push_str(&format!("  Output: {}\n", summary.output_dir.display()));
    report.push_str(&format!("  Pages discovered: {}\n", summary.pages_discovered));
    report.push_str(&format!("  Files written: {}\n", summary.files_written));
    report.push_str(&format!(
        "  Directories created: {} (+{} recovered at write time)\n",
        summary.directories_created, summary.recovered_directories
    ));
    if summary.skipped_collisions > 0 {
        report.push_str(&format!(
            "  Pages skipped (target file already written): {}\n",
            summary.skipped_collisions
        ));
    }
    report.push_str(&format!(
        "  Crawl time: {}ms\n",
        summary.crawl_duration.as_millis()
    ));
    report.push_str(&format!(
        "  Write time: {}ms\n",
        summary.write_duration.as_millis()
    ));

    if !summary.failed_paths.is_empty() {
        report.push_str(&format!("\n# Failed pages ({}):\n", summary.failed_paths.len()));
        for path in &summary.failed_paths {
            report.push_str(&format!("  ✗ /{}\n", path));
        }
    }

    report.push('\n');
    report.push_str(DIVIDER);
    report.push_str("\n\n# Page tree:\n");
    report.push_str(&generate_page_tree(&summary.root));
    report
}

pub fn generate_json_report(summary: &MirrorSummary) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "sitemirror",
                "version": env!("CARGO_PKG_VERSION"),
                "format": "json"
            },
            "site": summary.base_url,
            "output_dir": summary.output_dir,
            "summary": {
                "pages_discovered": summary.pages_discovered,
                "files_written": summary.files_written,
                "directories_created": summary.directories_created,
                "recovered_directories": summary.recovered_directories,
                "skipped_collisions": summary.skipped_collisions,
                "crawl_ms": summary.crawl_duration.as_millis() as u64,
                "write_ms": summary.write_duration.as_millis() as u64
            },
            "discovered_paths": summary.discovered_paths,
            "failed_paths": summary.failed_paths,
            "pages": page_tree_json(&summary.root)
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Box-drawing rendering of the crawled tree, children sorted by path.
pub fn generate_page_tree(root: &PageNode) -> String {
    let mut result = format!("/{}{}\n", root.path, status_suffix(root));
    push_children(root, "", &mut result);
    result
}

fn push_children(node: &PageNode, indent: &str, out: &mut String) {
    let mut children: Vec<&PageNode> = node.children.iter().collect();
    children.sort_by(|a, b| a.path.cmp(&b.path));

    for (i, child) in children.iter().enumerate() {
        let is_last = i == children.len() - 1;
        let (branch, next_indent) = if is_last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        out.push_str(&format!(
            "{}{}/{}{}\n",
            indent,
            branch,
            child.path,
            status_suffix(child)
        ));
        push_children(child, &format!("{}{}", indent, next_indent), out);
    }
}

fn status_suffix(node: &PageNode) -> String {
    match node.error {
        Some(ref error) => format!("  [✗ {}]", error),
        None => String::new(),
    }
}

// Paths only; page bodies stay out of the report.
fn page_tree_json(node: &PageNode) -> serde_json::Value {
    serde_json::json!({
        "path": node.path,
        "error": node.error,
        "children": node.children.iter().map(page_tree_json).collect::<Vec<_>>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn sample_summary() -> MirrorSummary {
        let mut blog = PageNode::new("blog");
        blog.content = Some("<html/>".to_string());
        blog.children.push(PageNode::new("blog/post-2"));
        blog.children.push(PageNode::new("blog/post-1"));

        let mut root = PageNode::new("");
        root.content = Some("<html/>".to_string());
        root.children.push(PageNode::new("about"));
        root.children.push(blog);
        root.children
            .push(PageNode::with_error("broken", "server responded with 500".to_string()));

        MirrorSummary {
            base_url: "https://example.com/".to_string(),
            output_dir: PathBuf::from("/tmp/mirror"),
            root,
            pages_discovered: 6,
            discovered_paths: ["", "about", "blog", "blog/post-1", "blog/post-2", "broken"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            directories_created: 1,
            files_written: 5,
            recovered_directories: 0,
            skipped_collisions: 0,
            failed_paths: vec!["broken".to_string()],
            crawl_duration: Duration::from_millis(1200),
            write_duration: Duration::from_millis(30),
        }
    }

    #[test]
    fn test_report_format_from_str() {
        assert_eq!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::from_str("text"), Some(ReportFormat::Text));
        assert_eq!(ReportFormat::from_str("csv"), None);
    }

    #[test]
    fn test_page_tree_is_sorted_and_nested() {
        let tree = generate_page_tree(&sample_summary().root);

        let expected = "/\n\
                        ├── /about\n\
                        ├── /blog\n\
                        │   ├── /blog/post-1\n\
                        │   └── /blog/post-2\n\
                        └── /broken  [✗ server responded with 500]\n";
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_text_report_contains_summary() {
        let report = generate_text_report(&sample_summary());

        assert!(report.contains("Pages discovered: 6"));
        assert!(report.contains("Files written: 5"));
        assert!(report.contains("Crawl time: 1200ms"));
        assert!(report.contains("Failed pages (1)"));
        assert!(report.contains("✗ /broken"));
        assert!(!report.contains("Pages skipped"));
    }

    #[test]
    fn test_json_report_omits_page_bodies() {
        let json = generate_json_report(&sample_summary()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["report"]["summary"]["files_written"], 5);
        assert_eq!(value["report"]["pages"]["children"][1]["path"], "blog");
        assert_eq!(value["report"]["discovered_paths"][3], "blog/post-1");
        assert_eq!(value["report"]["discovered_paths"].as_array().unwrap().len(), 6);
        assert!(!json.contains("<html/>"));
    }

    #[test]
    fn test_save_report_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");

        save_report("hello", &path).unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }
}
