// End-to-end tests for mirror runs against a mock site

use sitemirror_core::mirror::{MirrorOptions, collect_pages, execute_mirror};
use sitemirror_core::{MirrorError, Phase};
use sitemirror_scanner::{FailurePolicy, PageNode};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

async fn mount_page(server: &MockServer, route: &str, links: &[&str]) {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<a href="{}">{}</a>"#, l, l))
        .collect();
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(format!("<html><body>{}</body></html>", anchors)),
        )
        .mount(server)
        .await;
}

async fn mock_site() -> MockServer {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/about", "/blog", "/contact.html"]).await;
    mount_page(&server, "/about", &["/", "/blog/post-1"]).await;
    mount_page(&server, "/blog", &["/blog/post-1", "/blog/post-2"]).await;
    mount_page(&server, "/blog/post-1", &["/blog", "/about"]).await;
    mount_page(&server, "/blog/post-2", &["/blog/2024/recap"]).await;
    mount_page(&server, "/blog/2024/recap", &["/"]).await;
    mount_page(&server, "/contact.html", &[]).await;
    server
}

fn options(base_url: String, output_dir: std::path::PathBuf) -> MirrorOptions {
    MirrorOptions {
        base_url,
        output_dir,
        max_in_flight: 4,
        timeout_secs: 5,
        failure_policy: FailurePolicy::FailFast,
        show_progress_bars: false,
    }
}

// ============================================================================
// Full Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_mirror_writes_site_hierarchy() {
    let server = mock_site().await;
    let out = tempdir().unwrap();
    let root = out.path().join("mirror");

    let summary = execute_mirror(options(server.uri(), root.clone()), None)
        .await
        .unwrap();

    assert_eq!(summary.pages_discovered, 7);
    assert_eq!(
        summary.discovered_paths,
        vec![
            "",
            "about",
            "blog",
            "blog/2024/recap",
            "blog/post-1",
            "blog/post-2",
            "contact.html",
        ]
    );
    assert_eq!(summary.files_written, 7);
    assert!(summary.failed_paths.is_empty());

    for file in [
        "index.html",
        "about.html",
        "blog.html",
        "contact.html",
        "blog/post-1.html",
        "blog/post-2.html",
        "blog/2024/recap.html",
    ] {
        assert!(root.join(file).is_file(), "missing {}", file);
    }

    let about = std::fs::read_to_string(root.join("about.html")).unwrap();
    assert!(about.contains("/blog/post-1"));
}

#[tokio::test]
async fn test_directories_exist_before_writes() {
    let server = mock_site().await;
    let out = tempdir().unwrap();

    let summary = execute_mirror(options(server.uri(), out.path().to_path_buf()), None)
        .await
        .unwrap();

    // "blog" indexes as a page, but blog/2024/ is a directory entry and
    // creating it brings blog/ along before any page is written.
    assert_eq!(summary.directories_created, 1);
    assert!(out.path().join("blog/2024").is_dir());
    assert_eq!(summary.recovered_directories, 0);
}

#[tokio::test]
async fn test_mirror_twice_is_idempotent() {
    let server = mock_site().await;
    let out = tempdir().unwrap();

    execute_mirror(options(server.uri(), out.path().to_path_buf()), None)
        .await
        .unwrap();
    let second = execute_mirror(options(server.uri(), out.path().to_path_buf()), None)
        .await
        .unwrap();

    assert_eq!(second.directories_created, 0);
    assert_eq!(second.files_written, 7);
}

#[tokio::test]
async fn test_progress_messages_cover_each_phase() {
    let server = mock_site().await;
    let out = tempdir().unwrap();
    let messages = Arc::new(Mutex::new(Vec::new()));
    let messages_clone = messages.clone();

    execute_mirror(
        options(server.uri(), out.path().to_path_buf()),
        Some(Arc::new(move |msg: String| {
            messages_clone.lock().unwrap().push(msg);
        })),
    )
    .await
    .unwrap();

    let messages = messages.lock().unwrap();
    assert!(messages.iter().any(|m| m.starts_with("Fetching all pages")));
    assert!(messages.iter().any(|m| m.starts_with("Indexing 7 paths")));
    assert!(messages.iter().any(|m| m.starts_with("Finished writing 7 files")));
}

#[tokio::test]
async fn test_root_and_index_link_share_one_file() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/index.html", "/about"]).await;
    mount_page(&server, "/index.html", &["/"]).await;
    mount_page(&server, "/about", &[]).await;
    let out = tempdir().unwrap();

    let summary = execute_mirror(options(server.uri(), out.path().to_path_buf()), None)
        .await
        .unwrap();

    assert_eq!(summary.pages_discovered, 3);
    assert_eq!(summary.files_written, 2);
    assert_eq!(summary.skipped_collisions, 1);

    // The root page sorts first and keeps index.html
    let index = std::fs::read_to_string(out.path().join("index.html")).unwrap();
    assert!(index.contains("/about"));
}

// ============================================================================
// Failure Policy Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_failure_aborts_run() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/about", "/gone"]).await;
    mount_page(&server, "/about", &[]).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let out = tempdir().unwrap();
    let root = out.path().join("mirror");

    let err = execute_mirror(options(server.uri(), root.clone()), None)
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::Fetch(_)));
    assert_eq!(err.phase(), Some(Phase::Crawl));
    assert!(err.to_string().contains("gone"));
    assert!(!root.exists());
}

#[tokio::test]
async fn test_isolated_failure_writes_the_rest() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &["/about", "/gone"]).await;
    mount_page(&server, "/about", &[]).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let out = tempdir().unwrap();

    let mut opts = options(server.uri(), out.path().to_path_buf());
    opts.failure_policy = FailurePolicy::Isolate;
    let summary = execute_mirror(opts, None).await.unwrap();

    assert_eq!(summary.failed_paths, vec!["gone".to_string()]);
    assert_eq!(summary.files_written, 2);
    assert!(out.path().join("about.html").is_file());
    assert!(!out.path().join("gone.html").exists());
}

#[tokio::test]
async fn test_invalid_base_url_is_rejected() {
    let out = tempdir().unwrap();
    let err = execute_mirror(options("not a url".to_string(), out.path().to_path_buf()), None)
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::Config(_)));
    assert_eq!(err.phase(), None);
}

// ============================================================================
// Page Collection Tests
// ============================================================================

#[test]
fn test_collect_pages_skips_nodes_without_content() {
    let mut root = PageNode::new("");
    root.content = Some("root".to_string());
    let mut about = PageNode::new("about");
    about.content = Some("about".to_string());
    root.children.push(about);
    root.children
        .push(PageNode::with_error("gone", "500".to_string()));

    let pages = collect_pages(&root);

    assert_eq!(
        pages,
        vec![
            ("".to_string(), "root".to_string()),
            ("about".to_string(), "about".to_string()),
        ]
    );
}
