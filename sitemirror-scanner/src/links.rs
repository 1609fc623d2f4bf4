use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href]").unwrap_or_else(|e| panic!("invalid anchor selector: {e}"))
});

/// Pulls candidate link targets out of a fetched document.
pub trait LinkExtractor: Send + Sync {
    fn extract_links(&self, document: &str) -> Vec<String>;
}

/// [`LinkExtractor`] that reads `<a href>` targets and keeps the ones under
/// the site root, normalised to Link Paths.
pub struct HrefExtractor {
    base_url: Url,
}

impl HrefExtractor {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }
}

impl LinkExtractor for HrefExtractor {
    fn extract_links(&self, document: &str) -> Vec<String> {
        let document = Html::parse_document(document);
        let mut links = Vec::new();

        for element in document.select(&ANCHOR_SELECTOR) {
            if let Some(href) = element.value().attr("href") {
                match normalize_link_path(&self.base_url, href) {
                    Some(path) => links.push(path),
                    None => debug!("Skipping off-site link: {}", href),
                }
            }
        }

        links
    }
}

/// Resolves `href` against `base` and returns its path relative to `base`.
///
/// Returns `None` for non-navigational hrefs and for anything on another host
/// or outside the base path. The root page maps to the empty string.
pub fn normalize_link_path(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    if resolved.scheme() != base.scheme()
        || resolved.host_str() != base.host_str()
        || resolved.port_or_known_default() != base.port_or_known_default()
    {
        return None;
    }

    let relative = resolved.path().strip_prefix(base.path()).or_else(|| {
        // The base path itself without its trailing slash.
        (resolved.path() == base.path().trim_end_matches('/')).then_some("")
    })?;

    Some(relative.trim_matches('/').to_string())
}
