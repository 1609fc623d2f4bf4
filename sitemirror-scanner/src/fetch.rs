use crate::error::{Result, ScanError};
use futures::future::BoxFuture;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Retrieves the document body for a Link Path.
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// [`Fetcher`] that issues HTTP GET requests against a site base URL.
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
}

impl HttpFetcher {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;

        let client = Client::builder()
            .user_agent("sitemirror/0.1 (https://github.com/trapdoorsec/sitemirror)")
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ScanError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for a Link Path.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ScanError::InvalidUrl(format!("{}/{}: {}", self.base_url, path, e)))
    }

    async fn get(&self, path: &str) -> Result<String> {
        let url = self.url_for(path)?;
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ScanError::Fetch {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| ScanError::Fetch {
            path: path.to_string(),
            source,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.get(path))
    }
}

/// Parses the site root, forcing a trailing slash so relative joins stay under it.
pub fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut url =
        Url::parse(base_url).map_err(|e| ScanError::InvalidUrl(format!("Invalid URL: {}", e)))?;

    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ScanError::InvalidUrl(format!(
            "Invalid URL: {} has no host",
            base_url
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[test]
    fn test_parse_base_url_appends_slash() {
        let url = parse_base_url("https://example.com/docs").unwrap();
        assert_eq!(url.as_str(), "https://example.com/docs/");
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(matches!(
            parse_base_url("not a url"),
            Err(ScanError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_url_for_joins_nested_path() {
        let fetcher = HttpFetcher::new("https://example.com", 5).unwrap();
        assert_eq!(
            fetcher.url_for("blog/post-1").unwrap().as_str(),
            "https://example.com/blog/post-1"
        );
        assert_eq!(fetcher.url_for("").unwrap().as_str(), "https://example.com/");
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/about"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>about</html>"))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(&mock_server.uri(), 5).unwrap();
        let body = fetcher.fetch("about").await.unwrap();

        assert_eq!(body, "<html>about</html>");
    }

    #[tokio::test]
    async fn test_fetch_surfaces_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(&mock_server.uri(), 5).unwrap();
        let err = fetcher.fetch("missing").await.unwrap_err();

        assert!(matches!(err, ScanError::Status { status: 404, .. }));
        assert_eq!(err.path(), Some("missing"));
    }
}
