//! Page and stylesheet fetcher
//!
//! This module resolves page descriptors into HTML text:
//! - Building the HTTP client with the configured user agent
//! - GET requests with configured headers, plus `Cookie` and `Referer` for
//!   authenticated visits
//! - Error classification (timeout, status, content mismatch, network)
//! - Reporting every HTTP transaction to a [`FetchObserver`]
//! - Reading local files and passing inline HTML through

use crate::crawler::{PageDescriptor, PageKind, SessionState};
use crate::FetchError;
use reqwest::header::{CONTENT_TYPE, COOKIE, REFERER};
use reqwest::{redirect::Policy, Client, RequestBuilder};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default per-request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 4000;

/// User agent sent when none is configured
pub const DEFAULT_USER_AGENT: &str = concat!("stylesweep/", env!("CARGO_PKG_VERSION"));

/// A page resolved into HTML text
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Page body
    pub body: String,
    /// HTTP status code (URL pages only)
    pub status_code: Option<u16>,
    /// Final URL after redirects (URL pages only)
    pub final_url: Option<String>,
    /// Content-Type header value (URL pages only)
    pub content_type: Option<String>,
}

/// Facts about one HTTP transaction, successful or not
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub final_url: Option<String>,
    pub elapsed: Duration,
    pub error: Option<FetchError>,
}

/// Receives every HTTP page fetch exactly once
///
/// Observers run on worker tasks and must be cheap.
pub trait FetchObserver: Send + Sync {
    fn on_response(&self, meta: &ResponseMeta, requested: &str, session: SessionState);
}

impl<F> FetchObserver for F
where
    F: Fn(&ResponseMeta, &str, SessionState) + Send + Sync,
{
    fn on_response(&self, meta: &ResponseMeta, requested: &str, session: SessionState) {
        self(meta, requested, session)
    }
}

/// Observer that logs each transaction
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn on_response(&self, meta: &ResponseMeta, requested: &str, session: SessionState) {
        match &meta.error {
            Some(error) => tracing::warn!(
                "GET {} ({}) failed after {:?}: {}",
                requested,
                session,
                meta.elapsed,
                error
            ),
            None => tracing::debug!(
                "GET {} ({}) -> {} in {:?}",
                requested,
                session,
                meta.status.unwrap_or_default(),
                meta.elapsed
            ),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The User-Agent header value
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use stylesweep::crawler::{build_http_client, DEFAULT_USER_AGENT};
///
/// let client = build_http_client(DEFAULT_USER_AGENT).unwrap();
/// ```
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true if a Content-Type header denotes HTML
fn is_html(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("text/html"))
}

/// Shared, read-only fetch context handed to every worker
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    headers: Vec<(String, String)>,
    timeout: Duration,
    cookie: Option<Arc<str>>,
    observer: Arc<dyn FetchObserver>,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("authenticated", &self.cookie.is_some())
            .finish()
    }
}

impl Fetcher {
    /// Creates a fetcher with the default timeout and a logging observer
    pub fn new(client: Client) -> Self {
        Self {
            client,
            headers: Vec::new(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            cookie: None,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Headers added to every request
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Session cookie sent on authenticated visits
    pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie.filter(|c| !c.is_empty()).map(Arc::from);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Returns true if a session cookie is configured
    pub fn has_cookie(&self) -> bool {
        self.cookie.is_some()
    }

    /// Resolves a descriptor into HTML text
    ///
    /// # Behavior
    ///
    /// | Kind | Action |
    /// |------|--------|
    /// | `Url` | GET, observer notified once; non-2xx, non-HTML and timeouts are errors |
    /// | `FilePath` | read file; a missing file warns and yields an empty body |
    /// | `InlineHtml` | returned verbatim |
    pub async fn fetch_page(&self, descriptor: &PageDescriptor) -> Result<FetchedPage, FetchError> {
        match descriptor.kind {
            PageKind::Url => self.fetch_url(descriptor).await,
            PageKind::FilePath => Ok(read_file(&descriptor.locator).await),
            PageKind::InlineHtml => Ok(FetchedPage {
                body: descriptor.locator.clone(),
                status_code: None,
                final_url: None,
                content_type: None,
            }),
        }
    }

    /// Fetches a remote stylesheet
    ///
    /// Configured headers and the timeout apply; the observer is not notified
    /// and the content type is not checked.
    pub async fn fetch_stylesheet(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .request(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| self.classify(e))
    }

    async fn fetch_url(&self, descriptor: &PageDescriptor) -> Result<FetchedPage, FetchError> {
        let started = Instant::now();
        let result = self.send(descriptor).await;

        let meta = match &result {
            Ok(page) => ResponseMeta {
                status: page.status_code,
                content_type: page.content_type.clone(),
                final_url: page.final_url.clone(),
                elapsed: started.elapsed(),
                error: None,
            },
            Err(error) => ResponseMeta {
                status: error.status(),
                content_type: match error {
                    FetchError::ContentMismatch { content_type, .. } => Some(content_type.clone()),
                    _ => None,
                },
                final_url: None,
                elapsed: started.elapsed(),
                error: Some(error.clone()),
            },
        };
        self.observer
            .on_response(&meta, &descriptor.locator, descriptor.session);

        result
    }

    async fn send(&self, descriptor: &PageDescriptor) -> Result<FetchedPage, FetchError> {
        let mut request = self.request(&descriptor.locator);

        if descriptor.session == SessionState::Authenticated {
            if let Some(cookie) = &self.cookie {
                request = request
                    .header(COOKIE, &**cookie)
                    .header(REFERER, descriptor.locator.as_str());
            }
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !is_html(content_type.as_deref()) {
            return Err(FetchError::ContentMismatch {
                status: status.as_u16(),
                content_type: content_type.unwrap_or_default(),
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;

        Ok(FetchedPage {
            body,
            status_code: Some(status.as_u16()),
            final_url: Some(final_url),
            content_type,
        })
    }

    fn request(&self, url: &str) -> RequestBuilder {
        self.headers.iter().fold(
            self.client.get(url).timeout(self.timeout),
            |request, (name, value)| request.header(name.as_str(), value.as_str()),
        )
    }

    fn classify(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            FetchError::Network(error.to_string())
        }
    }
}

/// Reads a local HTML file; a missing or unreadable file yields an empty body
async fn read_file(path: &str) -> FetchedPage {
    let body = match tokio::fs::read_to_string(path).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Could not read {}: {}", path, e);
            String::new()
        }
    };

    FetchedPage {
        body,
        status_code: None,
        final_url: None,
        content_type: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn descriptor(locator: &str, kind: PageKind) -> PageDescriptor {
        PageDescriptor {
            locator: locator.to_string(),
            kind,
            follow_links: false,
            session: SessionState::Anonymous,
        }
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client("TestSweep/1.0");
        assert!(client.is_ok());
    }

    #[test]
    fn test_is_html() {
        assert!(is_html(Some("text/html")));
        assert!(is_html(Some("text/html; charset=utf-8")));
        assert!(is_html(Some("Text/HTML")));
        assert!(!is_html(Some("application/json")));
        assert!(!is_html(Some("text/htmlx")));
        assert!(!is_html(None));
    }

    #[test]
    fn test_cookie_is_optional() {
        let fetcher = Fetcher::default().with_cookie(Some(String::new()));
        assert!(!fetcher.has_cookie());

        let fetcher = Fetcher::default().with_cookie(Some("sessionid=abc".to_string()));
        assert!(fetcher.has_cookie());
    }

    #[tokio::test]
    async fn test_inline_html_is_verbatim() {
        let html = "<html><body class='foo'></body></html>";
        let page = Fetcher::default()
            .fetch_page(&descriptor(html, PageKind::InlineHtml))
            .await
            .unwrap();
        assert_eq!(page.body, html);
        assert_eq!(page.status_code, None);
    }

    #[tokio::test]
    async fn test_file_is_read() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "<p class='bar'></p>").unwrap();

        let locator = file.path().to_string_lossy().to_string();
        let page = Fetcher::default()
            .fetch_page(&descriptor(&locator, PageKind::FilePath))
            .await
            .unwrap();
        assert_eq!(page.body, "<p class='bar'></p>");
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let page = Fetcher::default()
            .fetch_page(&descriptor("/no/such/page.html", PageKind::FilePath))
            .await
            .unwrap();
        assert!(page.body.is_empty());
    }
}
