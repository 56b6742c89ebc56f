//! Crawler module: the crawl-and-match engine
//!
//! This module contains the core audit logic, including:
//! - Page descriptors and session states
//! - HTTP, file and inline page fetching
//! - Same-host link discovery
//! - Selector usage matching
//! - The frontier and dispatch loop

mod coordinator;
mod descriptor;
mod fetcher;
mod links;
mod matcher;

pub use coordinator::{
    Coordinator, CrawlOutcome, PageOutcome, DEFAULT_MAX_CONCURRENT_FETCHES,
};
pub use descriptor::{PageDescriptor, PageKind, PageTarget, SessionState};
pub use fetcher::{
    build_http_client, FetchObserver, FetchedPage, Fetcher, ResponseMeta, TracingObserver,
    DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT,
};
pub use links::discover_links;
pub use matcher::match_document;

use crate::css::{self, CssSource};
use crate::output::{aggregate, AuditResult};
use crate::scope::ScopePolicy;
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Pages to audit
#[derive(Debug, Clone, Default)]
pub struct PageSet {
    /// Seeds whose same-host links are followed
    pub crawl: Vec<PageTarget>,
    /// Pages visited as given, links not followed
    pub include: Vec<PageTarget>,
    /// Exclude entries (exact, `prefix*` or `regex:<pattern>`)
    pub exclude: Vec<String>,
}

impl PageSet {
    /// Returns true if there is nothing to visit
    pub fn is_empty(&self) -> bool {
        self.crawl.is_empty() && self.include.is_empty()
    }
}

/// Everything one audit needs
#[derive(Clone)]
pub struct AuditRequest {
    pub pages: PageSet,
    pub css: Vec<CssSource>,
    /// Rule texts never matched against HTML
    pub whitelist: Vec<String>,
    /// Headers sent with every request
    pub headers: Vec<(String, String)>,
    /// Per-request timeout
    pub timeout: Duration,
    pub max_concurrent_fetches: usize,
    /// Session cookie; when set every page is also visited authenticated
    pub cookie: Option<String>,
    /// Receives every page fetch; logs through `tracing` when unset
    pub observer: Option<Arc<dyn FetchObserver>>,
    pub user_agent: Option<String>,
}

impl Default for AuditRequest {
    fn default() -> Self {
        Self {
            pages: PageSet::default(),
            css: Vec::new(),
            whitelist: Vec::new(),
            headers: Vec::new(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            cookie: None,
            observer: None,
            user_agent: None,
        }
    }
}

impl std::fmt::Debug for AuditRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRequest")
            .field("pages", &self.pages)
            .field("css", &self.css)
            .field("whitelist", &self.whitelist)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("authenticated", &self.cookie.is_some())
            .field("observer", &self.observer.is_some())
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Runs a complete audit
///
/// This is the main entry point. It will:
/// 1. Compile the exclude rules
/// 2. Build the HTTP client and fetch context
/// 3. Extract the selector table from the CSS sources
/// 4. Crawl and match every page, once per session
/// 5. Aggregate the final table into an [`AuditResult`]
///
/// With no CSS sources or no pages the result is empty and nothing is
/// fetched.
///
/// # Returns
///
/// * `Ok(AuditResult)` - Audit completed; per-page failures are in `load_errors`
/// * `Err(SweepError)` - Invalid exclude pattern or HTTP client setup failed
///
/// # Example
///
/// ```no_run
/// use stylesweep::{audit, AuditRequest, CssSource, PageSet, PageTarget};
///
/// # async fn example() -> stylesweep::Result<()> {
/// let result = audit(AuditRequest {
///     pages: PageSet {
///         crawl: vec![PageTarget::url("http://localhost:8000/")],
///         ..Default::default()
///     },
///     css: vec![CssSource::sniff("static/site.css")],
///     ..Default::default()
/// })
/// .await?;
/// println!("{} unused rules", result.total_unused);
/// # Ok(())
/// # }
/// ```
pub async fn audit(request: AuditRequest) -> Result<AuditResult> {
    let started_at = Utc::now();

    if request.css.is_empty() || request.pages.is_empty() {
        tracing::info!("Nothing to audit: no CSS sources or no pages given");
        return Ok(AuditResult::empty(started_at));
    }

    let scope = ScopePolicy::new(&request.pages.exclude)?;

    let user_agent = request.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
    let client = build_http_client(user_agent)?;

    let mut fetcher = Fetcher::new(client)
        .with_headers(request.headers)
        .with_timeout(request.timeout)
        .with_cookie(request.cookie);
    if let Some(observer) = request.observer {
        fetcher = fetcher.with_observer(observer);
    }

    let mut table = css::extract(&fetcher, &request.css).await;
    table.apply_whitelist(&request.whitelist);

    let mut coordinator =
        Coordinator::new(fetcher, scope, table, request.max_concurrent_fetches);
    coordinator.seed(&request.pages);
    let crawl = coordinator.run().await;

    Ok(aggregate(
        crawl.table,
        crawl.load_errors,
        crawl.stats,
        started_at,
        Utc::now(),
    ))
}
