//! Crawler coordinator - frontier and dispatch loop
//!
//! The coordinator owns all mutable crawl state:
//! - The frontier of queued page descriptors
//! - The visit record, keyed by `(locator, session)`
//! - The selector table that match counts are merged into
//! - Load errors and visit statistics
//!
//! Workers run in a `JoinSet`, bounded by a semaphore. They fetch a page,
//! parse it, discover links and count selector matches, then hand a
//! [`PageOutcome`] back to the dispatch loop, which is the only writer.

use crate::crawler::descriptor::VisitKey;
use crate::crawler::{
    discover_links, match_document, Fetcher, PageDescriptor, PageKind, PageSet, SessionState,
};
use crate::css::RuleTable;
use crate::output::LoadError;
use crate::scope::ScopePolicy;
use crate::state::{VisitState, VisitStatistics};
use crate::FetchError;
use scraper::Html;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};

/// Default bound on in-flight fetches
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// What a worker reports back for one descriptor
#[derive(Debug)]
pub enum PageOutcome {
    /// Page fetched and matched
    Matched {
        descriptor: PageDescriptor,
        /// Same-host links to queue (empty unless the descriptor follows links)
        links: Vec<String>,
        /// Elements matched per rule text
        counts: HashMap<String, usize>,
    },

    /// Fetch failed
    Failed {
        descriptor: PageDescriptor,
        error: FetchError,
    },
}

/// Final state of a crawl, handed to the aggregator
#[derive(Debug)]
pub struct CrawlOutcome {
    pub table: RuleTable,
    pub load_errors: Vec<LoadError>,
    pub stats: VisitStatistics,
}

/// Read-only context shared by every worker
struct WorkerContext {
    fetcher: Fetcher,
    scope: Arc<ScopePolicy>,
    targets: Vec<String>,
}

/// Main crawl coordinator structure
pub struct Coordinator {
    context: Arc<WorkerContext>,
    scope: Arc<ScopePolicy>,
    frontier: VecDeque<PageDescriptor>,
    visited: HashMap<VisitKey, VisitState>,
    table: RuleTable,
    load_errors: Vec<LoadError>,
    stats: VisitStatistics,
    max_concurrent_fetches: usize,
}

impl Coordinator {
    /// Creates a coordinator for one audit
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Fetch context (client, headers, cookie, observer)
    /// * `scope` - Exclude rules
    /// * `table` - Selector table; whitelist already applied
    /// * `max_concurrent_fetches` - Bound on in-flight fetches (at least 1)
    pub fn new(
        fetcher: Fetcher,
        scope: ScopePolicy,
        table: RuleTable,
        max_concurrent_fetches: usize,
    ) -> Self {
        let scope = Arc::new(scope);
        let context = Arc::new(WorkerContext {
            fetcher,
            scope: Arc::clone(&scope),
            targets: table.match_targets(),
        });

        Self {
            context,
            scope,
            frontier: VecDeque::new(),
            visited: HashMap::new(),
            table,
            load_errors: Vec::new(),
            stats: VisitStatistics::default(),
            max_concurrent_fetches: max_concurrent_fetches.max(1),
        }
    }

    /// Seeds the frontier from the configured page lists
    ///
    /// Exact exclude entries are marked visited for both sessions first. Each
    /// `crawl` and `include` target is then queued once per active session.
    pub fn seed(&mut self, pages: &PageSet) {
        for locator in self.scope.exact_entries() {
            for session in [SessionState::Anonymous, SessionState::Authenticated] {
                self.visited
                    .insert((locator.to_string(), session), VisitState::Skipped);
            }
        }

        let sessions = SessionState::active(self.context.fetcher.has_cookie());

        for target in &pages.crawl {
            for &session in sessions {
                self.frontier
                    .push_back(PageDescriptor::crawl_seed(target, session));
            }
        }

        for target in &pages.include {
            for &session in sessions {
                self.frontier
                    .push_back(PageDescriptor::include(target, session));
            }
        }

        tracing::info!("Seeded frontier with {} pages", self.frontier.len());
    }

    /// Number of descriptors waiting in the frontier
    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    /// Runs the dispatch loop until the frontier is empty and no worker is
    /// in flight
    pub async fn run(mut self) -> CrawlOutcome {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_fetches));
        let mut workers = JoinSet::new();
        let mut in_flight: HashMap<task::Id, PageDescriptor> = HashMap::new();
        let start_time = std::time::Instant::now();

        loop {
            while let Some(descriptor) = self.frontier.pop_front() {
                if !self.admit(&descriptor) {
                    continue;
                }

                let permit = match Arc::clone(&semaphore).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        tracing::error!("Fetch semaphore closed: {}", e);
                        self.frontier.push_front(descriptor);
                        break;
                    }
                };

                let context = Arc::clone(&self.context);
                let worker_descriptor = descriptor.clone();
                let handle = workers.spawn(async move {
                    let _permit = permit;
                    visit(&context, worker_descriptor).await
                });
                in_flight.insert(handle.id(), descriptor);
            }

            match workers.join_next_with_id().await {
                Some(Ok((id, outcome))) => {
                    in_flight.remove(&id);
                    self.complete(outcome);
                }
                Some(Err(e)) => match in_flight.remove(&e.id()) {
                    Some(descriptor) => self.worker_failed(descriptor, &e),
                    None => tracing::error!("Page worker failed: {}", e),
                },
                None => break,
            }
        }

        tracing::info!(
            "Crawl completed: {} pages matched, {} failed, {} skipped in {:?}",
            self.stats.matched,
            self.stats.failed,
            self.stats.skipped,
            start_time.elapsed()
        );

        CrawlOutcome {
            table: self.table,
            load_errors: self.load_errors,
            stats: self.stats,
        }
    }

    /// Decides whether a dequeued descriptor gets fetched
    ///
    /// Marks it `Fetching` when admitted, `Skipped` otherwise.
    fn admit(&mut self, descriptor: &PageDescriptor) -> bool {
        let key = descriptor.visit_key();

        if self.visited.contains_key(&key) {
            tracing::trace!(
                "Already visited {} ({})",
                descriptor.display_locator(),
                descriptor.session
            );
            self.stats.record(VisitState::Skipped);
            return false;
        }

        let excludable = matches!(descriptor.kind, PageKind::Url | PageKind::FilePath);
        if excludable && self.scope.is_excluded(&descriptor.locator) {
            tracing::debug!("Excluded {}", descriptor.locator);
            self.transition(key, VisitState::Skipped);
            return false;
        }

        tracing::debug!(
            "Fetching {} ({})",
            descriptor.display_locator(),
            descriptor.session
        );
        self.transition(key, VisitState::Fetching);
        true
    }

    /// Merges a worker outcome into the crawl state
    fn complete(&mut self, outcome: PageOutcome) {
        match outcome {
            PageOutcome::Matched {
                descriptor,
                links,
                counts,
            } => {
                self.table.add_matches(&counts);
                self.enqueue_links(&links);
                self.transition(descriptor.visit_key(), VisitState::Matched);
            }
            PageOutcome::Failed { descriptor, error } => {
                self.transition(descriptor.visit_key(), VisitState::Failed);
                self.load_errors.push(LoadError {
                    locator: descriptor.locator,
                    session: descriptor.session,
                    error,
                });
            }
        }
    }

    /// Records a worker that panicked or was cancelled as a failed visit
    fn worker_failed(&mut self, descriptor: PageDescriptor, error: &JoinError) {
        tracing::error!(
            "Page worker for {} ({}) failed: {}",
            descriptor.display_locator(),
            descriptor.session,
            error
        );
        self.complete(PageOutcome::Failed {
            descriptor,
            error: FetchError::Worker(error.to_string()),
        });
    }

    /// Queues discovered links once per active session
    fn enqueue_links(&mut self, links: &[String]) {
        let sessions = SessionState::active(self.context.fetcher.has_cookie());
        let mut queued = HashSet::new();

        for link in links {
            for &session in sessions {
                let descriptor = PageDescriptor::discovered(link, session);
                let key = descriptor.visit_key();
                if self.visited.contains_key(&key) || !queued.insert(key) {
                    continue;
                }
                self.frontier.push_back(descriptor);
            }
        }
    }

    fn transition(&mut self, key: VisitKey, next: VisitState) {
        let current = self
            .visited
            .get(&key)
            .copied()
            .unwrap_or(VisitState::Queued);

        if !current.can_transition_to(next) {
            tracing::warn!(
                "Unexpected visit transition {} -> {} for {}",
                current,
                next,
                key.0
            );
        }

        self.stats.record(next);
        self.visited.insert(key, next);
    }
}

/// Worker body: fetch, then parse and match
async fn visit(context: &WorkerContext, descriptor: PageDescriptor) -> PageOutcome {
    match context.fetcher.fetch_page(&descriptor).await {
        Ok(page) => {
            let (links, counts) = process_document(&page.body, &descriptor, context);
            PageOutcome::Matched {
                descriptor,
                links,
                counts,
            }
        }
        Err(error) => PageOutcome::Failed { descriptor, error },
    }
}

/// Synchronous part of a visit; the parsed document never crosses an await
fn process_document(
    body: &str,
    descriptor: &PageDescriptor,
    context: &WorkerContext,
) -> (Vec<String>, HashMap<String, usize>) {
    let document = Html::parse_document(body);

    let links = if descriptor.follow_links && descriptor.kind == PageKind::Url {
        discover_links(&document, &descriptor.locator, &context.scope)
    } else {
        Vec::new()
    };

    let counts = match_document(&document, &context.targets);
    (links, counts)
}
