/// Visit state definitions for tracking page descriptors during an audit
use std::fmt;

/// Represents the current state of a page descriptor in the crawl engine
///
/// ```text
/// Queued -> Fetching -> Matched
///                    -> Failed
/// Queued -> Skipped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitState {
    // ===== Active States =====
    /// Descriptor is in the frontier
    Queued,

    /// A worker is fetching the page
    Fetching,

    // ===== Terminal States =====
    /// Page was fetched and its selectors matched
    Matched,

    /// Fetch failed, recorded as a load error
    Failed,

    /// Identity already visited or excluded
    Skipped,
}

impl VisitState {
    /// Returns true if no further processing happens for the descriptor
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Matched | Self::Failed | Self::Skipped)
    }

    /// Returns true if the page contributed match counts
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Matched)
    }

    /// Returns true if moving from this state to `next` is allowed
    pub fn can_transition_to(&self, next: VisitState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Fetching)
                | (Self::Queued, Self::Skipped)
                | (Self::Fetching, Self::Matched)
                | (Self::Fetching, Self::Failed)
        )
    }

    /// Short lowercase name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Matched => "matched",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counts of terminal visit states for one audit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisitStatistics {
    pub matched: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl VisitStatistics {
    /// Counts one descriptor reaching a terminal state
    ///
    /// Active states are ignored.
    pub fn record(&mut self, state: VisitState) {
        match state {
            VisitState::Matched => self.matched += 1,
            VisitState::Failed => self.failed += 1,
            VisitState::Skipped => self.skipped += 1,
            VisitState::Queued | VisitState::Fetching => {}
        }
    }

    /// Number of pages a fetch was attempted for
    pub fn fetched(&self) -> usize {
        self.matched + self.failed
    }
}
