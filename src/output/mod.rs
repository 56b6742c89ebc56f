//! Output module for audit results and reports
//!
//! This module handles:
//! - Aggregating the final selector table into an [`AuditResult`]
//! - Rendering the console report
//! - Writing markdown reports

mod aggregate;
pub mod markdown;
pub mod text;

pub use aggregate::aggregate;
pub use markdown::{format_markdown_report, write_markdown_report};
pub use text::{render, ReportOptions};

use crate::crawler::SessionState;
use crate::css::SelectorEntry;
use crate::state::VisitStatistics;
use crate::FetchError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A page that could not be loaded
#[derive(Debug, Clone)]
pub struct LoadError {
    pub locator: String,
    pub session: SessionState,
    pub error: FetchError,
}

/// Final outcome of an audit
///
/// Totals are derived once from the final selector table; every entry counts
/// toward exactly one of used, unused, ignored and whitelisted.
#[derive(Debug, Clone)]
pub struct AuditResult {
    /// Every rule found in the CSS, keyed by rule text
    pub selectors: BTreeMap<String, SelectorEntry>,
    pub total: usize,
    pub total_used: usize,
    pub total_unused: usize,
    pub total_ignored: usize,
    pub total_duplicates: usize,
    pub total_whitelisted: usize,
    pub load_errors: Vec<LoadError>,
    pub pages: VisitStatistics,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl AuditResult {
    /// Result of an audit that had nothing to do
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self {
            selectors: BTreeMap::new(),
            total: 0,
            total_used: 0,
            total_unused: 0,
            total_ignored: 0,
            total_duplicates: 0,
            total_whitelisted: 0,
            load_errors: Vec::new(),
            pages: VisitStatistics::default(),
            started_at: at,
            finished_at: at,
        }
    }

    /// Rules that take part in matching, in rule-text order
    pub fn matched_rules(&self) -> impl Iterator<Item = &SelectorEntry> {
        self.selectors.values().filter(|entry| entry.is_matchable())
    }

    /// Matchable rules that matched nothing
    pub fn unused(&self) -> impl Iterator<Item = &SelectorEntry> {
        self.matched_rules().filter(|entry| !entry.is_used())
    }

    /// Rules appearing more than once in the CSS
    pub fn duplicates(&self) -> impl Iterator<Item = &SelectorEntry> {
        self.selectors.values().filter(|entry| entry.is_duplicate())
    }

    /// Wall-clock duration of the audit
    pub fn duration_seconds(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
