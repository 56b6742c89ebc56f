use crate::css::RuleTable;
use crate::output::{AuditResult, LoadError};
use crate::state::VisitStatistics;
use chrono::{DateTime, Utc};

/// Derives the summary totals from the final selector table
///
/// One pass over the table. Whitelisted entries go to `total_whitelisted`,
/// otherwise ignored entries to `total_ignored`, otherwise to `total_used` or
/// `total_unused` by their match count. `total_duplicates` counts every entry
/// that occurs more than once, whatever its bucket.
pub fn aggregate(
    table: RuleTable,
    load_errors: Vec<LoadError>,
    pages: VisitStatistics,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> AuditResult {
    let mut result = AuditResult::empty(started_at);
    result.finished_at = finished_at;
    result.load_errors = load_errors;
    result.pages = pages;

    for entry in table.iter() {
        result.total += 1;

        if entry.whitelisted {
            result.total_whitelisted += 1;
        } else if entry.ignored {
            result.total_ignored += 1;
        } else if entry.is_used() {
            result.total_used += 1;
        } else {
            result.total_unused += 1;
        }

        if entry.is_duplicate() {
            result.total_duplicates += 1;
        }
    }

    result.selectors = table.into_entries();
    result
}
