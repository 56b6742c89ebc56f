//! Console report
//!
//! Lists unused rules (or every matchable rule with its count), optionally the
//! duplicated rules, a summary line and the pages that failed to load.

use crate::output::AuditResult;

const RULER: &str = "-------------------------------------";

/// What the console report shows
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    /// List every matchable rule with its match count, not just unused ones
    pub used: bool,
    /// Print headings and the summary line
    pub summary: bool,
    /// List duplicated rules
    pub duplicates: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            used: false,
            summary: true,
            duplicates: false,
        }
    }
}

/// Renders the console report
///
/// Rules are sorted by match count, then by rule text.
pub fn render(result: &AuditResult, options: &ReportOptions) -> String {
    let mut out = String::new();

    if options.summary {
        if options.used {
            out.push_str("\nRules:\n");
        } else {
            out.push_str("Unused rules:\n");
        }
        out.push_str(RULER);
        out.push('\n');
    }

    let mut rules: Vec<_> = result.matched_rules().collect();
    rules.sort_by_key(|entry| entry.matches_in_html);

    for entry in rules {
        if options.used {
            out.push_str(&format!("{}: {}\n", entry.rule_text, entry.matches_in_html));
        } else if !entry.is_used() {
            out.push_str(&format!("{}\n", entry.rule_text));
        }
    }

    if options.duplicates && result.total_duplicates > 0 {
        if options.summary {
            out.push_str("\nDuplicates:\n");
            out.push_str(RULER);
            out.push('\n');
        } else {
            out.push('\n');
        }

        let mut duplicates: Vec<_> = result.duplicates().collect();
        duplicates.sort_by_key(|entry| entry.occurrences_in_css);
        for entry in duplicates {
            out.push_str(&format!("{}: {}\n", entry.rule_text, entry.occurrences_in_css));
        }
    }

    if options.summary {
        out.push_str(RULER);
        out.push('\n');
        out.push_str(&summary_line(result));
        out.push('\n');
    }

    if !result.load_errors.is_empty() {
        out.push_str("\nCould not load:\n");
        for error in &result.load_errors {
            out.push_str(&format!(
                "{} ({}): {}\n",
                error.locator, error.session, error.error
            ));
        }
    }

    out
}

/// `Total: N (U used, X unused, D duplicates, I ignored[, W whitelisted])`
pub fn summary_line(result: &AuditResult) -> String {
    let duplicates = match result.total_duplicates {
        0 => "no duplicates".to_string(),
        1 => "1 duplicate".to_string(),
        n => format!("{} duplicates", n),
    };

    let mut line = format!(
        "Total: {} ({} used, {} unused, {}, {} ignored",
        result.total, result.total_used, result.total_unused, duplicates, result.total_ignored
    );
    if result.total_whitelisted > 0 {
        line.push_str(&format!(", {} whitelisted", result.total_whitelisted));
    }
    line.push(')');
    line
}
