//! Markdown report generation
//!
//! This module generates a human-readable markdown report of an audit,
//! including totals, unused and duplicated rules, and load errors.

use crate::output::{AuditResult, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown report of an audit
///
/// # Arguments
///
/// * `result` - The audit result
/// * `config_hash` - SHA-256 of the configuration file, if one was used
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn write_markdown_report(
    result: &AuditResult,
    config_hash: Option<&str>,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_report(result, config_hash);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats an audit result as markdown
pub fn format_markdown_report(result: &AuditResult, config_hash: Option<&str>) -> String {
    let mut md = String::new();

    // Title
    md.push_str("# Stylesweep Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", result.started_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Finished**: {}\n",
        result.finished_at.to_rfc3339()
    ));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n",
        result.duration_seconds()
    ));
    if let Some(hash) = config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    // Totals
    md.push_str("## Rules\n\n");
    md.push_str("| Bucket | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Total | {} |\n", result.total));
    md.push_str(&format!("| Used | {} |\n", result.total_used));
    md.push_str(&format!("| Unused | {} |\n", result.total_unused));
    md.push_str(&format!("| Ignored | {} |\n", result.total_ignored));
    md.push_str(&format!("| Whitelisted | {} |\n", result.total_whitelisted));
    md.push_str(&format!("| Duplicates | {} |\n\n", result.total_duplicates));

    // Pages
    md.push_str("## Pages\n\n");
    md.push_str("| State | Count |\n");
    md.push_str("|-------|-------|\n");
    md.push_str(&format!("| Matched | {} |\n", result.pages.matched));
    md.push_str(&format!("| Failed | {} |\n", result.pages.failed));
    md.push_str(&format!("| Skipped | {} |\n\n", result.pages.skipped));

    // Unused rules
    let unused: Vec<_> = result.unused().collect();
    if !unused.is_empty() {
        md.push_str("## Unused Rules\n\n");
        for entry in unused {
            md.push_str(&format!("- `{}`\n", entry.rule_text));
        }
        md.push('\n');
    }

    // Duplicates
    let mut duplicates: Vec<_> = result.duplicates().collect();
    if !duplicates.is_empty() {
        duplicates.sort_by(|a, b| b.occurrences_in_css.cmp(&a.occurrences_in_css));

        md.push_str("## Duplicated Rules\n\n");
        md.push_str("| Rule | Occurrences |\n");
        md.push_str("|------|-------------|\n");
        for entry in duplicates {
            md.push_str(&format!(
                "| `{}` | {} |\n",
                entry.rule_text.replace('|', "\\|"),
                entry.occurrences_in_css
            ));
        }
        md.push('\n');
    }

    // Load errors
    if !result.load_errors.is_empty() {
        md.push_str("## Load Errors\n\n");
        md.push_str("| Page | Session | Error |\n");
        md.push_str("|------|---------|-------|\n");
        for error in &result.load_errors {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                error.locator, error.session, error.error
            ));
        }
        md.push('\n');
    }

    md
}
