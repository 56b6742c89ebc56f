//! Selector usage counting for one document

use scraper::{Html, Selector};
use std::collections::HashMap;

/// Counts the elements each rule matches in a document
///
/// The pseudo part of a rule (everything from the first `:`) is dropped
/// before querying, so `a:hover` counts the `a` elements. The full rule
/// text keys the result. Rules the selector engine rejects are logged and
/// count zero.
///
/// `selectors` are match targets: ignored and whitelisted rules have already
/// been filtered out by the caller.
///
/// # Example
///
/// ```
/// use scraper::Html;
/// use stylesweep::crawler::match_document;
///
/// let html = Html::parse_document("<body class='foo'><a href='#'>x</a></body>");
/// let counts = match_document(&html, &[".foo".to_string(), "a:hover".to_string()]);
/// assert_eq!(counts[".foo"], 1);
/// assert_eq!(counts["a:hover"], 1);
/// ```
pub fn match_document(document: &Html, selectors: &[String]) -> HashMap<String, usize> {
    let mut counts = HashMap::with_capacity(selectors.len());

    for rule in selectors {
        let query = rule.split(':').next().unwrap_or_default().trim();

        let count = if query.is_empty() {
            0
        } else {
            match Selector::parse(query) {
                Ok(selector) => document.select(&selector).count(),
                Err(e) => {
                    tracing::debug!("Problem with selector '{}': {:?}", rule, e);
                    0
                }
            }
        };

        counts.insert(rule.clone(), count);
    }

    counts
}
