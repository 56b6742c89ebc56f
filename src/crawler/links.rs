//! Same-host link discovery
//!
//! Links are taken from `<a href>` elements only. A link is kept when it:
//! - is not empty, query-only (`?x=1`) or fragment-only (`#top`)
//! - resolves to an `http`/`https` URL other than the current page
//! - lives on the same host and port as the current page
//! - is not excluded by the scope policy

use crate::scope::{canonicalize, is_same_host, ScopePolicy};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts crawlable links from a parsed document
///
/// # Arguments
///
/// * `document` - The parsed page
/// * `parent` - Locator the page was requested under, used as the base URL
/// * `scope` - Exclude rules
///
/// # Returns
///
/// Canonical (query and fragment stripped) absolute URLs, each listed once,
/// in document order. A parent that is not an absolute URL yields no links.
///
/// # Example
///
/// ```
/// use scraper::Html;
/// use stylesweep::crawler::discover_links;
/// use stylesweep::ScopePolicy;
///
/// let html = Html::parse_document(r#"<a href="b.html?x=1">B</a><a href="http://other/">O</a>"#);
/// let links = discover_links(&html, "http://host/a.html", &ScopePolicy::default());
/// assert_eq!(links, vec!["http://host/b.html".to_string()]);
/// ```
pub fn discover_links(document: &Html, parent: &str, scope: &ScopePolicy) -> Vec<String> {
    let Ok(base_url) = Url::parse(parent) else {
        return Vec::new();
    };

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&a_selector) {
        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };

        if let Some(link) = resolve_link(href, &base_url, scope) {
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }

    links
}

/// Resolves a link href against the parent page and applies scope rules
///
/// Returns None if the link should not be followed.
fn resolve_link(href: &str, base_url: &Url, scope: &ScopePolicy) -> Option<String> {
    let href = href.trim();

    // Empty, query-only and fragment-only hrefs point back at this page
    if href.is_empty() || href.starts_with('?') || href.starts_with('#') {
        return None;
    }

    let mut resolved = base_url.join(href).ok()?;

    // javascript:, mailto:, tel:, data: and friends
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }

    resolved.set_fragment(None);
    let mut current = base_url.clone();
    current.set_fragment(None);
    if resolved == current {
        return None;
    }

    if !is_same_host(base_url, &resolved) {
        tracing::trace!("Skipping cross-host link {}", resolved);
        return None;
    }

    if scope.is_excluded(resolved.as_str()) {
        tracing::trace!("Skipping excluded link {}", resolved);
        return None;
    }

    Some(canonicalize(resolved.as_str()))
}
