use url::Url;

/// Strips the query string and fragment from a locator
///
/// The canonical locator is the dedup key for crawl-seeded and discovered
/// pages. Include entries are deliberately never passed through here.
///
/// # Examples
///
/// ```
/// use stylesweep::scope::canonicalize;
///
/// assert_eq!(canonicalize("http://example.com/a?b=1"), "http://example.com/a");
/// assert_eq!(canonicalize("http://example.com/a#top"), "http://example.com/a");
/// assert_eq!(canonicalize("/local/page.html"), "/local/page.html");
/// ```
pub fn canonicalize(locator: &str) -> String {
    locator
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Checks whether `candidate` lives on the same host as `parent`
///
/// Relative and protocol-relative candidates are resolved against the parent
/// first. Host and effective port must both match; the scheme may differ.
/// A parent that is not an absolute URL has no host, so nothing matches it.
///
/// # Examples
///
/// ```
/// use stylesweep::scope::same_host;
///
/// assert!(same_host("http://example.com/a/b.html", "../c.html"));
/// assert!(same_host("http://example.com/", "//example.com/x"));
/// assert!(!same_host("http://example.com/", "http://other.com/"));
/// assert!(!same_host("http://example.com:8080/", "http://example.com:9090/"));
/// ```
pub fn same_host(parent: &str, candidate: &str) -> bool {
    let Ok(parent) = Url::parse(parent) else {
        return false;
    };

    match parent.join(candidate) {
        Ok(resolved) => is_same_host(&parent, &resolved),
        Err(_) => false,
    }
}

/// Compares host and effective port of two absolute URLs
pub(crate) fn is_same_host(parent: &Url, candidate: &Url) -> bool {
    match (parent.host_str(), candidate.host_str()) {
        (Some(a), Some(b)) => {
            a.eq_ignore_ascii_case(b)
                && parent.port_or_known_default() == candidate.port_or_known_default()
        }
        _ => false,
    }
}
