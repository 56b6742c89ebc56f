//! CSS side of the audit
//!
//! This module loads stylesheets and turns them into a [`RuleTable`]:
//! - `CssSource`: where a stylesheet comes from (URL, file or inline text)
//! - `extractor`: cssparser-based rule collection
//! - `table`: the selector table shared with the crawl engine

mod extractor;
mod table;

pub use extractor::{parse_stylesheet, strip_unsupported, CssParseError};
pub use table::{RuleTable, SelectorEntry, SourceId};

use crate::crawler::Fetcher;
use std::fmt;
use std::path::PathBuf;

/// A stylesheet to audit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssSource {
    /// Remote stylesheet fetched over HTTP
    Url(String),
    /// Local stylesheet file
    File(PathBuf),
    /// CSS text given directly
    Inline(String),
}

impl CssSource {
    /// Classifies a raw configuration entry
    ///
    /// Entries starting with `http` are URLs, entries without `{` are file
    /// paths and everything else is inline CSS.
    ///
    /// # Examples
    ///
    /// ```
    /// use stylesweep::CssSource;
    ///
    /// assert!(matches!(CssSource::sniff("https://host/site.css"), CssSource::Url(_)));
    /// assert!(matches!(CssSource::sniff("static/site.css"), CssSource::File(_)));
    /// assert!(matches!(CssSource::sniff(".foo { color: red }"), CssSource::Inline(_)));
    /// ```
    pub fn sniff(entry: &str) -> Self {
        if entry.starts_with("http") {
            Self::Url(entry.to_string())
        } else if !entry.contains('{') {
            Self::File(PathBuf::from(entry))
        } else {
            Self::Inline(entry.to_string())
        }
    }

    /// Loads the CSS text of this source
    async fn load(&self, fetcher: &Fetcher) -> Result<String, String> {
        match self {
            Self::Url(url) => fetcher
                .fetch_stylesheet(url)
                .await
                .map_err(|e| e.to_string()),
            Self::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| e.to_string()),
            Self::Inline(css) => Ok(css.clone()),
        }
    }
}

impl fmt::Display for CssSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{}", url),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Inline(css) => {
                let preview: String = css.chars().take(40).collect();
                write!(f, "inline CSS '{}'", preview.trim())
            }
        }
    }
}

/// Loads and parses every source into one table
///
/// Sources are processed in order; the index of a source in `sources` is the
/// [`SourceId`] recorded in entry positions. A source that cannot be loaded or
/// parsed is logged and contributes nothing.
pub async fn extract(fetcher: &Fetcher, sources: &[CssSource]) -> RuleTable {
    let mut table = RuleTable::new();

    for (source_id, source) in sources.iter().enumerate() {
        let css = match source.load(fetcher).await {
            Ok(css) => css,
            Err(e) => {
                tracing::warn!("Failed to load CSS from {}: {}", source, e);
                continue;
            }
        };

        match parse_stylesheet(&css, source_id) {
            Ok(parsed) => {
                tracing::debug!("Parsed {} rules from {}", parsed.len(), source);
                table.merge(parsed);
            }
            Err(e) => {
                tracing::warn!("Skipping CSS from {}: {}", source, e);
            }
        }
    }

    tracing::info!(
        "Extracted {} rules from {} CSS sources",
        table.len(),
        sources.len()
    );
    table
}
