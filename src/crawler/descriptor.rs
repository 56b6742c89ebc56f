//! Page descriptors: what the crawl engine visits and under which session

use crate::scope::canonicalize;
use std::fmt;

/// Whether a page is requested anonymously or with the session cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

impl SessionState {
    /// Sessions to visit each page under
    ///
    /// Every page is visited anonymously, and once more with the cookie when
    /// one is configured.
    pub fn active(has_cookie: bool) -> &'static [SessionState] {
        if has_cookie {
            &[Self::Anonymous, Self::Authenticated]
        } else {
            &[Self::Anonymous]
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// How a locator is resolved into HTML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Url,
    FilePath,
    InlineHtml,
}

/// A page entry from configuration, kind already decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTarget {
    pub locator: String,
    pub kind: PageKind,
}

impl PageTarget {
    pub fn url(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            kind: PageKind::Url,
        }
    }

    pub fn file(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            kind: PageKind::FilePath,
        }
    }

    pub fn html(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            kind: PageKind::InlineHtml,
        }
    }

    /// Classifies a plain string entry
    ///
    /// `http://` and `https://` entries are URLs, entries containing `<` are
    /// inline HTML and everything else is a file path.
    ///
    /// # Examples
    ///
    /// ```
    /// use stylesweep::{PageKind, PageTarget};
    ///
    /// assert_eq!(PageTarget::sniff("http://localhost/").kind, PageKind::Url);
    /// assert_eq!(PageTarget::sniff("<html></html>").kind, PageKind::InlineHtml);
    /// assert_eq!(PageTarget::sniff("site/index.html").kind, PageKind::FilePath);
    /// ```
    pub fn sniff(entry: &str) -> Self {
        if entry.starts_with("http://") || entry.starts_with("https://") {
            Self::url(entry)
        } else if entry.contains('<') {
            Self::html(entry)
        } else {
            Self::file(entry)
        }
    }
}

/// One unit of work for the crawl engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDescriptor {
    pub locator: String,
    pub kind: PageKind,
    pub follow_links: bool,
    pub session: SessionState,
}

/// Identity of a visit: locator plus session
pub(crate) type VisitKey = (String, SessionState);

impl PageDescriptor {
    /// Descriptor for a `crawl` entry
    ///
    /// URL locators are canonicalized and links are followed.
    pub fn crawl_seed(target: &PageTarget, session: SessionState) -> Self {
        let locator = match target.kind {
            PageKind::Url => canonicalize(&target.locator),
            PageKind::FilePath | PageKind::InlineHtml => target.locator.clone(),
        };

        Self {
            locator,
            kind: target.kind,
            follow_links: true,
            session,
        }
    }

    /// Descriptor for an `include` entry
    ///
    /// The locator is kept verbatim, query string included, and links are not
    /// followed.
    pub fn include(target: &PageTarget, session: SessionState) -> Self {
        Self {
            locator: target.locator.clone(),
            kind: target.kind,
            follow_links: false,
            session,
        }
    }

    /// Descriptor for a link found on a crawled page
    pub fn discovered(url: &str, session: SessionState) -> Self {
        Self {
            locator: canonicalize(url),
            kind: PageKind::Url,
            follow_links: true,
            session,
        }
    }

    pub(crate) fn visit_key(&self) -> VisitKey {
        (self.locator.clone(), self.session)
    }

    /// Short form of the locator for logs
    pub fn display_locator(&self) -> String {
        match self.kind {
            PageKind::InlineHtml => {
                let preview: String = self.locator.chars().take(40).collect();
                format!("inline HTML '{}'", preview.trim())
            }
            PageKind::Url | PageKind::FilePath => self.locator.clone(),
        }
    }
}
