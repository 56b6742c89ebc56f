use crate::scope::canonicalize;
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Prefix marking an exclude entry as a raw regular expression
pub const REGEX_PREFIX: &str = "regex:";

/// A single rule parsed from the `exclude` list
#[derive(Debug, Clone)]
pub enum ExcludeRule {
    /// Exact canonical locator, pre-seeded into the visit record
    Exact(String),

    /// Wildcard entry (`http://host/sub/*` or `/sub/*`)
    Prefix {
        /// The entry with its trailing `*` removed
        literal: String,
        /// URL path of the literal, when the entry is an absolute URL
        path: Option<String>,
    },

    /// Raw regular expression (`regex:<pattern>`)
    Pattern(Regex),
}

impl ExcludeRule {
    /// Parses an exclude entry
    ///
    /// # Entry Forms
    ///
    /// | Entry | Rule |
    /// |-------|------|
    /// | `regex:\.pdf$` | `Pattern` |
    /// | `http://host/sub/*` | `Prefix` with path `/sub/` |
    /// | `/sub/*` | `Prefix` without path |
    /// | anything else | `Exact` (canonicalized) |
    ///
    /// # Returns
    ///
    /// * `Ok(ExcludeRule)` - The parsed rule
    /// * `Err(ConfigError)` - The regular expression does not compile
    pub fn parse(entry: &str) -> Result<Self, ConfigError> {
        let entry = entry.trim();

        if let Some(pattern) = entry.strip_prefix(REGEX_PREFIX) {
            return Regex::new(pattern)
                .map(Self::Pattern)
                .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)));
        }

        if let Some(literal) = entry.strip_suffix('*') {
            let path = Url::parse(literal)
                .ok()
                .filter(|url| url.has_host())
                .map(|url| url.path().to_string());

            return Ok(Self::Prefix {
                literal: literal.to_string(),
                path,
            });
        }

        Ok(Self::Exact(canonicalize(entry)))
    }

    /// Checks whether a locator falls under this rule
    ///
    /// `url_path` is the path component of the locator when it is a URL.
    pub fn matches(&self, locator: &str, url_path: Option<&str>) -> bool {
        match self {
            Self::Exact(exact) => locator == exact || canonicalize(locator) == *exact,
            Self::Prefix { literal, path } => {
                if locator.starts_with(literal.as_str()) {
                    return true;
                }

                match url_path {
                    Some(url_path) => {
                        url_path.starts_with(literal.as_str())
                            || path
                                .as_deref()
                                .is_some_and(|prefix| url_path.starts_with(prefix))
                    }
                    None => false,
                }
            }
            Self::Pattern(regex) => regex.is_match(locator),
        }
    }
}
