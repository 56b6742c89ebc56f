//! Scope policy for deciding which pages are visited
//!
//! This module provides locator canonicalization, same-host checks and the
//! exclude rules (exact locators, wildcard prefixes and regular expressions).

mod canonical;
mod matcher;

use crate::ConfigError;
use url::Url;

// Re-export main functions
pub use canonical::{canonicalize, same_host};
pub(crate) use canonical::is_same_host;
pub use matcher::{ExcludeRule, REGEX_PREFIX};

/// Exclude rules compiled from the `exclude` page list
#[derive(Debug, Clone, Default)]
pub struct ScopePolicy {
    rules: Vec<ExcludeRule>,
}

impl ScopePolicy {
    /// Builds a policy from raw exclude entries
    ///
    /// # Arguments
    ///
    /// * `exclude` - Entries as written in the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(ScopePolicy)` - All entries parsed
    /// * `Err(ConfigError)` - An entry is an invalid regular expression
    ///
    /// # Examples
    ///
    /// ```
    /// use stylesweep::scope::ScopePolicy;
    ///
    /// let policy = ScopePolicy::new(&[
    ///     "http://host/sub/*".to_string(),
    ///     "http://host/private.html".to_string(),
    /// ]).unwrap();
    ///
    /// assert!(policy.is_excluded("http://host/sub/page.html"));
    /// assert!(policy.is_excluded("http://host/private.html?x=1"));
    /// assert!(!policy.is_excluded("http://host/public.html"));
    /// ```
    pub fn new(exclude: &[String]) -> Result<Self, ConfigError> {
        let rules = exclude
            .iter()
            .filter(|entry| !entry.trim().is_empty())
            .map(|entry| ExcludeRule::parse(entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    /// Returns true if the locator matches any exclude rule
    pub fn is_excluded(&self, locator: &str) -> bool {
        if self.rules.is_empty() {
            return false;
        }

        let url_path = Url::parse(locator)
            .ok()
            .filter(|url| url.has_host())
            .map(|url| url.path().to_string());

        self.rules
            .iter()
            .any(|rule| rule.matches(locator, url_path.as_deref()))
    }

    /// Canonical locators of the exact exclude entries
    ///
    /// The crawl engine marks these as already visited before seeding.
    pub fn exact_entries(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().filter_map(|rule| match rule {
            ExcludeRule::Exact(locator) => Some(locator.as_str()),
            _ => None,
        })
    }

    /// Number of exclude rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if there are no exclude rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
