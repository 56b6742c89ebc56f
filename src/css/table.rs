//! Selector bookkeeping shared by the extractor, the matcher and the report

use std::collections::{BTreeMap, HashMap};

/// Index of a CSS source in the order it was given
pub type SourceId = usize;

/// Per-rule record of CSS occurrences and HTML matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorEntry {
    /// Selector or at-rule prelude exactly as registered
    pub rule_text: String,

    /// How many times the rule appears in the CSS (always >= 1)
    pub occurrences_in_css: u32,

    /// Elements matched across every visited page
    pub matches_in_html: u64,

    /// Rules containing `@` are never matched against HTML
    pub ignored: bool,

    /// Bare at-rule prelude (`@font-face`); its count stays at 1
    pub at_rule: bool,

    /// Whitelisted entries are never matched against HTML
    pub whitelisted: bool,

    /// Byte offsets of each occurrence, per source
    pub positions: BTreeMap<SourceId, Vec<usize>>,
}

impl SelectorEntry {
    fn new(rule_text: &str, source: SourceId, offset: usize, at_rule: bool) -> Self {
        let mut positions = BTreeMap::new();
        positions.insert(source, vec![offset]);

        Self {
            rule_text: rule_text.to_string(),
            occurrences_in_css: 1,
            matches_in_html: 0,
            ignored: rule_text.contains('@'),
            at_rule,
            whitelisted: false,
            positions,
        }
    }

    /// Returns true if the rule appears more than once in the CSS
    pub fn is_duplicate(&self) -> bool {
        self.occurrences_in_css > 1
    }

    /// Returns true if the rule matched at least one element
    pub fn is_used(&self) -> bool {
        self.matches_in_html > 0
    }

    /// Returns true if the rule takes part in HTML matching
    pub fn is_matchable(&self) -> bool {
        !self.ignored && !self.whitelisted
    }
}

/// Flat table of every rule found in the CSS sources, keyed by rule text
///
/// Entries are created while parsing CSS and never removed. Iteration order is
/// the lexical order of the rule text so reports are stable between runs.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    entries: BTreeMap<String, SelectorEntry>,
}

impl RuleTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one occurrence of a selector
    pub fn register_selector(&mut self, text: &str, source: SourceId, offset: usize) {
        match self.entries.get_mut(text) {
            Some(entry) => {
                entry.occurrences_in_css += 1;
                entry.positions.entry(source).or_default().push(offset);
            }
            None => {
                self.entries.insert(
                    text.to_string(),
                    SelectorEntry::new(text, source, offset, false),
                );
            }
        }
    }

    /// Registers an at-rule prelude such as `@font-face`
    ///
    /// At-rules keep an occurrence count of 1 no matter how often they repeat.
    pub fn register_at_rule(&mut self, text: &str, source: SourceId, offset: usize) {
        self.entries
            .entry(text.to_string())
            .and_modify(|entry| entry.positions.entry(source).or_default().push(offset))
            .or_insert_with(|| SelectorEntry::new(text, source, offset, true));
    }

    /// Merges the table of one CSS source into this one
    pub fn merge(&mut self, other: RuleTable) {
        for (text, incoming) in other.entries {
            match self.entries.get_mut(&text) {
                Some(entry) => {
                    if !entry.at_rule {
                        entry.occurrences_in_css += incoming.occurrences_in_css;
                    }
                    for (source, offsets) in incoming.positions {
                        entry.positions.entry(source).or_default().extend(offsets);
                    }
                }
                None => {
                    self.entries.insert(text, incoming);
                }
            }
        }
    }

    /// Flags every entry whose text appears in the whitelist
    pub fn apply_whitelist(&mut self, whitelist: &[String]) {
        for rule in whitelist {
            if let Some(entry) = self.entries.get_mut(rule.trim()) {
                entry.whitelisted = true;
            }
        }
    }

    /// Rule texts that should be queried against each document
    pub fn match_targets(&self) -> Vec<String> {
        self.entries
            .values()
            .filter(|entry| entry.is_matchable())
            .map(|entry| entry.rule_text.clone())
            .collect()
    }

    /// Adds per-page match counts to the table
    ///
    /// Counts for unknown, ignored or whitelisted rules are dropped.
    pub fn add_matches(&mut self, counts: &HashMap<String, usize>) {
        for (text, count) in counts {
            if let Some(entry) = self.entries.get_mut(text) {
                if entry.is_matchable() {
                    entry.matches_in_html += *count as u64;
                }
            }
        }
    }

    /// Looks up an entry by rule text
    pub fn get(&self, text: &str) -> Option<&SelectorEntry> {
        self.entries.get(text)
    }

    /// Iterates over all entries in rule-text order
    pub fn iter(&self) -> impl Iterator<Item = &SelectorEntry> {
        self.entries.values()
    }

    /// Number of distinct rules
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no rule was found
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the table, returning the entries keyed by rule text
    pub fn into_entries(self) -> BTreeMap<String, SelectorEntry> {
        self.entries
    }
}
