//! CSS rule extraction
//!
//! This module turns CSS text into a [`RuleTable`]:
//! - Grouped selectors (`.a, .b {}`) are registered one by one
//! - `@media` blocks are flattened into the same table
//! - Other at-rules register their prelude (`@font-face`, `@keyframes x`)
//! - `@supports` and `@document` bodies are stripped before parsing

use crate::css::table::{RuleTable, SourceId};
use cssparser::{
    AtRuleParser, CowRcStr, ParseError, Parser, ParserInput, ParserState, QualifiedRuleParser,
    StyleSheetParser, Token,
};
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use thiserror::Error;

/// A CSS source was rejected by the parser
#[derive(Debug, Clone, Error)]
#[error("CSS parse error at line {line}, column {column}: {message} (near '{snippet}')")]
pub struct CssParseError {
    /// 1-based line of the offending rule
    pub line: u32,
    /// 1-based column of the offending rule
    pub column: u32,
    /// Parser error description
    pub message: String,
    /// Start of the rejected rule text
    pub snippet: String,
}

/// Reasons a rule is rejected while collecting
#[derive(Debug, Clone, PartialEq, Eq, Error)]
enum RuleError {
    #[error("rule without selector")]
    EmptySelector,
}

/// Bodies of these at-rules are removed before parsing.
///
/// `@supports (...) { .foo { ... }}`, `@-prefix-supports`, `@document url(...)
/// { ... }}` and `@-prefix-document`.
fn unsupported_rules() -> &'static [Regex] {
    static RULES: OnceLock<Vec<Regex>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            r"(?s)@-*\w*-*supports\s.*?\}\s*?\}",
            r"(?s)@-*\w*-*document\s.*?\}\s*?\}",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Removes `@supports` and `@document` blocks from CSS text
pub fn strip_unsupported(css: &str) -> Cow<'_, str> {
    let mut css = Cow::Borrowed(css);
    for rule in unsupported_rules() {
        if rule.is_match(&css) {
            css = Cow::Owned(rule.replace_all(&css, "").into_owned());
        }
    }
    css
}

/// Parses one CSS source into a fresh table
///
/// Offsets recorded in the table are byte offsets into the CSS text after
/// unsupported at-rules were stripped.
///
/// # Arguments
///
/// * `css` - CSS text
/// * `source` - Index of the source, recorded in entry positions
///
/// # Returns
///
/// * `Ok(RuleTable)` - Every rule of the source
/// * `Err(CssParseError)` - The first rule the parser rejected; the source is
///   then discarded as a whole
///
/// # Example
///
/// ```
/// use stylesweep::css::parse_stylesheet;
///
/// let table = parse_stylesheet(".foo {} .bar{} .foo{} .foo{}", 0).unwrap();
/// assert_eq!(table.get(".foo").unwrap().occurrences_in_css, 3);
/// assert_eq!(table.get(".bar").unwrap().occurrences_in_css, 1);
/// ```
pub fn parse_stylesheet(css: &str, source: SourceId) -> Result<RuleTable, CssParseError> {
    let css = strip_unsupported(css);
    let mut input = ParserInput::new(&css);
    let mut parser = Parser::new(&mut input);

    let mut table = RuleTable::new();
    let mut collector = RuleCollector {
        table: &mut table,
        source,
    };

    let mut first_error = None;
    for result in StyleSheetParser::new(&mut parser, &mut collector) {
        if let Err((error, slice)) = result {
            if first_error.is_none() {
                first_error = Some(CssParseError {
                    line: error.location.line + 1,
                    column: error.location.column,
                    message: format!("{:?}", error.kind),
                    snippet: slice.trim().chars().take(60).collect(),
                });
            }
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(table),
    }
}

/// Token classes `consume_text` cares about
enum TextToken {
    Comment,
    Space,
    Other,
}

/// Consumes the rest of a (possibly delimited) input and returns its text
///
/// Top-level comments are dropped; whitespace left on both sides of a removed
/// comment collapses to the first run, so `.a /* c */ .b` reads `.a .b`.
fn consume_text(input: &mut Parser<'_, '_>) -> String {
    input.skip_whitespace();
    let mut text = String::new();
    let mut segment = input.position();

    loop {
        let before = input.position();
        let token = match input.next_including_whitespace_and_comments() {
            Ok(Token::Comment(_)) => TextToken::Comment,
            Ok(Token::WhiteSpace(_)) => TextToken::Space,
            Ok(_) => TextToken::Other,
            Err(_) => break,
        };

        match token {
            TextToken::Comment => {
                text.push_str(input.slice(segment..before));
                segment = input.position();
            }
            TextToken::Space if segment == before && text.ends_with(char::is_whitespace) => {
                segment = input.position();
            }
            TextToken::Space | TextToken::Other => {}
        }
    }

    text.push_str(input.slice_from(segment));
    text.trim().to_string()
}

/// Skips every remaining token of a block
fn skip_block(input: &mut Parser<'_, '_>) {
    while input.next_including_whitespace_and_comments().is_ok() {}
}

/// Prelude of an at-rule
enum AtPrelude {
    /// `@media`, whose nested rules are registered as top-level rules
    Media,
    /// Any other at-rule, registered by its prelude text
    Other(String),
}

/// Rule parser that registers selectors straight into a table
struct RuleCollector<'a> {
    table: &'a mut RuleTable,
    source: SourceId,
}

impl<'i> QualifiedRuleParser<'i> for RuleCollector<'_> {
    type Prelude = Vec<(String, usize)>;
    type QualifiedRule = ();
    type Error = RuleError;

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        input.parse_comma_separated(|input| {
            input.skip_whitespace();
            let offset = input.position().byte_index();
            let selector = consume_text(input);
            if selector.is_empty() {
                return Err(input.new_custom_error(RuleError::EmptySelector));
            }
            Ok((selector, offset))
        })
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        skip_block(input);
        for (selector, offset) in prelude {
            self.table.register_selector(&selector, self.source, offset);
        }
        Ok(())
    }
}

impl<'i> AtRuleParser<'i> for RuleCollector<'_> {
    type Prelude = AtPrelude;
    type AtRule = ();
    type Error = RuleError;

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let rest = consume_text(input);

        if name.eq_ignore_ascii_case("media") {
            return Ok(AtPrelude::Media);
        }

        let text = if rest.is_empty() {
            format!("@{}", &*name)
        } else {
            format!("@{} {}", &*name, rest)
        };
        Ok(AtPrelude::Other(text))
    }

    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        start: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        match prelude {
            AtPrelude::Other(text) => {
                self.table
                    .register_at_rule(&text, self.source, start.position().byte_index());
                Ok(())
            }
            AtPrelude::Media => Err(()),
        }
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        match prelude {
            AtPrelude::Media => {
                for result in StyleSheetParser::new(input, self) {
                    if let Err((error, _)) = result {
                        return Err(error);
                    }
                }
                Ok(())
            }
            AtPrelude::Other(text) => {
                skip_block(input);
                self.table
                    .register_at_rule(&text, self.source, start.position().byte_index());
                Ok(())
            }
        }
    }
}
