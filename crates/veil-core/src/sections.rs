//! Named sections declared by tag comments.
//!
//! A section is opened by a `[START name]` tag and closed by an `[END name]` tag, each inside a
//! single-line comment. The tag grammar is pluggable through [`SectionParser`];
//! [`TagSectionParser`] is the default strategy.
//!
//! # Example
//!
//! ```rust
//! use veil_core::{CommentOccurrence, SectionParser, TagSectionParser};
//!
//! let comment = |line_index: usize, inner: &str| CommentOccurrence {
//!     line_index,
//!     char_index: 0,
//!     inner: inner.to_string(),
//!     outer: format!("//{inner}"),
//! };
//!
//! let parser = TagSectionParser::default();
//! let sections = parser.parse_sections(&[comment(1, " [START main]"), comment(4, " [END main]")]);
//!
//! assert_eq!(sections.len(), 1);
//! assert_eq!(sections[0].name, "main");
//! assert_eq!(sections[0].start_line, 1);
//! assert_eq!(sections[0].end_line, Some(4));
//! ```

use crate::comments::CommentOccurrence;
use crate::error::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

static START_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\s*)START(\s+)([_0-9A-Za-z]+)(\s*)\]").expect("valid start tag regex")
});

static END_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\s*)END(\s+)([_0-9A-Za-z]+)(\s*)\]").expect("valid end tag regex")
});

/// Capture group holding the section name in a tag pattern.
const NAME_GROUP: usize = 3;

/// A named, possibly unterminated line range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedSection {
    /// Section name (`[A-Za-z0-9_]+`).
    pub name: String,
    /// First line of the section (the line of its earliest start tag, or 0).
    pub start_line: usize,
    /// Last line of the section (the line of its latest end tag), `None` if open to the end.
    pub end_line: Option<usize>,
}

impl NamedSection {
    /// Inclusive line range, resolving an open end to `last_line`.
    pub fn line_range(&self, last_line: usize) -> RangeInclusive<usize> {
        self.start_line..=self.end_line.unwrap_or(last_line)
    }

    /// Returns `true` if the section shares at least one line with `first..=last`.
    pub fn overlaps_lines(&self, first: usize, last: usize) -> bool {
        self.start_line <= last && self.end_line.is_none_or(|end| end >= first)
    }
}

/// A strategy that turns comment occurrences into named sections.
pub trait SectionParser: Send + Sync {
    /// Parse sections from all comments of a document. At most one section per name.
    fn parse_sections(&self, comments: &[CommentOccurrence]) -> Vec<NamedSection>;

    /// Returns `true` if a comment's inner text carries section tags.
    ///
    /// Such comments are service comments and get hidden from the visible text.
    fn is_service_comment(&self, text: &str) -> bool;
}

/// Default tag grammar: `[START name]` / `[END name]`.
///
/// Whitespace is allowed inside the brackets, around the keyword and around the name. Keywords
/// are case-sensitive and the name must be non-empty `[A-Za-z0-9_]+`.
#[derive(Debug, Clone)]
pub struct TagSectionParser {
    start: Regex,
    end: Regex,
}

impl TagSectionParser {
    /// Build the same grammar around custom keywords (e.g. `BEGIN` / `FINISH`).
    pub fn with_keywords(start_keyword: &str, end_keyword: &str) -> Result<Self> {
        Ok(Self {
            start: Regex::new(&tag_pattern(start_keyword))?,
            end: Regex::new(&tag_pattern(end_keyword))?,
        })
    }
}

impl Default for TagSectionParser {
    fn default() -> Self {
        Self {
            start: START_TAG.clone(),
            end: END_TAG.clone(),
        }
    }
}

fn tag_pattern(keyword: &str) -> String {
    format!(
        r"\[(\s*){}(\s+)([_0-9A-Za-z]+)(\s*)\]",
        regex::escape(keyword)
    )
}

impl SectionParser for TagSectionParser {
    fn parse_sections(&self, comments: &[CommentOccurrence]) -> Vec<NamedSection> {
        let mut starts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut ends: BTreeMap<&str, usize> = BTreeMap::new();

        for comment in comments {
            for name in tag_names(&self.start, &comment.inner) {
                starts
                    .entry(name)
                    .and_modify(|line| *line = (*line).min(comment.line_index))
                    .or_insert(comment.line_index);
            }
            for name in tag_names(&self.end, &comment.inner) {
                ends.entry(name)
                    .and_modify(|line| *line = (*line).max(comment.line_index))
                    .or_insert(comment.line_index);
            }
        }

        let mut names: Vec<&str> = starts.keys().chain(ends.keys()).copied().collect();
        names.sort_unstable();
        names.dedup();

        names
            .into_iter()
            .map(|name| NamedSection {
                name: name.to_string(),
                start_line: starts.get(name).copied().unwrap_or(0),
                end_line: ends.get(name).copied(),
            })
            .collect()
    }

    fn is_service_comment(&self, text: &str) -> bool {
        self.start.is_match(text) || self.end.is_match(text)
    }
}

fn tag_names<'t>(pattern: &Regex, text: &'t str) -> impl Iterator<Item = &'t str> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(NAME_GROUP).map(|m| m.as_str()))
}
