//! Single-line comment discovery.
//!
//! Finds, for every line, the first single-line comment that is not inside a string literal.
//! The result feeds both the named-section parser and service-comment hiding.

use crate::line_index::LineIndex;
use veil_lang::CommentSyntax;

/// One single-line comment found in the full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentOccurrence {
    /// Line the comment is on.
    pub line_index: usize,
    /// Character offset of the comment prefix in the full text.
    pub char_index: usize,
    /// Comment text after the prefix.
    pub inner: String,
    /// Comment text including the prefix, up to the end of the line content.
    pub outer: String,
}

impl CommentOccurrence {
    /// Character offset just past the comment (end of the line content).
    pub fn end(&self) -> usize {
        self.char_index + self.outer.chars().count()
    }
}

/// Scan every line for a single-line comment.
///
/// Quotes (`"`, `'`, `` ` ``) open a literal that lasts until the matching quote or the end of
/// the line; a backslash escapes the next character inside a literal.
pub fn scan_line_comments(lines: &LineIndex, syntax: &CommentSyntax) -> Vec<CommentOccurrence> {
    let prefixes: Vec<Vec<char>> = syntax
        .prefixes_longest_first()
        .into_iter()
        .map(|p| p.chars().collect())
        .collect();
    if prefixes.is_empty() {
        return Vec::new();
    }

    lines
        .lines()
        .iter()
        .filter_map(|line| {
            let chars: Vec<char> = line.text.chars().collect();
            let (column, prefix_len) = find_comment_start(&chars, &prefixes)?;
            let outer: String = chars[column..].iter().collect();
            let inner: String = chars[column + prefix_len..].iter().collect();
            Some(CommentOccurrence {
                line_index: line.index,
                char_index: line.start + column,
                inner,
                outer,
            })
        })
        .collect()
}

/// Column and prefix length of the first comment on a line.
fn find_comment_start(chars: &[char], prefixes: &[Vec<char>]) -> Option<(usize, usize)> {
    let mut literals = LiteralTracker::default();

    for column in 0..chars.len() {
        if !literals.in_literal() {
            if let Some(prefix) = prefixes
                .iter()
                .find(|p| chars[column..].starts_with(p.as_slice()))
            {
                return Some((column, prefix.len()));
            }
        }
        literals.advance(chars, column);
    }

    None
}

/// Tracks string and char literals while scanning one line left to right.
#[derive(Debug, Default)]
pub(crate) struct LiteralTracker {
    quote: Option<char>,
    escaped: bool,
}

impl LiteralTracker {
    pub(crate) fn in_literal(&self) -> bool {
        self.quote.is_some()
    }

    /// Consume the char at `column`. Returns `true` if it is code, `false` if it belongs to a
    /// literal (quotes included).
    pub(crate) fn advance(&mut self, chars: &[char], column: usize) -> bool {
        let ch = chars[column];

        if let Some(quote) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == quote {
                self.quote = None;
            }
            return false;
        }

        if matches!(ch, '"' | '`') || (ch == '\'' && opens_char_literal(chars, column)) {
            self.quote = Some(ch);
            return false;
        }

        true
    }
}

/// A `'` after `&` or `<` is a lifetime, and one without a closing `'` on the line is
/// an apostrophe; neither opens a literal.
fn opens_char_literal(chars: &[char], column: usize) -> bool {
    let after_ref = column > 0 && matches!(chars[column - 1], '&' | '<');
    !after_ref && chars[column + 1..].contains(&'\'')
}
