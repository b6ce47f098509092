//! Token span trees produced by highlighters.
//!
//! The engine treats highlighting output as opaque styled ranges that must be sliced the same
//! way as the text they describe.

use std::ops::Range;

/// Style ID type
pub type StyleId = u32;

/// A styled character range `[start, end)` with optional nested spans.
///
/// Children are expected to lie within their parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpan {
    /// Start character offset (inclusive).
    pub start: usize,
    /// End character offset (exclusive).
    pub end: usize,
    /// Style applied to the range.
    pub style: StyleId,
    /// Nested spans.
    pub children: Vec<TokenSpan>,
}

impl TokenSpan {
    /// Create a leaf span.
    pub fn new(start: usize, end: usize, style: StyleId) -> Self {
        Self {
            start,
            end,
            style,
            children: Vec::new(),
        }
    }

    /// Create a span with nested spans.
    pub fn with_children(start: usize, end: usize, style: StyleId, children: Vec<TokenSpan>) -> Self {
        Self {
            start,
            end,
            style,
            children,
        }
    }

    /// Character range of the span.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Check if range is empty
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Produces token spans for a full text.
pub trait Highlighter: Send + Sync {
    /// Highlight `text`, returning top-level spans in character offsets.
    fn highlight(&self, text: &str) -> Vec<TokenSpan>;
}
