//! Document snapshot.
//!
//! [`Code`] aggregates everything derived from one full text: line index, comments, named
//! sections, foldable blocks, the hidden-range set, and the visible projection of the text and
//! its token spans. It is an immutable value: folding, unfolding and re-associating folds all
//! return a new snapshot, sharing every sub-structure that did not change.
//!
//! Edits are made against the visible text. [`Code::edit_result`] maps such an edit back to a
//! replacement of the full text, leaving hidden content intact; the caller then builds the next
//! snapshot from the new full text and carries fold state over with [`Code::folded_as`].
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeSet;
//! use veil_core::{Code, Language, TagSectionParser, TextSelection, VisibleValue};
//! use veil_lang::LanguageConfig;
//!
//! let language = Language::with_brace_blocks(LanguageConfig::rust());
//! let parser = TagSectionParser::default();
//! let code = Code::new(
//!     "fn main() { // [START main]\n    run();\n}\n",
//!     &language,
//!     &parser,
//!     &BTreeSet::new(),
//! );
//! assert_eq!(code.visible_text(), "fn main() { \n    run();\n}\n");
//!
//! let folded = code.folded_at(0);
//! assert_eq!(folded.visible_text(), "fn main() { \n");
//!
//! // Type at the very end of the visible text.
//! let old = VisibleValue::new(folded.visible_text(), Some(TextSelection::collapsed(13)));
//! let new = VisibleValue::new("fn main() { \n// done", Some(TextSelection::collapsed(20)));
//! let result = folded.edit_result(&old, &new).unwrap();
//! assert_eq!(
//!     result.full_text_after,
//!     "fn main() { // [START main]\n    run();\n}\n// done"
//! );
//! ```

use crate::blocks::{FoldableBlock, match_folded_blocks};
use crate::comments::{CommentOccurrence, scan_line_comments};
use crate::delta::TextDeltaEdit;
use crate::error::Result;
use crate::hidden::{
    Affinity, HiddenRange, HiddenRangeMap, HiddenRanges, HiddenSource, TextSelection,
};
use crate::line_index::LineIndex;
use crate::processing::Language;
use crate::sections::{NamedSection, SectionParser, TagSectionParser};
use crate::spans::TokenSpan;
use crate::text::{common_prefix_chars, common_suffix_chars};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Range, RangeInclusive};
use std::sync::{Arc, LazyLock};

static EMPTY: LazyLock<Code> = LazyLock::new(|| {
    Code::new(
        "",
        &Language::plain_text(),
        &TagSectionParser::default(),
        &BTreeSet::new(),
    )
});

/// What the UI holds: the visible text and its selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VisibleValue {
    /// Visible text.
    pub text: String,
    /// Selection in visible coordinates, `None` when there is none.
    pub selection: Option<TextSelection>,
}

impl VisibleValue {
    /// Create a visible value.
    pub fn new(text: impl Into<String>, selection: Option<TextSelection>) -> Self {
        Self {
            text: text.into(),
            selection,
        }
    }
}

/// A visible edit mapped onto the full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditResult {
    /// Full text after the edit.
    pub full_text_after: String,
    /// Lines of the pre-edit full text touched by the edit, `None` when nothing changed.
    pub lines_changed: Option<RangeInclusive<usize>>,
    /// Changed range of the pre-edit visible text, `None` when nothing changed.
    pub visible_changed: Option<Range<usize>>,
    /// The replacement applied to the full text, `None` when nothing changed.
    pub delta: Option<TextDeltaEdit>,
}

impl EditResult {
    fn unchanged(full_text: &str) -> Self {
        Self {
            full_text_after: full_text.to_string(),
            lines_changed: None,
            visible_changed: None,
            delta: None,
        }
    }

    /// Replaced character range of the pre-edit full text.
    pub fn characters_changed(&self) -> Option<Range<usize>> {
        self.delta.as_ref().map(TextDeltaEdit::deleted_range)
    }

    /// Returns `true` if the edit did not change anything.
    pub fn is_unchanged(&self) -> bool {
        self.delta.is_none()
    }
}

/// An immutable snapshot of a document and its visible projection.
#[derive(Debug, Clone)]
pub struct Code {
    text: Arc<str>,
    language: Language,
    lines: Arc<LineIndex>,
    comments: Arc<[CommentOccurrence]>,
    sections: Arc<BTreeMap<String, NamedSection>>,
    blocks: Arc<[FoldableBlock]>,
    hidden: HiddenRanges,
    folded: Arc<BTreeSet<FoldableBlock>>,
    spans: Option<Arc<[TokenSpan]>>,
    visible_text: Arc<str>,
    visible_spans: Option<Arc<[TokenSpan]>>,
}

impl Code {
    /// Build a snapshot from a full text.
    ///
    /// Service comments (comments the section parser recognizes) are hidden, and lines of the
    /// sections named in `read_only_sections` are marked read-only. Nothing is folded.
    pub fn new(
        text: &str,
        language: &Language,
        section_parser: &dyn SectionParser,
        read_only_sections: &BTreeSet<String>,
    ) -> Self {
        let mut lines = LineIndex::from_text(text);
        let comments = scan_line_comments(&lines, &language.config().comments);
        let blocks = language.parse_blocks(&lines, &comments);

        let sections: BTreeMap<String, NamedSection> = section_parser
            .parse_sections(&comments)
            .into_iter()
            .map(|section| (section.name.clone(), section))
            .collect();

        let last_line = lines.line_count() - 1;
        for name in read_only_sections {
            if let Some(section) = sections.get(name) {
                lines.mark_read_only(section.line_range(last_line));
            }
        }

        let service_comments: HiddenRangeMap = comments
            .iter()
            .filter(|c| section_parser.is_service_comment(&c.inner))
            .filter_map(|c| Some((c.char_index, service_comment_range(&lines, c)?)))
            .collect();
        let hidden = HiddenRanges::from_sources(
            BTreeMap::from([(HiddenSource::ServiceComments, service_comments)]),
            lines.char_count(),
        );

        let spans: Option<Arc<[TokenSpan]>> = language.highlight(text).map(Arc::from);
        let visible_text: Arc<str> = Arc::from(hidden.cut_string(text));
        let visible_spans = spans.as_deref().map(|s| Arc::from(hidden.cut_spans(s)));

        tracing::debug!(
            language = %language.config().name,
            lines = lines.line_count(),
            sections = sections.len(),
            blocks = blocks.len(),
            hidden = hidden.ranges().len(),
            "code snapshot built"
        );

        Self {
            text: Arc::from(text),
            language: language.clone(),
            lines: Arc::new(lines),
            comments: Arc::from(comments),
            sections: Arc::new(sections),
            blocks: Arc::from(blocks),
            hidden,
            folded: Arc::new(BTreeSet::new()),
            spans,
            visible_text,
            visible_spans,
        }
    }

    /// The process-wide empty snapshot.
    pub fn empty() -> Self {
        EMPTY.clone()
    }

    /// Full text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Visible text: the full text with every hidden range removed.
    pub fn visible_text(&self) -> &str {
        &self.visible_text
    }

    /// Language the snapshot was built with.
    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Line index of the full text.
    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }

    /// Single-line comments of the full text.
    pub fn comments(&self) -> &[CommentOccurrence] {
        &self.comments
    }

    /// Named sections, by name.
    pub fn named_sections(&self) -> &BTreeMap<String, NamedSection> {
        &self.sections
    }

    /// Look up a section by name.
    pub fn section(&self, name: &str) -> Option<&NamedSection> {
        self.sections.get(name)
    }

    /// Foldable blocks, sorted by first line.
    pub fn blocks(&self) -> &[FoldableBlock] {
        &self.blocks
    }

    /// Currently folded blocks.
    pub fn folded_blocks(&self) -> &BTreeSet<FoldableBlock> {
        &self.folded
    }

    /// Hidden-range set.
    pub fn hidden_ranges(&self) -> &HiddenRanges {
        &self.hidden
    }

    /// Token spans of the full text, if the language has a highlighter.
    pub fn spans(&self) -> Option<&[TokenSpan]> {
        self.spans.as_deref()
    }

    /// Token spans of the visible text, if the language has a highlighter.
    pub fn visible_spans(&self) -> Option<&[TokenSpan]> {
        self.visible_spans.as_deref()
    }

    /// The block starting at `line`, if any.
    pub fn block_at(&self, line: usize) -> Option<FoldableBlock> {
        self.blocks
            .binary_search_by_key(&line, |b| b.first_line)
            .ok()
            .map(|idx| self.blocks[idx])
    }

    /// Returns `true` if a folded block starts at `line`.
    pub fn is_folded(&self, line: usize) -> bool {
        self.folded.iter().any(|b| b.first_line == line)
    }

    /// Returns `true` if any line of the inclusive range is read-only.
    pub fn is_read_only_in_line_range(&self, range: RangeInclusive<usize>) -> bool {
        self.lines.is_read_only_in_range(range)
    }

    /// Returns `true` if a visible selection touches a read-only line.
    ///
    /// A collapsed caret is checked at its [`insertion_point`](Self::insertion_point).
    pub fn is_read_only_selected(&self, selection: Option<TextSelection>) -> Result<bool> {
        let Some(selection) = selection else {
            return Ok(false);
        };
        let (start, end) = if selection.is_collapsed() {
            let point = self.insertion_point(selection.start())?;
            (point, point)
        } else {
            (
                self.hidden
                    .recover_position(selection.start(), Affinity::Downstream)?,
                self.hidden
                    .recover_position(selection.end(), Affinity::Downstream)?,
            )
        };
        let first = self.lines.char_to_line(start)?;
        let last = self.lines.char_to_line(end)?;
        Ok(self.is_read_only_in_line_range(first..=last))
    }

    /// Map a full-text selection to the visible text.
    pub fn visible_selection(&self, selection: Option<TextSelection>) -> Option<TextSelection> {
        self.hidden.cut_selection(selection)
    }

    /// Map a visible selection to the full text.
    pub fn full_selection(&self, selection: Option<TextSelection>) -> Result<Option<TextSelection>> {
        self.hidden.recover_selection(selection)
    }

    /// Fold the block starting at `line`.
    ///
    /// The block's first line stays visible; everything from the end of its text to the end of
    /// the last line's text is hidden, so the line after the block keeps its indentation. Folding
    /// a missing or already folded block returns an identical snapshot.
    pub fn folded_at(&self, line: usize) -> Self {
        let Some(block) = self.block_at(line) else {
            return self.clone();
        };
        if self.folded.contains(&block) {
            return self.clone();
        }
        let Some(range) = self.fold_range(&block) else {
            return self.clone();
        };

        tracing::debug!(
            first_line = block.first_line,
            last_line = block.last_line,
            "fold block"
        );
        let hidden = self
            .hidden
            .copy_with_range(HiddenSource::FoldedBlocks, block.first_line, range);
        let mut folded = (*self.folded).clone();
        folded.insert(block);
        self.with_hidden(hidden, folded)
    }

    /// Unfold the folded block starting at `line`. No-op if there is none.
    pub fn unfolded_at(&self, line: usize) -> Self {
        let Some(block) = self.folded.iter().find(|b| b.first_line == line).copied() else {
            return self.clone();
        };

        tracing::debug!(
            first_line = block.first_line,
            last_line = block.last_line,
            "unfold block"
        );
        let hidden = self
            .hidden
            .copy_without_range(HiddenSource::FoldedBlocks, block.first_line);
        let mut folded = (*self.folded).clone();
        folded.remove(&block);
        self.with_hidden(hidden, folded)
    }

    /// Fold the block at `line` if it is unfolded, unfold it otherwise.
    pub fn toggled_at(&self, line: usize) -> Self {
        if self.is_folded(line) {
            self.unfolded_at(line)
        } else {
            self.folded_at(line)
        }
    }

    /// Carry the fold state of `old` over to this freshly built snapshot.
    ///
    /// Blocks of `self` that match a folded block of `old` get folded; all other blocks are
    /// unfolded. See [`match_folded_blocks`] for the matching rule.
    pub fn folded_as(&self, old: &Code) -> Self {
        let folded = match_folded_blocks(
            &old.blocks,
            &old.lines,
            &old.folded,
            &self.blocks,
            &self.lines,
        );
        tracing::debug!(
            before = old.folded.len(),
            after = folded.len(),
            "folds carried over"
        );
        self.with_folded_set(folded)
    }

    /// Fold every imports block.
    pub fn folded_imports(&self) -> Self {
        let mut folded = (*self.folded).clone();
        folded.extend(self.blocks.iter().filter(|b| b.is_imports));
        self.with_folded_set(folded)
    }

    /// Fold the comment block starting at line 0, typically a license header.
    pub fn folded_comment_at_line_zero(&self) -> Self {
        match self.block_at(0) {
            Some(block) if block.is_comment => self.folded_at(0),
            _ => self.clone(),
        }
    }

    /// Fold every block that shares no line with any of the named sections.
    ///
    /// Names that do not exist are ignored; if none of them exists nothing is folded.
    pub fn folded_outside_sections(&self, names: &BTreeSet<String>) -> Self {
        let sections: Vec<&NamedSection> = names
            .iter()
            .filter_map(|name| self.sections.get(name))
            .collect();
        if sections.is_empty() {
            return self.clone();
        }

        let mut folded = (*self.folded).clone();
        folded.extend(self.blocks.iter().filter(|block| {
            !sections
                .iter()
                .any(|s| s.overlaps_lines(block.first_line, block.last_line))
        }));
        self.with_folded_set(folded)
    }

    /// Unfold every block.
    pub fn unfolded_all(&self) -> Self {
        if self.folded.is_empty() {
            return self.clone();
        }
        self.with_folded_set(BTreeSet::new())
    }

    /// Map a change of the visible text onto the full text.
    ///
    /// `old` is what the UI showed before the change, `new` is what it shows after. The changed
    /// visible range lies between the longest common prefix and suffix of
    /// [`visible_text`](Self::visible_text) and `new.text`. When those overlap, as when typing
    /// into a run of equal characters, the old selection's start picks the split.
    ///
    /// Hidden ranges touching the changed range are never swallowed by it:
    ///
    /// - a hidden range at the end boundary is placed after the new text;
    /// - when visible text is replaced or deleted, a hidden range at the start boundary is placed
    ///   before the new text, so deleting the character after a tag comment keeps the tag;
    /// - a pure insertion lands before a hidden range touching its point (`aX// [START s]`),
    ///   unless that range is a run of whole hidden lines ending at a line start: the point is
    ///   then the start of the next visible line and the text goes there, after the hidden lines.
    ///
    /// The caller decides whether to accept the edit, typically by rejecting it when
    /// [`is_read_only_in_line_range`](Self::is_read_only_in_line_range) holds for
    /// [`EditResult::lines_changed`].
    pub fn edit_result(&self, old: &VisibleValue, new: &VisibleValue) -> Result<EditResult> {
        if old.text != *self.visible_text {
            tracing::warn!("old visible value does not match the snapshot's visible text");
        }

        let visible = &*self.visible_text;
        let old_len = self.hidden.visible_length();
        let new_len = new.text.chars().count();

        let min_len = old_len.min(new_len);
        let common_prefix = common_prefix_chars(visible, &new.text);
        let common_suffix = common_suffix_chars(visible, &new.text, min_len);
        let prefix = if common_prefix + common_suffix > min_len {
            // Every split in [min_len - common_suffix, common_prefix] yields the same texts.
            let anchor = old.selection.map_or(common_prefix, |s| s.start());
            anchor.clamp(min_len - common_suffix, common_prefix)
        } else {
            common_prefix
        };
        let suffix = common_suffix.min(min_len - prefix);

        let visible_start = prefix;
        let old_visible_end = old_len - suffix;
        let new_visible_end = new_len - suffix;
        if visible_start == old_visible_end && visible_start == new_visible_end {
            return Ok(EditResult::unchanged(&self.text));
        }

        let inserted_text: String = new
            .text
            .chars()
            .skip(visible_start)
            .take(new_visible_end - visible_start)
            .collect();

        let (full_start, full_end) = if old_visible_end > visible_start {
            (
                self.hidden.recover_position(visible_start, Affinity::Upstream)?,
                self.hidden
                    .recover_position(old_visible_end, Affinity::Downstream)?,
            )
        } else {
            let point = self.insertion_point(visible_start)?;
            (point, point)
        };

        let start_byte = self.lines.char_to_byte(full_start)?;
        let end_byte = self.lines.char_to_byte(full_end)?;
        let mut full_text_after =
            String::with_capacity(self.text.len() - (end_byte - start_byte) + inserted_text.len());
        full_text_after.push_str(&self.text[..start_byte]);
        full_text_after.push_str(&inserted_text);
        full_text_after.push_str(&self.text[end_byte..]);

        let first_line = self.lines.char_to_line(full_start)?;
        // An edit starting at a line start may glue the line holding its end onto it.
        let last_char = if self.starts_line(full_start) {
            full_end
        } else {
            full_end.saturating_sub(1)
        };
        let last_line = self.lines.char_to_line(last_char.max(full_start))?;

        let delta = TextDeltaEdit {
            start: full_start,
            deleted_text: self.text[start_byte..end_byte].to_string(),
            inserted_text,
        };
        tracing::debug!(
            start = delta.start,
            deleted = delta.deleted_len(),
            inserted = delta.inserted_len(),
            first_line,
            last_line,
            "visible edit mapped to full text"
        );

        Ok(EditResult {
            full_text_after,
            lines_changed: Some(first_line..=last_line),
            visible_changed: Some(visible_start..old_visible_end),
            delta: Some(delta),
        })
    }

    /// Full offset for text inserted at visible offset `position`.
    ///
    /// See [`edit_result`](Self::edit_result) for where the text lands around hidden ranges.
    pub fn insertion_point(&self, position: usize) -> Result<usize> {
        let affinity = match self.hidden.range_at_visible(position) {
            Some(range) if range.whole_first_line && self.starts_line(range.end) => {
                Affinity::Upstream
            }
            _ => Affinity::Downstream,
        };
        self.hidden.recover_position(position, affinity)
    }

    fn starts_line(&self, offset: usize) -> bool {
        self.lines
            .char_to_line(offset)
            .ok()
            .and_then(|index| self.lines.line(index))
            .is_some_and(|line| line.start == offset)
    }

    /// Hidden range of a folded block.
    fn fold_range(&self, block: &FoldableBlock) -> Option<HiddenRange> {
        let first = self.lines.line(block.first_line)?;
        let last = self.lines.line(block.last_line)?;
        Some(HiddenRange::new(
            first.text_end(),
            last.text_end(),
            block.first_line,
            block.last_line,
            false,
        ))
    }

    /// Replace the whole folded-block contribution with the ranges of `folded`.
    fn with_folded_set(&self, folded: BTreeSet<FoldableBlock>) -> Self {
        let map: HiddenRangeMap = folded
            .iter()
            .filter_map(|block| Some((block.first_line, self.fold_range(block)?)))
            .collect();
        let hidden = self
            .hidden
            .copy_merging_source_map(HiddenSource::FoldedBlocks, map);
        self.with_hidden(hidden, folded)
    }

    /// New snapshot sharing everything but the hidden ranges and the folded set.
    fn with_hidden(&self, hidden: HiddenRanges, folded: BTreeSet<FoldableBlock>) -> Self {
        let visible_text = Arc::from(hidden.cut_string(&self.text));
        let visible_spans = self
            .spans
            .as_deref()
            .map(|spans| Arc::from(hidden.cut_spans(spans)));

        Self {
            hidden,
            folded: Arc::new(folded),
            visible_text,
            visible_spans,
            ..self.clone()
        }
    }
}

impl Default for Code {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Code {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
            && self.lines.lines() == other.lines.lines()
            && self.sections == other.sections
            && self.blocks == other.blocks
            && self.hidden == other.hidden
            && self.folded == other.folded
            && self.spans == other.spans
    }
}

/// Hidden range of a service comment.
///
/// A comment alone on its line hides the whole line, newline included. A trailing comment hides
/// from its prefix to the end of the line's text.
fn service_comment_range(lines: &LineIndex, comment: &CommentOccurrence) -> Option<HiddenRange> {
    let line = lines.line(comment.line_index)?;
    let alone = line
        .text
        .chars()
        .take(comment.char_index - line.start)
        .all(char::is_whitespace);

    Some(if alone {
        HiddenRange::new(line.start, line.end, line.index, line.index, true)
    } else {
        HiddenRange::new(comment.char_index, comment.end(), line.index, line.index, false)
    })
}
