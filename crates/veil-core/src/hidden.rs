//! Hidden ranges and full ↔ visible coordinate mapping.
//!
//! Several independent sources contribute character ranges of the full text that must not be
//! shown: service comments (keyed by the comment's character offset) and folded blocks (keyed by
//! the block's first line). Contributions are stored per source and key, so each one can be
//! retracted on its own, and are merged into one canonical, sorted, non-overlapping set that all
//! coordinate conversions use.
//!
//! Overlapping or touching contributions coalesce into a single canonical range covering their
//! union. Retracting one of them recomputes the canonical set from the remaining contributions.
//!
//! # Example
//!
//! ```rust
//! use veil_core::{Affinity, HiddenRange, HiddenRanges, HiddenSource};
//!
//! let text = "ab// [START s]\ncd";
//! let ranges = HiddenRanges::new(text.chars().count()).copy_with_range(
//!     HiddenSource::ServiceComments,
//!     2,
//!     HiddenRange::new(2, 14, 0, 0, false),
//! );
//!
//! assert_eq!(ranges.cut_string(text), "ab\ncd");
//! // Text typed at the boundary goes before the hidden comment...
//! assert_eq!(ranges.recover_position(2, Affinity::Downstream).unwrap(), 2);
//! // ...unless the hidden range is placed before the point.
//! assert_eq!(ranges.recover_position(2, Affinity::Upstream).unwrap(), 14);
//! ```

use crate::error::{CoreError, Result};
use crate::spans::TokenSpan;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

/// A character range of the full text that is not visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HiddenRange {
    /// Start character offset (inclusive).
    pub start: usize,
    /// End character offset (exclusive).
    pub end: usize,
    /// First line touched by the range.
    pub first_line: usize,
    /// Last line touched by the range.
    pub last_line: usize,
    /// Whether the range hides its first line entirely (as opposed to a tail of it).
    pub whole_first_line: bool,
}

impl HiddenRange {
    /// Create a hidden range.
    pub fn new(
        start: usize,
        end: usize,
        first_line: usize,
        last_line: usize,
        whole_first_line: bool,
    ) -> Self {
        Self {
            start,
            end,
            first_line,
            last_line,
            whole_first_line,
        }
    }

    /// Number of hidden characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if range is empty
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Character range `[start, end)`.
    pub fn char_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Who contributed a hidden range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HiddenSource {
    /// Comments carrying section tags, keyed by the comment's character offset.
    ServiceComments,
    /// Folded blocks, keyed by the block's first line.
    FoldedBlocks,
}

/// Contributions of one source, by key.
pub type HiddenRangeMap = BTreeMap<usize, HiddenRange>;

/// Tie-break used when a recovered position touches a hidden range.
///
/// The affinity says on which side of the point the touching hidden range is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Affinity {
    /// The hidden range precedes the point: recover to the position after the range.
    Upstream,
    /// The hidden range follows the point: recover to the position before the range.
    #[default]
    Downstream,
}

/// A selection in character offsets. `base == extent` is a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSelection {
    /// Where the selection started.
    pub base: usize,
    /// Where the selection ends (the caret).
    pub extent: usize,
}

impl TextSelection {
    /// Create a selection.
    pub fn new(base: usize, extent: usize) -> Self {
        Self { base, extent }
    }

    /// Create a caret at `offset`.
    pub fn collapsed(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    /// Smaller endpoint.
    pub fn start(&self) -> usize {
        self.base.min(self.extent)
    }

    /// Larger endpoint.
    pub fn end(&self) -> usize {
        self.base.max(self.extent)
    }

    /// Returns `true` if the selection is a caret.
    pub fn is_collapsed(&self) -> bool {
        self.base == self.extent
    }
}

/// The canonical hidden-range set plus the keyed contributions it was built from.
///
/// Values are immutable; every `copy_*` method returns a new set and shares nothing mutable
/// with `self`.
#[derive(Debug, Clone)]
pub struct HiddenRanges {
    sources: Arc<BTreeMap<HiddenSource, HiddenRangeMap>>,
    ranges: Arc<[HiddenRange]>,
    text_length: usize,
}

impl HiddenRanges {
    /// Create an empty set for a text of `text_length` characters.
    pub fn new(text_length: usize) -> Self {
        Self {
            sources: Arc::new(BTreeMap::new()),
            ranges: Arc::from(Vec::new()),
            text_length,
        }
    }

    /// Build the canonical set from all contributions.
    pub fn from_sources(
        mut sources: BTreeMap<HiddenSource, HiddenRangeMap>,
        text_length: usize,
    ) -> Self {
        sources.retain(|_, map| !map.is_empty());
        let ranges = canonicalize(&sources, text_length);
        Self {
            sources: Arc::new(sources),
            ranges: Arc::from(ranges),
            text_length,
        }
    }

    /// Register one more range under `source` and `key` (replacing a previous one with the same key).
    pub fn copy_with_range(&self, source: HiddenSource, key: usize, range: HiddenRange) -> Self {
        let mut sources = (*self.sources).clone();
        sources.entry(source).or_default().insert(key, range);
        Self::from_sources(sources, self.text_length)
    }

    /// Retract the range registered under `source` and `key`. Unknown keys are a no-op.
    pub fn copy_without_range(&self, source: HiddenSource, key: usize) -> Self {
        if !self.contains_key(source, key) {
            return self.clone();
        }

        let mut sources = (*self.sources).clone();
        if let Some(map) = sources.get_mut(&source) {
            map.remove(&key);
        }
        Self::from_sources(sources, self.text_length)
    }

    /// Replace every contribution of `source` with `map` in one step.
    pub fn copy_merging_source_map(&self, source: HiddenSource, map: HiddenRangeMap) -> Self {
        let mut sources = (*self.sources).clone();
        sources.insert(source, map);
        Self::from_sources(sources, self.text_length)
    }

    /// Contributions of one source.
    pub fn source(&self, source: HiddenSource) -> Option<&HiddenRangeMap> {
        self.sources.get(&source)
    }

    /// Returns `true` if `source` has a contribution under `key`.
    pub fn contains_key(&self, source: HiddenSource, key: usize) -> bool {
        self.sources
            .get(&source)
            .is_some_and(|map| map.contains_key(&key))
    }

    /// Canonical ranges, sorted by start, pairwise disjoint and non-adjacent.
    pub fn ranges(&self) -> &[HiddenRange] {
        &self.ranges
    }

    /// Returns `true` if nothing is hidden.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Length of the full text, in characters.
    pub fn text_length(&self) -> usize {
        self.text_length
    }

    /// Length of the visible text, in characters.
    pub fn visible_length(&self) -> usize {
        let hidden: usize = self.ranges.iter().map(HiddenRange::len).sum();
        self.text_length - hidden
    }

    /// Remove every hidden range from `text`.
    pub fn cut_string(&self, text: &str) -> String {
        if self.ranges.is_empty() {
            return text.to_string();
        }

        let mut visible = String::with_capacity(text.len());
        let mut ranges = self.ranges.iter().peekable();

        for (offset, ch) in text.chars().enumerate() {
            while ranges.next_if(|r| offset >= r.end).is_some() {}
            if ranges.peek().is_some_and(|r| offset >= r.start) {
                continue;
            }
            visible.push(ch);
        }

        visible
    }

    /// Map a full-text offset to the visible text.
    ///
    /// Offsets inside a hidden range map to where the range collapses.
    pub fn cut_position(&self, position: usize) -> usize {
        let mut hidden = 0;
        for range in self.ranges.iter() {
            if position <= range.start {
                break;
            }
            if position < range.end {
                return range.start - hidden;
            }
            hidden += range.len();
        }
        position - hidden
    }

    /// Map a full-text selection to the visible text.
    pub fn cut_selection(&self, selection: Option<TextSelection>) -> Option<TextSelection> {
        selection.map(|s| TextSelection::new(self.cut_position(s.base), self.cut_position(s.extent)))
    }

    /// Slice a token span tree the same way [`cut_string`](Self::cut_string) slices text.
    ///
    /// Spans entirely inside hidden ranges are dropped, spans crossing a boundary are truncated,
    /// and all offsets are shifted to visible coordinates.
    pub fn cut_spans(&self, spans: &[TokenSpan]) -> Vec<TokenSpan> {
        spans
            .iter()
            .filter_map(|span| {
                let start = self.cut_position(span.start);
                let end = self.cut_position(span.end);
                (start < end).then(|| {
                    TokenSpan::with_children(start, end, span.style, self.cut_spans(&span.children))
                })
            })
            .collect()
    }

    /// Map a visible offset back to the full text.
    ///
    /// When the point touches a hidden range, `affinity` decides whether that range ends up
    /// before the point ([`Affinity::Upstream`]) or after it ([`Affinity::Downstream`]).
    pub fn recover_position(&self, visible: usize, affinity: Affinity) -> Result<usize> {
        let length = self.visible_length();
        if visible > length {
            return Err(CoreError::PositionOutOfRange {
                position: visible,
                length,
            });
        }

        let mut hidden = 0;
        for range in self.ranges.iter() {
            let visible_start = range.start - hidden;
            if visible < visible_start
                || (visible == visible_start && affinity == Affinity::Downstream)
            {
                break;
            }
            hidden += range.len();
        }
        Ok(visible + hidden)
    }

    /// The canonical range collapsed at visible offset `visible`, if any.
    pub fn range_at_visible(&self, visible: usize) -> Option<&HiddenRange> {
        let mut hidden = 0;
        for range in self.ranges.iter() {
            let visible_start = range.start - hidden;
            if visible_start >= visible {
                return (visible_start == visible).then_some(range);
            }
            hidden += range.len();
        }
        None
    }

    /// Map a visible selection back to the full text (downstream on both ends).
    pub fn recover_selection(
        &self,
        selection: Option<TextSelection>,
    ) -> Result<Option<TextSelection>> {
        selection
            .map(|s| {
                Ok(TextSelection::new(
                    self.recover_position(s.base, Affinity::Downstream)?,
                    self.recover_position(s.extent, Affinity::Downstream)?,
                ))
            })
            .transpose()
    }
}

impl Default for HiddenRanges {
    fn default() -> Self {
        Self::new(0)
    }
}

impl PartialEq for HiddenRanges {
    fn eq(&self, other: &Self) -> bool {
        self.text_length == other.text_length && self.sources == other.sources
    }
}

impl Eq for HiddenRanges {}

fn canonicalize(
    sources: &BTreeMap<HiddenSource, HiddenRangeMap>,
    text_length: usize,
) -> Vec<HiddenRange> {
    let mut all: Vec<HiddenRange> = sources
        .iter()
        .flat_map(|(source, map)| map.iter().map(move |(key, range)| (*source, *key, *range)))
        .filter(|(source, key, range)| {
            let valid = !range.is_empty() && range.end <= text_length;
            if !valid {
                tracing::warn!(
                    ?source,
                    key,
                    start = range.start,
                    end = range.end,
                    text_length,
                    "dropping invalid hidden range"
                );
            }
            valid
        })
        .map(|(_, _, range)| range)
        .collect();

    // Outer ranges first, so a coalesced range keeps the outermost contribution's first line.
    all.sort_by_key(|r| (r.start, Reverse(r.end)));

    let mut merged: Vec<HiddenRange> = Vec::with_capacity(all.len());
    for range in all {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => {
                last.end = last.end.max(range.end);
                last.last_line = last.last_line.max(range.last_line);
            }
            _ => merged.push(range),
        }
    }

    tracing::trace!(count = merged.len(), "hidden ranges recomputed");
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn range(start: usize, end: usize) -> HiddenRange {
        HiddenRange::new(start, end, 0, 0, false)
    }

    fn comments(ranges: &[(usize, usize)], text_length: usize) -> HiddenRanges {
        let map = ranges.iter().map(|&(s, e)| (s, range(s, e))).collect();
        HiddenRanges::from_sources(
            BTreeMap::from([(HiddenSource::ServiceComments, map)]),
            text_length,
        )
    }

    #[test]
    fn test_cut_string() {
        let ranges = comments(&[(1, 3), (5, 6)], 8);
        assert_eq!(ranges.cut_string("abcdefgh"), "adegh");
        assert_eq!(ranges.visible_length(), 5);
        assert_eq!(comments(&[], 3).cut_string("abc"), "abc");
    }

    #[test]
    fn test_cut_string_multibyte() {
        let ranges = comments(&[(1, 2)], 3);
        assert_eq!(ranges.cut_string("你好吗"), "你吗");
    }

    #[test]
    fn test_overlapping_sources_coalesce_and_retract() {
        let base = comments(&[(4, 6)], 20);
        let folded = base.copy_with_range(HiddenSource::FoldedBlocks, 1, range(2, 10));

        assert_eq!(folded.ranges(), &[range(2, 10)]);
        assert_eq!(folded.cut_string("0123456789abcdefghij"), "01abcdefghij");

        // Retracting the outer contribution brings the inner one back.
        let unfolded = folded.copy_without_range(HiddenSource::FoldedBlocks, 1);
        assert_eq!(unfolded.ranges(), &[range(4, 6)]);
        assert_eq!(unfolded, base);
    }

    #[test]
    fn test_touching_ranges_coalesce() {
        let ranges = comments(&[(2, 4), (4, 6), (8, 9)], 10);
        assert_eq!(ranges.ranges(), &[range(2, 6), range(8, 9)]);
    }

    #[test]
    fn test_invalid_ranges_are_dropped() {
        let ranges = comments(&[(3, 3), (5, 12), (1, 2)], 10);
        assert_eq!(ranges.ranges(), &[range(1, 2)]);
    }

    #[test]
    fn test_copy_without_unknown_key_is_noop() {
        let ranges = comments(&[(1, 2)], 5);
        let same = ranges.copy_without_range(HiddenSource::FoldedBlocks, 7);
        assert_eq!(same, ranges);
        assert_eq!(same.ranges(), ranges.ranges());
    }

    #[test]
    fn test_copy_merging_source_map_replaces_source() {
        let ranges = comments(&[(0, 1)], 20)
            .copy_with_range(HiddenSource::FoldedBlocks, 3, range(3, 5))
            .copy_with_range(HiddenSource::FoldedBlocks, 9, range(9, 11));

        let merged = ranges.copy_merging_source_map(
            HiddenSource::FoldedBlocks,
            BTreeMap::from([(14, range(14, 16))]),
        );
        assert_eq!(merged.ranges(), &[range(0, 1), range(14, 16)]);
        assert!(!merged.contains_key(HiddenSource::FoldedBlocks, 3));

        let cleared = merged.copy_merging_source_map(HiddenSource::FoldedBlocks, BTreeMap::new());
        assert!(cleared.source(HiddenSource::FoldedBlocks).is_none());
        assert_eq!(cleared.ranges(), &[range(0, 1)]);
    }

    #[test]
    fn test_fold_order_commutes() {
        let base = comments(&[], 30);
        let a = base
            .copy_with_range(HiddenSource::FoldedBlocks, 1, range(2, 5))
            .copy_with_range(HiddenSource::FoldedBlocks, 7, range(10, 15));
        let b = base
            .copy_with_range(HiddenSource::FoldedBlocks, 7, range(10, 15))
            .copy_with_range(HiddenSource::FoldedBlocks, 1, range(2, 5));
        assert_eq!(a, b);
        assert_eq!(a.ranges(), b.ranges());
    }

    #[test]
    fn test_cut_position_and_selection() {
        let ranges = comments(&[(2, 5)], 8);

        assert_eq!(ranges.cut_position(1), 1);
        assert_eq!(ranges.cut_position(2), 2);
        assert_eq!(ranges.cut_position(3), 2); // inside
        assert_eq!(ranges.cut_position(5), 2);
        assert_eq!(ranges.cut_position(7), 4);

        assert_eq!(
            ranges.cut_selection(Some(TextSelection::new(7, 1))),
            Some(TextSelection::new(4, 1))
        );
        assert_eq!(ranges.cut_selection(None), None);
    }

    #[test]
    fn test_recover_position_affinity() {
        // "ab[cde]fg" with "cde" hidden, visible "abfg".
        let ranges = comments(&[(2, 5)], 7);

        assert_eq!(ranges.recover_position(0, Affinity::Downstream).unwrap(), 0);
        assert_eq!(ranges.recover_position(2, Affinity::Downstream).unwrap(), 2);
        assert_eq!(ranges.recover_position(2, Affinity::Upstream).unwrap(), 5);
        assert_eq!(ranges.recover_position(3, Affinity::Downstream).unwrap(), 6);
        assert_eq!(ranges.recover_position(4, Affinity::Upstream).unwrap(), 7);
    }

    #[test]
    fn test_recover_position_hidden_at_text_edges() {
        let ranges = comments(&[(0, 2), (5, 7)], 7);

        assert_eq!(ranges.recover_position(0, Affinity::Downstream).unwrap(), 0);
        assert_eq!(ranges.recover_position(0, Affinity::Upstream).unwrap(), 2);
        assert_eq!(ranges.recover_position(3, Affinity::Downstream).unwrap(), 5);
        assert_eq!(ranges.recover_position(3, Affinity::Upstream).unwrap(), 7);
    }

    #[test]
    fn test_range_at_visible() {
        let ranges = comments(&[(0, 2), (4, 6)], 8);

        assert_eq!(ranges.range_at_visible(0), Some(&range(0, 2)));
        assert_eq!(ranges.range_at_visible(1), None);
        assert_eq!(ranges.range_at_visible(2), Some(&range(4, 6)));
        assert_eq!(ranges.range_at_visible(4), None);
    }

    #[test]
    fn test_recover_position_out_of_range() {
        let ranges = comments(&[(2, 5)], 7);
        assert!(matches!(
            ranges.recover_position(5, Affinity::Downstream),
            Err(CoreError::PositionOutOfRange {
                position: 5,
                length: 4
            })
        ));
    }

    #[test]
    fn test_recover_selection() {
        let ranges = comments(&[(2, 5)], 7);
        assert_eq!(
            ranges
                .recover_selection(Some(TextSelection::new(1, 3)))
                .unwrap(),
            Some(TextSelection::new(1, 6))
        );
        assert_eq!(ranges.recover_selection(None).unwrap(), None);
        assert!(
            ranges
                .recover_selection(Some(TextSelection::collapsed(9)))
                .is_err()
        );
    }

    #[test]
    fn test_cut_spans() {
        // Visible "ab|fg" out of "abcdefg", "cde" hidden.
        let ranges = comments(&[(2, 5)], 7);
        let spans = vec![
            TokenSpan::new(0, 3, 1), // straddles the start: truncated
            TokenSpan::new(2, 5, 2), // fully hidden: dropped
            TokenSpan::with_children(1, 7, 3, vec![TokenSpan::new(3, 4, 4), TokenSpan::new(5, 6, 5)]),
        ];

        assert_eq!(
            ranges.cut_spans(&spans),
            vec![
                TokenSpan::new(0, 2, 1),
                TokenSpan::with_children(1, 4, 3, vec![TokenSpan::new(2, 3, 5)]),
            ]
        );
    }

    #[test]
    fn test_random_round_trip() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..200 {
            let text: String = (0..rng.gen_range(0..40))
                .map(|_| if rng.gen_bool(0.2) { '\n' } else { rng.gen_range('a'..='e') })
                .collect();
            let length = text.chars().count();

            let mut map = HiddenRangeMap::new();
            let mut folds = HiddenRangeMap::new();
            for key in 0..rng.gen_range(0..5) {
                if length == 0 {
                    break;
                }
                let start = rng.gen_range(0..length);
                let end = rng.gen_range(start..=length);
                let target = if rng.gen_bool(0.5) { &mut map } else { &mut folds };
                target.insert(key, range(start, end));
            }
            let ranges = HiddenRanges::from_sources(
                BTreeMap::from([
                    (HiddenSource::ServiceComments, map),
                    (HiddenSource::FoldedBlocks, folds),
                ]),
                length,
            );

            let visible = ranges.cut_string(&text);
            assert_eq!(visible.chars().count(), ranges.visible_length());

            for pos in 0..=ranges.visible_length() {
                for affinity in [Affinity::Downstream, Affinity::Upstream] {
                    let full = ranges.recover_position(pos, affinity).unwrap();
                    let prefix: String = text.chars().take(full).collect();
                    let expected: String = visible.chars().take(pos).collect();
                    assert_eq!(ranges.cut_string(&prefix), expected);
                    assert_eq!(ranges.cut_position(full), pos);
                }
            }
        }
    }
}
