//! Logical Line Index
//!
//! Splits the full text into line records backed by a Rope, supporting O(log N) lookup of the
//! line that contains a character offset.
//!
//! Only `'\n'` terminates a line, so a text with N newlines always has N + 1 lines. A trailing
//! `'\r'` stays inside the line's character range but is not part of [`LineRecord::text`].

use crate::error::{CoreError, Result};
use ropey::Rope;
use std::ops::{Range, RangeInclusive};

/// One logical line of the full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    /// Zero-based line number.
    pub index: usize,
    /// Start character offset (inclusive).
    pub start: usize,
    /// End character offset (exclusive). Includes the trailing `'\n'` for every line but the last.
    pub end: usize,
    /// Line content without the line terminator.
    pub text: String,
    /// Whether the line belongs to a read-only section.
    pub read_only: bool,
}

impl LineRecord {
    /// Character range `[start, end)` of the line, terminator included.
    pub fn char_range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Character offset just past the line content (before any `"\r\n"` / `'\n'`).
    pub fn text_end(&self) -> usize {
        self.start + self.text.chars().count()
    }

    /// Returns `true` if `pos` lies within `[start, end)`.
    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.start && pos < self.end
    }
}

/// Logical line index - implemented using Rope data structure
#[derive(Debug, Clone)]
pub struct LineIndex {
    rope: Rope,
    lines: Vec<LineRecord>,
}

impl LineIndex {
    /// Build line index from text. All lines start writable.
    pub fn from_text(text: &str) -> Self {
        let rope = Rope::from_str(text);
        let mut lines = Vec::with_capacity(rope.len_lines());

        for (index, line) in rope.lines().enumerate() {
            let start = rope.line_to_char(index);
            let end = start + line.len_chars();

            let mut content = line.to_string();
            if content.ends_with('\n') {
                content.pop();
            }
            if content.ends_with('\r') {
                content.pop();
            }

            lines.push(LineRecord {
                index,
                start,
                end,
                text: content,
                read_only: false,
            });
        }

        Self { rope, lines }
    }

    /// Mark an inclusive line range read-only. Lines past the end are ignored.
    pub fn mark_read_only(&mut self, range: RangeInclusive<usize>) {
        let last = self.lines.len().saturating_sub(1);
        let (first, end) = (*range.start(), (*range.end()).min(last));
        for line in self.lines.iter_mut().take(end + 1).skip(first) {
            line.read_only = true;
        }
    }

    /// Get the line that contains `char_offset`.
    ///
    /// `char_offset == char_count()` resolves to the last line. Offsets past the end are
    /// rejected rather than clamped.
    pub fn char_to_line(&self, char_offset: usize) -> Result<usize> {
        self.check_offset(char_offset)?;
        Ok(self.rope.char_to_line(char_offset))
    }

    /// Get line number and offset within line from character offset
    pub fn char_offset_to_position(&self, char_offset: usize) -> Result<(usize, usize)> {
        let line_idx = self.char_to_line(char_offset)?;
        Ok((line_idx, char_offset - self.lines[line_idx].start))
    }

    /// Byte offset in the full text of a character offset.
    pub fn char_to_byte(&self, char_offset: usize) -> Result<usize> {
        self.check_offset(char_offset)?;
        Ok(self.rope.char_to_byte(char_offset))
    }

    /// Text of a character range.
    pub fn slice(&self, range: Range<usize>) -> Result<String> {
        self.check_offset(range.end)?;
        if range.start > range.end {
            return Err(CoreError::PositionOutOfRange {
                position: range.start,
                length: range.end,
            });
        }
        Ok(self.rope.slice(range).to_string())
    }

    /// Get the record of the specified line.
    pub fn line(&self, line_number: usize) -> Option<&LineRecord> {
        self.lines.get(line_number)
    }

    /// All line records in order.
    pub fn lines(&self) -> &[LineRecord] {
        &self.lines
    }

    /// Get text of the specified line (excluding newline)
    pub fn get_line_text(&self, line_number: usize) -> Option<&str> {
        self.lines.get(line_number).map(|l| l.text.as_str())
    }

    /// Returns `true` if any line of the inclusive range is read-only.
    pub fn is_read_only_in_range(&self, range: RangeInclusive<usize>) -> bool {
        let (first, last) = (*range.start(), *range.end());
        if first > last {
            return false;
        }
        self.lines
            .iter()
            .skip(first)
            .take(last - first + 1)
            .any(|l| l.read_only)
    }

    /// Get total line count
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Get total character count
    pub fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    /// Get complete text
    pub fn get_text(&self) -> String {
        self.rope.to_string()
    }

    fn check_offset(&self, char_offset: usize) -> Result<()> {
        let length = self.rope.len_chars();
        if char_offset > length {
            return Err(CoreError::PositionOutOfRange {
                position: char_offset,
                length,
            });
        }
        Ok(())
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::from_text("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_has_one_line() {
        let index = LineIndex::from_text("");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.char_count(), 0);
        assert_eq!(index.line(0).map(|l| l.char_range()), Some(0..0));
        assert_eq!(index.char_to_line(0).unwrap(), 0);
    }

    #[test]
    fn test_ranges_are_contiguous() {
        let text = "First line\n\nThird 你好\n";
        let index = LineIndex::from_text(text);

        assert_eq!(index.line_count(), text.matches('\n').count() + 1);
        for pair in index.lines().windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        let last = index.lines().last().unwrap();
        assert_eq!(last.end, text.chars().count());
        assert_eq!(last.text, "");
    }

    #[test]
    fn test_line_text_and_ranges() {
        let index = LineIndex::from_text("ABC\nDEF\nGHI");

        let line1 = index.line(1).unwrap();
        assert_eq!(line1.text, "DEF");
        assert_eq!(line1.char_range(), 4..8);
        assert_eq!(line1.text_end(), 7);
        assert_eq!(index.line(2).unwrap().char_range(), 8..11);
        assert!(index.line(3).is_none());
    }

    #[test]
    fn test_char_to_line() {
        let index = LineIndex::from_text("ABC\nDEF\nGHI");

        assert_eq!(index.char_to_line(0).unwrap(), 0);
        assert_eq!(index.char_to_line(3).unwrap(), 0); // '\n' belongs to line 0
        assert_eq!(index.char_to_line(4).unwrap(), 1);
        assert_eq!(index.char_to_line(11).unwrap(), 2); // end of text
        assert_eq!(index.char_offset_to_position(9).unwrap(), (2, 1));
    }

    #[test]
    fn test_char_to_line_out_of_range() {
        let index = LineIndex::from_text("ABC");
        assert!(matches!(
            index.char_to_line(4),
            Err(CoreError::PositionOutOfRange {
                position: 4,
                length: 3
            })
        ));
    }

    #[test]
    fn test_crlf_stays_in_range_but_not_in_text() {
        let index = LineIndex::from_text("a\r\nb");
        assert_eq!(index.line_count(), 2);
        assert_eq!(index.line(0).unwrap().text, "a");
        assert_eq!(index.line(0).unwrap().char_range(), 0..3);
        assert_eq!(index.line(0).unwrap().text_end(), 1);
    }

    #[test]
    fn test_lone_carriage_return_is_not_a_line_break() {
        let index = LineIndex::from_text("a\rb\u{2028}c");
        assert_eq!(index.line_count(), 1);
    }

    #[test]
    fn test_read_only_marking() {
        let mut index = LineIndex::from_text("0\n1\n2\n3\n4\n5");
        index.mark_read_only(2..=4);

        assert!(!index.is_read_only_in_range(0..=1));
        assert!(index.is_read_only_in_range(1..=2));
        assert!(index.is_read_only_in_range(4..=4));
        assert!(!index.is_read_only_in_range(5..=5));

        // Ranges past the end are clamped.
        index.mark_read_only(5..=100);
        assert!(index.is_read_only_in_range(5..=5));
    }

    #[test]
    fn test_slice_and_bytes() {
        let index = LineIndex::from_text("你好\nab");
        assert_eq!(index.slice(1..4).unwrap(), "好\na");
        assert_eq!(index.char_to_byte(3).unwrap(), 7);
        assert!(index.slice(0..6).is_err());
    }

    #[test]
    fn test_large_document() {
        let text = (0..10000)
            .map(|i| format!("Line {}", i))
            .collect::<Vec<_>>()
            .join("\n");

        let index = LineIndex::from_text(&text);
        assert_eq!(index.line_count(), 10000);
        assert_eq!(index.get_line_text(5000), Some("Line 5000"));
    }
}
