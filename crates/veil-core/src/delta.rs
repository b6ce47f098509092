//! Structured full-text edits.
//!
//! Edit reconciliation turns a change of the visible text into one replacement of the full
//! text. Consumers that keep derived state (undo history, incremental parsing) can use this
//! delta instead of diffing the old and new full texts again.
//!
//! Offsets are **character offsets** (Unicode scalar values).

use std::ops::Range;

/// One replacement of the full text, as produced by [`Code::edit_result`](crate::Code::edit_result).
///
/// `start` refers to the full text before the replacement; the replaced range spans as many
/// characters as `deleted_text` holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDeltaEdit {
    /// Where the replacement begins.
    pub start: usize,
    /// Full text removed, hidden content included.
    pub deleted_text: String,
    /// Text typed in its place.
    pub inserted_text: String,
}

impl TextDeltaEdit {
    /// Characters removed.
    pub fn deleted_len(&self) -> usize {
        self.deleted_text.chars().count()
    }

    /// Characters inserted.
    pub fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }

    /// One past the last removed character.
    pub fn end(&self) -> usize {
        self.start + self.deleted_len()
    }

    /// Removed range of the old full text.
    pub fn deleted_range(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Move an offset of the old full text across the replacement.
    ///
    /// Offsets inside the removed range land at the end of the inserted text.
    pub fn map_offset(&self, offset: usize) -> usize {
        if offset < self.start {
            offset
        } else if offset < self.end() {
            self.start + self.inserted_len()
        } else {
            offset + self.inserted_len() - self.deleted_len()
        }
    }
}
