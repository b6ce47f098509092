//! Controller - owns the current snapshot and serializes changes
//!
//! [`CodeController`] is the thin consumer of [`Code`] a UI talks to. It keeps the current
//! snapshot and the visible selection, applies visible edits (rejecting those that touch
//! read-only lines), rebuilds the snapshot after each accepted edit while carrying folds over,
//! and notifies subscribers with a version number per change.
//!
//! # Example
//!
//! ```rust
//! use veil_core::{CodeController, CodeChangeKind, CodeSettings, Language, VisibleValue};
//! use veil_lang::LanguageConfig;
//!
//! let mut controller = CodeController::new(
//!     "a// [START s]\nb\n// [END s]\nc",
//!     Language::with_brace_blocks(LanguageConfig::rust()),
//!     CodeSettings::default(),
//! );
//! controller.subscribe(|change| {
//!     assert_eq!(change.kind, CodeChangeKind::TextChanged);
//! });
//!
//! assert_eq!(controller.code().visible_text(), "a\nb\nc");
//! assert!(controller.apply_visible_value(VisibleValue::new("aX\nb\nc", None)).unwrap());
//! assert_eq!(controller.code().text(), "aX// [START s]\nb\n// [END s]\nc");
//! assert_eq!(controller.version(), 1);
//! ```

use crate::code::{Code, EditResult, VisibleValue};
use crate::delta::TextDeltaEdit;
use crate::error::{CoreError, Result};
use crate::hidden::{Affinity, TextSelection};
use crate::processing::Language;
use crate::sections::{SectionParser, TagSectionParser};
use std::collections::BTreeSet;
use std::sync::Arc;

/// How a document is presented when it is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeSettings {
    /// Sections whose lines cannot be edited.
    pub read_only_sections: BTreeSet<String>,
    /// Sections the user should focus on: every block outside them is folded on load.
    pub visible_only_sections: BTreeSet<String>,
    /// Fold the imports block on load.
    pub fold_imports_on_load: bool,
    /// Fold a comment block starting at line 0 (a license header) on load.
    pub fold_comment_at_line_zero: bool,
}

impl CodeSettings {
    /// Mark sections as read-only.
    pub fn with_read_only_sections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read_only_sections = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the visible-only sections.
    pub fn with_visible_only_sections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visible_only_sections = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeChangeKind {
    /// The full text changed.
    TextChanged,
    /// Blocks were folded or unfolded.
    FoldingChanged,
    /// Only the selection moved.
    SelectionChanged,
}

/// Change record
#[derive(Debug, Clone)]
pub struct CodeChange {
    /// Change type
    pub kind: CodeChangeKind,
    /// Version before the change
    pub old_version: u64,
    /// Version after the change
    pub new_version: u64,
    /// Replacement of the full text, for [`CodeChangeKind::TextChanged`].
    pub delta: Option<Arc<TextDeltaEdit>>,
}

/// Change callback function type
pub type CodeChangeCallback = Box<dyn FnMut(&CodeChange) + Send>;

/// Owns the current [`Code`] snapshot and applies changes to it.
///
/// Text and fold changes bump the version; selection changes notify subscribers without
/// bumping it.
pub struct CodeController {
    code: Code,
    selection: Option<TextSelection>,
    language: Language,
    section_parser: Arc<dyn SectionParser>,
    settings: CodeSettings,
    version: u64,
    callbacks: Vec<CodeChangeCallback>,
}

impl CodeController {
    /// Load `text` with the default tag grammar and apply the on-load folds of `settings`.
    pub fn new(text: &str, language: Language, settings: CodeSettings) -> Self {
        Self::with_section_parser(text, language, settings, TagSectionParser::default())
    }

    /// Load `text` with a custom section grammar.
    pub fn with_section_parser(
        text: &str,
        language: Language,
        settings: CodeSettings,
        section_parser: impl SectionParser + 'static,
    ) -> Self {
        let section_parser: Arc<dyn SectionParser> = Arc::new(section_parser);
        let mut code = Code::new(
            text,
            &language,
            section_parser.as_ref(),
            &settings.read_only_sections,
        );
        if settings.fold_comment_at_line_zero {
            code = code.folded_comment_at_line_zero();
        }
        if settings.fold_imports_on_load {
            code = code.folded_imports();
        }
        if !settings.visible_only_sections.is_empty() {
            code = code.folded_outside_sections(&settings.visible_only_sections);
        }

        Self {
            code,
            selection: None,
            language,
            section_parser,
            settings,
            version: 0,
            callbacks: Vec::new(),
        }
    }

    /// Current snapshot.
    pub fn code(&self) -> &Code {
        &self.code
    }

    /// Settings the document was loaded with.
    pub fn settings(&self) -> &CodeSettings {
        &self.settings
    }

    /// Current version number.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Visible selection.
    pub fn selection(&self) -> Option<TextSelection> {
        self.selection
    }

    /// What the UI should show.
    pub fn visible_value(&self) -> VisibleValue {
        VisibleValue::new(self.code.visible_text(), self.selection)
    }

    /// Subscribe to changes.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&CodeChange) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Move the visible selection.
    pub fn set_selection(&mut self, selection: Option<TextSelection>) -> Result<()> {
        let length = self.code.hidden_ranges().visible_length();
        if let Some(sel) = selection {
            if sel.end() > length {
                return Err(CoreError::PositionOutOfRange {
                    position: sel.end(),
                    length,
                });
            }
        }
        if selection != self.selection {
            self.selection = selection;
            self.notify(CodeChange {
                kind: CodeChangeKind::SelectionChanged,
                old_version: self.version,
                new_version: self.version,
                delta: None,
            });
        }
        Ok(())
    }

    /// Returns `true` if the current selection touches a read-only line.
    pub fn is_read_only_selected(&self) -> Result<bool> {
        self.code.is_read_only_selected(self.selection)
    }

    /// Apply a new visible value produced by the UI.
    ///
    /// Returns `Ok(true)` if the full text changed and `Ok(false)` if only the selection did.
    /// An edit touching a read-only line fails with [`CoreError::ReadOnly`] and leaves the
    /// controller unchanged.
    pub fn apply_visible_value(&mut self, new: VisibleValue) -> Result<bool> {
        let old = self.visible_value();
        let result = self.code.edit_result(&old, &new)?;

        let (Some(lines), Some(delta)) = (result.lines_changed.clone(), result.delta.clone())
        else {
            self.set_selection(new.selection)?;
            return Ok(false);
        };

        if self.code.is_read_only_in_line_range(lines.clone()) {
            tracing::debug!(
                first_line = lines.start(),
                last_line = lines.end(),
                "edit rejected: read-only lines"
            );
            return Err(CoreError::ReadOnly {
                first_line: *lines.start(),
                last_line: *lines.end(),
            });
        }

        let next = self.rebuild(&result.full_text_after);
        let full_selection = match new.selection {
            Some(sel) => Some(TextSelection::new(
                self.map_through_edit(&result, &new, sel.base)?,
                self.map_through_edit(&result, &new, sel.extent)?,
            )),
            None => None,
        };
        self.selection = next.visible_selection(full_selection);
        self.code = next;

        tracing::debug!(version = self.version + 1, "edit accepted");
        self.bump(CodeChangeKind::TextChanged, Some(Arc::new(delta)));
        Ok(true)
    }

    /// Replace the whole full text, keeping the folds that still match.
    ///
    /// The selection is cleared. Returns `false` if the text is unchanged.
    pub fn set_full_text(&mut self, text: &str) -> bool {
        if text == self.code.text() {
            return false;
        }

        let delta = TextDeltaEdit {
            start: 0,
            deleted_text: self.code.text().to_string(),
            inserted_text: text.to_string(),
        };
        self.code = self.rebuild(text);
        self.selection = None;
        self.bump(CodeChangeKind::TextChanged, Some(Arc::new(delta)));
        true
    }

    /// Fold the block starting at `line`. Returns `false` if nothing changed.
    pub fn fold_at(&mut self, line: usize) -> bool {
        let next = self.code.folded_at(line);
        self.replace_folding(next)
    }

    /// Unfold the block starting at `line`. Returns `false` if nothing changed.
    pub fn unfold_at(&mut self, line: usize) -> bool {
        let next = self.code.unfolded_at(line);
        self.replace_folding(next)
    }

    /// Toggle the fold of the block starting at `line`. Returns `false` if nothing changed.
    pub fn toggle_fold_at(&mut self, line: usize) -> bool {
        let next = self.code.toggled_at(line);
        self.replace_folding(next)
    }

    /// Fold every block outside the visible-only sections of the settings.
    pub fn fold_outside_visible_sections(&mut self) -> bool {
        let next = self
            .code
            .folded_outside_sections(&self.settings.visible_only_sections);
        self.replace_folding(next)
    }

    /// Unfold every block.
    pub fn unfold_all(&mut self) -> bool {
        let next = self.code.unfolded_all();
        self.replace_folding(next)
    }

    /// Parse `text` into a new snapshot carrying the current folds over.
    fn rebuild(&self, text: &str) -> Code {
        Code::new(
            text,
            &self.language,
            self.section_parser.as_ref(),
            &self.settings.read_only_sections,
        )
        .folded_as(&self.code)
    }

    /// Map a position of the new visible text to the full text after the edit.
    ///
    /// Positions before the change keep their full offset, positions inside the inserted text
    /// are offset from the start of the replacement, and positions after it follow the old
    /// full text shifted by the length difference.
    fn map_through_edit(
        &self,
        result: &EditResult,
        new: &VisibleValue,
        position: usize,
    ) -> Result<usize> {
        let (Some(visible), Some(delta)) = (&result.visible_changed, &result.delta) else {
            return self.code.hidden_ranges().recover_position(position, Affinity::Downstream);
        };

        let hidden = self.code.hidden_ranges();
        let new_visible_end =
            (visible.end + new.text.chars().count()).saturating_sub(hidden.visible_length());

        if position < visible.start {
            hidden.recover_position(position, Affinity::Downstream)
        } else if position <= new_visible_end {
            Ok(delta.start + (position - visible.start))
        } else {
            let old_position = position - new_visible_end + visible.end;
            let full = hidden.recover_position(old_position, Affinity::Downstream)?;
            Ok(delta.map_offset(full))
        }
    }

    fn replace_folding(&mut self, next: Code) -> bool {
        if next.folded_blocks() == self.code.folded_blocks() {
            return false;
        }

        let full_selection = match self.code.full_selection(self.selection) {
            Ok(selection) => selection,
            Err(err) => {
                tracing::warn!(%err, "dropping selection that does not fit the document");
                None
            }
        };
        self.selection = next.visible_selection(full_selection);
        self.code = next;
        self.bump(CodeChangeKind::FoldingChanged, None);
        true
    }

    fn bump(&mut self, kind: CodeChangeKind, delta: Option<Arc<TextDeltaEdit>>) {
        let old_version = self.version;
        self.version += 1;
        self.notify(CodeChange {
            kind,
            old_version,
            new_version: self.version,
            delta,
        });
    }

    fn notify(&mut self, change: CodeChange) {
        for callback in &mut self.callbacks {
            callback(&change);
        }
    }
}
