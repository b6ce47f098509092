#![warn(missing_docs)]
//! Veil Core - Headless Hidden-Range Text Engine
//!
//! # Overview
//!
//! `veil-core` shows a user a *visible* projection of a document while the *full* document lives
//! underneath. Inline service annotations (section tag comments) and folded blocks are hidden
//! from the visible text; the user edits the visible text only, and the engine reconstructs the
//! corresponding edit on the full text, leaving hidden content byte-for-byte intact.
//!
//! # Core Features
//!
//! - **Line Index**: Rope based, character offsets, LF-only line breaks
//! - **Named Sections**: `[START name]` / `[END name]` comment tags, with read-only marking
//! - **Hidden Ranges**: keyed contributions from several sources, merged into one canonical set
//! - **Coordinate Mapping**: full ↔ visible positions, selections, and token span trees
//! - **Code Folding**: fold state survives re-parses through block matching
//! - **Edit Reconciliation**: a visible diff becomes one replacement of the full text
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  CodeController (versions, subscriptions)   │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Code snapshot (fold / unfold / edit)       │  ← Immutable values
//! ├─────────────────────────────────────────────┤
//! │  Hidden ranges & block matching             │  ← Visibility
//! ├─────────────────────────────────────────────┤
//! │  Comments & named sections                  │  ← Annotations
//! ├─────────────────────────────────────────────┤
//! │  Line Index (Rope-based)                    │  ← Line Access
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use veil_core::{CodeController, CodeSettings, Language, VisibleValue};
//! use veil_lang::LanguageConfig;
//!
//! let text = "fn main() {\n    // [START body]\n    todo();\n    // [END body]\n}\n";
//! let mut controller = CodeController::new(
//!     text,
//!     Language::with_brace_blocks(LanguageConfig::rust()),
//!     CodeSettings::default(),
//! );
//! assert_eq!(controller.code().visible_text(), "fn main() {\n    todo();\n}\n");
//!
//! controller
//!     .apply_visible_value(VisibleValue::new("fn main() {\n    done();\n}\n", None))
//!     .unwrap();
//! assert_eq!(
//!     controller.code().text(),
//!     "fn main() {\n    // [START body]\n    done();\n    // [END body]\n}\n"
//! );
//! ```
//!
//! # Module Description
//!
//! - [`line_index`] - Rope based line index
//! - [`comments`] - single-line comment scanner
//! - [`sections`] - named-section tag parser
//! - [`hidden`] - hidden-range set and coordinate mapping
//! - [`blocks`] - foldable blocks, default discovery and fold matching
//! - [`code`] - the immutable document snapshot
//! - [`controller`] - snapshot owner with versioning and change notifications
//!
//! # Coordinates
//!
//! Every offset is a character offset (Unicode scalar value). Only `\n` ends a line.

pub mod blocks;
pub mod code;
pub mod comments;
pub mod controller;
pub mod delta;
pub mod error;
pub mod hidden;
pub mod line_index;
pub mod processing;
pub mod sections;
pub mod spans;
mod text;

pub use blocks::{BraceBlockParser, FoldableBlock, match_folded_blocks};
pub use code::{Code, EditResult, VisibleValue};
pub use comments::{CommentOccurrence, scan_line_comments};
pub use controller::{CodeChange, CodeChangeCallback, CodeChangeKind, CodeController, CodeSettings};
pub use delta::TextDeltaEdit;
pub use error::{CoreError, Result};
pub use hidden::{Affinity, HiddenRange, HiddenRangeMap, HiddenRanges, HiddenSource, TextSelection};
pub use line_index::{LineIndex, LineRecord};
pub use processing::{BlockParser, Language};
pub use sections::{NamedSection, SectionParser, TagSectionParser};
pub use spans::{Highlighter, StyleId, TokenSpan};
