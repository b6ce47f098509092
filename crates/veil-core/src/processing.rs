//! External collaborators of the engine.
//!
//! Block discovery and highlighting are language-specific and live outside the core. A
//! [`Language`] bundles the lexical configuration from `veil-lang` with optional
//! implementations of the two seams:
//! - [`BlockParser`] produces foldable block descriptors
//! - [`Highlighter`] produces token span trees
//!
//! When a seam is absent the engine treats its output as empty.

use crate::blocks::{BraceBlockParser, FoldableBlock};
use crate::comments::CommentOccurrence;
use crate::line_index::LineIndex;
use crate::spans::{Highlighter, TokenSpan};
use std::fmt;
use std::sync::Arc;
use veil_lang::LanguageConfig;

/// A structural parser that discovers foldable blocks.
pub trait BlockParser: Send + Sync {
    /// Discover blocks of a document.
    ///
    /// Implementations should return at most one block per first line; the engine keys
    /// folded blocks by their first line.
    fn parse_blocks(&self, lines: &LineIndex, comments: &[CommentOccurrence]) -> Vec<FoldableBlock>;
}

/// Language configuration plus the optional block parser and highlighter.
///
/// Cloning is cheap: every part is shared.
#[derive(Clone)]
pub struct Language {
    config: Arc<LanguageConfig>,
    block_parser: Option<Arc<dyn BlockParser>>,
    highlighter: Option<Arc<dyn Highlighter>>,
}

impl Language {
    /// A language with no block parser and no highlighter.
    pub fn new(config: LanguageConfig) -> Self {
        Self {
            config: Arc::new(config),
            block_parser: None,
            highlighter: None,
        }
    }

    /// A language whose blocks are discovered by [`BraceBlockParser`].
    pub fn with_brace_blocks(config: LanguageConfig) -> Self {
        let parser = BraceBlockParser::new(config.clone());
        Self::new(config).with_block_parser(parser)
    }

    /// Plain text: no comments, no blocks, no highlighting.
    pub fn plain_text() -> Self {
        Self::new(LanguageConfig::plain_text())
    }

    /// Set the block parser.
    pub fn with_block_parser(mut self, parser: impl BlockParser + 'static) -> Self {
        self.block_parser = Some(Arc::new(parser));
        self
    }

    /// Set the highlighter.
    pub fn with_highlighter(mut self, highlighter: impl Highlighter + 'static) -> Self {
        self.highlighter = Some(Arc::new(highlighter));
        self
    }

    /// Lexical configuration.
    pub fn config(&self) -> &LanguageConfig {
        &self.config
    }

    /// Run the block parser, if any. Blocks come back sorted and deduplicated by first line.
    pub fn parse_blocks(&self, lines: &LineIndex, comments: &[CommentOccurrence]) -> Vec<FoldableBlock> {
        let Some(parser) = &self.block_parser else {
            return Vec::new();
        };
        let mut blocks = parser.parse_blocks(lines, comments);
        blocks.retain(|b| b.last_line > b.first_line && b.last_line < lines.line_count());
        crate::blocks::dedup_by_first_line(&mut blocks);
        blocks
    }

    /// Run the highlighter, if any.
    pub fn highlight(&self, text: &str) -> Option<Vec<TokenSpan>> {
        self.highlighter.as_ref().map(|h| h.highlight(text))
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::plain_text()
    }
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("config", &self.config)
            .field("block_parser", &self.block_parser.is_some())
            .field("highlighter", &self.highlighter.is_some())
            .finish()
    }
}
