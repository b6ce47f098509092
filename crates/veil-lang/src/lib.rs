#![warn(missing_docs)]
//! `veil-lang` - data-driven language configuration helpers for `veil-core`.
//!
//! This crate intentionally stays lightweight and does **not** depend on any parsing or
//! highlighting system. It describes the handful of lexical facts the engine needs to find
//! service comments and import runs in a language-aware way.

/// Single-line comment syntax for a given language.
///
/// A language may accept several prefixes (e.g. `//` and `///`); the comment scanner picks the
/// longest prefix that matches at a position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentSyntax {
    /// Line comment prefixes (e.g. `//`, `#`, `--`).
    pub line_prefixes: Vec<String>,
}

impl CommentSyntax {
    /// Create a syntax with a single line comment prefix.
    pub fn line(prefix: impl Into<String>) -> Self {
        Self {
            line_prefixes: vec![prefix.into()],
        }
    }

    /// Create a syntax that accepts any of the given line comment prefixes.
    pub fn lines<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            line_prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if at least one non-empty prefix is configured.
    pub fn has_line(&self) -> bool {
        self.line_prefixes.iter().any(|p| !p.is_empty())
    }

    /// Non-empty prefixes, longest first.
    pub fn prefixes_longest_first(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = self
            .line_prefixes
            .iter()
            .map(String::as_str)
            .filter(|p| !p.is_empty())
            .collect();
        prefixes.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
        prefixes.dedup();
        prefixes
    }
}

/// Lexical configuration for one language.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LanguageConfig {
    /// Display name (e.g. `"rust"`).
    pub name: String,
    /// Single-line comment syntax.
    pub comments: CommentSyntax,
    /// Line prefixes (after leading whitespace) that start an import statement.
    pub import_prefixes: Vec<String>,
}

impl LanguageConfig {
    /// Create a config with the given name and comment syntax, and no import prefixes.
    pub fn new(name: impl Into<String>, comments: CommentSyntax) -> Self {
        Self {
            name: name.into(),
            comments,
            import_prefixes: Vec::new(),
        }
    }

    /// Set the import prefixes.
    pub fn with_import_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.import_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Plain text: no comments, no imports.
    pub fn plain_text() -> Self {
        Self::new("plaintext", CommentSyntax::default())
    }

    /// Rust.
    pub fn rust() -> Self {
        Self::new("rust", CommentSyntax::line("//")).with_import_prefixes(["use ", "pub use "])
    }

    /// Dart.
    pub fn dart() -> Self {
        Self::new("dart", CommentSyntax::line("//")).with_import_prefixes(["import ", "export "])
    }

    /// Java / Kotlin style.
    pub fn java() -> Self {
        Self::new("java", CommentSyntax::line("//")).with_import_prefixes(["import ", "package "])
    }

    /// Python.
    pub fn python() -> Self {
        Self::new("python", CommentSyntax::line("#")).with_import_prefixes(["import ", "from "])
    }

    /// Go.
    pub fn go() -> Self {
        Self::new("go", CommentSyntax::line("//")).with_import_prefixes(["import "])
    }

    /// Returns `true` if `line` (ignoring leading whitespace) starts an import statement.
    pub fn is_import_line(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        self.import_prefixes
            .iter()
            .any(|p| !p.is_empty() && trimmed.starts_with(p.as_str()))
    }
}
