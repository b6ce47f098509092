//! Foldable blocks: descriptors, default discovery, and fold-state matching across re-parses.

use crate::comments::{CommentOccurrence, LiteralTracker};
use crate::line_index::LineIndex;
use crate::processing::BlockParser;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use veil_lang::LanguageConfig;

/// A block of lines that can be folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FoldableBlock {
    /// First line of the block; stays visible when folded.
    pub first_line: usize,
    /// Last line of the block (inclusive).
    pub last_line: usize,
    /// The block is a run of comment lines.
    pub is_comment: bool,
    /// The block is a run of import statements.
    pub is_imports: bool,
}

impl FoldableBlock {
    /// Create a code block spanning `first_line..=last_line`.
    pub fn new(first_line: usize, last_line: usize) -> Self {
        Self {
            first_line,
            last_line,
            is_comment: false,
            is_imports: false,
        }
    }

    /// Create a comment block.
    pub fn comment(first_line: usize, last_line: usize) -> Self {
        Self {
            is_comment: true,
            ..Self::new(first_line, last_line)
        }
    }

    /// Create an imports block.
    pub fn imports(first_line: usize, last_line: usize) -> Self {
        Self {
            is_imports: true,
            ..Self::new(first_line, last_line)
        }
    }

    /// Check if line number is within the block
    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.first_line && line <= self.last_line
    }

    /// Returns `true` if `self` strictly contains `other`.
    pub fn encloses(&self, other: &FoldableBlock) -> bool {
        self != other && self.first_line <= other.first_line && other.last_line <= self.last_line
    }
}

/// Sort blocks by first line and keep one block per first line: the largest, preferring
/// comment and import runs on ties.
pub(crate) fn dedup_by_first_line(blocks: &mut Vec<FoldableBlock>) {
    blocks.sort_by_key(|b| {
        (
            b.first_line,
            Reverse(b.last_line),
            Reverse(b.is_imports || b.is_comment),
        )
    });
    blocks.dedup_by_key(|b| b.first_line);
}

/// Default block discovery for brace-delimited languages.
///
/// Finds:
/// - `{}`, `()` and `[]` pairs spanning several lines (ignoring comments and literals)
/// - runs of two or more lines holding nothing but a comment
/// - runs of two or more import statements, blank lines allowed in between, extended over
///   multi-line import lists
#[derive(Debug, Clone, Default)]
pub struct BraceBlockParser {
    config: LanguageConfig,
}

impl BraceBlockParser {
    /// Create a parser using the import prefixes of `config`.
    pub fn new(config: LanguageConfig) -> Self {
        Self { config }
    }

    fn bracket_blocks(lines: &LineIndex, comment_columns: &HashMap<usize, usize>) -> Vec<FoldableBlock> {
        let mut blocks = Vec::new();
        let mut open: Vec<(char, usize)> = Vec::new();

        for line in lines.lines() {
            let chars: Vec<char> = line.text.chars().collect();
            let code_end = comment_columns
                .get(&line.index)
                .copied()
                .unwrap_or(chars.len())
                .min(chars.len());
            let mut literals = LiteralTracker::default();

            for column in 0..code_end {
                if !literals.advance(&chars, column) {
                    continue;
                }
                match chars[column] {
                    '{' | '(' | '[' => open.push((chars[column], line.index)),
                    closer @ ('}' | ')' | ']') => {
                        let opener = match closer {
                            '}' => '{',
                            ')' => '(',
                            _ => '[',
                        };
                        if open.last().is_some_and(|(ch, _)| *ch == opener) {
                            if let Some((_, first_line)) = open.pop() {
                                if line.index > first_line {
                                    blocks.push(FoldableBlock::new(first_line, line.index));
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        blocks
    }

    fn comment_blocks(lines: &LineIndex, comments: &[CommentOccurrence]) -> Vec<FoldableBlock> {
        let whole_line: BTreeSet<usize> = comments
            .iter()
            .filter(|c| {
                lines.line(c.line_index).is_some_and(|line| {
                    line.text
                        .chars()
                        .take(c.char_index - line.start)
                        .all(char::is_whitespace)
                })
            })
            .map(|c| c.line_index)
            .collect();

        runs(whole_line.into_iter())
            .filter(|(first, last)| last > first)
            .map(|(first, last)| FoldableBlock::comment(first, last))
            .collect()
    }

    fn import_blocks(&self, lines: &LineIndex, brackets: &[FoldableBlock]) -> Vec<FoldableBlock> {
        let mut blocks = Vec::new();
        let mut current: Option<(usize, usize)> = None;
        let mut line_index = 0;

        while let Some(line) = lines.line(line_index) {
            if self.config.is_import_line(&line.text) {
                // A multi-line import list belongs to the statement it opens on.
                let end = brackets
                    .iter()
                    .filter(|b| b.first_line == line.index)
                    .map(|b| b.last_line)
                    .max()
                    .unwrap_or(line.index);
                current = Some(match current {
                    Some((first, _)) => (first, end),
                    None => (line.index, end),
                });
                line_index = end + 1;
                continue;
            }

            if !line.text.trim().is_empty() {
                if let Some((first, last)) = current.take() {
                    if last > first {
                        blocks.push(FoldableBlock::imports(first, last));
                    }
                }
            }
            line_index += 1;
        }

        if let Some((first, last)) = current {
            if last > first {
                blocks.push(FoldableBlock::imports(first, last));
            }
        }

        blocks
    }
}

impl BlockParser for BraceBlockParser {
    fn parse_blocks(&self, lines: &LineIndex, comments: &[CommentOccurrence]) -> Vec<FoldableBlock> {
        let comment_columns: HashMap<usize, usize> = comments
            .iter()
            .filter_map(|c| {
                let line = lines.line(c.line_index)?;
                Some((c.line_index, c.char_index - line.start))
            })
            .collect();

        let brackets = Self::bracket_blocks(lines, &comment_columns);
        let mut blocks = self.import_blocks(lines, &brackets);
        blocks.extend(Self::comment_blocks(lines, comments));
        blocks.extend(brackets);
        dedup_by_first_line(&mut blocks);
        blocks
    }
}

/// Group sorted line numbers into runs of consecutive lines.
fn runs(lines: impl Iterator<Item = usize>) -> impl Iterator<Item = (usize, usize)> {
    let mut runs: Vec<(usize, usize)> = Vec::new();
    for line in lines {
        match runs.last_mut() {
            Some((_, last)) if *last + 1 == line => *last = line,
            _ => runs.push((line, line)),
        }
    }
    runs.into_iter()
}

/// What a block looks like, independent of where it is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BlockSignature<'a> {
    first_line_text: &'a str,
    depth: usize,
    is_comment: bool,
    is_imports: bool,
}

/// Signature of every block plus its occurrence index among blocks with the same signature.
fn signatures<'a>(
    blocks: &[FoldableBlock],
    lines: &'a LineIndex,
) -> Vec<(BlockSignature<'a>, usize)> {
    let mut seen: HashMap<BlockSignature<'a>, usize> = HashMap::new();

    blocks
        .iter()
        .map(|block| {
            let signature = if block.is_imports {
                // Imports blocks match on their kind alone.
                BlockSignature {
                    first_line_text: "",
                    depth: 0,
                    is_comment: false,
                    is_imports: true,
                }
            } else {
                BlockSignature {
                    first_line_text: lines.get_line_text(block.first_line).unwrap_or("").trim(),
                    depth: blocks.iter().filter(|outer| outer.encloses(block)).count(),
                    is_comment: block.is_comment,
                    is_imports: false,
                }
            };
            let occurrence = seen.entry(signature.clone()).or_insert(0);
            let index = *occurrence;
            *occurrence += 1;
            (signature, index)
        })
        .collect()
}

/// Decide which of the freshly parsed blocks stay folded.
///
/// A new block matches a previously folded block when both have the same trimmed first-line
/// text, the same nesting depth and the same kind, and appear as the same occurrence of that
/// signature in document order. Import blocks match on kind alone. Unmatched old folds are
/// dropped and unmatched new blocks start unfolded. Inputs are never modified.
pub fn match_folded_blocks(
    old_blocks: &[FoldableBlock],
    old_lines: &LineIndex,
    old_folded: &BTreeSet<FoldableBlock>,
    new_blocks: &[FoldableBlock],
    new_lines: &LineIndex,
) -> BTreeSet<FoldableBlock> {
    if old_folded.is_empty() {
        return BTreeSet::new();
    }

    let folded_signatures: Vec<(BlockSignature<'_>, usize)> = old_blocks
        .iter()
        .zip(signatures(old_blocks, old_lines))
        .filter(|(block, _)| old_folded.contains(*block))
        .map(|(_, signature)| signature)
        .collect();

    new_blocks
        .iter()
        .zip(signatures(new_blocks, new_lines))
        .filter(|(_, signature)| folded_signatures.contains(signature))
        .map(|(block, _)| *block)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::scan_line_comments;
    use pretty_assertions::assert_eq;

    fn parse(text: &str, config: LanguageConfig) -> Vec<FoldableBlock> {
        let lines = LineIndex::from_text(text);
        let comments = scan_line_comments(&lines, &config.comments);
        BraceBlockParser::new(config).parse_blocks(&lines, &comments)
    }

    #[test]
    fn test_bracket_blocks() {
        let text = "fn a() {\n    let v = [\n        1,\n    ];\n}\nfn b() { }\n";
        assert_eq!(
            parse(text, LanguageConfig::rust()),
            vec![FoldableBlock::new(0, 4), FoldableBlock::new(1, 3)]
        );
    }

    #[test]
    fn test_brackets_in_comments_and_strings_are_ignored() {
        let text = "let s = \"{\"; // {\nfoo(\n  \")\",\n);";
        assert_eq!(
            parse(text, LanguageConfig::rust()),
            vec![FoldableBlock::new(1, 3)]
        );
    }

    #[test]
    fn test_comment_runs() {
        let text = "// a\n// b\nx // c\n// d\n\n// e";
        assert_eq!(
            parse(text, LanguageConfig::rust()),
            vec![FoldableBlock::comment(0, 1)]
        );
    }

    #[test]
    fn test_import_runs_with_blank_lines_and_lists() {
        let text = "use a;\n\nuse b::{\n    c,\n};\n\nfn main() {}\n";
        assert_eq!(
            parse(text, LanguageConfig::rust()),
            vec![FoldableBlock::imports(0, 4), FoldableBlock::new(2, 4)]
        );
    }

    #[test]
    fn test_single_import_is_not_a_block() {
        assert!(parse("use a;\nfn main() {}", LanguageConfig::rust()).is_empty());
    }

    #[test]
    fn test_one_block_per_first_line() {
        let mut blocks = vec![
            FoldableBlock::new(0, 2),
            FoldableBlock::new(0, 5),
            FoldableBlock::imports(0, 5),
            FoldableBlock::new(1, 2),
        ];
        dedup_by_first_line(&mut blocks);
        assert_eq!(
            blocks,
            vec![FoldableBlock::imports(0, 5), FoldableBlock::new(1, 2)]
        );
    }

    #[test]
    fn test_match_survives_lines_inserted_above() {
        let old_lines = LineIndex::from_text("fn a() {\n}\nfn b() {\n}");
        let old_blocks = vec![FoldableBlock::new(0, 1), FoldableBlock::new(2, 3)];
        let folded = BTreeSet::from([FoldableBlock::new(2, 3)]);

        let new_lines = LineIndex::from_text("// new\n\nfn a() {\n}\nfn b() {\n  x();\n}");
        let new_blocks = vec![FoldableBlock::new(2, 3), FoldableBlock::new(4, 6)];

        assert_eq!(
            match_folded_blocks(&old_blocks, &old_lines, &folded, &new_blocks, &new_lines),
            BTreeSet::from([FoldableBlock::new(4, 6)])
        );
    }

    #[test]
    fn test_match_uses_occurrence_among_identical_blocks() {
        let old_lines = LineIndex::from_text("if x {\n}\nif x {\n}");
        let old_blocks = vec![FoldableBlock::new(0, 1), FoldableBlock::new(2, 3)];
        let folded = BTreeSet::from([FoldableBlock::new(2, 3)]);

        let matched = match_folded_blocks(&old_blocks, &old_lines, &folded, &old_blocks, &old_lines);
        assert_eq!(matched, folded);
    }

    #[test]
    fn test_match_requires_same_depth() {
        let old_lines = LineIndex::from_text("a {\n}\n");
        let old_blocks = vec![FoldableBlock::new(0, 1)];
        let folded = BTreeSet::from([FoldableBlock::new(0, 1)]);

        let new_lines = LineIndex::from_text("b {\na {\n}\n}");
        let new_blocks = vec![FoldableBlock::new(0, 3), FoldableBlock::new(1, 2)];

        assert!(match_folded_blocks(&old_blocks, &old_lines, &folded, &new_blocks, &new_lines).is_empty());
    }

    #[test]
    fn test_imports_match_by_kind() {
        let old_lines = LineIndex::from_text("use a;\nuse b;\n");
        let old_blocks = vec![FoldableBlock::imports(0, 1)];
        let folded = BTreeSet::from([FoldableBlock::imports(0, 1)]);

        let new_lines = LineIndex::from_text("use z;\nuse a;\nuse b;\n");
        let new_blocks = vec![FoldableBlock::imports(0, 2)];

        assert_eq!(
            match_folded_blocks(&old_blocks, &old_lines, &folded, &new_blocks, &new_lines),
            BTreeSet::from([FoldableBlock::imports(0, 2)])
        );
    }

    #[test]
    fn test_unmatched_folds_are_dropped() {
        let old_lines = LineIndex::from_text("fn a() {\n}");
        let old_blocks = vec![FoldableBlock::new(0, 1)];
        let folded = BTreeSet::from([FoldableBlock::new(0, 1)]);

        let new_lines = LineIndex::from_text("fn renamed() {\n}");
        assert!(match_folded_blocks(&old_blocks, &old_lines, &folded, &old_blocks, &new_lines).is_empty());
    }
}
