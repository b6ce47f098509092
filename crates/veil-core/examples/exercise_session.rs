use veil_core::{CodeController, CodeSettings, CoreError, Language, TextSelection, VisibleValue};
use veil_lang::LanguageConfig;

const EXERCISE: &str = "\
// Copyright 2024
// All rights reserved.
import 'dart:math';
import 'dart:io';

int helper(int x) {
  return x * 2;
}

void main() {
  // [START given]
  final seed = 21;
  // [END given]
  // [START solution]
  print(seed);
  // [END solution]
}
";

fn main() {
    let settings = CodeSettings {
        fold_imports_on_load: true,
        fold_comment_at_line_zero: true,
        ..CodeSettings::default()
    }
    .with_read_only_sections(["given"])
    .with_visible_only_sections(["given", "solution"]);

    let mut controller = CodeController::new(
        EXERCISE,
        Language::with_brace_blocks(LanguageConfig::dart()),
        settings,
    );
    controller.subscribe(|change| {
        println!(
            "{:?}: v{} -> v{}",
            change.kind, change.old_version, change.new_version
        );
    });

    println!("--- visible ---\n{}", controller.code().visible_text());

    // Replace `seed` with `helper(seed)` inside the solution.
    let visible = controller.code().visible_text().to_string();
    let edited = visible.replace("print(seed);", "print(helper(seed));");
    let caret = edited.find("));").unwrap_or(0) + 2;
    controller
        .apply_visible_value(VisibleValue::new(
            edited,
            Some(TextSelection::collapsed(caret)),
        ))
        .unwrap();

    // Editing the given code is refused.
    let visible = controller.code().visible_text().to_string();
    match controller.apply_visible_value(VisibleValue::new(visible.replace("21", "42"), None)) {
        Err(CoreError::ReadOnly {
            first_line,
            last_line,
        }) => println!("refused edit of lines {first_line}..={last_line}"),
        other => println!("unexpected: {other:?}"),
    }

    println!("--- full ---\n{}", controller.code().text());
}
