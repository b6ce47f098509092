use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use veil_core::{
    CodeChangeKind, CodeController, CodeSettings, CoreError, Language, TextSelection, VisibleValue,
};
use veil_lang::LanguageConfig;

const EXERCISE: &str = "\
// Copyright line one
// Copyright line two
import 'a.dart';
import 'b.dart';

void helper() {
  print('help');
}

void main() {
  // [START solution]
  helper();
  // [END solution]
}
";

fn dart() -> Language {
    Language::with_brace_blocks(LanguageConfig::dart())
}

fn type_at(controller: &mut CodeController, caret: usize, text: &str) -> Result<bool, CoreError> {
    controller.set_selection(Some(TextSelection::collapsed(caret)))?;
    let mut visible: Vec<char> = controller.code().visible_text().chars().collect();
    for (i, ch) in text.chars().enumerate() {
        visible.insert(caret + i, ch);
    }
    let end = caret + text.chars().count();
    controller.apply_visible_value(VisibleValue::new(
        visible.into_iter().collect::<String>(),
        Some(TextSelection::collapsed(end)),
    ))
}

#[test]
fn test_exercise_session() {
    let settings = CodeSettings {
        fold_imports_on_load: true,
        fold_comment_at_line_zero: true,
        ..CodeSettings::default()
    }
    .with_visible_only_sections(["solution"]);
    let mut controller = CodeController::new(EXERCISE, dart(), settings);

    assert_eq!(
        controller.code().visible_text(),
        "// Copyright line one\nimport 'a.dart';\n\nvoid helper() {\n\nvoid main() {\n  helper();\n}\n"
    );

    // Type inside the solution, right after "helper();".
    let caret = controller.code().visible_text().find("helper();\n}").unwrap() + "helper();".len();
    assert!(type_at(&mut controller, caret, " done();").unwrap());

    assert_eq!(
        controller.code().text(),
        EXERCISE.replace("  helper();\n", "  helper(); done();\n")
    );
    assert_eq!(
        controller.selection(),
        Some(TextSelection::collapsed(caret + " done();".len()))
    );
    // Folds made on load are still in place.
    assert!(controller.code().is_folded(0));
    assert!(controller.code().is_folded(2));
    assert!(controller.code().is_folded(5));
}

#[test]
fn test_read_only_rejection_leaves_state_untouched() {
    let settings = CodeSettings::default().with_read_only_sections(["solution"]);
    let mut controller = CodeController::new(EXERCISE, dart(), settings);
    let before = controller.code().clone();

    let caret = controller.code().visible_text().find("helper();\n}").unwrap();
    let err = type_at(&mut controller, caret, "x").unwrap_err();

    assert!(matches!(
        err,
        CoreError::ReadOnly {
            first_line: 11,
            last_line: 11
        }
    ));
    assert_eq!(controller.code(), &before);
    assert_eq!(controller.version(), 0);
    assert!(controller.is_read_only_selected().unwrap());

    // The closing brace after the section is editable.
    let caret = controller.code().visible_text().len();
    assert!(type_at(&mut controller, caret, "\n").unwrap());
    assert_eq!(controller.code().text(), format!("{EXERCISE}\n"));
}

#[test]
fn test_line_after_read_only_section_is_editable() {
    let text = "0\n1\n// [START s]\n3\n// [END s]\n5";
    let settings = CodeSettings::default().with_read_only_sections(["s"]);
    let mut controller = CodeController::new(text, dart(), settings);
    assert_eq!(controller.code().visible_text(), "0\n1\n3\n5");

    // Start of the visible line "5", right after the hidden end tag.
    controller
        .set_selection(Some(TextSelection::collapsed(6)))
        .unwrap();
    assert!(!controller.is_read_only_selected().unwrap());
    assert!(type_at(&mut controller, 6, "X").unwrap());

    assert_eq!(
        controller.code().text(),
        "0\n1\n// [START s]\n3\n// [END s]\nX5"
    );
    assert_eq!(controller.code().visible_text(), "0\n1\n3\nX5");
    assert_eq!(controller.selection(), Some(TextSelection::collapsed(7)));

    // The start of the section's own first line is still refused.
    let err = type_at(&mut controller, 4, "Y").unwrap_err();
    assert!(matches!(
        err,
        CoreError::ReadOnly {
            first_line: 3,
            last_line: 3
        }
    ));
}

#[test]
fn test_change_notifications_carry_deltas() {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);

    let mut controller = CodeController::new(EXERCISE, dart(), CodeSettings::default());
    controller.subscribe(move |change| {
        sink.lock().unwrap().push(change.clone());
    });

    assert!(controller.toggle_fold_at(5));
    assert!(type_at(&mut controller, 0, "// ").unwrap());
    assert!(controller.unfold_all());

    let changes = changes.lock().unwrap();
    let kinds: Vec<CodeChangeKind> = changes.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            CodeChangeKind::FoldingChanged,
            CodeChangeKind::SelectionChanged,
            CodeChangeKind::TextChanged,
            CodeChangeKind::FoldingChanged,
        ]
    );

    let delta = changes[2].delta.as_deref().unwrap();
    assert_eq!((delta.start, delta.inserted_text.as_str()), (0, "// "));
    assert_eq!(changes[3].old_version, 2);
    assert_eq!(controller.version(), 3);
}

#[test]
fn test_folds_follow_text_replacement() {
    let mut controller = CodeController::new(EXERCISE, dart(), CodeSettings::default());
    assert!(controller.fold_at(9));

    let replaced = EXERCISE.replace("void helper() {\n  print('help');\n}\n\n", "");
    assert!(controller.set_full_text(&replaced));

    assert!(controller.code().is_folded(5));
    assert_eq!(controller.selection(), None);
}
