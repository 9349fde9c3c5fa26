//! Word list import followed by the normalization filter.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use common::{fixture_path, read_fixture, TestHarness};
use lexideck::import::{highlights_by_color, import_words, ImportFormat};
use lexideck::normalize::{pop_unchanged, IdentityLemmatizer, NormalizeOptions};
use lexideck::{ImportError, Normalizer};

/// One import scenario: fixture, format and the expected filter outcome.
struct ImportCase {
    name: &'static str,
    fixture: &'static str,
    format: ImportFormat,
    raw: &'static [&'static str],
    unchanged: &'static [&'static str],
    suggestions: &'static [(&'static str, &'static str)],
}

const IMPORT_CASES: &[ImportCase] = &[
    ImportCase {
        name: "plain_text",
        fixture: "words.txt",
        format: ImportFormat::Text,
        raw: &["Aguento", "deixa!", "começou", "casa"],
        unchanged: &["aguento", "casa"],
        suggestions: &[("começou", "começar"), ("deixa", "deixar")],
    },
    ImportCase {
        name: "kindle_yellow_highlights",
        fixture: "notebook.html",
        format: ImportFormat::Kindle,
        raw: &["Aguento,", "deixa", "aguento"],
        unchanged: &["aguento"],
        suggestions: &[("deixa", "deixar")],
    },
    ImportCase {
        name: "kobo_annotations",
        fixture: "book.annot",
        format: ImportFormat::Kobo,
        raw: &["começou", "casa"],
        unchanged: &["casa"],
        suggestions: &[("começou", "começar")],
    },
];

#[test]
fn test_import_cases() {
    let harness = TestHarness::new();
    let normalizer = harness.normalizer();

    for case in IMPORT_CASES {
        let path = fixture_path(case.fixture);
        assert_eq!(
            ImportFormat::from_path(&path).unwrap(),
            case.format,
            "{}: format detection",
            case.name
        );

        let words = import_words(&path, case.format)
            .unwrap_or_else(|e| panic!("{}: import failed: {}", case.name, e));
        assert_eq!(words, case.raw, "{}: raw words", case.name);

        let outcome = normalizer.normalize(&words);
        assert_eq!(outcome.unchanged, case.unchanged, "{}: unchanged", case.name);
        let expected: BTreeMap<String, String> = case
            .suggestions
            .iter()
            .map(|(w, l)| (w.to_string(), l.to_string()))
            .collect();
        assert_eq!(outcome.suggestions, expected, "{}: suggestions", case.name);
        assert!(!outcome.degraded);
    }
}

#[test]
fn test_kindle_colors_are_kept_apart() {
    let highlights = highlights_by_color(&read_fixture("notebook.html"));

    assert_eq!(highlights["blue"], vec!["dar certo"]);
    assert_eq!(highlights["pink"], vec!["Ele começou a trabalhar cedo."]);
    assert_eq!(highlights["yellow"].len(), 3);
}

#[test]
fn test_normalization_is_idempotent() {
    let harness = TestHarness::new();
    let normalizer = harness.normalizer();
    let words = import_words(&fixture_path("words.txt"), ImportFormat::Text).unwrap();

    let first = normalizer.normalize(&words);

    let again = normalizer.normalize(&first.unchanged);
    assert_eq!(again.unchanged, first.unchanged);
    assert!(again.suggestions.is_empty());

    // Accepted lemmas are already in dictionary form.
    let lemmas = normalizer.normalize(first.suggestions.values());
    assert!(lemmas.suggestions.is_empty());
    assert_eq!(lemmas.unchanged, vec!["começar", "deixar"]);
}

#[test]
fn test_pop_unchanged_splits_mapping() {
    let mapping: BTreeMap<String, String> = [("aguento", "aguento"), ("deixa", "deixar")]
        .into_iter()
        .map(|(w, l)| (w.to_string(), l.to_string()))
        .collect();

    let (unchanged, suggestions) = pop_unchanged(&mapping);

    assert_eq!(unchanged, vec!["aguento"]);
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions["deixa"], "deixar");
}

#[test]
fn test_without_lemma_table_words_pass_through() {
    let normalizer = Normalizer::new(NormalizeOptions::default(), Arc::new(IdentityLemmatizer));
    let words = import_words(&fixture_path("words.txt"), ImportFormat::Text).unwrap();

    let outcome = normalizer.normalize(&words);

    assert!(outcome.degraded);
    assert!(outcome.suggestions.is_empty());
    assert_eq!(outcome.unchanged, vec!["aguento", "deixa", "começou", "casa"]);
}

#[test]
fn test_import_errors() {
    let harness = TestHarness::new();

    let unknown = harness.write_file("words.csv", "casa\n");
    assert!(matches!(
        ImportFormat::from_path(&unknown),
        Err(ImportError::UnsupportedFormat(_))
    ));

    let missing = harness.temp_path().join("missing.txt");
    assert!(matches!(
        import_words(&missing, ImportFormat::Text),
        Err(ImportError::ReadFile { .. })
    ));

    let broken = harness.write_file("broken.annot", "<annotationSet><annotation></target>");
    assert!(matches!(
        import_words(&broken, ImportFormat::Kobo),
        Err(ImportError::Malformed { .. })
    ));
}
