use std::path::PathBuf;

use lemmatch_reference::{Delimiter, LoadError, LoadMode, ReferenceSet, SourceFile, parse_word_list};
use lemmatch_types::{Cell, SchemaKind};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn loads_morpheme_fixture_with_both_modes() {
    for mode in [LoadMode::Mmap, LoadMode::Owned] {
        let set = ReferenceSet::from_path(fixture("morphemes.tsv"), mode).expect("load fixture");
        assert_eq!(set.schema(), SchemaKind::Morpheme);
        assert_eq!(set.delimiter(), Delimiter::Tab);
        assert_eq!(set.len(), 4);
        assert_eq!(set.index().get("ორი"), &[0]);
        assert_eq!(set.index().get("kari"), &[3]);
    }
}

#[test]
fn frequency_fixture_indexes_every_form_to_its_row() {
    let set = ReferenceSet::from_path(fixture("frequency.csv"), LoadMode::Owned).unwrap();
    assert_eq!(set.schema(), SchemaKind::FrequencyAnnotated);
    assert_eq!(set.delimiter(), Delimiter::Comma);
    assert_eq!(set.index().get("სახლი"), &[0]);
    assert_eq!(set.index().get("სახლები"), &[0]);
    assert_eq!(set.index().get("ორი"), &[1]);

    let house = set.entry(0).unwrap();
    assert_eq!(house.lemma, "სახლი");
    assert_eq!(house.gloss.as_deref(), Some("house"));
    assert_eq!(house.field("total").as_deref(), Some("15"));
}

#[test]
fn word_forms_fixture_splits_cells() {
    let set = ReferenceSet::from_path(fixture("word_forms.tsv"), LoadMode::Mmap).unwrap();
    assert_eq!(set.schema(), SchemaKind::WordForms);
    for form in ["წერს", "წერა", "დაწერა"] {
        assert_eq!(set.index().get(form), &[0], "{form}");
    }
    assert_eq!(set.index().get("კაცს"), &[1]);
    assert_eq!(set.index().key_count(), 5);
}

#[test]
fn reads_word_list_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("words.csv");
    std::fs::write(&path, "\u{feff}Freq,Word\n1,ორი\n3,სახლები\n").unwrap();

    let source = SourceFile::open(&path, LoadMode::Mmap).unwrap();
    let records = parse_word_list(source.text().unwrap()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].word, "სახლები");
    assert_eq!(records[1].frequency, Cell::Int(3));
}

#[test]
fn empty_file_is_empty_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.tsv");
    std::fs::write(&path, "").unwrap();
    let err = ReferenceSet::from_path(&path, LoadMode::Mmap).unwrap_err();
    assert!(matches!(err, LoadError::EmptyInput { .. }), "{err}");
}

#[test]
fn reports_missing_and_non_utf8_files() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.tsv");
    assert!(matches!(
        ReferenceSet::from_path(&missing, LoadMode::Owned),
        Err(LoadError::Io { .. })
    ));

    let latin1 = dir.path().join("latin1.csv");
    std::fs::write(&latin1, [b'W', b'o', b'r', b'd', b'\n', 0xE9, b'\n']).unwrap();
    assert!(matches!(
        ReferenceSet::from_path(&latin1, LoadMode::Owned),
        Err(LoadError::InvalidUtf8 { .. })
    ));
}
