use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use lemmatch_reference::{LoadMode, ReferenceSet, SourceFile};
use lemmatch_service::{BatchError, MatchingSession};
use lemmatch_types::SchemaKind;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../lemmatch-reference/tests/fixtures")
        .join(name)
}

fn reference(name: &str) -> Arc<ReferenceSet> {
    Arc::new(ReferenceSet::from_path(fixture(name), LoadMode::Owned).unwrap())
}

fn session(batch: usize, name: &str) -> MatchingSession {
    MatchingSession::with_reference(NonZeroUsize::new(batch).unwrap(), reference(name))
}

#[test]
fn word_list_from_disk_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("words.csv");
    std::fs::write(&path, "\u{feff}Freq,Word,Source\n12,ორი,news\n4,ორმა,web\n2,ზღვა,web\n").unwrap();

    let mut session = session(2, "morphemes.tsv");
    let file = SourceFile::open(&path, LoadMode::Mmap).unwrap();
    let summary = session.parse_word_list(file.text().unwrap()).unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.batches, 2);

    assert_eq!(session.process_all(), Ok(2));
    let results = session.results();
    assert_eq!(results[1].matches[0].lemma(), "ორი");
    assert!(results[2].matches.is_empty());
    assert_eq!(session.records()[0].extra_field("source").unwrap().to_string(), "news");

    let stats = session.statistics();
    assert_eq!(stats.matched + stats.unmatched, 3);
    assert_eq!(stats.by_part_of_speech["NUM"], 2);
    assert_eq!(
        session.export(false),
        "Word\tFrequency\tLemma\tPOS\tGloss\tMorphemes\tMorpheme_Count\n\
         ორი\t12\tორი\tNUM\ttwo\tორ-ი\t2\n\
         ორმა\t4\tორი\tNUM\ttwo\tორ-მა\t2"
    );
}

#[test]
fn frequency_annotated_forms_share_a_row() {
    let mut session = session(500, "frequency.csv");
    assert_eq!(
        session.reference().unwrap().schema(),
        SchemaKind::FrequencyAnnotated
    );

    let house = session.lookup("სახლი");
    let houses = session.lookup("სახლები");
    assert_eq!(house.len(), 1);
    assert_eq!(house, houses);
    assert_eq!(house[0].entry.pos_label(), "NOUN");

    session.parse_word_list("Word\nსახლები\n").unwrap();
    session.process_next_batch().unwrap();
    assert_eq!(
        session.process_next_batch(),
        Err(BatchError::Exhausted { batches: 1 })
    );
}

#[test]
fn word_forms_reference_resolves_every_listed_form() {
    let session = session(500, "word_forms.tsv");
    for form in ["წერს", "წერა", "დაწერა"] {
        let matches = session.lookup(form);
        assert_eq!(matches.len(), 1, "{form}");
        assert_eq!(matches[0].lemma(), "წერა");
    }
    assert_eq!(session.lookup("კაცს")[0].entry.gloss.as_deref(), Some("man"));
}

#[test]
fn latin_keyed_rows_match_through_transliteration() {
    let session = session(500, "morphemes.tsv");
    let matches = session.lookup("კარი");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].lemma(), "კარი");
    assert_eq!(matches[0].variant.as_deref(), Some("kari"));
}
