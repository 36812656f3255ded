use lemmatch_types::SchemaKind;
use thiserror::Error;
use tracing::debug;

use crate::table::find_column;

const MORPHEME_HEADERS: [&str; 6] = ["word", "frequency", "lemma", "pos", "gloss", "morphemes"];
const WORD_FORMS_HEADERS: [&str; 3] = ["lemma", "pos", "gloss"];
const WORD_FORMS_MARKER: &str = "word forms";
const FREQUENCY_MARKER: &str = "words (frequency)";

/// Reference headers matched none of the known layouts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("headers [{}] match no known reference format; expected one of:{}", .found.join(", "), expected_formats())]
pub struct SchemaDetectionError {
    /// Headers that were actually present.
    pub found: Vec<String>,
}

impl SchemaDetectionError {
    /// The header sets that would have been accepted, in priority order.
    pub fn expected(&self) -> Vec<(SchemaKind, &'static [&'static str])> {
        SchemaKind::ALL
            .iter()
            .map(|kind| (*kind, kind.expected_headers()))
            .collect()
    }
}

fn expected_formats() -> String {
    let mut out = String::new();
    for kind in SchemaKind::ALL {
        let quoted: Vec<String> = kind
            .expected_headers()
            .iter()
            .map(|h| format!("\"{h}\""))
            .collect();
        out.push_str(&format!("\n- {} format: {} columns", kind, quoted.join(", ")));
    }
    out
}

/// Classify a header row. Every layout is checked; when several match, the
/// morpheme layout wins over word forms, which wins over frequency-annotated.
pub fn detect_schema(headers: &[String]) -> Result<SchemaKind, SchemaDetectionError> {
    let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    let has = |name: &str| lowered.iter().any(|h| h == name);
    let has_containing = |needle: &str| lowered.iter().any(|h| h.contains(needle));

    let morpheme = MORPHEME_HEADERS.iter().all(|name| has(name));
    let word_forms =
        has_containing(WORD_FORMS_MARKER) && WORD_FORMS_HEADERS.iter().all(|name| has(name));
    let frequency_annotated = has_containing(FREQUENCY_MARKER) && has("lemma");
    debug!(
        ?headers,
        morpheme, word_forms, frequency_annotated, "schema checks"
    );

    if morpheme {
        Ok(SchemaKind::Morpheme)
    } else if word_forms {
        Ok(SchemaKind::WordForms)
    } else if frequency_annotated {
        Ok(SchemaKind::FrequencyAnnotated)
    } else {
        Err(SchemaDetectionError {
            found: headers.to_vec(),
        })
    }
}

/// Column positions a detected layout reads from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SchemaColumns {
    pub schema: SchemaKind,
    /// Column holding the word form(s) to index.
    pub forms: usize,
    pub lemma: usize,
    pub pos: Option<usize>,
    pub gloss: Option<usize>,
    pub morphemes: Option<usize>,
}

impl SchemaColumns {
    /// Locate the columns for `schema`; `None` if `headers` do not fit it.
    pub fn resolve(schema: SchemaKind, headers: &[String]) -> Option<Self> {
        let exact = |name: &str| find_column(headers, |h| h == name);
        let forms = match schema {
            SchemaKind::Morpheme => exact("word")?,
            SchemaKind::WordForms => find_column(headers, |h| h.contains(WORD_FORMS_MARKER))?,
            SchemaKind::FrequencyAnnotated => {
                find_column(headers, |h| h.contains(FREQUENCY_MARKER))?
            }
        };
        Some(Self {
            schema,
            forms,
            lemma: exact("lemma")?,
            pos: exact("pos"),
            gloss: exact("gloss"),
            morphemes: exact("morphemes"),
        })
    }

    /// True if `col` feeds a typed `ReferenceEntry` field.
    pub fn is_known_field(&self, col: usize) -> bool {
        col == self.lemma
            || self.pos == Some(col)
            || self.gloss == Some(col)
            || self.morphemes == Some(col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detects_morpheme_layout_case_insensitively() {
        let h = headers(&["WORD", "frequency", "Lemma", "pos", "Gloss", "MORPHEMES"]);
        assert_eq!(detect_schema(&h), Ok(SchemaKind::Morpheme));
    }

    #[test]
    fn detects_word_forms_by_substring() {
        let h = headers(&["All Word Forms", "Lemma", "POS", "Gloss"]);
        assert_eq!(detect_schema(&h), Ok(SchemaKind::WordForms));
    }

    #[test]
    fn detects_frequency_annotated() {
        let h = headers(&["Words (Frequency)", "Lemma", "Total", "POS", "Gloss"]);
        assert_eq!(detect_schema(&h), Ok(SchemaKind::FrequencyAnnotated));
    }

    #[test]
    fn prefers_morpheme_then_word_forms() {
        let all = headers(&[
            "Word",
            "Frequency",
            "Lemma",
            "POS",
            "Gloss",
            "Morphemes",
            "Word forms",
            "Words (Frequency)",
        ]);
        assert_eq!(detect_schema(&all), Ok(SchemaKind::Morpheme));

        let two = headers(&["Word forms", "Words (Frequency)", "Lemma", "POS", "Gloss"]);
        assert_eq!(detect_schema(&two), Ok(SchemaKind::WordForms));
    }

    #[test]
    fn exact_headers_do_not_match_by_substring() {
        let h = headers(&["Word forms", "Lemmas", "POS", "Gloss"]);
        assert!(detect_schema(&h).is_err());
    }

    #[test]
    fn failure_lists_every_expected_format() {
        let err = detect_schema(&headers(&["Foo", "Bar"])).unwrap_err();
        assert_eq!(err.found, vec!["Foo", "Bar"]);
        assert_eq!(err.expected().len(), 3);
        let message = err.to_string();
        assert!(message.contains("\"Morphemes\""));
        assert!(message.contains("\"Word forms\""));
        assert!(message.contains("\"Words (Frequency)\""));
    }

    #[test]
    fn resolves_optional_columns() {
        let h = headers(&["Words (Frequency)", "Lemma", "Total", "POS", "Gloss"]);
        let cols = SchemaColumns::resolve(SchemaKind::FrequencyAnnotated, &h).unwrap();
        assert_eq!(cols.forms, 0);
        assert_eq!(cols.lemma, 1);
        assert_eq!(cols.pos, Some(3));
        assert_eq!(cols.gloss, Some(4));
        assert_eq!(cols.morphemes, None);
        assert!(cols.is_known_field(3));
        assert!(!cols.is_known_field(2));
    }
}
