//! Shared types for reconciling a word list against a lemma dictionary.
//!
//! Reference rows and input rows arrive as loosely typed delimited text. The
//! fields the matcher actually reads are lifted into typed struct fields
//! ([`ReferenceEntry::lemma`], [`InputRecord::word`], ...); every other column
//! is kept verbatim in an ordered `extra` list of [`Cell`] values so nothing is
//! lost between load and export.
//!
//! [`MatchResult`] and [`MatchStatistics`] are what a batch run produces, and
//! [`SchemaKind`] names the reference layouts the loader understands.
//!
//! ```rust
//! use lemmatch_types::{Cell, ReferenceEntry};
//!
//! assert_eq!(Cell::parse("12"), Cell::Int(12));
//! assert_eq!(Cell::parse("ორი"), Cell::Text("ორი".into()));
//!
//! let entry = ReferenceEntry {
//!     lemma: "ორი".into(),
//!     morphemes: Some("ორ-ი".into()),
//!     ..ReferenceEntry::default()
//! };
//! assert_eq!(entry.morpheme_count(), 2);
//! assert_eq!(entry.pos_label(), "Unknown");
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

/// Part-of-speech label used when a reference row leaves POS blank.
pub const UNKNOWN_POS: &str = "Unknown";

/// A single cell value with light dynamic typing applied.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Type a raw cell: blanks become [`Cell::Empty`], `true`/`false` become
    /// booleans, numeric literals become numbers, everything else stays text.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Cell::Empty;
        }
        match raw {
            "true" | "TRUE" => return Cell::Bool(true),
            "false" | "FALSE" => return Cell::Bool(false),
            _ => {}
        }

        let trimmed = raw.trim();
        if is_number_literal(trimmed) {
            if !trimmed.contains(['.', 'e', 'E'])
                && let Ok(value) = trimmed.parse::<i64>()
            {
                return Cell::Int(value);
            }
            if let Ok(value) = trimmed.parse::<f64>()
                && value.is_finite()
            {
                return Cell::Float(value);
            }
        }
        Cell::Text(raw.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Borrow the text payload, if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(x) => write!(f, "{x}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Accepts `-?(\d+\.?|\.\d+|\d+\.\d+)([eE][-+]?\d+)?`.
fn is_number_literal(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(at) => (&s[..at], Some(&s[at + 1..])),
        None => (s, None),
    };

    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (mantissa, ""),
    };
    if !all_digits(int_part) || !all_digits(frac_part) {
        return false;
    }
    if int_part.is_empty() && frac_part.is_empty() {
        return false;
    }

    match exponent {
        None => true,
        Some(exp) => {
            let digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            !digits.is_empty() && all_digits(digits)
        }
    }
}

/// One row of the reference dictionary.
///
/// Rows have no key of their own: they are identified by position in the
/// loaded collection, and several rows may share a lemma.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReferenceEntry {
    pub lemma: String,
    #[serde(rename = "pos")]
    pub part_of_speech: Option<String>,
    pub gloss: Option<String>,
    pub morphemes: Option<String>,
    #[serde(serialize_with = "serialize_fields")]
    pub extra: Vec<(String, Cell)>,
}

impl ReferenceEntry {
    /// Part of speech, or [`UNKNOWN_POS`] when the row leaves it blank.
    pub fn pos_label(&self) -> &str {
        self.part_of_speech.as_deref().unwrap_or(UNKNOWN_POS)
    }

    /// Number of non-blank hyphen-delimited segments in `morphemes`.
    pub fn morpheme_count(&self) -> usize {
        self.morphemes.as_deref().map_or(0, count_morphemes)
    }

    /// Case-insensitive field access covering the typed fields and `extra`.
    pub fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let known = match name.to_lowercase().as_str() {
            "lemma" => Some(Some(self.lemma.as_str())),
            "pos" => Some(self.part_of_speech.as_deref()),
            "gloss" => Some(self.gloss.as_deref()),
            "morphemes" => Some(self.morphemes.as_deref()),
            _ => None,
        };
        if let Some(value) = known {
            return value.map(Cow::Borrowed);
        }
        lookup_extra(&self.extra, name).map(|cell| match cell {
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
            other => Cow::Owned(other.to_string()),
        })
    }
}

/// Count non-blank segments of a hyphen-delimited morpheme breakdown.
pub fn count_morphemes(morphemes: &str) -> usize {
    morphemes
        .split('-')
        .filter(|part| !part.trim().is_empty())
        .count()
}

/// One row of the user's word list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InputRecord {
    pub word: String,
    pub frequency: Cell,
    #[serde(serialize_with = "serialize_fields")]
    pub extra: Vec<(String, Cell)>,
}

impl InputRecord {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            frequency: Cell::Int(0),
            extra: Vec::new(),
        }
    }

    /// Case-insensitive lookup of a passthrough column.
    pub fn extra_field(&self, name: &str) -> Option<&Cell> {
        lookup_extra(&self.extra, name)
    }
}

fn lookup_extra<'a>(extra: &'a [(String, Cell)], name: &str) -> Option<&'a Cell> {
    let wanted = name.to_lowercase();
    extra
        .iter()
        .find(|(key, _)| key.to_lowercase() == wanted)
        .map(|(_, cell)| cell)
}

fn serialize_fields<S: Serializer>(fields: &[(String, Cell)], s: S) -> Result<S::Ok, S::Error> {
    s.collect_map(fields.iter().map(|(k, v)| (k, v)))
}

/// A reference row returned for a query, with the transliteration variant
/// that found it (`None` for exact hits).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Match {
    #[serde(flatten)]
    pub entry: ReferenceEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Match {
    pub fn exact(entry: ReferenceEntry) -> Self {
        Self {
            entry,
            variant: None,
        }
    }

    pub fn via_variant(entry: ReferenceEntry, variant: impl Into<String>) -> Self {
        Self {
            entry,
            variant: Some(variant.into()),
        }
    }

    pub fn lemma(&self) -> &str {
        &self.entry.lemma
    }
}

/// Matches found for one input record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchResult {
    pub word: String,
    pub frequency: Cell,
    pub matches: Vec<Match>,
    /// Position of the record in the full input list.
    pub original_index: usize,
}

impl MatchResult {
    pub fn is_matched(&self) -> bool {
        !self.matches.is_empty()
    }
}

/// Running totals over processed batches. Counters only ever grow until the
/// input list is reset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MatchStatistics {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Per-match tallies; a word with three matches adds three.
    pub by_part_of_speech: BTreeMap<String, usize>,
}

/// One bar of the POS distribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PosShare {
    pub pos: String,
    pub count: usize,
    /// Share of matched words, rounded to the nearest percent.
    pub percentage: u32,
}

impl MatchStatistics {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Fold one result into the counters.
    pub fn record(&mut self, result: &MatchResult) {
        if result.matches.is_empty() {
            self.unmatched += 1;
            return;
        }
        self.matched += 1;
        for m in &result.matches {
            *self
                .by_part_of_speech
                .entry(m.entry.pos_label().to_string())
                .or_insert(0) += 1;
        }
    }

    /// Words accounted for so far.
    pub fn processed(&self) -> usize {
        self.matched + self.unmatched
    }

    /// POS tallies sorted by count (descending), then label.
    pub fn pos_distribution(&self) -> Vec<PosShare> {
        let mut shares: Vec<PosShare> = self
            .by_part_of_speech
            .iter()
            .map(|(pos, &count)| PosShare {
                pos: pos.clone(),
                count,
                percentage: percentage_of(count, self.matched),
            })
            .collect();
        shares.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.pos.cmp(&b.pos)));
        shares
    }
}

fn percentage_of(count: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((count as f64 / whole as f64) * 100.0).round() as u32
}

/// Recognised reference layouts, listed in detection priority order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    /// `Word, Frequency, Lemma, POS, Gloss, Morphemes`; one form per row.
    Morpheme,
    /// `Word forms, Lemma, POS, Gloss`; many forms per row.
    WordForms,
    /// `Words (Frequency), Lemma`; cells like `form (12), form2 (3)`.
    FrequencyAnnotated,
}

impl SchemaKind {
    pub const ALL: [SchemaKind; 3] = [
        SchemaKind::Morpheme,
        SchemaKind::WordForms,
        SchemaKind::FrequencyAnnotated,
    ];

    /// Header names as a user would type them for this layout.
    pub fn expected_headers(self) -> &'static [&'static str] {
        match self {
            SchemaKind::Morpheme => &["Word", "Frequency", "Lemma", "POS", "Gloss", "Morphemes"],
            SchemaKind::WordForms => &["Word forms", "Lemma", "POS", "Gloss"],
            SchemaKind::FrequencyAnnotated => &["Words (Frequency)", "Lemma"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SchemaKind::Morpheme => "morpheme",
            SchemaKind::WordForms => "word forms",
            SchemaKind::FrequencyAnnotated => "frequency-annotated",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(lemma: &str, pos: Option<&str>) -> ReferenceEntry {
        ReferenceEntry {
            lemma: lemma.into(),
            part_of_speech: pos.map(Into::into),
            ..ReferenceEntry::default()
        }
    }

    fn result(idx: usize, matches: Vec<Match>) -> MatchResult {
        MatchResult {
            word: format!("w{idx}"),
            frequency: Cell::Int(0),
            matches,
            original_index: idx,
        }
    }

    #[test]
    fn types_cells_like_a_spreadsheet() {
        assert_eq!(Cell::parse(""), Cell::Empty);
        assert_eq!(Cell::parse("TRUE"), Cell::Bool(true));
        assert_eq!(Cell::parse("false"), Cell::Bool(false));
        assert_eq!(Cell::parse("007"), Cell::Int(7));
        assert_eq!(Cell::parse("-3"), Cell::Int(-3));
        assert_eq!(Cell::parse("1.5"), Cell::Float(1.5));
        assert_eq!(Cell::parse(".5"), Cell::Float(0.5));
        assert_eq!(Cell::parse("2e3"), Cell::Float(2000.0));
        assert_eq!(Cell::parse("1.2.3"), Cell::Text("1.2.3".into()));
        assert_eq!(Cell::parse("+4"), Cell::Text("+4".into()));
        assert_eq!(Cell::parse("inf"), Cell::Text("inf".into()));
        assert_eq!(Cell::parse("ორ-ი"), Cell::Text("ორ-ი".into()));
    }

    #[test]
    fn displays_cells_for_export() {
        assert_eq!(Cell::Empty.to_string(), "");
        assert_eq!(Cell::Int(5).to_string(), "5");
        assert_eq!(Cell::Float(5.0).to_string(), "5");
        assert_eq!(Cell::Float(1.25).to_string(), "1.25");
        assert_eq!(Cell::Text("x".into()).to_string(), "x");
    }

    #[test]
    fn counts_morphemes_ignoring_blank_segments() {
        assert_eq!(count_morphemes("ორ-ი"), 2);
        assert_eq!(count_morphemes("-a--b - "), 2);
        assert_eq!(count_morphemes(""), 0);
        assert_eq!(entry("x", None).morpheme_count(), 0);
    }

    #[test]
    fn field_access_is_case_insensitive() {
        let mut e = entry("სახლი", Some("NOUN"));
        e.extra.push(("Total".into(), Cell::Int(15)));
        assert_eq!(e.field("LEMMA").as_deref(), Some("სახლი"));
        assert_eq!(e.field("pos").as_deref(), Some("NOUN"));
        assert_eq!(e.field("total").as_deref(), Some("15"));
        assert_eq!(e.field("gloss"), None);
        assert_eq!(e.field("missing"), None);
    }

    #[test]
    fn statistics_count_every_match_per_pos() {
        let mut stats = MatchStatistics::new(3);
        stats.record(&result(
            0,
            vec![
                Match::exact(entry("a", Some("NOUN"))),
                Match::exact(entry("b", Some("NOUN"))),
                Match::exact(entry("c", None)),
            ],
        ));
        stats.record(&result(1, vec![]));
        stats.record(&result(2, vec![Match::exact(entry("d", Some("VERB")))]));

        assert_eq!(stats.matched, 2);
        assert_eq!(stats.unmatched, 1);
        assert_eq!(stats.processed(), 3);
        assert_eq!(stats.by_part_of_speech["NOUN"], 2);
        assert_eq!(stats.by_part_of_speech[UNKNOWN_POS], 1);
        assert_eq!(stats.by_part_of_speech["VERB"], 1);
    }

    #[test]
    fn distribution_sorts_by_count_and_rounds() {
        let mut stats = MatchStatistics::new(3);
        stats.matched = 3;
        stats.by_part_of_speech.insert("VERB".into(), 1);
        stats.by_part_of_speech.insert("NOUN".into(), 2);
        stats.by_part_of_speech.insert("ADJ".into(), 1);
        let dist = stats.pos_distribution();
        assert_eq!(dist[0].pos, "NOUN");
        assert_eq!(dist[0].percentage, 67);
        assert_eq!(dist[1].pos, "ADJ");
        assert_eq!(dist[2].percentage, 33);

        assert!(MatchStatistics::new(0).pos_distribution().is_empty());
    }

    #[test]
    fn serializes_matches_flat() {
        let mut e = entry("ორი", Some("NUM"));
        e.extra.push(("Frequency".into(), Cell::Int(5)));
        let value = serde_json::to_value(Match::via_variant(e, "ori")).unwrap();
        assert_eq!(value["lemma"], "ორი");
        assert_eq!(value["pos"], "NUM");
        assert_eq!(value["variant"], "ori");
        assert_eq!(value["extra"]["Frequency"], 5);
        assert!(value["gloss"].is_null());
    }
}
