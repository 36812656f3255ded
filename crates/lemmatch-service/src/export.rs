use lemmatch_types::MatchResult;
use serde::Serialize;

pub const EXPORT_HEADER: [&str; 7] = [
    "Word",
    "Frequency",
    "Lemma",
    "POS",
    "Gloss",
    "Morphemes",
    "Morpheme_Count",
];

/// One line of the tab-separated export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub word: String,
    pub frequency: String,
    pub lemma: String,
    pub pos: String,
    pub gloss: String,
    pub morphemes: String,
    /// `None` on rows for unmatched words.
    pub morpheme_count: Option<usize>,
}

impl ExportRow {
    fn to_line(&self) -> String {
        let count = self
            .morpheme_count
            .map(|c| c.to_string())
            .unwrap_or_default();
        [
            self.word.as_str(),
            self.frequency.as_str(),
            self.lemma.as_str(),
            self.pos.as_str(),
            self.gloss.as_str(),
            self.morphemes.as_str(),
            count.as_str(),
        ]
        .join("\t")
    }
}

/// One row per match; unmatched words get a row with blank dictionary
/// fields only when `include_unmatched` is set.
pub fn export_rows(results: &[MatchResult], include_unmatched: bool) -> Vec<ExportRow> {
    let mut rows = Vec::new();
    for result in results {
        let frequency = result.frequency.to_string();
        if result.matches.is_empty() {
            if include_unmatched {
                rows.push(ExportRow {
                    word: result.word.clone(),
                    frequency,
                    lemma: String::new(),
                    pos: String::new(),
                    gloss: String::new(),
                    morphemes: String::new(),
                    morpheme_count: None,
                });
            }
            continue;
        }
        for m in &result.matches {
            let entry = &m.entry;
            rows.push(ExportRow {
                word: result.word.clone(),
                frequency: frequency.clone(),
                lemma: entry.lemma.clone(),
                pos: entry.part_of_speech.clone().unwrap_or_default(),
                gloss: entry.gloss.clone().unwrap_or_default(),
                morphemes: entry.morphemes.clone().unwrap_or_default(),
                morpheme_count: Some(entry.morpheme_count()),
            });
        }
    }
    rows
}

/// Header line, then one line per [`ExportRow`], joined by `\n`.
pub fn render_tsv(results: &[MatchResult], include_unmatched: bool) -> String {
    let mut out = EXPORT_HEADER.join("\t");
    out.push('\n');
    let lines: Vec<String> = export_rows(results, include_unmatched)
        .iter()
        .map(ExportRow::to_line)
        .collect();
    out.push_str(&lines.join("\n"));
    out
}
