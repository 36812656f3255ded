use std::collections::HashMap;

use lemmatch_types::SchemaKind;
use tracing::info;

use crate::schema::SchemaColumns;
use crate::table::{Table, cell};

/// Lowercased, trimmed word form → positions of the reference rows that list
/// it. Built once per load and read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceIndex {
    exact: HashMap<String, Vec<usize>>,
    rows: usize,
}

impl ReferenceIndex {
    /// Index every row of `table`, pulling word forms from the column the
    /// detected layout designates.
    pub fn build(table: &Table, columns: &SchemaColumns) -> Self {
        let mut exact: HashMap<String, Vec<usize>> = HashMap::new();
        let mut postings = 0usize;

        for (row_idx, row) in table.rows.iter().enumerate() {
            for form in extract_forms(columns.schema, cell(row, columns.forms)) {
                exact.entry(form).or_default().push(row_idx);
                postings += 1;
            }
        }

        info!(
            "indexed {} word forms ({} postings) from {} rows",
            exact.len(),
            postings,
            table.rows.len()
        );
        Self {
            exact,
            rows: table.rows.len(),
        }
    }

    /// Row positions for an already-normalised key; empty when absent.
    pub fn get(&self, key: &str) -> &[usize] {
        self.exact.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.exact.contains_key(key)
    }

    /// Number of distinct word forms.
    pub fn key_count(&self) -> usize {
        self.exact.len()
    }

    /// Total (form, row) pairs, counting repeats.
    pub fn posting_count(&self) -> usize {
        self.exact.values().map(Vec::len).sum()
    }

    /// Number of rows the index was built over; every stored position is below it.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.exact.keys().map(String::as_str)
    }
}

/// Lowercase and trim a word form or query.
pub fn normalize_form(raw: &str) -> String {
    raw.to_lowercase().trim().to_string()
}

/// Word forms a single source cell contributes under `schema`, normalised,
/// with blanks dropped.
pub fn extract_forms(schema: SchemaKind, raw: &str) -> Vec<String> {
    let lowered = raw.to_lowercase();
    let candidates: Vec<&str> = match schema {
        SchemaKind::Morpheme => vec![lowered.as_str()],
        SchemaKind::WordForms => lowered
            .split(|c: char| c == ',' || c.is_whitespace())
            .collect(),
        SchemaKind::FrequencyAnnotated => lowered
            .split(',')
            .filter_map(|entry| strip_frequency(entry.trim()))
            .collect(),
    };

    candidates
        .into_iter()
        .map(str::trim)
        .filter(|form| !form.is_empty())
        .map(str::to_string)
        .collect()
}

// `სახლი (12)` -> `სახლი`; an entry that opens with `(` has no word.
fn strip_frequency(entry: &str) -> Option<&str> {
    let word = entry.split('(').next().unwrap_or_default();
    if word.is_empty() { None } else { Some(word) }
}
