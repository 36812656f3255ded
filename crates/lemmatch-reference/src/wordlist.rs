use lemmatch_types::{Cell, InputRecord};
use tracing::info;

use crate::LoadError;
use crate::table::{Delimiter, Table, cell};

/// Parse a user word list separated by commas, tabs, semicolons or pipes.
/// Needs a `word` column (any case); `freq` or `frequency` is optional and
/// defaults to 0. When a header repeats, the rightmost column is used. Other
/// columns ride along in `extra`, typed with [`Cell::parse`].
pub fn parse_word_list(text: &str) -> Result<Vec<InputRecord>, LoadError> {
    if text.trim().is_empty() {
        return Err(LoadError::EmptyInput { what: "word list" });
    }

    let delimiter = Delimiter::sniff_any(text);
    let table = Table::parse(text, delimiter)?;
    if table.is_empty() {
        return Err(LoadError::EmptyInput { what: "word list" });
    }

    let word_col = table
        .last_column(&["word"])
        .ok_or_else(|| LoadError::MissingWordColumn {
            headers: table.headers.clone(),
        })?;
    let freq_col = table.last_column(&["freq", "frequency"]);

    let records: Vec<InputRecord> = table
        .rows
        .iter()
        .map(|row| {
            let frequency = match freq_col.map(|col| Cell::parse(cell(row, col))) {
                None | Some(Cell::Empty) => Cell::Int(0),
                Some(value) => value,
            };
            let extra = table
                .headers
                .iter()
                .enumerate()
                .filter(|(_, header)| !is_reserved(header))
                .map(|(col, header)| (header.clone(), Cell::parse(cell(row, col))))
                .collect();
            InputRecord {
                word: cell(row, word_col).to_string(),
                frequency,
                extra,
            }
        })
        .collect();

    info!(
        "parsed {} word list rows ({})",
        records.len(),
        delimiter.label()
    );
    Ok(records)
}

// Word and frequency headers never ride along in `extra`, even the
// duplicates that lost to a column further right.
fn is_reserved(header: &str) -> bool {
    matches!(header.to_lowercase().as_str(), "word" | "freq" | "frequency")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_freq_word_example() {
        let records = parse_word_list("Freq,Word\n1,ორი\n1,პუმბა\n1,კარაქი\n").unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].word, "ორი");
        assert_eq!(records[0].frequency, Cell::Int(1));
        assert!(records[0].extra.is_empty());
    }

    #[test]
    fn frequency_defaults_to_zero() {
        let records = parse_word_list("word\tnote\nსახლი\tx\nორი\t\n").unwrap();
        assert_eq!(records[0].frequency, Cell::Int(0));
        assert_eq!(records[0].extra, vec![("note".to_string(), Cell::Text("x".into()))]);
        assert_eq!(records[1].extra_field("NOTE"), Some(&Cell::Empty));
    }

    #[test]
    fn accepts_long_frequency_header_and_text_values() {
        let records = parse_word_list("WORD,Frequency\nორი,many\nსამი,\n").unwrap();
        assert_eq!(records[0].frequency, Cell::Text("many".into()));
        assert_eq!(records[1].frequency, Cell::Int(0));
    }

    #[test]
    fn rightmost_frequency_column_wins() {
        let records = parse_word_list("Freq,Word,Frequency\n1,ორი,9\n").unwrap();
        assert_eq!(records[0].frequency, Cell::Int(9));
        assert!(records[0].extra.is_empty());

        let records = parse_word_list("Frequency,Word,freq\n4,ორი,2\n").unwrap();
        assert_eq!(records[0].frequency, Cell::Int(2));
    }

    #[test]
    fn reads_semicolon_and_pipe_lists() {
        let records = parse_word_list("Word;Freq\nორი;3\nსამი;1\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].word, "ორი");
        assert_eq!(records[0].frequency, Cell::Int(3));

        let records = parse_word_list("Freq|Word\n7|სახლი\n").unwrap();
        assert_eq!(records[0].word, "სახლი");
        assert_eq!(records[0].frequency, Cell::Int(7));
    }

    #[test]
    fn rejects_missing_word_column() {
        let err = parse_word_list("Freq,Token\n1,ორი\n").unwrap_err();
        match err {
            LoadError::MissingWordColumn { headers } => assert_eq!(headers, vec!["Freq", "Token"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_blank_and_header_only_input() {
        assert!(matches!(
            parse_word_list("  \n\t"),
            Err(LoadError::EmptyInput { .. })
        ));
        assert!(matches!(
            parse_word_list("Word,Freq\n"),
            Err(LoadError::EmptyInput { .. })
        ));
    }
}
