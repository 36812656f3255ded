use serde::Serialize;

use crate::LoadError;

/// Field separator of a pasted or loaded table.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Comma,
    Tab,
    Semicolon,
    Pipe,
}

impl Delimiter {
    /// Pick tab when the first line has more tabs than commas, comma otherwise.
    /// Reference data only ever comes as CSV or TSV.
    pub fn sniff(text: &str) -> Self {
        let first_line = first_line(text);
        let tabs = first_line.matches('\t').count();
        let commas = first_line.matches(',').count();
        if tabs > commas {
            Delimiter::Tab
        } else {
            Delimiter::Comma
        }
    }

    /// Word lists also accept `;` and `|`. The separator seen most often on
    /// the first line wins; ties go to comma, then tab, then semicolon.
    pub fn sniff_any(text: &str) -> Self {
        let first_line = first_line(text);
        let mut best = Delimiter::Comma;
        let mut best_count = 0;
        for candidate in [
            Delimiter::Comma,
            Delimiter::Tab,
            Delimiter::Semicolon,
            Delimiter::Pipe,
        ] {
            let count = first_line.matches(candidate.as_byte() as char).count();
            if count > best_count {
                best = candidate;
                best_count = count;
            }
        }
        best
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
            Delimiter::Semicolon => b';',
            Delimiter::Pipe => b'|',
        }
    }

    /// Short name for log messages.
    pub fn label(self) -> &'static str {
        match self {
            Delimiter::Comma => "CSV",
            Delimiter::Tab => "TSV",
            Delimiter::Semicolon => "semicolon-separated",
            Delimiter::Pipe => "pipe-separated",
        }
    }
}

fn first_line(text: &str) -> &str {
    text.split('\n').next().unwrap_or_default()
}

/// Header row plus raw string cells. Rows may be shorter or longer than the
/// header; missing cells read as empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Tokenise `text` with the `csv` reader. Blank lines are skipped.
    pub fn parse(text: &str, delimiter: Delimiter) -> Result<Self, LoadError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter.as_byte())
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(delimited)?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(delimited)?;
            if record.len() <= 1 && record.iter().all(str::is_empty) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// First header equal to `name`, ignoring case.
    pub fn column(&self, name: &str) -> Option<usize> {
        find_column(&self.headers, |h| h == name)
    }

    /// Last header equal to any of `names`, ignoring case. Later columns
    /// override earlier ones when a list repeats a field.
    pub fn last_column(&self, names: &[&str]) -> Option<usize> {
        self.headers
            .iter()
            .rposition(|h| names.contains(&h.to_lowercase().as_str()))
    }

    /// First header containing `needle`, ignoring case.
    pub fn column_containing(&self, needle: &str) -> Option<usize> {
        find_column(&self.headers, |h| h.contains(needle))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Cell `col` of `row`, empty when the row is short.
pub fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map_or("", String::as_str)
}

pub(crate) fn find_column(headers: &[String], pred: impl Fn(&str) -> bool) -> Option<usize> {
    headers.iter().position(|h| pred(&h.to_lowercase()))
}

fn delimited(err: csv::Error) -> LoadError {
    LoadError::DelimitedText(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_from_first_line_only() {
        assert_eq!(Delimiter::sniff("a\tb\tc\n1,2,3,4,5"), Delimiter::Tab);
        assert_eq!(Delimiter::sniff("a,b\tc"), Delimiter::Comma);
        assert_eq!(Delimiter::sniff("word"), Delimiter::Comma);
        assert_eq!(Delimiter::sniff(""), Delimiter::Comma);
        assert_eq!(Delimiter::sniff("Word;Freq"), Delimiter::Comma);
    }

    #[test]
    fn word_list_sniff_accepts_semicolons_and_pipes() {
        assert_eq!(Delimiter::sniff_any("Word;Freq;Note\nა;1;x"), Delimiter::Semicolon);
        assert_eq!(Delimiter::sniff_any("Word|Freq"), Delimiter::Pipe);
        assert_eq!(Delimiter::sniff_any("Word\tFreq"), Delimiter::Tab);
        assert_eq!(Delimiter::sniff_any("Word,Freq;x"), Delimiter::Comma);
        assert_eq!(Delimiter::sniff_any("Word"), Delimiter::Comma);
    }

    #[test]
    fn parses_ragged_rows_and_skips_blank_lines() {
        let table = Table::parse("Word,Lemma,POS\nა,ბ\n\nგ,დ,ე,ვ\n", Delimiter::Comma).unwrap();
        assert_eq!(table.headers, vec!["Word", "Lemma", "POS"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(cell(&table.rows[0], 2), "");
        assert_eq!(cell(&table.rows[1], 3), "ვ");
    }

    #[test]
    fn honours_quotes() {
        let text = "Words (Frequency),Lemma\n\"სახლი (12), სახლები (3)\",სახლი\n";
        let table = Table::parse(text, Delimiter::Comma).unwrap();
        assert_eq!(cell(&table.rows[0], 0), "სახლი (12), სახლები (3)");
        assert_eq!(cell(&table.rows[0], 1), "სახლი");
    }

    #[test]
    fn strips_byte_order_mark() {
        let table = Table::parse("\u{feff}Word\tFreq\nორი\t1\n", Delimiter::Tab).unwrap();
        assert_eq!(table.column("word"), Some(0));
    }

    #[test]
    fn finds_columns_case_insensitively() {
        let table = Table {
            headers: vec!["Word Forms (all)".into(), "LEMMA".into()],
            rows: vec![],
        };
        assert_eq!(table.column("lemma"), Some(1));
        assert_eq!(table.column_containing("word forms"), Some(0));
        assert_eq!(table.column("pos"), None);
        assert_eq!(table.last_column(&["lemma", "word forms (all)"]), Some(1));
        assert!(table.is_empty());
    }
}
