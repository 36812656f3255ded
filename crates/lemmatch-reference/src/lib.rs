//! Load lemmatised reference dictionaries and user word lists.
//!
//! Reference data comes as CSV or TSV in one of three header layouts (see
//! [`SchemaKind`]). Loading sniffs the delimiter, tokenises with the `csv`
//! reader, classifies the headers, and builds a [`ReferenceIndex`] from every
//! word form a row lists to the row's position. Rows keep their typed fields
//! (`lemma`, `pos`, `gloss`, `morphemes`) plus every other column verbatim.
//!
//! Text can come from memory (pasted data) or from disk via [`SourceFile`],
//! which memory-maps or reads the file depending on [`LoadMode`].
//!
//! # Example
//! ```
//! use lemmatch_reference::ReferenceSet;
//! use lemmatch_types::SchemaKind;
//!
//! # fn main() -> Result<(), lemmatch_reference::LoadError> {
//! let text = "Word,Frequency,Lemma,POS,Gloss,Morphemes\nორი,5,ორი,NUM,two,ორ-ი\n";
//! let reference = ReferenceSet::parse(text)?;
//! assert_eq!(reference.schema(), SchemaKind::Morpheme);
//! let rows: Vec<_> = reference.lookup("ორი").collect();
//! assert_eq!(rows[0].pos_label(), "NUM");
//! # Ok(()) }
//! ```
//!
//! For a runnable demo, see `cargo run -p lemmatch-reference --example stats -- <file>`.

pub mod index;
pub mod schema;
pub mod table;
pub mod wordlist;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use lemmatch_types::{Cell, ReferenceEntry, SchemaKind};
use memmap2::Mmap;
use thiserror::Error;
use tracing::{debug, info};

pub use index::{ReferenceIndex, extract_forms, normalize_form};
pub use schema::{SchemaColumns, SchemaDetectionError, detect_schema};
pub use table::{Delimiter, Table};
pub use wordlist::parse_word_list;

/// Why a reference or word-list load was rejected. Loads are all-or-nothing.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{what} is empty")]
    EmptyInput { what: &'static str },
    #[error(transparent)]
    SchemaDetection(#[from] SchemaDetectionError),
    #[error(
        "word list must have a \"Word\" column (found: {}); columns may be separated by commas, tabs, semicolons or pipes",
        .headers.join(", ")
    )]
    MissingWordColumn { headers: Vec<String> },
    #[error("failed to parse delimited text: {0}")]
    DelimitedText(String),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not valid UTF-8", .path.display())]
    InvalidUtf8 { path: PathBuf },
}

/// Strategy for reading files from disk.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map the file (fast, zero-copy).
    #[default]
    Mmap,
    /// Read the file into an owned buffer (portable fallback).
    Owned,
}

impl LoadMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "mmap" => Some(LoadMode::Mmap),
            "owned" => Some(LoadMode::Owned),
            _ => None,
        }
    }
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

/// A delimited-text file held in memory.
pub struct SourceFile {
    path: PathBuf,
    buffer: Buffer,
}

impl SourceFile {
    pub fn open(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self, LoadError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| LoadError::Io {
            path: path.clone(),
            source,
        };

        let mut file = File::open(&path).map_err(io_err)?;
        let len = file.metadata().map_err(io_err)?.len();
        let buffer = match mode {
            // Zero-length maps are rejected on some platforms.
            LoadMode::Mmap if len > 0 => unsafe { Mmap::map(&file) }
                .map(Buffer::Mmap)
                .map_err(io_err)?,
            _ => {
                let mut buf = Vec::with_capacity(len as usize);
                file.read_to_end(&mut buf).map_err(io_err)?;
                Buffer::Owned(buf)
            }
        };
        debug!("opened {} ({} bytes, {:?})", path.display(), len, mode);
        Ok(Self { path, buffer })
    }

    /// File contents as UTF-8, without a leading byte-order mark.
    pub fn text(&self) -> Result<&str, LoadError> {
        let text = std::str::from_utf8(self.buffer.as_slice()).map_err(|_| {
            LoadError::InvalidUtf8 {
                path: self.path.clone(),
            }
        })?;
        Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A loaded reference dictionary: rows in source order plus the form index.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceSet {
    entries: Vec<ReferenceEntry>,
    index: ReferenceIndex,
    schema: SchemaKind,
    delimiter: Delimiter,
}

impl ReferenceSet {
    /// Sniff, tokenise, classify and index reference text.
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        if text.trim().is_empty() {
            return Err(LoadError::EmptyInput {
                what: "reference data",
            });
        }

        let delimiter = Delimiter::sniff(text);
        let table = Table::parse(text, delimiter)?;
        if table.is_empty() {
            return Err(LoadError::EmptyInput {
                what: "reference data",
            });
        }
        debug!("headers detected: {:?}", table.headers);

        let schema = detect_schema(&table.headers)?;
        // A detected schema always has its columns.
        let columns = SchemaColumns::resolve(schema, &table.headers).ok_or_else(|| {
            SchemaDetectionError {
                found: table.headers.clone(),
            }
        })?;

        let index = ReferenceIndex::build(&table, &columns);
        let entries: Vec<ReferenceEntry> = table
            .rows
            .iter()
            .map(|row| entry_from_row(&table.headers, row, &columns))
            .collect();

        info!(
            "{} data loaded successfully with {} entries ({} layout)",
            delimiter.label(),
            entries.len(),
            schema
        );
        Ok(Self {
            entries,
            index,
            schema,
            delimiter,
        })
    }

    /// Load and parse a reference file.
    pub fn from_path(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self, LoadError> {
        let source = SourceFile::open(path, mode)?;
        Self::parse(source.text()?)
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn entry(&self, position: usize) -> Option<&ReferenceEntry> {
        self.entries.get(position)
    }

    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    pub fn schema(&self) -> SchemaKind {
        self.schema
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows indexed under an already-normalised key, in row order.
    pub fn lookup<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a ReferenceEntry> + use<'a> {
        let positions = self.index.get(key);
        positions
            .iter()
            .filter_map(move |&pos| self.entries.get(pos))
    }
}

fn entry_from_row(headers: &[String], row: &[String], columns: &SchemaColumns) -> ReferenceEntry {
    let text_at = |col: Option<usize>| {
        col.map(|c| table::cell(row, c))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let extra = headers
        .iter()
        .enumerate()
        .filter(|(col, _)| !columns.is_known_field(*col))
        .map(|(col, header)| (header.clone(), Cell::parse(table::cell(row, col))))
        .collect();

    ReferenceEntry {
        lemma: table::cell(row, columns.lemma).to_string(),
        part_of_speech: text_at(columns.pos),
        gloss: text_at(columns.gloss),
        morphemes: text_at(columns.morphemes),
        extra,
    }
}
