//! Batch lemma matching for Georgian word lists.
//!
//! A [`MatchingSession`] holds one reference dictionary and one parsed word
//! list. The caller drives matching one batch at a time; each word is looked
//! up exactly first, then through its Latin transliteration variants (see
//! [`resolve`]). Results accumulate in input order alongside running
//! statistics and can be exported as TSV.
//!
//! # Example
//! ```
//! use lemmatch_service::MatchingSession;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = MatchingSession::default();
//! session.load_reference("Word,Frequency,Lemma,POS,Gloss,Morphemes\nორი,5,ორი,NUM,two,ორ-ი\n")?;
//! session.parse_word_list("Freq,Word\n12,ორი\n3,ზღვა\n")?;
//! session.process_all()?;
//! assert_eq!(session.statistics().matched, 1);
//! assert!(session.export(false).ends_with("ორი\t12\tორი\tNUM\ttwo\tორ-ი\t2"));
//! # Ok(()) }
//! ```
//!
//! The same session is served over HTTP by `lemmatch-server` ([`router`]) and
//! run end to end by the `lemmatch` command-line tool.

pub mod export;
pub mod handlers;
pub mod rate_limit;
pub mod resolver;
pub mod session;

pub use export::{EXPORT_HEADER, ExportRow, export_rows, render_tsv};
pub use handlers::{ApiError, AppState, SessionId, SessionSlot, router};
pub use rate_limit::{RateLimiterLayer, TokenBuckets};
pub use resolver::resolve;
pub use session::{
    BatchError, BatchOutcome, DEFAULT_BATCH_SIZE, InputSummary, MatchingSession, Progress,
    ReferenceSummary,
};
