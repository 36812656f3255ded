use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Arc;

use lemmatch_reference::{Delimiter, LoadError, ReferenceSet, parse_word_list};
use lemmatch_types::{InputRecord, Match, MatchResult, MatchStatistics, SchemaKind};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::export::render_tsv;
use crate::resolver::resolve;

pub const DEFAULT_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(500) {
    Some(size) => size,
    None => panic!("default batch size is zero"),
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("no word list has been parsed")]
    NoInput,
    #[error("batch {requested} requested out of order; the next batch is {expected}")]
    OutOfOrder { expected: usize, requested: usize },
    #[error("all {batches} batches have already been processed")]
    Exhausted { batches: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReferenceSummary {
    pub entries: usize,
    pub schema: SchemaKind,
    pub delimiter: Delimiter,
    pub index_keys: usize,
}

impl ReferenceSummary {
    fn of(set: &ReferenceSet) -> Self {
        Self {
            entries: set.len(),
            schema: set.schema(),
            delimiter: set.delimiter(),
            index_keys: set.index().key_count(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InputSummary {
    pub total: usize,
    pub batch_size: usize,
    pub batches: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    pub percent: u32,
    pub batches_processed: usize,
    pub batch_count: usize,
    pub has_more: bool,
}

/// A completed batch: its 1-based number and where its results sit in
/// [`MatchingSession::results`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchOutcome {
    pub batch: usize,
    pub range: Range<usize>,
}

#[derive(Debug)]
struct InputState {
    records: Vec<InputRecord>,
    batch_size: NonZeroUsize,
    processed_batches: usize,
    results: Vec<MatchResult>,
    stats: MatchStatistics,
}

impl InputState {
    fn new(records: Vec<InputRecord>, batch_size: NonZeroUsize) -> Self {
        let stats = MatchStatistics::new(records.len());
        Self {
            records,
            batch_size,
            processed_batches: 0,
            results: Vec::new(),
            stats,
        }
    }

    fn size(&self) -> usize {
        self.batch_size.get()
    }

    fn batch_count(&self) -> usize {
        self.records.len().div_ceil(self.size())
    }

    fn has_more(&self) -> bool {
        self.processed_batches * self.size() < self.records.len()
    }

    fn processed_count(&self) -> usize {
        (self.processed_batches * self.size()).min(self.records.len())
    }
}

/// All state of one matching run: the reference dictionary, the parsed word
/// list, and the results and statistics accumulated batch by batch.
///
/// The reference and the word list are loaded and reset independently. A
/// failed load leaves the previous state in place. Batches are driven by the
/// caller, one [`process_batch`](Self::process_batch) call at a time, and
/// must be requested in order starting from 1.
#[derive(Debug)]
pub struct MatchingSession {
    batch_size: NonZeroUsize,
    reference: Option<Arc<ReferenceSet>>,
    input: InputState,
}

impl Default for MatchingSession {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl MatchingSession {
    pub fn new(batch_size: NonZeroUsize) -> Self {
        Self {
            batch_size,
            reference: None,
            input: InputState::new(Vec::new(), batch_size),
        }
    }

    /// Start with an already loaded (possibly shared) reference.
    pub fn with_reference(batch_size: NonZeroUsize, reference: Arc<ReferenceSet>) -> Self {
        let mut session = Self::new(batch_size);
        session.reference = Some(reference);
        session
    }

    /// Batch size for the next parsed word list; the current list keeps the
    /// size it was parsed with.
    pub fn set_batch_size(&mut self, batch_size: NonZeroUsize) {
        self.batch_size = batch_size;
    }

    pub fn batch_size(&self) -> NonZeroUsize {
        self.input.batch_size
    }

    pub fn load_reference(&mut self, text: &str) -> Result<ReferenceSummary, LoadError> {
        let set = ReferenceSet::parse(text)?;
        Ok(self.set_reference(Arc::new(set)))
    }

    pub fn set_reference(&mut self, reference: Arc<ReferenceSet>) -> ReferenceSummary {
        let summary = ReferenceSummary::of(&reference);
        self.reference = Some(reference);
        summary
    }

    /// Drop the reference dictionary. Parsed input and results stay.
    pub fn reset_reference(&mut self) {
        if self.reference.take().is_some() {
            info!("reference data reset");
        }
    }

    pub fn reference(&self) -> Option<&ReferenceSet> {
        self.reference.as_deref()
    }

    pub fn reference_summary(&self) -> Option<ReferenceSummary> {
        self.reference().map(ReferenceSummary::of)
    }

    /// Replace the word list, clearing results and statistics.
    pub fn parse_word_list(&mut self, text: &str) -> Result<InputSummary, LoadError> {
        let records = parse_word_list(text)?;
        Ok(self.set_word_list(records))
    }

    /// Install records parsed elsewhere, clearing results and statistics.
    pub fn set_word_list(&mut self, records: Vec<InputRecord>) -> InputSummary {
        self.input = InputState::new(records, self.batch_size);
        self.input_summary()
    }

    /// Drop the word list with its results and statistics. The reference stays.
    pub fn reset_input(&mut self) {
        self.input = InputState::new(Vec::new(), self.batch_size);
    }

    pub fn has_input(&self) -> bool {
        !self.input.records.is_empty()
    }

    pub fn records(&self) -> &[InputRecord] {
        &self.input.records
    }

    pub fn input_summary(&self) -> InputSummary {
        InputSummary {
            total: self.input.records.len(),
            batch_size: self.input.size(),
            batches: self.input.batch_count(),
        }
    }

    /// Matches for a single word against the current reference.
    pub fn lookup(&self, word: &str) -> Vec<Match> {
        resolve_against(self.reference(), word)
    }

    pub fn has_more_batches(&self) -> bool {
        self.input.has_more()
    }

    /// Match records `[(n-1)*size, min(n*size, total))` and fold them into the
    /// results and statistics. Only batch `processed + 1` is accepted; on
    /// error nothing is recorded.
    pub fn process_batch(&mut self, batch: usize) -> Result<BatchOutcome, BatchError> {
        let input = &mut self.input;
        if input.records.is_empty() {
            return Err(BatchError::NoInput);
        }
        if !input.has_more() {
            return Err(BatchError::Exhausted {
                batches: input.batch_count(),
            });
        }
        let expected = input.processed_batches + 1;
        if batch != expected {
            return Err(BatchError::OutOfOrder {
                expected,
                requested: batch,
            });
        }

        let size = input.size();
        let start = (batch - 1) * size;
        let end = (batch * size).min(input.records.len());
        let reference = self.reference.as_deref();
        let staged: Vec<MatchResult> = input.records[start..end]
            .iter()
            .enumerate()
            .map(|(offset, record)| MatchResult {
                word: record.word.clone(),
                frequency: record.frequency.clone(),
                matches: resolve_against(reference, &record.word),
                original_index: start + offset,
            })
            .collect();

        for result in &staged {
            input.stats.record(result);
        }
        let first = input.results.len();
        input.results.extend(staged);
        input.processed_batches = batch;

        info!(
            batch,
            start,
            end,
            matched = input.stats.matched,
            unmatched = input.stats.unmatched,
            "batch processed"
        );
        Ok(BatchOutcome {
            batch,
            range: first..input.results.len(),
        })
    }

    pub fn process_next_batch(&mut self) -> Result<BatchOutcome, BatchError> {
        self.process_batch(self.input.processed_batches + 1)
    }

    /// Run the remaining batches back to back; returns how many ran.
    pub fn process_all(&mut self) -> Result<usize, BatchError> {
        let mut ran = 0;
        while self.has_more_batches() {
            self.process_next_batch()?;
            ran += 1;
        }
        Ok(ran)
    }

    /// Results of every processed batch, in input order.
    pub fn results(&self) -> &[MatchResult] {
        &self.input.results
    }

    pub fn statistics(&self) -> &MatchStatistics {
        &self.input.stats
    }

    pub fn batch_count(&self) -> usize {
        self.input.batch_count()
    }

    /// Records covered by processed batches.
    pub fn processed_count(&self) -> usize {
        self.input.processed_count()
    }

    /// Share of records processed, rounded to the nearest percent.
    pub fn progress_percent(&self) -> u32 {
        let total = self.input.records.len();
        if total == 0 {
            return 0;
        }
        ((self.processed_count() as f64 / total as f64) * 100.0).round() as u32
    }

    pub fn progress(&self) -> Progress {
        Progress {
            processed: self.processed_count(),
            total: self.input.records.len(),
            percent: self.progress_percent(),
            batches_processed: self.input.processed_batches,
            batch_count: self.batch_count(),
            has_more: self.has_more_batches(),
        }
    }

    /// Tab-separated export of the processed results.
    pub fn export(&self, include_unmatched: bool) -> String {
        render_tsv(&self.input.results, include_unmatched)
    }
}

fn resolve_against(reference: Option<&ReferenceSet>, word: &str) -> Vec<Match> {
    reference.map_or_else(Vec::new, |set| resolve(word, set))
}
