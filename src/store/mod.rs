mod memory;
mod sqlite;


pub use memory::{MemoryAggregate, MemoryCorpus};
pub use sqlite::{CorpusStats, SqliteAggregate, SqliteCorpus};

use crate::content::ContentId;
use crate::lexeme::{SourceSummary, Token};
use crate::profile::CodepointCounts;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("No source stored for {0}")]
    MissingSource(ContentId),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Count out of range: {0}")]
    CountOutOfRange(u64),
}

/// Largest count either backend will hold; SQLite integers are signed
pub const MAX_COUNT: u64 = i64::MAX as u64;

/// `current + by`, refused past [`MAX_COUNT`]
pub(crate) fn add_count(current: u64, by: u64) -> Result<u64, StoreError> {
    current
        .checked_add(by)
        .filter(|total| *total <= MAX_COUNT)
        .ok_or(StoreError::CountOutOfRange(by))
}

/// Result of adding a source file to the corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inserted {
    pub id: ContentId,
    /// False when byte-identical content was already stored
    pub is_new: bool,
}

/// What the corpus knows about one source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    Unparsed,
    Parsed,
    Failed,
}

/// Durable home of source files and their parse results.
///
/// Every write is keyed by content id and safe to repeat: a redelivered work
/// item may record the same outcome twice.
pub trait CorpusStore: Send {
    /// Store source bytes under their content id
    fn insert_source(&self, source: &[u8]) -> Result<Inserted, StoreError>;

    fn get_source(&self, id: &ContentId) -> Result<Vec<u8>, StoreError>;

    /// Record tokens and syntax tree, clearing any failure marker
    fn record_parse_success(
        &self,
        id: &ContentId,
        tokens: &[Token],
        ast: &serde_json::Value,
    ) -> Result<(), StoreError>;

    /// Mark the source as unparseable, clearing any parse result
    fn record_parse_failure(&self, id: &ContentId) -> Result<(), StoreError>;

    fn record_source_summary(
        &self,
        id: &ContentId,
        summary: SourceSummary,
    ) -> Result<(), StoreError>;

    fn parse_status(&self, id: &ContentId) -> Result<ParseStatus, StoreError>;
}

/// Corpus-wide codepoint frequencies shared by all workers.
///
/// Increments must be atomic in the backing store; callers never read a
/// count, add to it and write it back.
pub trait AggregateStore: Send {
    /// Add `by` to a label, returning the new count
    fn increment(&self, label: &str, by: u64) -> Result<u64, StoreError>;

    fn score(&self, label: &str) -> Result<Option<u64>, StoreError>;

    /// Add every bucket of `counts`
    fn merge(&self, counts: &CodepointCounts) -> Result<(), StoreError> {
        for (label, count) in counts.iter() {
            self.increment(label, count)?;
        }
        Ok(())
    }

    /// Merge the profile of source `id` unless it was already recorded.
    ///
    /// Returns false when `id` had been profiled before and nothing changed,
    /// so a redelivered item never counts twice.
    fn record_profile(
        &self,
        id: &ContentId,
        counts: &CodepointCounts,
    ) -> Result<bool, StoreError>;

    /// Highest counts first
    fn top(&self, limit: usize) -> Result<Vec<(String, u64)>, StoreError>;
}
