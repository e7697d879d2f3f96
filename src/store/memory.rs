use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{AggregateStore, CorpusStore, Inserted, ParseStatus, StoreError, add_count};
use crate::content::ContentId;
use crate::lexeme::{SourceSummary, Token};
use crate::profile::CodepointCounts;
use crate::tokenizer::Parsed;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
}

/// Process-local corpus. Clones share the same contents.
#[derive(Clone, Default)]
pub struct MemoryCorpus {
    inner: Arc<Mutex<CorpusState>>,
}

#[derive(Default)]
struct CorpusState {
    sources: HashMap<ContentId, Vec<u8>>,
    parsed: HashMap<ContentId, Parsed>,
    failed: HashSet<ContentId>,
    summaries: HashMap<ContentId, SourceSummary>,
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_parsed(&self, id: &ContentId) -> Result<Option<Parsed>, StoreError> {
        Ok(lock(&self.inner)?.parsed.get(id).cloned())
    }

    pub fn get_source_summary(&self, id: &ContentId) -> Result<Option<SourceSummary>, StoreError> {
        Ok(lock(&self.inner)?.summaries.get(id).copied())
    }

    /// Number of recorded (parsed, failed) outcomes
    pub fn outcome_counts(&self) -> Result<(usize, usize), StoreError> {
        let state = lock(&self.inner)?;
        Ok((state.parsed.len(), state.failed.len()))
    }
}

impl CorpusStore for MemoryCorpus {
    fn insert_source(&self, source: &[u8]) -> Result<Inserted, StoreError> {
        let id = ContentId::of(source);
        let mut state = lock(&self.inner)?;
        let is_new = !state.sources.contains_key(&id);
        if is_new {
            state.sources.insert(id.clone(), source.to_vec());
        }
        Ok(Inserted { id, is_new })
    }

    fn get_source(&self, id: &ContentId) -> Result<Vec<u8>, StoreError> {
        lock(&self.inner)?
            .sources
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::MissingSource(id.clone()))
    }

    fn record_parse_success(
        &self,
        id: &ContentId,
        tokens: &[Token],
        ast: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut state = lock(&self.inner)?;
        state.failed.remove(id);
        state.parsed.insert(
            id.clone(),
            Parsed {
                tokens: tokens.to_vec(),
                ast: ast.clone(),
            },
        );
        Ok(())
    }

    fn record_parse_failure(&self, id: &ContentId) -> Result<(), StoreError> {
        let mut state = lock(&self.inner)?;
        state.parsed.remove(id);
        state.summaries.remove(id);
        state.failed.insert(id.clone());
        Ok(())
    }

    fn record_source_summary(
        &self,
        id: &ContentId,
        summary: SourceSummary,
    ) -> Result<(), StoreError> {
        lock(&self.inner)?.summaries.insert(id.clone(), summary);
        Ok(())
    }

    fn parse_status(&self, id: &ContentId) -> Result<ParseStatus, StoreError> {
        let state = lock(&self.inner)?;
        Ok(if state.parsed.contains_key(id) {
            ParseStatus::Parsed
        } else if state.failed.contains(id) {
            ParseStatus::Failed
        } else {
            ParseStatus::Unparsed
        })
    }
}

/// Process-local codepoint frequencies. Clones share the same counters.
#[derive(Clone, Default)]
pub struct MemoryAggregate {
    inner: Arc<Mutex<AggregateState>>,
}

#[derive(Default)]
struct AggregateState {
    counts: CodepointCounts,
    profiled: HashSet<ContentId>,
}

impl AggregateState {
    /// All or nothing: a batch that would overflow leaves every counter as is
    fn merge(&mut self, other: &CodepointCounts) -> Result<(), StoreError> {
        for (label, count) in other.iter() {
            add_count(self.counts.get(label), count)?;
        }
        self.counts.merge(other);
        Ok(())
    }
}

impl MemoryAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every counter
    pub fn snapshot(&self) -> Result<CodepointCounts, StoreError> {
        Ok(lock(&self.inner)?.counts.clone())
    }
}

impl AggregateStore for MemoryAggregate {
    fn increment(&self, label: &str, by: u64) -> Result<u64, StoreError> {
        let mut state = lock(&self.inner)?;
        let total = add_count(state.counts.get(label), by)?;
        state.counts.add(label, by);
        Ok(total)
    }

    fn score(&self, label: &str) -> Result<Option<u64>, StoreError> {
        let state = lock(&self.inner)?;
        Ok(state
            .counts
            .contains(label)
            .then(|| state.counts.get(label)))
    }

    /// Whole batch under one lock
    fn merge(&self, other: &CodepointCounts) -> Result<(), StoreError> {
        lock(&self.inner)?.merge(other)
    }

    fn record_profile(
        &self,
        id: &ContentId,
        counts: &CodepointCounts,
    ) -> Result<bool, StoreError> {
        let mut state = lock(&self.inner)?;
        if state.profiled.contains(id) {
            return Ok(false);
        }
        state.merge(counts)?;
        state.profiled.insert(id.clone());
        Ok(true)
    }

    fn top(&self, limit: usize) -> Result<Vec<(String, u64)>, StoreError> {
        let state = lock(&self.inner)?;
        let counts = &state.counts;
        let mut ranked: Vec<(String, u64)> = counts
            .iter()
            .map(|(label, count)| (label.to_string(), count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        Ok(ranked)
    }
}
