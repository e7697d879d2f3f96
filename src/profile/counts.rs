use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Frequency of codepoint labels, ordered by label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodepointCounts(BTreeMap<String, u64>);

impl CodepointCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: impl Into<String>, by: u64) {
        *self.0.entry(label.into()).or_insert(0) += by;
    }

    /// Add every bucket of `other` into this one
    pub fn merge(&mut self, other: &CodepointCounts) {
        for (label, count) in other.iter() {
            self.add(label, count);
        }
    }

    pub fn get(&self, label: &str) -> u64 {
        self.0.get(label).copied().unwrap_or(0)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains_key(label)
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(label, count)| (label.as_str(), *count))
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for CodepointCounts {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (label, count) in iter {
            counts.add(label, count);
        }
        counts
    }
}
