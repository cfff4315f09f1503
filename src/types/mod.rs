//! Core identifiers and entities shared across pipeline stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a sentence by its 0-based position in the input file.
///
/// Assignment order is file order and is stable for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SentenceId(u32);

impl SentenceId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Render the record key used by the persisted stores, e.g. `sentence42`.
    pub fn record_key(&self) -> String {
        format!("sentence{}", self.0)
    }

    /// Parse a record key back into an id. Returns `None` for foreign keys.
    pub fn from_record_key(key: &str) -> Option<Self> {
        key.strip_prefix("sentence")
            .and_then(|n| n.parse::<u32>().ok())
            .map(Self)
    }
}

impl fmt::Display for SentenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.record_key())
    }
}

/// Identifies a distinct term (unigram or n-gram) in the term dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TermId(u32);

impl TermId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Identifies a cluster within a single run. Ids are not stable across runs
/// because seed selection is random.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterId(u32);

impl ClusterId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One input sentence, immutable once read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub id: SentenceId,
    pub text: String,
}

impl Sentence {
    pub fn new(id: SentenceId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}
