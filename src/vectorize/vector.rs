//! Sparse feature vectors.

use serde::{Deserialize, Serialize};

use crate::types::TermId;

/// Sparse vector over the term dictionary space.
///
/// Entries are sorted by term id, one entry per id, no explicit zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    entries: Vec<(TermId, f64)>,
}

impl SparseVector {
    /// Build from unordered pairs with unique ids. Zero weights are dropped
    /// and entries sorted by id.
    pub fn from_pairs(mut pairs: Vec<(TermId, f64)>) -> Self {
        pairs.retain(|(_, weight)| *weight != 0.0);
        pairs.sort_by_key(|(id, _)| *id);
        Self { entries: pairs }
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[(TermId, f64)] {
        &self.entries
    }

    /// Number of non-zero entries.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: TermId) -> f64 {
        self.entries
            .binary_search_by_key(&id, |(entry_id, _)| *entry_id)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0.0)
    }

    pub fn l1_norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w.abs()).sum()
    }

    pub fn l2_norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    pub fn norm_squared(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum()
    }

    /// Divide every weight by `divisor`. A zero divisor is a no-op so zero
    /// vectors stay zero instead of turning into NaN.
    pub fn scale_down(&mut self, divisor: f64) {
        if divisor == 0.0 {
            return;
        }
        for (_, weight) in &mut self.entries {
            *weight /= divisor;
        }
    }

    /// Dot product against a dense vector indexed by term id.
    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.entries
            .iter()
            .map(|(id, w)| w * dense.get(id.index()).copied().unwrap_or(0.0))
            .sum()
    }

    /// Accumulate into a dense vector, used for centroid averaging.
    pub fn add_to_dense(&self, acc: &mut [f64]) {
        for (id, weight) in &self.entries {
            if let Some(slot) = acc.get_mut(id.index()) {
                *slot += weight;
            }
        }
    }
}

/// A sparse vector tagged with its originating record key, so clustering
/// output traces back to source sentences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedVector {
    pub name: String,
    pub vector: SparseVector,
}

impl NamedVector {
    pub fn new(name: impl Into<String>, vector: SparseVector) -> Self {
        Self {
            name: name.into(),
            vector,
        }
    }
}
