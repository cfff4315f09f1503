//! Document-frequency statistics and TF-IDF weighting.

use serde::{Deserialize, Serialize};

use crate::config::Norm;
use crate::types::TermId;
use crate::vectorize::vector::{NamedVector, SparseVector};

/// Corpus-wide document frequencies, indexed by term id.
///
/// Persisted as `vectors/df-stats.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DfStats {
    pub num_docs: usize,
    pub df: Vec<u32>,
}

impl DfStats {
    /// Count, per dictionary term, the documents whose TF vector has a
    /// non-zero entry for it.
    pub fn compute(tf_vectors: &[NamedVector], dictionary_len: usize) -> Self {
        let mut df = vec![0u32; dictionary_len];
        for named in tf_vectors {
            for (id, _) in named.vector.entries() {
                if let Some(slot) = df.get_mut(id.index()) {
                    *slot += 1;
                }
            }
        }
        Self {
            num_docs: tf_vectors.len(),
            df,
        }
    }

    pub fn df(&self, id: TermId) -> u32 {
        self.df.get(id.index()).copied().unwrap_or(0)
    }

    /// Inverse document frequency, `ln(N / df)`. Terms absent from every
    /// document have no defined idf; they never appear in a TF vector, so
    /// the zero returned here is never multiplied into a weight.
    pub fn idf(&self, id: TermId) -> f64 {
        let df = self.df(id);
        if df == 0 || self.num_docs == 0 {
            return 0.0;
        }
        (self.num_docs as f64 / df as f64).ln()
    }
}

/// TF-IDF weighting parameters.
#[derive(Debug, Clone, Copy)]
pub struct TfIdfParams {
    /// Dampen raw counts with `1 + ln(tf)` before applying idf.
    pub log_normalize: bool,
    /// Norm applied to each finished vector.
    pub norm: Norm,
}

/// Reweight TF vectors into the TF-IDF space consumed by clustering.
///
/// Names carry over unchanged; output order matches input order.
pub fn transform(
    tf_vectors: &[NamedVector],
    stats: &DfStats,
    params: &TfIdfParams,
) -> Vec<NamedVector> {
    tf_vectors
        .iter()
        .map(|named| {
            let pairs = named
                .vector
                .entries()
                .iter()
                .map(|&(id, tf)| {
                    let tf = if params.log_normalize { 1.0 + tf.ln() } else { tf };
                    (id, tf * stats.idf(id))
                })
                .collect();
            let mut vector = SparseVector::from_pairs(pairs);
            match params.norm {
                Norm::None => {}
                Norm::L1 => vector.scale_down(vector.l1_norm()),
                Norm::L2 => vector.scale_down(vector.l2_norm()),
            }
            NamedVector::new(named.name.clone(), vector)
        })
        .collect()
}
