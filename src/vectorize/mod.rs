//! Vectorization stage.
//!
//! Turns the normalized corpus into the TF-IDF vector space clustering
//! consumes: term dictionary → raw term-frequency vectors → corpus
//! document-frequency statistics → TF-IDF vectors, every vector tagged
//! with its sentence record key.

pub mod dictionary;
pub mod tfidf;
pub mod vector;

pub use dictionary::{DictionaryParams, TermDictionary};
pub use tfidf::{DfStats, TfIdfParams};
pub use vector::{NamedVector, SparseVector};

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::VectorizeConfig;
use crate::store::{self, OutputLayout, StoreError};
use crate::types::TermId;

#[derive(Error, Debug)]
pub enum VectorizeError {
    /// Reached with zero documents; the run must not continue to clustering.
    #[error("cannot vectorize an empty corpus")]
    EmptyCorpus,

    /// Every candidate term was filtered away by the dictionary thresholds.
    #[error(
        "term dictionary is empty after filtering ({num_docs} documents); \
         loosen min_df/min_support or raise max_df_percent"
    )]
    EmptyVocabulary { num_docs: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One normalized document entering vectorization: record key plus its
/// term list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermDocument {
    pub key: String,
    pub terms: Vec<String>,
}

impl TermDocument {
    pub fn new(key: impl Into<String>, terms: Vec<String>) -> Self {
        Self {
            key: key.into(),
            terms,
        }
    }

    /// Split a persisted space-joined term string back into a term list.
    pub fn from_joined(key: impl Into<String>, joined: &str) -> Self {
        Self::new(key, joined.split_whitespace().map(str::to_string).collect())
    }
}

/// Everything the stage produces, in memory.
#[derive(Debug, Clone)]
pub struct VectorizeOutput {
    pub dictionary: TermDictionary,
    pub tf_vectors: Vec<NamedVector>,
    pub df_stats: DfStats,
    pub tfidf_vectors: Vec<NamedVector>,
}

impl VectorizeOutput {
    /// Persist the stage artifacts under `vectors/`.
    pub fn write_artifacts(&self, layout: &OutputLayout) -> Result<(), VectorizeError> {
        store::write_json(&layout.dictionary(), &self.dictionary.entries())?;
        store::write_jsonl(&layout.tf_vectors(), &self.tf_vectors)?;
        store::write_json(&layout.df_stats(), &self.df_stats)?;
        store::write_jsonl(&layout.tfidf_vectors(), &self.tfidf_vectors)?;
        Ok(())
    }
}

/// Run the full vectorization stage over normalized documents.
///
/// Output vectors are in corpus order, one per input document, including
/// documents whose every term fell outside the dictionary (those yield
/// empty vectors, keeping the one-vector-per-sentence invariant).
pub fn vectorize(
    docs: &[TermDocument],
    config: &VectorizeConfig,
) -> Result<VectorizeOutput, VectorizeError> {
    if docs.is_empty() {
        return Err(VectorizeError::EmptyCorpus);
    }

    let params = DictionaryParams::from(config);
    let dictionary = TermDictionary::build(docs.iter().map(|d| d.terms.as_slice()), &params);
    if dictionary.is_empty() {
        return Err(VectorizeError::EmptyVocabulary {
            num_docs: docs.len(),
        });
    }
    debug!(terms = dictionary.len(), docs = docs.len(), "built term dictionary");

    let tf_vectors: Vec<NamedVector> = docs
        .iter()
        .map(|doc| NamedVector::new(doc.key.clone(), term_frequencies(&doc.terms, &dictionary, params.max_ngram_size)))
        .collect();

    let df_stats = DfStats::compute(&tf_vectors, dictionary.len());
    let tfidf_params = TfIdfParams {
        log_normalize: config.log_normalize,
        norm: config.norm,
    };
    let tfidf_vectors = tfidf::transform(&tf_vectors, &df_stats, &tfidf_params);

    info!(
        vectors = tfidf_vectors.len(),
        vocabulary = dictionary.len(),
        "vectorization complete"
    );
    Ok(VectorizeOutput {
        dictionary,
        tf_vectors,
        df_stats,
        tfidf_vectors,
    })
}

/// Raw term-frequency vector for one document over the dictionary space.
pub fn term_frequencies(
    terms: &[String],
    dictionary: &TermDictionary,
    max_ngram_size: usize,
) -> SparseVector {
    let mut counts: HashMap<TermId, f64> = HashMap::new();
    for gram in dictionary::ngrams(terms, max_ngram_size) {
        if let Some(id) = dictionary.id_of(&gram) {
            *counts.entry(id).or_default() += 1.0;
        }
    }
    SparseVector::from_pairs(counts.into_iter().collect())
}
