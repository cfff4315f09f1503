//! Term dictionary construction.
//!
//! Builds the shared term → id mapping from the normalized corpus. Terms
//! are unigrams and joined n-grams up to a configured size, pruned by
//! document frequency so that rare noise and ubiquitous stop-word behavior
//! both stay out of the vector space. Ids are assigned in lexicographic
//! term order, so the same corpus and parameters always produce the same
//! dictionary.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::VectorizeConfig;
use crate::types::TermId;

/// Dictionary pruning parameters.
#[derive(Debug, Clone, Copy)]
pub struct DictionaryParams {
    /// Largest n-gram size recorded; 1 means unigrams only.
    pub max_ngram_size: usize,
    /// Minimum corpus-wide occurrence count for n-grams of size 2 and up.
    pub min_support: usize,
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// Terms in more than this percentage of documents are dropped.
    pub max_df_percent: u8,
}

impl From<&VectorizeConfig> for DictionaryParams {
    fn from(config: &VectorizeConfig) -> Self {
        Self {
            max_ngram_size: config.max_ngram_size,
            min_support: config.min_support,
            min_df: config.min_df,
            max_df_percent: config.max_df_percent,
        }
    }
}

/// Expand a term list into all 1..=max_n grams, multi-term grams joined
/// with a single space.
pub fn ngrams(terms: &[String], max_n: usize) -> Vec<String> {
    let mut grams = Vec::new();
    for n in 1..=max_n.max(1) {
        if n > terms.len() {
            break;
        }
        for window in terms.windows(n) {
            grams.push(window.join(" "));
        }
    }
    grams
}

/// Immutable term → id mapping shared by the vectorization stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermDictionary {
    terms: Vec<String>,
    index: HashMap<String, TermId>,
}

/// One dictionary entry as persisted in `vectors/dictionary.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub term: String,
    pub id: TermId,
}

impl TermDictionary {
    /// Build the dictionary from per-document term lists.
    ///
    /// Survival rules: every gram needs `min_df <= df` and
    /// `df * 100 <= max_df_percent * num_docs`; grams of two or more terms
    /// additionally need a corpus-wide occurrence count of at least
    /// `min_support`.
    pub fn build<'a, I>(docs: I, params: &DictionaryParams) -> Self
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let mut df: BTreeMap<String, usize> = BTreeMap::new();
        let mut corpus_freq: HashMap<String, usize> = HashMap::new();
        let mut num_docs = 0usize;

        for terms in docs {
            num_docs += 1;
            let grams = ngrams(terms, params.max_ngram_size);
            let mut seen = HashSet::new();
            for gram in grams {
                *corpus_freq.entry(gram.clone()).or_default() += 1;
                if seen.insert(gram.clone()) {
                    *df.entry(gram).or_default() += 1;
                }
            }
        }

        let max_df = params.max_df_percent as usize * num_docs;
        let surviving: Vec<String> = df
            .into_iter()
            .filter(|(gram, df)| {
                if *df < params.min_df || *df * 100 > max_df {
                    return false;
                }
                // min_support governs collocations only
                if gram.contains(' ') {
                    corpus_freq.get(gram).copied().unwrap_or(0) >= params.min_support
                } else {
                    true
                }
            })
            .map(|(gram, _)| gram)
            .collect();

        // BTreeMap iteration is already lexicographic, so ids follow term order
        let index = surviving
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), TermId::new(i as u32)))
            .collect();
        Self {
            terms: surviving,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn id_of(&self, term: &str) -> Option<TermId> {
        self.index.get(term).copied()
    }

    pub fn term(&self, id: TermId) -> Option<&str> {
        self.terms.get(id.index()).map(String::as_str)
    }

    /// Entries in id order, the persisted artifact shape.
    pub fn entries(&self) -> Vec<DictionaryEntry> {
        self.terms
            .iter()
            .enumerate()
            .map(|(i, term)| DictionaryEntry {
                term: term.clone(),
                id: TermId::new(i as u32),
            })
            .collect()
    }

    /// Rebuild from persisted entries (ids must be dense and in order).
    pub fn from_entries(entries: Vec<DictionaryEntry>) -> Self {
        let terms: Vec<String> = entries.into_iter().map(|e| e.term).collect();
        let index = terms
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), TermId::new(i as u32)))
            .collect();
        Self { terms, index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn loose_params() -> DictionaryParams {
        DictionaryParams {
            max_ngram_size: 1,
            min_support: 2,
            min_df: 1,
            max_df_percent: 100,
        }
    }

    #[test]
    fn ngram_expansion_up_to_max() {
        let doc = terms(&["猫", "好", "犬"]);
        assert_eq!(ngrams(&doc, 1), vec!["猫", "好", "犬"]);
        assert_eq!(ngrams(&doc, 2), vec!["猫", "好", "犬", "猫 好", "好 犬"]);
        // Windows longer than the document contribute nothing
        assert_eq!(ngrams(&doc, 5).len(), 3 + 2 + 1);
    }

    #[test]
    fn ids_follow_lexicographic_term_order() {
        let docs = [terms(&["b", "a"]), terms(&["c", "a"])];
        let dict = TermDictionary::build(docs.iter().map(Vec::as_slice), &loose_params());

        assert_eq!(dict.len(), 3);
        assert_eq!(dict.term(TermId::new(0)), Some("a"));
        assert_eq!(dict.term(TermId::new(1)), Some("b"));
        assert_eq!(dict.term(TermId::new(2)), Some("c"));
        assert_eq!(dict.id_of("c"), Some(TermId::new(2)));
    }

    #[test]
    fn min_df_drops_rare_terms() {
        let docs = [terms(&["a", "b"]), terms(&["a", "c"]), terms(&["a"])];
        let params = DictionaryParams {
            min_df: 2,
            ..loose_params()
        };
        let dict = TermDictionary::build(docs.iter().map(Vec::as_slice), &params);

        assert_eq!(dict.len(), 1);
        assert_eq!(dict.id_of("a"), Some(TermId::new(0)));
        assert_eq!(dict.id_of("b"), None);
    }

    #[test]
    fn max_df_percent_drops_stop_words() {
        // "a" appears in 3 of 4 documents (75%)
        let docs = [
            terms(&["a", "b"]),
            terms(&["a", "c"]),
            terms(&["a"]),
            terms(&["d"]),
        ];
        let params = DictionaryParams {
            max_df_percent: 50,
            ..loose_params()
        };
        let dict = TermDictionary::build(docs.iter().map(Vec::as_slice), &params);

        assert_eq!(dict.id_of("a"), None);
        assert!(dict.id_of("b").is_some());
    }

    #[test]
    fn min_support_applies_to_bigrams_only() {
        // The bigram "a b" occurs once; unigram "c" also occurs once
        let docs = [terms(&["a", "b"]), terms(&["c"])];
        let params = DictionaryParams {
            max_ngram_size: 2,
            min_support: 2,
            ..loose_params()
        };
        let dict = TermDictionary::build(docs.iter().map(Vec::as_slice), &params);

        assert!(dict.id_of("c").is_some());
        assert_eq!(dict.id_of("a b"), None);

        // Seen twice corpus-wide, the bigram survives
        let docs = [terms(&["a", "b"]), terms(&["a", "b"])];
        let dict = TermDictionary::build(docs.iter().map(Vec::as_slice), &params);
        assert!(dict.id_of("a b").is_some());
    }

    #[test]
    fn repeated_term_counts_once_per_document_for_df() {
        let docs = [terms(&["a", "a", "a"])];
        let params = DictionaryParams {
            min_df: 2,
            ..loose_params()
        };
        let dict = TermDictionary::build(docs.iter().map(Vec::as_slice), &params);
        assert!(dict.is_empty());
    }

    #[test]
    fn entries_roundtrip() {
        let docs = [terms(&["b", "a"])];
        let dict = TermDictionary::build(docs.iter().map(Vec::as_slice), &loose_params());
        let rebuilt = TermDictionary::from_entries(dict.entries());
        assert_eq!(rebuilt, dict);
    }

    #[test]
    fn empty_corpus_yields_empty_dictionary() {
        let dict = TermDictionary::build(std::iter::empty(), &loose_params());
        assert!(dict.is_empty());
    }
}
