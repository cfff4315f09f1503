//! Sentence tokenization and normalization.
//!
//! Turns raw sentences into per-sentence term lists: a [`Tokenizer`] splits
//! the text into part-of-speech tagged tokens, a [`Normalizer`] keeps the
//! configured POS class (nouns by default) and picks base or surface form.
//!
//! Two pipeline shapes use this module. In `pretokenized` mode normalization
//! runs right after ingestion and the term strings are what gets persisted.
//! In `delegated` mode the raw text is persisted and the vectorization stage
//! calls back in here with its own analyzer.

mod normalize;
mod tokenizer;

pub use normalize::Normalizer;
pub use tokenizer::{CharClassTokenizer, Token, Tokenizer};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::DocumentRecord;
use crate::types::{Sentence, SentenceId};

pub type TokenizeResult<T> = Result<T, TokenizeError>;

#[derive(Error, Debug)]
pub enum TokenizeError {
    /// Raised by analyzers that can fail mid-analysis.
    #[error("tokenization failed: {0}")]
    Analysis(String),

    #[error("tokenization failed for record {key}: {message}")]
    Record { key: String, message: String },
}

impl TokenizeError {
    /// Attach the owning record key to a bare analysis error.
    fn with_key(self, key: String) -> Self {
        match self {
            Self::Analysis(message) => Self::Record { key, message },
            other => other,
        }
    }
}

/// Token sequence for one record, persisted in delegated mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedDocument {
    pub key: String,
    pub tokens: Vec<Token>,
}

/// Per-sentence term list produced by normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDocument {
    pub id: SentenceId,
    pub terms: Vec<String>,
}

impl NormalizedDocument {
    /// Space-joined term string, the persisted record value.
    pub fn joined(&self) -> String {
        self.terms.join(" ")
    }
}

/// Tokenize and normalize every sentence, preserving corpus order.
///
/// A sentence whose tokens are all filtered away yields an empty term list,
/// not a dropped record; record keys must stay aligned with line numbers.
pub fn normalize_sentences(
    sentences: &[Sentence],
    tokenizer: &dyn Tokenizer,
    normalizer: &Normalizer,
) -> TokenizeResult<Vec<NormalizedDocument>> {
    sentences
        .par_iter()
        .map(|sentence| {
            let tokens = tokenizer
                .tokenize(&sentence.text)
                .map_err(|e| e.with_key(sentence.id.record_key()))?;
            Ok(NormalizedDocument {
                id: sentence.id,
                terms: normalizer.terms(&tokens),
            })
        })
        .collect()
}

/// Tokenize persisted raw-text records (delegated mode).
pub fn tokenize_records(
    records: &[DocumentRecord],
    tokenizer: &dyn Tokenizer,
) -> TokenizeResult<Vec<TokenizedDocument>> {
    records
        .par_iter()
        .map(|record| {
            let tokens = tokenizer
                .tokenize(&record.value)
                .map_err(|e| e.with_key(record.key.clone()))?;
            Ok(TokenizedDocument {
                key: record.key.clone(),
                tokens,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SentenceId;

    fn noun_normalizer() -> Normalizer {
        Normalizer::new("名詞", true)
    }

    #[test]
    fn normalize_keeps_sentence_order_and_ids() {
        let sentences = vec![
            Sentence::new(SentenceId::new(0), "猫が好きです"),
            Sentence::new(SentenceId::new(1), "犬が好きです"),
            Sentence::new(SentenceId::new(2), "飛行機は速いです"),
        ];
        let tokenizer = CharClassTokenizer;
        let docs = normalize_sentences(&sentences, &tokenizer, &noun_normalizer()).unwrap();

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].id, SentenceId::new(0));
        assert_eq!(docs[0].terms, vec!["猫", "好"]);
        assert_eq!(docs[1].terms, vec!["犬", "好"]);
        assert_eq!(docs[2].terms, vec!["飛行機", "速"]);
    }

    #[test]
    fn normalize_is_idempotent() {
        let sentences = vec![Sentence::new(SentenceId::new(0), "東京タワーは333メートルです")];
        let tokenizer = CharClassTokenizer;
        let normalizer = noun_normalizer();

        let first = normalize_sentences(&sentences, &tokenizer, &normalizer).unwrap();
        let second = normalize_sentences(&sentences, &tokenizer, &normalizer).unwrap();
        assert_eq!(first, second);

        // Normalizing the already-joined output changes nothing either: every
        // surviving term is a noun-class run, so it survives a second pass.
        let rejoined = vec![Sentence::new(SentenceId::new(0), first[0].joined())];
        let third = normalize_sentences(&rejoined, &tokenizer, &normalizer).unwrap();
        assert_eq!(third[0].terms, first[0].terms);
    }

    #[test]
    fn filtered_out_sentence_keeps_its_record() {
        // Pure hiragana, nothing survives the noun filter
        let sentences = vec![
            Sentence::new(SentenceId::new(0), "これは"),
            Sentence::new(SentenceId::new(1), "猫"),
        ];
        let tokenizer = CharClassTokenizer;
        let docs = normalize_sentences(&sentences, &tokenizer, &noun_normalizer()).unwrap();

        assert_eq!(docs.len(), 2);
        assert!(docs[0].terms.is_empty());
        assert_eq!(docs[0].joined(), "");
        assert_eq!(docs[1].terms, vec!["猫"]);
    }

    #[test]
    fn tokenize_records_preserves_keys() {
        let records = vec![
            DocumentRecord::new("sentence0", "猫が好き"),
            DocumentRecord::new("sentence1", "犬"),
        ];
        let tokenizer = CharClassTokenizer;
        let docs = tokenize_records(&records, &tokenizer).unwrap();

        assert_eq!(docs[0].key, "sentence0");
        // 猫 | が | 好 | き, one token per script-class run
        assert_eq!(docs[0].tokens.len(), 4);
        assert_eq!(docs[1].key, "sentence1");
        assert_eq!(docs[1].tokens[0].surface, "犬");
    }
}
