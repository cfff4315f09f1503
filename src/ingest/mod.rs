//! Sentence ingestion.
//!
//! Reads the input corpus, one sentence per line, assigning record keys in
//! file order. The reader stops after `max_lines` lines; anything past the
//! cap is ignored with a warning.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{Sentence, SentenceId};

/// Errors raised while reading the input corpus.
///
/// All of these are fatal: a corpus that cannot be read completely must not
/// produce partial downstream artifacts.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("cannot open input file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input file {path} is not valid UTF-8 at line {line}")]
    Encoding { path: PathBuf, line: usize },

    #[error("failed to read input file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read up to `max_lines` sentences from `path`, in file order.
///
/// Every line becomes a record, including empty ones, so record keys stay
/// aligned with line numbers. Line terminators are stripped.
pub fn read_sentences(path: &Path, max_lines: usize) -> Result<Vec<Sentence>, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut sentences = Vec::new();
    let mut lines = reader.lines();
    for (index, line) in lines.by_ref().take(max_lines).enumerate() {
        let text = line.map_err(|source| match source.kind() {
            ErrorKind::InvalidData => IngestError::Encoding {
                path: path.to_path_buf(),
                // 1-based, matching what editors display
                line: index + 1,
            },
            _ => IngestError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;
        sentences.push(Sentence::new(SentenceId::new(index as u32), text));
    }

    if lines.next().is_some() {
        warn!(
            limit = max_lines,
            "input file has more lines than the limit, extra lines ignored"
        );
    }

    debug!(count = sentences.len(), path = %path.display(), "read sentences");
    Ok(sentences)
}
