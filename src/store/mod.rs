//! Persisted intermediate stores.
//!
//! Every artifact between stages is either a JSONL file (one record per
//! line, streamable) or a single JSON document (dictionaries, statistics,
//! centroid snapshots). Writers create parent directories; readers attribute
//! malformed content to a file and line.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to write store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record in {path} at line {line}: {source}")]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed document {path}: {source}")]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Well-known paths inside the output directory.
///
/// Keeps every stage agreeing on where artifacts live without passing
/// individual paths around.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Exclusive run lock, the only file that survives the run-start clear.
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(".bunrui.lock")
    }

    pub fn sentences(&self) -> PathBuf {
        self.root.join("seqfiles").join("sentences.jsonl")
    }

    /// Delegated mode only.
    pub fn tokens(&self) -> PathBuf {
        self.root.join("tokenized-documents").join("tokens.jsonl")
    }

    pub fn dictionary(&self) -> PathBuf {
        self.root.join("vectors").join("dictionary.json")
    }

    pub fn tf_vectors(&self) -> PathBuf {
        self.root.join("vectors").join("tf-vectors.jsonl")
    }

    pub fn df_stats(&self) -> PathBuf {
        self.root.join("vectors").join("df-stats.json")
    }

    pub fn tfidf_vectors(&self) -> PathBuf {
        self.root.join("vectors").join("tfidf-vectors.jsonl")
    }

    pub fn seeds(&self) -> PathBuf {
        self.root.join("clusters").join("seeds.json")
    }

    pub fn iteration(&self, n: usize) -> PathBuf {
        self.root.join("clusters").join(format!("iteration-{n:03}.json"))
    }

    pub fn clustered_points(&self) -> PathBuf {
        self.root.join("results").join("clustered-points.jsonl")
    }
}

/// One persisted key-value record.
///
/// The value is the normalized term string, or the raw sentence text when
/// tokenization is delegated to the vectorization stage.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DocumentRecord {
    pub key: String,
    pub value: String,
}

impl DocumentRecord {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

fn create_parent_dirs(path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Write items as JSONL, one record per line, replacing any existing file.
pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> StoreResult<()> {
    let wrap_write = |source: std::io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    create_parent_dirs(path)?;
    let file = File::create(path).map_err(wrap_write)?;
    let mut writer = BufWriter::new(file);
    for item in items {
        let line = serde_json::to_string(item).map_err(|source| StoreError::MalformedDocument {
            path: path.to_path_buf(),
            source,
        })?;
        writer.write_all(line.as_bytes()).map_err(wrap_write)?;
        writer.write_all(b"\n").map_err(wrap_write)?;
    }
    writer.flush().map_err(wrap_write)
}

/// Read a JSONL store back into memory, in file order.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> StoreResult<Vec<T>> {
    let file = File::open(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut items = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if line.is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line).map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        items.push(item);
    }
    Ok(items)
}

/// Write a single pretty-printed JSON document.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    create_parent_dirs(path)?;
    let json =
        serde_json::to_string_pretty(value).map_err(|source| StoreError::MalformedDocument {
            path: path.to_path_buf(),
            source,
        })?;
    fs::write(path, json).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a single JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::MalformedDocument {
        path: path.to_path_buf(),
        source,
    })
}
