//! Pipeline runner.
//!
//! Sequences the four stages end to end: ingest → normalize → vectorize →
//! cluster, each stage persisting its artifact before the next starts, then
//! builds the final report. Owns the run lock and the destructive clearing
//! of the output directory.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::cluster::{self, ClusterError, Termination};
use crate::config::{Settings, TokenizeMode};
use crate::ingest::{self, IngestError};
use crate::report::{ClusterReport, ReportError};
use crate::store::{self, DocumentRecord, OutputLayout, StoreError};
use crate::tokenize::{self, CharClassTokenizer, Normalizer, TokenizeError, Tokenizer};
use crate::vectorize::{self, TermDocument, VectorizeError};

/// A stage failure, attributed to the stage that raised it.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("another run is already targeting {0} (stale lock? remove the file)")]
    OutputDirBusy(PathBuf),

    #[error("failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("tokenization failed: {0}")]
    Tokenize(#[from] TokenizeError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("vectorization failed: {0}")]
    Vectorize(#[from] VectorizeError),

    #[error("clustering failed: {0}")]
    Cluster(#[from] ClusterError),

    #[error("reporting failed: {0}")]
    Report(#[from] ReportError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Run statistics for the summary log line.
#[derive(Debug, Clone, Copy)]
pub struct RunStats {
    pub sentences: usize,
    pub records: usize,
    pub vocabulary: usize,
    pub vectors: usize,
    pub iterations: usize,
    pub unassigned: usize,
    pub elapsed: Duration,
}

/// Everything a completed run returns to its caller.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: ClusterReport,
    pub termination: Termination,
    pub stats: RunStats,
}

/// Exclusive marker for one run per output directory.
///
/// Remove-on-drop, so the lock clears on failures too. A crashed process
/// can leave the file behind; the error message says how to recover.
struct RunLock {
    path: PathBuf,
}

impl RunLock {
    fn acquire(layout: &OutputLayout) -> PipelineResult<Self> {
        fs::create_dir_all(layout.root()).map_err(|source| PipelineError::OutputDir {
            path: layout.root().to_path_buf(),
            source,
        })?;
        let path = layout.lock_file();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(PipelineError::OutputDirBusy(layout.root().to_path_buf()))
            }
            Err(source) => Err(PipelineError::OutputDir {
                path,
                source,
            }),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Single entry point for a full pipeline run.
///
/// Holds an immutable settings value; every stage is a function of explicit
/// inputs, and failures propagate as fatal with the owning stage named.
pub struct PipelineRunner {
    settings: Settings,
    tokenizer: Box<dyn Tokenizer>,
}

impl PipelineRunner {
    pub fn new(settings: Settings) -> Self {
        Self::with_tokenizer(settings, Box::new(CharClassTokenizer))
    }

    /// Swap in a different morphological analyzer behind the seam.
    pub fn with_tokenizer(settings: Settings, tokenizer: Box<dyn Tokenizer>) -> Self {
        Self {
            settings,
            tokenizer,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn run(&self) -> PipelineResult<RunOutcome> {
        let start = Instant::now();
        self.settings.validate()?;

        let layout = OutputLayout::new(&self.settings.output_dir);
        let _lock = RunLock::acquire(&layout)?;
        clear_output_dir(&layout)?;

        // Stage 1: ingestion
        let sentences =
            ingest::read_sentences(&self.settings.input_path, self.settings.ingest.max_lines)?;
        info!(sentences = sentences.len(), "[ingest] corpus read");

        // Stage 2: normalization, persisted as id→text records
        let normalizer = Normalizer::from_config(&self.settings.tokenize);
        let docs = match self.settings.tokenize.mode {
            TokenizeMode::Pretokenized => {
                let normalized =
                    tokenize::normalize_sentences(&sentences, self.tokenizer.as_ref(), &normalizer)?;
                let records: Vec<DocumentRecord> = normalized
                    .iter()
                    .map(|doc| DocumentRecord::new(doc.id.record_key(), doc.joined()))
                    .collect();
                store::write_jsonl(&layout.sentences(), &records)?;
                normalized
                    .into_iter()
                    .map(|doc| TermDocument::new(doc.id.record_key(), doc.terms))
                    .collect::<Vec<_>>()
            }
            TokenizeMode::Delegated => {
                // Raw text goes to seqfiles; the analyzer runs against the
                // persisted records and its token stream is persisted too
                let records: Vec<DocumentRecord> = sentences
                    .iter()
                    .map(|s| DocumentRecord::new(s.id.record_key(), s.text.clone()))
                    .collect();
                store::write_jsonl(&layout.sentences(), &records)?;

                let tokenized = tokenize::tokenize_records(&records, self.tokenizer.as_ref())?;
                store::write_jsonl(&layout.tokens(), &tokenized)?;
                tokenized
                    .into_iter()
                    .map(|doc| {
                        let terms = normalizer.terms(&doc.tokens);
                        TermDocument::new(doc.key, terms)
                    })
                    .collect::<Vec<_>>()
            }
        };
        info!(
            records = docs.len(),
            mode = ?self.settings.tokenize.mode,
            analyzer = self.tokenizer.name(),
            "[tokenize] records persisted"
        );

        // Stage 3: vectorization
        let vectorized = vectorize::vectorize(&docs, &self.settings.vectorize)?;
        vectorized.write_artifacts(&layout)?;

        // Stage 4: clustering
        let mut rng = cluster::seed_rng(self.settings.cluster.seed);
        let (seeds, outcome, points) = cluster::cluster(
            &vectorized.tfidf_vectors,
            vectorized.dictionary.len(),
            self.settings.cluster.count,
            self.settings.cluster.convergence_delta,
            self.settings.cluster.max_iterations,
            self.settings.cluster.classification_threshold,
            &mut rng,
        )?;
        store::write_json(&layout.seeds(), &seeds)?;
        for (index, snapshot) in outcome.history.iter().enumerate() {
            store::write_json(&layout.iteration(index + 1), snapshot)?;
        }
        // Results are the last artifact; a failed run never leaves one
        store::write_jsonl(&layout.clustered_points(), &points)?;

        let report = ClusterReport::from_points(&points);
        let stats = RunStats {
            sentences: sentences.len(),
            records: docs.len(),
            vocabulary: vectorized.dictionary.len(),
            vectors: vectorized.tfidf_vectors.len(),
            iterations: outcome.iterations,
            unassigned: report.unassigned().len(),
            elapsed: start.elapsed(),
        };
        info!(
            sentences = stats.sentences,
            vocabulary = stats.vocabulary,
            vectors = stats.vectors,
            iterations = stats.iterations,
            termination = %outcome.termination,
            unassigned = stats.unassigned,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "[pipeline] run complete"
        );

        Ok(RunOutcome {
            report,
            termination: outcome.termination,
            stats,
        })
    }
}

/// Remove every previous artifact under the output root, keeping only the
/// run lock. Destructive on purpose: no entity persists across runs.
fn clear_output_dir(layout: &OutputLayout) -> PipelineResult<()> {
    let wrap = |source: std::io::Error| PipelineError::OutputDir {
        path: layout.root().to_path_buf(),
        source,
    };
    let lock = layout.lock_file();
    for entry in fs::read_dir(layout.root()).map_err(wrap)? {
        let entry = entry.map_err(wrap)?;
        let path = entry.path();
        if path == lock {
            continue;
        }
        debug!(path = %path.display(), "clearing previous artifact");
        if entry.file_type().map_err(wrap)?.is_dir() {
            fs::remove_dir_all(&path).map_err(wrap)?;
        } else {
            fs::remove_file(&path).map_err(wrap)?;
        }
    }
    Ok(())
}
