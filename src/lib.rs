//! Topic clustering for Japanese sentences.
//!
//! A four-stage batch pipeline: ingest a one-sentence-per-line corpus,
//! tokenize and normalize each sentence to a term list, build a TF-IDF
//! vector space over term n-grams, and group the vectors with k-means.
//! Every intermediate artifact is persisted under the output directory and
//! the final cluster membership is rendered as a console report.

pub mod cli;
pub mod cluster;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod store;
pub mod tokenize;
pub mod types;
pub mod vectorize;

pub use config::Settings;
pub use pipeline::{PipelineError, PipelineRunner, RunOutcome};
pub use report::ClusterReport;
