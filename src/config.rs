//! Layered configuration for the clustering pipeline.
//!
//! Settings are resolved from three sources, later ones winning:
//! - Default values
//! - `bunrui.toml` in the working directory (or a path given via `--config`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `BUNRUI_` and use double
//! underscores to separate nested levels:
//! - `BUNRUI_CLUSTER__COUNT=8` sets `cluster.count`
//! - `BUNRUI_VECTORIZE__MAX_NGRAM_SIZE=3` sets `vectorize.max_ngram_size`
//! - `BUNRUI_INGEST__MAX_LINES=200` sets `ingest.max_lines`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file name looked up in the working directory.
pub const CONFIG_FILE: &str = "bunrui.toml";

/// Errors from validating or persisting settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },

    #[error("configuration file already exists at {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("failed to write configuration: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Input file holding one sentence per line (UTF-8)
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,

    /// Directory that receives every pipeline artifact
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Ingestion stage settings
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Tokenization stage settings
    #[serde(default)]
    pub tokenize: TokenizeConfig,

    /// Vectorization stage settings
    #[serde(default)]
    pub vectorize: VectorizeConfig,

    /// Clustering stage settings
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IngestConfig {
    /// Hard cap on the number of lines read from the input file
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

/// How sentences become token streams.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenizeMode {
    /// Tokenize inline during normalization, no intermediate artifact
    Pretokenized,
    /// Write a tokenized-documents artifact first, then normalize from it
    Delegated,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TokenizeConfig {
    /// Pipeline shape: `pretokenized` or `delegated`
    #[serde(default = "default_tokenize_mode")]
    pub mode: TokenizeMode,

    /// Part-of-speech prefix a token must carry to survive normalization;
    /// an empty string keeps every token
    #[serde(default = "default_pos_filter")]
    pub pos_filter: String,

    /// Prefer the dictionary base form over the surface form when present
    #[serde(default = "default_true")]
    pub use_base_form: bool,
}

/// Norm applied to finished TF-IDF vectors.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    None,
    L1,
    L2,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VectorizeConfig {
    /// Largest n-gram size recorded in the term dictionary
    #[serde(default = "default_max_ngram_size")]
    pub max_ngram_size: usize,

    /// Minimum corpus-wide occurrences for n-grams of size 2 and up
    #[serde(default = "default_min_support")]
    pub min_support: usize,

    /// Minimum document frequency for a term to stay in the dictionary
    #[serde(default = "default_min_df")]
    pub min_df: usize,

    /// Terms present in more than this percentage of documents are dropped
    #[serde(default = "default_max_df_percent")]
    pub max_df_percent: u8,

    /// Norm applied to each TF-IDF vector
    #[serde(default = "default_norm")]
    pub norm: Norm,

    /// Dampen raw term counts with 1 + ln(tf)
    #[serde(default = "default_false")]
    pub log_normalize: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClusterConfig {
    /// Number of clusters (k)
    #[serde(default = "default_cluster_count")]
    pub count: usize,

    /// Convergence threshold on the largest centroid movement per iteration
    #[serde(default = "default_convergence_delta")]
    pub convergence_delta: f64,

    /// Upper bound on refinement iterations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Minimum normalized weight required to assign a point to a cluster
    #[serde(default = "default_false_f64")]
    pub classification_threshold: f64,

    /// Fixed RNG seed for reproducible seed selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `"bunrui::cluster" = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 { 1 }
fn default_input_path() -> PathBuf { PathBuf::from("data/input/examples.utf") }
fn default_output_dir() -> PathBuf { PathBuf::from("data/output") }
fn default_max_lines() -> usize { 500 }
fn default_tokenize_mode() -> TokenizeMode { TokenizeMode::Pretokenized }
fn default_pos_filter() -> String { "名詞".to_string() }
fn default_true() -> bool { true }
fn default_false() -> bool { false }
fn default_max_ngram_size() -> usize { 2 }
fn default_min_support() -> usize { 2 }
fn default_min_df() -> usize { 1 }
fn default_max_df_percent() -> u8 { 85 }
fn default_norm() -> Norm { Norm::L2 }
fn default_cluster_count() -> usize { 20 }
fn default_convergence_delta() -> f64 { 0.001 }
fn default_max_iterations() -> usize { 10 }
fn default_false_f64() -> f64 { 0.0 }
fn default_log_level() -> String { "warn".to_string() }

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            input_path: default_input_path(),
            output_dir: default_output_dir(),
            ingest: IngestConfig::default(),
            tokenize: TokenizeConfig::default(),
            vectorize: VectorizeConfig::default(),
            cluster: ClusterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_lines: default_max_lines(),
        }
    }
}

impl Default for TokenizeConfig {
    fn default() -> Self {
        Self {
            mode: default_tokenize_mode(),
            pos_filter: default_pos_filter(),
            use_base_form: true,
        }
    }
}

impl Default for VectorizeConfig {
    fn default() -> Self {
        Self {
            max_ngram_size: default_max_ngram_size(),
            min_support: default_min_support(),
            min_df: default_min_df(),
            max_df_percent: default_max_df_percent(),
            norm: default_norm(),
            log_normalize: false,
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            count: default_cluster_count(),
            convergence_delta: default_convergence_delta(),
            max_iterations: default_max_iterations(),
            classification_threshold: 0.0,
            seed: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific file, still layering env overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path))
            // Layer in environment variables with BUNRUI_ prefix
            // Double underscore (__) separates nested levels; single
            // underscore remains part of the field name
            .merge(Env::prefixed("BUNRUI_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.max_lines == 0 {
            return Err(ConfigError::Invalid {
                field: "ingest.max_lines",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.vectorize.max_ngram_size == 0 {
            return Err(ConfigError::Invalid {
                field: "vectorize.max_ngram_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.vectorize.max_df_percent > 100 {
            return Err(ConfigError::Invalid {
                field: "vectorize.max_df_percent",
                reason: format!("must be at most 100, got {}", self.vectorize.max_df_percent),
            });
        }
        if self.cluster.count == 0 {
            return Err(ConfigError::Invalid {
                field: "cluster.count",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.cluster.convergence_delta.is_finite() || self.cluster.convergence_delta < 0.0 {
            return Err(ConfigError::Invalid {
                field: "cluster.convergence_delta",
                reason: format!("must be >= 0.0, got {}", self.cluster.convergence_delta),
            });
        }
        if !(0.0..=1.0).contains(&self.cluster.classification_threshold) {
            return Err(ConfigError::Invalid {
                field: "cluster.classification_threshold",
                reason: format!(
                    "must be within [0.0, 1.0], got {}",
                    self.cluster.classification_threshold
                ),
            });
        }
        Ok(())
    }

    /// Save current configuration to file as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Create a default settings file at `path`.
    ///
    /// Refuses to clobber an existing file unless `force` is set.
    pub fn init_config_file(path: &Path, force: bool) -> Result<(), ConfigError> {
        if !force && path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        Settings::default().save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.input_path, PathBuf::from("data/input/examples.utf"));
        assert_eq!(settings.output_dir, PathBuf::from("data/output"));
        assert_eq!(settings.ingest.max_lines, 500);
        assert_eq!(settings.tokenize.mode, TokenizeMode::Pretokenized);
        assert_eq!(settings.tokenize.pos_filter, "名詞");
        assert_eq!(settings.vectorize.max_ngram_size, 2);
        assert_eq!(settings.vectorize.max_df_percent, 85);
        assert_eq!(settings.vectorize.norm, Norm::L2);
        assert_eq!(settings.cluster.count, 20);
        assert_eq!(settings.cluster.max_iterations, 10);
        assert!(settings.cluster.seed.is_none());
        settings.validate().unwrap();
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bunrui.toml");

        let toml_content = r#"
input_path = "corpus.txt"

[cluster]
count = 4
seed = 42

[vectorize]
norm = "none"
log_normalize = true
"#;
        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.input_path, PathBuf::from("corpus.txt"));
        assert_eq!(settings.cluster.count, 4);
        assert_eq!(settings.cluster.seed, Some(42));
        assert_eq!(settings.vectorize.norm, Norm::None);
        assert!(settings.vectorize.log_normalize);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bunrui.toml");

        // Only specify a few settings
        let toml_content = r#"
[cluster]
count = 3

[tokenize]
mode = "delegated"
"#;
        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();

        // Modified values
        assert_eq!(settings.cluster.count, 3);
        assert_eq!(settings.tokenize.mode, TokenizeMode::Delegated);

        // Default values should still be present
        assert_eq!(settings.version, 1);
        assert_eq!(settings.cluster.max_iterations, 10);
        assert_eq!(settings.vectorize.min_support, 2);
        assert_eq!(settings.tokenize.pos_filter, "名詞");
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bunrui.toml");

        let mut settings = Settings::default();
        settings.cluster.count = 7;
        settings.tokenize.mode = TokenizeMode::Delegated;

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.cluster.count, 7);
        assert_eq!(loaded.tokenize.mode, TokenizeMode::Delegated);
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bunrui.toml");
        fs::write(&config_path, "[ingest]\nmax_lines = 100\n").unwrap();

        // Key chosen so no other test reads it through the figment layers
        unsafe {
            std::env::set_var("BUNRUI_INGEST__MAX_LINES", "9");
        }
        let settings = Settings::load_from(&config_path).unwrap();
        unsafe {
            std::env::remove_var("BUNRUI_INGEST__MAX_LINES");
        }

        // Environment variable should override config file
        assert_eq!(settings.ingest.max_lines, 9);
        // Config file values without env overrides remain
        assert_eq!(settings.cluster.count, 20);
    }

    #[test]
    fn test_validate_rejects_zero_clusters() {
        let mut settings = Settings::default();
        settings.cluster.count = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid {
                field: "cluster.count",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut settings = Settings::default();
        settings.cluster.classification_threshold = 1.5;
        assert!(settings.validate().is_err());

        settings.cluster.classification_threshold = -0.1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_df_percent_above_hundred() {
        let mut settings = Settings::default();
        settings.vectorize.max_df_percent = 101;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bunrui.toml");

        Settings::init_config_file(&config_path, false).unwrap();
        let second = Settings::init_config_file(&config_path, false);
        assert!(matches!(second, Err(ConfigError::AlreadyExists(_))));

        Settings::init_config_file(&config_path, true).unwrap();
    }
}
