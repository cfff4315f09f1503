//! CLI argument parsing using clap.
//!
//! Contains the Cli struct and the Commands enum. Flag overrides are
//! applied onto loaded settings in one place so every subcommand sees the
//! same precedence: defaults < config file < environment < flags.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::config::Settings;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[derive(Parser)]
#[command(name = "bunrui")]
#[command(version)]
#[command(about = "Cluster Japanese sentences by topic: tokenize, TF-IDF, k-means")]
#[command(styles = clap_cargo_style())]
#[command(after_help = "Examples:
  $ bunrui init                            # Write bunrui.toml with defaults
  $ bunrui run                             # Full pipeline on the configured input
  $ bunrui run -i corpus.utf -k 5 --text   # Five clusters, report with sentence text
  $ bunrui run --seed 42                   # Reproducible seed selection
  $ bunrui report -o data/output           # Re-render an existing results store
  $ bunrui config                          # Show the active merged settings
")]
pub struct Cli {
    /// Settings file to load instead of bunrui.toml
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Run the full clustering pipeline and print the report
    Run {
        /// Input file, one sentence per line (UTF-8)
        #[arg(short, long, value_name = "PATH")]
        input: Option<PathBuf>,

        /// Output directory for pipeline artifacts
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Number of clusters (k)
        #[arg(short = 'k', long = "clusters", value_name = "N")]
        clusters: Option<usize>,

        /// Read at most this many input lines
        #[arg(long, value_name = "N")]
        max_lines: Option<usize>,

        /// Upper bound on k-means iterations
        #[arg(long, value_name = "N")]
        max_iterations: Option<usize>,

        /// Centroid movement below which k-means counts as converged
        #[arg(long, value_name = "DELTA")]
        convergence_delta: Option<f64>,

        /// Minimum membership weight for a final cluster assignment (0.0-1.0)
        #[arg(long, value_name = "WEIGHT")]
        threshold: Option<f64>,

        /// Fix the RNG seed for reproducible seed selection
        #[arg(long, value_name = "SEED")]
        seed: Option<u64>,

        /// Resolve member keys to sentence text in the report
        #[arg(long)]
        text: bool,
    },

    /// Re-render the cluster report from an existing output directory
    Report {
        /// Output directory holding a results store
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Resolve member keys to sentence text
        #[arg(long)]
        text: bool,
    },

    /// Show current configuration
    Config,
}

impl Commands {
    /// Fold command-line overrides into loaded settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        match self {
            Commands::Run {
                input,
                output,
                clusters,
                max_lines,
                max_iterations,
                convergence_delta,
                threshold,
                seed,
                ..
            } => {
                if let Some(input) = input {
                    settings.input_path = input.clone();
                }
                if let Some(output) = output {
                    settings.output_dir = output.clone();
                }
                if let Some(clusters) = clusters {
                    settings.cluster.count = *clusters;
                }
                if let Some(max_lines) = max_lines {
                    settings.ingest.max_lines = *max_lines;
                }
                if let Some(max_iterations) = max_iterations {
                    settings.cluster.max_iterations = *max_iterations;
                }
                if let Some(delta) = convergence_delta {
                    settings.cluster.convergence_delta = *delta;
                }
                if let Some(threshold) = threshold {
                    settings.cluster.classification_threshold = *threshold;
                }
                if let Some(seed) = seed {
                    settings.cluster.seed = Some(*seed);
                }
            }
            Commands::Report {
                output: Some(output),
                ..
            } => {
                settings.output_dir = output.clone();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_override_settings() {
        let cli = Cli::parse_from([
            "bunrui",
            "run",
            "-i",
            "corpus.utf",
            "-k",
            "5",
            "--max-lines",
            "100",
            "--threshold",
            "0.3",
            "--seed",
            "42",
        ]);
        let mut settings = Settings::default();
        cli.command.apply_overrides(&mut settings);

        assert_eq!(settings.input_path, PathBuf::from("corpus.utf"));
        assert_eq!(settings.cluster.count, 5);
        assert_eq!(settings.ingest.max_lines, 100);
        assert_eq!(settings.cluster.classification_threshold, 0.3);
        assert_eq!(settings.cluster.seed, Some(42));
        // Untouched settings keep their values
        assert_eq!(settings.cluster.max_iterations, 10);
    }

    #[test]
    fn report_output_flag_overrides_dir() {
        let cli = Cli::parse_from(["bunrui", "report", "-o", "other/out"]);
        let mut settings = Settings::default();
        cli.command.apply_overrides(&mut settings);
        assert_eq!(settings.output_dir, PathBuf::from("other/out"));
    }

    #[test]
    fn overrides_without_flags_change_nothing() {
        let cli = Cli::parse_from(["bunrui", "run"]);
        let mut settings = Settings::default();
        cli.command.apply_overrides(&mut settings);
        assert_eq!(settings.cluster.count, Settings::default().cluster.count);
    }
}
