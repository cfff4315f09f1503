use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use clap::Parser;

use bunrui::cli::{Cli, Commands};
use bunrui::config::CONFIG_FILE;
use bunrui::report::ClusterReport;
use bunrui::store::OutputLayout;
use bunrui::{PipelineRunner, Settings};

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| Path::new(CONFIG_FILE).to_path_buf());

    // Init writes the file before anything tries to load it
    if let Commands::Init { force } = &cli.command {
        Settings::init_config_file(&config_path, *force)?;
        println!("Created configuration file: {}", config_path.display());
        return Ok(());
    }

    let mut settings = Settings::load_from(&config_path)
        .with_context(|| format!("failed to load settings from {}", config_path.display()))?;
    cli.command.apply_overrides(&mut settings);
    bunrui::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),

        Commands::Run { text, .. } => {
            let runner = PipelineRunner::new(settings);
            let outcome = runner.run()?;

            let stdout = io::stdout();
            let mut out = stdout.lock();
            if text {
                let layout = OutputLayout::new(&runner.settings().output_dir);
                outcome.report.render_with_text(&mut out, &layout)?;
            } else {
                outcome.report.render(&mut out)?;
            }
            out.flush()?;
        }

        Commands::Report { text, .. } => {
            let layout = OutputLayout::new(&settings.output_dir);
            let report = ClusterReport::load(&layout).with_context(|| {
                format!(
                    "no results store under {} (run the pipeline first)",
                    settings.output_dir.display()
                )
            })?;

            let stdout = io::stdout();
            let mut out = stdout.lock();
            if text {
                report.render_with_text(&mut out, &layout)?;
            } else {
                report.render(&mut out)?;
            }
            out.flush()?;
        }

        Commands::Config => {
            let toml = toml::to_string_pretty(&settings)?;
            println!("{toml}");
        }
    }

    Ok(())
}
