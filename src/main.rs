use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use loadgen::config::load_config_file;
use loadgen::output::{create_timestamped_output_dir, CSV_FILE_NAME};
use loadgen::{parse_start, CsvExporter, GenerationLoop, RunConfig, TracingProgress};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "Synthetic per-second server and database load generator")]
struct Cli {
    /// Simulated duration in days
    #[arg(long)]
    days: Option<f64>,

    /// Write the generated table as CSV
    #[arg(long, default_value_t = false)]
    export: bool,

    /// Simulated start instant, e.g. 2019-01-01T00:00:00
    #[arg(long)]
    start: Option<String>,

    /// Output base directory for exported runs
    #[arg(long, default_value = "output-loadgen")]
    output: PathBuf,

    /// JSON run configuration (weights, seed, chunk size, ...)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => load_config_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(v) = cli.days {
        cfg.duration_days = v;
    }
    if let Some(raw) = &cli.start {
        cfg.start = parse_start(raw)?;
    }
    if let Some(v) = cli.seed {
        cfg.seed = v;
    }
    cfg.export |= cli.export;
    cfg.validate()?;

    if cfg.export && cfg.destination.is_none() {
        let run_dir = create_timestamped_output_dir(&cli.output)
            .with_context(|| format!("failed to create output dir under {}", cli.output.display()))?;
        cfg.destination = Some(run_dir.join(CSV_FILE_NAME));
    }

    let mut generation = GenerationLoop::new(cfg)?;
    generation
        .abort_handle()
        .abort_on_signals()
        .context("failed to install signal handlers")?;
    let summary = generation.run(&mut CsvExporter, &mut TracingProgress)?;

    println!(
        "Generation complete. Rows: {} | Total queries: {:.0}",
        summary.rows, summary.total_queries
    );
    if let Some(path) = &summary.exported_to {
        println!("CSV: {}", path.display());
    }

    Ok(())
}
