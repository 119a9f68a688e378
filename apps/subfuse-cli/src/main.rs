use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use subfuse_consensus::{Config, Pipeline};
use subfuse_stt_interface::SourceTranscript;

#[derive(Parser)]
#[command(name = "subfuse", about = "Fuse multiple STT transcripts into one subtitle track")]
struct Cli {
    /// JSON transcript file, one per backend. Repeat per source.
    #[arg(long = "transcript", required = true)]
    transcripts: Vec<PathBuf>,

    /// Source ids in reliability order, most trusted first.
    #[arg(long, value_delimiter = ',')]
    priority: Vec<String>,

    #[arg(long, default_value_t = 0.5)]
    overlap_threshold: f64,

    #[arg(long, default_value_t = 0.5)]
    confidence_prior: f64,

    #[arg(long, default_value_t = 800)]
    min_display_ms: i64,

    #[arg(long, default_value_t = 7000)]
    max_segment_ms: i64,

    #[arg(long, default_value_t = 300)]
    max_fillable_gap_ms: i64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config {
        overlap_threshold: cli.overlap_threshold,
        confidence_prior: cli.confidence_prior,
        source_priority: cli.priority,
        min_display_ms: cli.min_display_ms,
        max_segment_ms: cli.max_segment_ms,
        max_fillable_gap_ms: cli.max_fillable_gap_ms,
        ..Config::default()
    };
    let pipeline = Pipeline::new(config)?;

    let mut inputs: Vec<SourceTranscript> = Vec::with_capacity(cli.transcripts.len());
    for path in &cli.transcripts {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        inputs.push(
            serde_json::from_str(&data)
                .with_context(|| format!("parsing transcript {}", path.display()))?,
        );
    }

    let run = pipeline.run(&inputs)?;
    serde_json::to_writer_pretty(std::io::stdout().lock(), &run)?;
    println!();

    Ok(())
}
