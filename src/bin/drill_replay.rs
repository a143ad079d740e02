//! drill_replay - run a recorded measurement stream through the drill engine

use anyhow::{anyhow, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use drill_counter::{config::EngineConfig, ingest::RecordingSource, replay, DrillEngine, DrillType};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON-lines recording of per-frame measurements.
    #[arg(long)]
    input: PathBuf,
    /// Drill identifier (e.g. toe_taps, push_pull, inside_outside_left).
    #[arg(long)]
    drill: String,
    /// Session identifier used for the replay.
    #[arg(long, default_value = "replay")]
    session: String,
    /// Write result lines here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Engine config file (TOML or JSON) for tuning overrides.
    #[arg(long, env = "DRILL_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let drill: DrillType = args.drill.parse()?;
    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let engine = DrillEngine::new(config);
    let mut source = RecordingSource::open(&args.input)?;

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|e| {
            anyhow!("failed to create output file {}: {}", path.display(), e)
        })?)),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    let summary = replay::replay(&engine, &mut source, &args.session, drill.as_str(), &mut out)?;
    out.flush()?;

    if summary.unpaired_frames > 0 {
        log::warn!(
            "{} frames never received both halves",
            summary.unpaired_frames
        );
    }
    log::info!(
        "{}: {} records, {} frames evaluated, {} sub-events, final count {}",
        drill,
        summary.records,
        summary.frames_evaluated,
        summary.triggers,
        summary.final_count
    );
    Ok(())
}
