use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use drive_analyzer_rs::{report, Analysis, AnalysisConfig, SessionLog};

#[derive(Parser, Debug)]
#[command(name = "drive_analyzer")]
#[command(about = "Offline anomaly detection for recorded driving sessions", long_about = None)]
struct Args {
    /// Path to the input session log (.json or .json.gz)
    #[arg(long)]
    file: PathBuf,

    /// Path to store the anomaly report
    #[arg(long)]
    output_file: PathBuf,

    /// Maximum allowed distance in metres between expected future
    /// coordinates and actual future coordinates
    #[arg(long, default_value = "3.0")]
    localisation_max_diff: f64,

    /// Number of occluded frames tolerated before a track id is dropped
    #[arg(long, default_value = "0")]
    max_occluded_frames: u32,

    /// Pretty-print the report JSON
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // Setup errors surface before any analysis starts
    report::check_output_dir(&args.output_file)?;
    let log = SessionLog::load(&args.file)?;
    info!(
        "Loaded {}: {} localisation frames, {} perception frames at {} fps",
        args.file.display(),
        log.localisation_frames(),
        log.perception_frames(),
        log.fps
    );

    let config = AnalysisConfig {
        localisation_max_diff: args.localisation_max_diff,
        del_track_id_after_missed_frames: args.max_occluded_frames,
    };
    let anomalies = Analysis::new(log, config).run();

    anomalies.save(&args.output_file, args.pretty)?;
    info!("Report written to {}", args.output_file.display());
    Ok(())
}
