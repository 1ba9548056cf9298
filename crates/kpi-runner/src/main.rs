//! kpi-eval - evaluate a recorded measurement against the parking KPIs

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use kpi_runner::{init_logging, load_config, run_recording};
use kpi_steps::GroundTruth;
use signal_frame::Recording;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "kpi-eval", version, about = "Offline parking KPI evaluation")]
struct Args {
    /// Recording to evaluate (JSON)
    #[arg(long)]
    recording: PathBuf,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// CV ground truth boxes (JSON)
    #[arg(long)]
    ground_truth: Option<PathBuf>,

    /// Where to write the JSON report
    #[arg(long, default_value = "kpi_report.json")]
    output: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs).map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    info!("=== kpi-eval v{} ===", env!("CARGO_PKG_VERSION"));

    let config = load_config(args.config.as_deref()).context("failed to load configuration")?;
    let recording = Recording::load(&args.recording)
        .with_context(|| format!("failed to load recording {}", args.recording.display()))?;
    let ground_truth = args
        .ground_truth
        .as_deref()
        .map(GroundTruth::load)
        .transpose()
        .context("failed to load ground truth")?;

    let report = run_recording(&recording, &config, ground_truth).context("evaluation failed")?;
    report
        .write(&args.output)
        .with_context(|| format!("failed to write report {}", args.output.display()))?;

    // The verdict lives in the report; the exit code only reflects load errors
    info!("Overall verdict: {}", report.overall_verdict);
    Ok(())
}
