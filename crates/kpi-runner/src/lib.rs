//! Parking KPI Runner
//!
//! Loads the layered evaluation configuration, installs logging and runs the
//! registered test cases over one recording.

use chrono::{DateTime, Utc};
use config::{Config, Environment, File};
use kpi_core::{ResultAggregator, StepContext, SummaryTable, TestCaseReport, Verdict};
use kpi_steps::{default_test_cases, EvaluationConfig, GroundTruth};
use serde::Serialize;
use signal_frame::{FrameError, Recording, SignalSchema};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Prefix of configuration environment variables, e.g. `KPI_PPC__FTTI_US`
pub const ENV_PREFIX: &str = "KPI";

/// Runner errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid signal schema: {0}")]
    Schema(#[from] FrameError),

    #[error("Report error: {0}")]
    Report(#[from] kpi_core::EvalError),
}

/// Load configuration: built-in defaults, then the optional file, then
/// `KPI_` environment variables with `__` between nested keys
pub fn load_config(path: Option<&Path>) -> Result<EvaluationConfig, ConfigError> {
    let mut builder = Config::builder().add_source(Config::try_from(&EvaluationConfig::default())?);
    if let Some(path) = path {
        info!("Loading configuration from {}", path.display());
        builder = builder.add_source(File::from(path).required(true));
    }
    let settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    Ok(settings.try_deserialize()?)
}

/// Initialize logging; `RUST_LOG` overrides the default `info` level
pub fn init_logging(json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}

/// Outcome of one evaluation run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub recording: String,
    pub overall_verdict: Verdict,
    pub verdict_counts: BTreeMap<Verdict, usize>,
    pub summary: SummaryTable,
    pub cases: Vec<TestCaseReport>,
}

impl RunReport {
    /// Report of one test case
    pub fn case(&self, case_id: &str) -> Option<&TestCaseReport> {
        self.cases.iter().find(|case| case.case_id == case_id)
    }

    /// Write the report as pretty JSON
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        info!("Report written to {}", path.display());
        Ok(())
    }
}

/// Run every registered test case over one recording
pub fn run_recording(
    recording: &Recording,
    config: &EvaluationConfig,
    ground_truth: Option<GroundTruth>,
) -> Result<RunReport, ConfigError> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!("Run {} started on recording {}", run_id, recording.name);

    let schema = SignalSchema::from_layout(&config.schema)?;
    let ctx = StepContext {
        recording_name: &recording.name,
        reader: recording,
        schema: &schema,
        alias: &config.recording_alias,
    };

    let mut aggregator = ResultAggregator::new();
    let cases: Vec<TestCaseReport> = default_test_cases(config, ground_truth)
        .iter()
        .map(|case| case.run(&ctx, &mut aggregator))
        .collect();

    let overall_verdict = aggregator.overall_verdict();
    info!(
        "Run {} finished: {} ({} steps)",
        run_id,
        overall_verdict,
        aggregator.len()
    );
    Ok(RunReport {
        run_id,
        started_at,
        recording: recording.name.clone(),
        overall_verdict,
        verdict_counts: aggregator.verdict_counts(),
        summary: aggregator.summary_table()?,
        cases,
    })
}
