//! Evaluation Results, Tables and Figures

use crate::{EvalError, Verdict};
use serde::Serialize;
use signal_frame::Timestamp;
use std::collections::BTreeMap;

/// Convert a recording timestamp to seconds for plotting
pub fn to_seconds(timestamp: Timestamp) -> f64 {
    timestamp as f64 / 1e6
}

/// Summary table cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Verdict(Verdict),
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<Verdict> for Cell {
    fn from(value: Verdict) -> Self {
        Cell::Verdict(value)
    }
}

/// Tabular summary of an evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SummaryTable {
    /// Create an empty table with headers
    pub fn new<S: Into<String>>(
        title: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            title: title.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; its width must match the header
    pub fn push_row(&mut self, cells: Vec<Cell>) -> Result<(), EvalError> {
        if cells.len() != self.columns.len() {
            return Err(EvalError::Report(format!(
                "table {:?} row has {} cells, expected {}",
                self.title,
                cells.len(),
                self.columns.len()
            )));
        }
        self.rows.push(cells);
        Ok(())
    }
}

/// One plotted series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Vertical marker, e.g. the first failing sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub at: f64,
    pub label: String,
}

/// Figure data handed to the report renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub traces: Vec<Trace>,
    pub markers: Vec<Marker>,
}

impl Figure {
    /// Create a figure with a time axis in seconds
    pub fn time_series(title: impl Into<String>, y_label: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x_label: "Time [s]".to_string(),
            y_label: y_label.into(),
            traces: Vec::new(),
            markers: Vec::new(),
        }
    }

    /// Add a series over recording timestamps
    pub fn with_series(
        mut self,
        name: impl Into<String>,
        timestamps: &[Timestamp],
        values: &[f64],
    ) -> Self {
        self.traces.push(Trace {
            name: name.into(),
            x: timestamps.iter().copied().map(to_seconds).collect(),
            y: values.to_vec(),
        });
        self
    }

    /// Add a constant threshold line spanning the time axis
    pub fn with_threshold(
        mut self,
        name: impl Into<String>,
        timestamps: &[Timestamp],
        level: f64,
    ) -> Self {
        if let (Some(&first), Some(&last)) = (timestamps.first(), timestamps.last()) {
            self.traces.push(Trace {
                name: name.into(),
                x: vec![to_seconds(first), to_seconds(last)],
                y: vec![level, level],
            });
        }
        self
    }

    /// Add a vertical marker at a timestamp
    pub fn with_marker(mut self, label: impl Into<String>, timestamp: Timestamp) -> Self {
        self.markers.push(Marker {
            at: to_seconds(timestamp),
            label: label.into(),
        });
        self
    }
}

/// Report artefact: a figure or a table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Plot {
    Figure(Figure),
    Table(SummaryTable),
}

impl Plot {
    /// Title shown above the artefact
    pub fn title(&self) -> &str {
        match self {
            Plot::Figure(figure) => &figure.title,
            Plot::Table(table) => &table.title,
        }
    }
}

/// Result of one test step on one recording
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub verdict: Verdict,
    /// Human-readable evaluation sentence
    pub explanation: String,
    pub plots: Vec<Plot>,
    pub remarks: Vec<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl EvaluationResult {
    /// Create a result with a verdict and explanation
    pub fn new(verdict: Verdict, explanation: impl Into<String>) -> Self {
        Self {
            verdict,
            explanation: explanation.into(),
            plots: Vec::new(),
            remarks: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Required inputs were absent
    pub fn input_missing(missing: &[String]) -> Self {
        Self::new(
            Verdict::InputMissing,
            format!("Required signals missing: {}", missing.join(", ")),
        )
        .with_metadata("missing_signals", missing.to_vec())
    }

    /// Evaluation precondition was never reached
    pub fn not_assessed(reason: impl Into<String>) -> Self {
        Self::new(Verdict::NotAssessed, reason)
    }

    /// Evaluation aborted with an unexpected error
    pub fn data_nok(reason: impl Into<String>) -> Self {
        Self::new(Verdict::DataNok, reason)
    }

    /// Attach a figure
    pub fn with_figure(mut self, figure: Figure) -> Self {
        self.plots.push(Plot::Figure(figure));
        self
    }

    /// Attach a table
    pub fn with_table(mut self, table: SummaryTable) -> Self {
        self.plots.push(Plot::Table(table));
        self
    }

    /// Attach a remark
    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remarks.push(remark.into());
        self
    }

    /// Attach a metadata entry
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
