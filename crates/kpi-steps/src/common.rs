//! Helpers shared by the feature steps

use kpi_core::{Cell, CheckOutcome, EvalError, Figure, SummaryTable, Verdict};
use kpi_geometry::GeometryError;
use signal_frame::Timestamp;

/// One row of a per-signal summary table
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub subject: String,
    pub verdict: Verdict,
    pub evaluation: String,
}

impl SummaryRow {
    pub fn new(
        subject: impl Into<String>,
        verdict: Verdict,
        evaluation: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            verdict,
            evaluation: evaluation.into(),
        }
    }
}

/// Summary table with subject, verdict and evaluation columns
pub fn summary_table(
    title: &str,
    subject_header: &str,
    rows: &[SummaryRow],
) -> Result<SummaryTable, EvalError> {
    let mut table = SummaryTable::new(title, [subject_header, "Verdict", "Evaluation"]);
    for row in rows {
        table.push_row(vec![
            Cell::from(row.subject.as_str()),
            Cell::from(row.verdict),
            Cell::from(row.evaluation.as_str()),
        ])?;
    }
    Ok(table)
}

/// Evaluation sentence for a per-sample check
pub fn describe_outcome(signal: &str, requirement: &str, outcome: &CheckOutcome) -> String {
    match (outcome.evaluated, outcome.first_failure) {
        (0, _) => format!("No usable samples of {}", signal),
        (n, None) => format!("All {} samples of {} satisfy {}", n, signal, requirement),
        (n, Some(failure)) => format!(
            "{} ({} of {} samples)",
            failure.describe(signal, requirement),
            outcome.violations,
            n
        ),
    }
}

/// Time series figure with a threshold line and the first failure marked
pub fn check_figure(
    title: &str,
    y_label: &str,
    timestamps: &[Timestamp],
    series: &[(&str, &[f64])],
    threshold: Option<f64>,
    outcome: &CheckOutcome,
) -> Figure {
    let mut figure = Figure::time_series(title, y_label);
    for (name, values) in series {
        figure = figure.with_series(*name, timestamps, values);
    }
    if let Some(level) = threshold {
        figure = figure.with_threshold("Threshold", timestamps, level);
    }
    if let Some(failure) = outcome.first_failure {
        figure = figure.with_marker("First violation", failure.timestamp);
    }
    figure
}

/// Geometry failures are data problems of the recording
pub fn geometry_error(err: GeometryError) -> EvalError {
    EvalError::InvalidData(err.to_string())
}

/// Round to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use kpi_core::{scan, RangeCheck};

    #[test]
    fn test_describe_outcome() {
        let check = RangeCheck::at_least(0.2);
        let pass = scan(&[0, 10], &[0.3, 0.4], &check);
        assert_eq!(
            describe_outcome("distance", "[0.2, +inf)", &pass),
            "All 2 samples of distance satisfy [0.2, +inf)"
        );

        let fail = scan(&[0, 1_000_000], &[0.3, 0.1], &check);
        assert_eq!(
            describe_outcome("distance", "[0.2, +inf)", &fail),
            "distance = 0.1 at t = 1.000000 s violates [0.2, +inf) (1 of 2 samples)"
        );

        assert_eq!(
            describe_outcome("distance", "x", &CheckOutcome::default()),
            "No usable samples of distance"
        );
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.345_6), 12.35);
        assert_eq!(round2(100.0), 100.0);
    }
}
