//! Result Aggregation
//!
//! Collects step verdicts across test cases and recordings. The aggregator is
//! owned by the caller and passed explicitly to each run.

use crate::{Cell, EvalError, SummaryTable, Verdict};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// One recorded step verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub case_id: String,
    pub step_id: String,
    pub recording: String,
    pub verdict: Verdict,
    pub explanation: String,
}

/// Verdict store shared by sibling steps through explicit `&mut` access
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    records: Vec<StepRecord>,
}

impl ResultAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step verdict
    pub fn record(&mut self, record: StepRecord) {
        debug!(
            "Recorded {}/{} on {}: {}",
            record.case_id, record.step_id, record.recording, record.verdict
        );
        self.records.push(record);
    }

    /// All records in insertion order
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Records of one test case
    pub fn records_for<'a>(
        &'a self,
        case_id: &'a str,
    ) -> impl Iterator<Item = &'a StepRecord> + 'a {
        self.records.iter().filter(move |r| r.case_id == case_id)
    }

    /// Combined verdict of one test case
    pub fn case_verdict(&self, case_id: &str) -> Verdict {
        Verdict::aggregate(self.records_for(case_id).map(|r| r.verdict))
    }

    /// Combined verdict of everything recorded
    pub fn overall_verdict(&self) -> Verdict {
        Verdict::aggregate(self.records.iter().map(|r| r.verdict))
    }

    /// Number of records per verdict
    pub fn verdict_counts(&self) -> BTreeMap<Verdict, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.verdict).or_insert(0) += 1;
        }
        counts
    }

    /// Overview table, one row per record
    pub fn summary_table(&self) -> Result<SummaryTable, EvalError> {
        let mut table = SummaryTable::new(
            "Test step overview",
            ["Test case", "Test step", "Recording", "Verdict", "Evaluation"],
        );
        for record in &self.records {
            table.push_row(vec![
                Cell::from(record.case_id.as_str()),
                Cell::from(record.step_id.as_str()),
                Cell::from(record.recording.as_str()),
                Cell::from(record.verdict),
                Cell::from(record.explanation.as_str()),
            ])?;
        }
        Ok(table)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all records
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
