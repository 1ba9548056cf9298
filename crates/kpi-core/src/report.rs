//! Report Sink
//!
//! Shape consumed by the report renderer: plots with titles, remarks and an
//! additional-results block carrying verdict, colour and metadata.

use crate::{EvaluationResult, Plot, Verdict};
use serde::Serialize;
use std::collections::BTreeMap;

/// Verdict entry of the additional results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerdictEntry {
    pub value: &'static str,
    pub color: &'static str,
    pub verdict: Verdict,
}

impl From<Verdict> for VerdictEntry {
    fn from(verdict: Verdict) -> Self {
        Self {
            value: verdict.label(),
            color: verdict.color(),
            verdict,
        }
    }
}

/// Additional results block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdditionalResults {
    #[serde(rename = "Verdict")]
    pub verdict: VerdictEntry,
    #[serde(rename = "Explanation")]
    pub explanation: String,
    #[serde(rename = "Metadata")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Per-step report details
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDetails {
    #[serde(rename = "Plots")]
    pub plots: Vec<Plot>,
    #[serde(rename = "Plot_titles")]
    pub plot_titles: Vec<String>,
    #[serde(rename = "Remarks")]
    pub remarks: Vec<String>,
    #[serde(rename = "Additional_results")]
    pub additional_results: AdditionalResults,
    pub file_name: String,
}

impl ReportDetails {
    /// Build the report details of a step result
    pub fn from_result(file_name: impl Into<String>, result: &EvaluationResult) -> Self {
        let plot_titles = result.plots.iter().map(|plot| plot.title().to_string()).collect();
        Self {
            plots: result.plots.clone(),
            plot_titles,
            remarks: result.remarks.clone(),
            additional_results: AdditionalResults {
                verdict: result.verdict.into(),
                explanation: result.explanation.clone(),
                metadata: result.metadata.clone(),
            },
            file_name: file_name.into(),
        }
    }
}
