//! Evaluation Error Types

use signal_frame::FrameError;
use thiserror::Error;

/// Errors raised while evaluating a test step
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Required inputs absent from the recording
    #[error("Missing input signals: {}", .0.join(", "))]
    MissingInputs(Vec<String>),

    /// Data present but unusable for the evaluation
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Malformed summary table or figure
    #[error("Report assembly failed: {0}")]
    Report(String),

    /// Frame access or decoding failure
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl EvalError {
    /// Names of the absent inputs if this is a missing-input error
    pub fn missing_inputs(&self) -> Option<Vec<String>> {
        match self {
            EvalError::MissingInputs(names) => Some(names.clone()),
            EvalError::Frame(FrameError::UnknownReader(alias)) => {
                Some(vec![format!("reader {}", alias)])
            }
            EvalError::Frame(err) => err.missing_columns(),
            _ => None,
        }
    }
}
