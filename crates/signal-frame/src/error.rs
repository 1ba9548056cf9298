//! Signal Frame Error Types

use thiserror::Error;

/// Errors raised while building, reading or decoding signal frames
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    /// Timestamp index is not strictly increasing
    #[error("Timestamps are not strictly increasing at index {index}")]
    NonMonotonicTimestamps { index: usize },

    /// Column length differs from the timestamp index
    #[error("Column {name} has {actual} samples, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A single required column is absent
    #[error("Missing signal column: {0}")]
    MissingColumn(String),

    /// Several required columns are absent
    #[error("Missing signal columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Column exists but holds a different payload
    #[error("Column {name} is not a {expected} column")]
    WrongColumnKind { name: String, expected: &'static str },

    /// Signal key is not registered in the schema
    #[error("Unknown signal: {0}")]
    UnknownSignal(String),

    /// Naming template lacks a placeholder required by its scope
    #[error("Template {template:?} for {kind} must contain {placeholder}")]
    InvalidTemplate {
        kind: String,
        template: String,
        placeholder: &'static str,
    },

    /// Reader alias not present in the recording
    #[error("Unknown reader alias: {0}")]
    UnknownReader(String),

    /// Packed blob does not hold a whole number of records
    #[error("Malformed blob: {len} bytes is not a multiple of {record_len}")]
    MalformedBlob { len: usize, record_len: usize },

    /// Recording file could not be read
    #[error("Failed to read recording: {0}")]
    Io(String),

    /// Recording file could not be parsed
    #[error("Failed to parse recording: {0}")]
    Parse(String),
}

impl FrameError {
    /// Column names this error reports as absent, if it is a missing-input error
    pub fn missing_columns(&self) -> Option<Vec<String>> {
        match self {
            FrameError::MissingColumn(name) => Some(vec![name.clone()]),
            FrameError::MissingColumns(names) => Some(names.clone()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        FrameError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FrameError {
    fn from(err: serde_json::Error) -> Self {
        FrameError::Parse(err.to_string())
    }
}
