//! Timestamp-Indexed Signal Frame

use crate::FrameError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recording timestamp in microseconds
pub type Timestamp = u64;

/// Column payload
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Numeric samples, NaN where the sample carries no value
    Scalar(Vec<f64>),
    /// Packed or array-encoded samples
    Blob(Vec<Vec<u8>>),
}

impl Column {
    /// Number of samples in the column
    pub fn len(&self) -> usize {
        match self {
            Column::Scalar(values) => values.len(),
            Column::Blob(values) => values.len(),
        }
    }

    /// Check if the column holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Signal table indexed by recording timestamp.
///
/// Timestamps are strictly increasing and every column has exactly one
/// sample per timestamp. Frames are immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame", into = "RawFrame")]
pub struct SignalFrame {
    timestamps: Vec<Timestamp>,
    columns: BTreeMap<String, Column>,
}

impl SignalFrame {
    /// Create an empty-columned frame over the given timestamp index
    pub fn new(timestamps: Vec<Timestamp>) -> Result<Self, FrameError> {
        if let Some(index) = timestamps
            .windows(2)
            .position(|pair| pair[1] <= pair[0])
        {
            return Err(FrameError::NonMonotonicTimestamps { index: index + 1 });
        }
        Ok(Self {
            timestamps,
            columns: BTreeMap::new(),
        })
    }

    /// Add a numeric column
    pub fn with_scalar(
        mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, FrameError> {
        self.insert(name.into(), Column::Scalar(values))?;
        Ok(self)
    }

    /// Add a packed column
    pub fn with_blob(
        mut self,
        name: impl Into<String>,
        values: Vec<Vec<u8>>,
    ) -> Result<Self, FrameError> {
        self.insert(name.into(), Column::Blob(values))?;
        Ok(self)
    }

    fn insert(&mut self, name: String, column: Column) -> Result<(), FrameError> {
        if column.len() != self.timestamps.len() {
            return Err(FrameError::LengthMismatch {
                name,
                expected: self.timestamps.len(),
                actual: column.len(),
            });
        }
        self.columns.insert(name, column);
        Ok(())
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the frame has no samples
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Timestamp index
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// Timestamp of a sample
    pub fn timestamp(&self, index: usize) -> Option<Timestamp> {
        self.timestamps.get(index).copied()
    }

    /// Check if a column is present
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Names of all columns, sorted
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Numeric samples of a column
    pub fn scalar(&self, name: &str) -> Result<&[f64], FrameError> {
        match self.columns.get(name) {
            Some(Column::Scalar(values)) => Ok(values),
            Some(Column::Blob(_)) => Err(FrameError::WrongColumnKind {
                name: name.to_string(),
                expected: "scalar",
            }),
            None => Err(FrameError::MissingColumn(name.to_string())),
        }
    }

    /// Packed samples of a column
    pub fn blob(&self, name: &str) -> Result<&[Vec<u8>], FrameError> {
        match self.columns.get(name) {
            Some(Column::Blob(values)) => Ok(values),
            Some(Column::Scalar(_)) => Err(FrameError::WrongColumnKind {
                name: name.to_string(),
                expected: "blob",
            }),
            None => Err(FrameError::MissingColumn(name.to_string())),
        }
    }

    /// Names from `names` that are absent, in the order given
    pub fn missing_columns<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        names
            .into_iter()
            .filter(|name| !self.has_column(name))
            .map(str::to_string)
            .collect()
    }

    /// Fail with every absent column at once
    pub fn require<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<(), FrameError> {
        let missing = self.missing_columns(names);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FrameError::MissingColumns(missing))
        }
    }

    /// Index of the first sample at or after `ts`
    pub fn index_at_or_after(&self, ts: Timestamp) -> Option<usize> {
        let idx = self.timestamps.partition_point(|&t| t < ts);
        (idx < self.timestamps.len()).then_some(idx)
    }
}

/// Serialized frame layout. JSON has no NaN, so missing values are `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawFrame {
    timestamps: Vec<Timestamp>,
    #[serde(default)]
    columns: BTreeMap<String, RawColumn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawColumn {
    Scalar(Vec<Option<f64>>),
    Blob(Vec<Vec<u8>>),
}

impl TryFrom<RawFrame> for SignalFrame {
    type Error = FrameError;

    fn try_from(raw: RawFrame) -> Result<Self, Self::Error> {
        let mut frame = SignalFrame::new(raw.timestamps)?;
        for (name, column) in raw.columns {
            let column = match column {
                RawColumn::Scalar(values) => Column::Scalar(
                    values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
                ),
                RawColumn::Blob(values) => Column::Blob(values),
            };
            frame.insert(name, column)?;
        }
        Ok(frame)
    }
}

impl From<SignalFrame> for RawFrame {
    fn from(frame: SignalFrame) -> Self {
        let columns = frame
            .columns
            .into_iter()
            .map(|(name, column)| {
                let raw = match column {
                    Column::Scalar(values) => RawColumn::Scalar(
                        values
                            .into_iter()
                            .map(|v| if v.is_nan() { None } else { Some(v) })
                            .collect(),
                    ),
                    Column::Blob(values) => RawColumn::Blob(values),
                };
                (name, raw)
            })
            .collect();
        RawFrame {
            timestamps: frame.timestamps,
            columns,
        }
    }
}
