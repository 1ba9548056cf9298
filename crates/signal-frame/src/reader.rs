//! Measurement Reader Seam
//!
//! Decoding of vehicle measurement formats happens outside this workspace.
//! Evaluations only see the [`SignalReader`] trait; [`Recording`] is the
//! in-memory implementation, loadable from JSON fixtures.

use crate::{FrameError, SignalFrame};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Source of signal frames keyed by reader alias
pub trait SignalReader {
    /// Frame published under `alias`
    fn frame(&self, alias: &str) -> Result<&SignalFrame, FrameError>;
}

/// One recorded measurement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    /// Recording name, used in reports
    pub name: String,
    /// Frames by reader alias
    pub readers: BTreeMap<String, SignalFrame>,
}

impl Recording {
    /// Create a recording with a single frame
    pub fn single(name: impl Into<String>, alias: impl Into<String>, frame: SignalFrame) -> Self {
        let mut readers = BTreeMap::new();
        readers.insert(alias.into(), frame);
        Self {
            name: name.into(),
            readers,
        }
    }

    /// Parse a recording from JSON
    pub fn from_json(json: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a recording from a JSON file
    pub fn load(path: &Path) -> Result<Self, FrameError> {
        let contents = std::fs::read_to_string(path)?;
        let recording = Self::from_json(&contents)?;
        info!(
            "Loaded recording {} with {} reader(s) from {}",
            recording.name,
            recording.readers.len(),
            path.display()
        );
        Ok(recording)
    }
}

impl SignalReader for Recording {
    fn frame(&self, alias: &str) -> Result<&SignalFrame, FrameError> {
        self.readers
            .get(alias)
            .ok_or_else(|| FrameError::UnknownReader(alias.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FIXTURE: &str = r#"{
        "name": "rec_001",
        "readers": {
            "MTS": {
                "timestamps": [0, 40000],
                "columns": {"Vehicle.speed_kph": {"scalar": [3.0, 4.0]}}
            }
        }
    }"#;

    #[test]
    fn test_reader_lookup() {
        let recording = Recording::from_json(FIXTURE).unwrap();
        assert_eq!(recording.name, "rec_001");
        assert_eq!(recording.frame("MTS").unwrap().len(), 2);
        assert_eq!(
            recording.frame("CAN").unwrap_err(),
            FrameError::UnknownReader("CAN".to_string())
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let recording = Recording::load(file.path()).unwrap();
        let frame = recording.frame("MTS").unwrap();
        assert_eq!(frame.scalar("Vehicle.speed_kph").unwrap(), &[3.0, 4.0]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Recording::load(Path::new("/nonexistent/recording.json")).unwrap_err();
        assert!(matches!(err, FrameError::Io(_)));
    }
}
