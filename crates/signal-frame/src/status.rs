//! Signal Validity Status

use serde::{Deserialize, Serialize};

/// Signal state as published with each sample (`AL_SIG_STATE_*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigStatus {
    Init,
    Ok,
    Invalid,
    Unknown,
}

impl SigStatus {
    /// Decode a raw status sample
    pub fn from_raw(raw: f64) -> Self {
        if !raw.is_finite() {
            return SigStatus::Unknown;
        }
        match raw as i64 {
            0 => SigStatus::Init,
            1 => SigStatus::Ok,
            2 => SigStatus::Invalid,
            _ => SigStatus::Unknown,
        }
    }

    /// Check if samples with this status may be evaluated
    pub fn is_usable(&self) -> bool {
        matches!(self, SigStatus::Ok)
    }
}

/// Per-sample usability mask from a status column
pub fn usable_mask(status: &[f64]) -> Vec<bool> {
    status
        .iter()
        .map(|&raw| SigStatus::from_raw(raw).is_usable())
        .collect()
}

/// Indices of samples whose status is Ok
pub fn usable_samples(status: &[f64]) -> Vec<usize> {
    status
        .iter()
        .enumerate()
        .filter(|(_, &raw)| SigStatus::from_raw(raw).is_usable())
        .map(|(idx, _)| idx)
        .collect()
}
