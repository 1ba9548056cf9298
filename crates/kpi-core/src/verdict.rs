//! Test Step Verdicts

use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal verdict of one test step on one recording
///
/// Declared in ascending precedence, so `Ord` ranks
/// DATA_NOK > FAIL > INPUT_MISSING > NOT_ASSESSED > PASS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    NotAssessed,
    InputMissing,
    Fail,
    DataNok,
}

impl Verdict {
    /// Verdict of a boolean evaluation
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    /// Label shown in reports
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASSED",
            Verdict::Fail => "FAILED",
            Verdict::NotAssessed => "NOT ASSESSED",
            Verdict::InputMissing => "INPUT MISSING",
            Verdict::DataNok => "DATA NOK",
        }
    }

    /// Report colour
    pub fn color(&self) -> &'static str {
        match self {
            Verdict::Pass => "#28a745",
            Verdict::Fail => "#dc3545",
            Verdict::NotAssessed => "#818589",
            Verdict::InputMissing => "#ffc107",
            Verdict::DataNok => "#fd7e14",
        }
    }

    /// Check if the step reached a pass/fail decision
    pub fn is_assessed(&self) -> bool {
        matches!(self, Verdict::Pass | Verdict::Fail)
    }

    /// Combine two verdicts, keeping the one with higher precedence
    pub fn combine(self, other: Verdict) -> Verdict {
        self.max(other)
    }

    /// Combine many verdicts; no verdicts at all is NOT_ASSESSED
    pub fn aggregate(verdicts: impl IntoIterator<Item = Verdict>) -> Verdict {
        verdicts.into_iter().max().unwrap_or(Verdict::NotAssessed)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_precedence() {
        assert_eq!(Verdict::Pass.combine(Verdict::Fail), Verdict::Fail);
        assert_eq!(Verdict::Fail.combine(Verdict::InputMissing), Verdict::Fail);
        assert_eq!(Verdict::InputMissing.combine(Verdict::DataNok), Verdict::DataNok);
        assert_eq!(Verdict::Pass.combine(Verdict::NotAssessed), Verdict::NotAssessed);
        assert_eq!(Verdict::NotAssessed.combine(Verdict::InputMissing), Verdict::InputMissing);
    }

    #[test]
    fn test_ord_matches_precedence() {
        let ascending = [
            Verdict::Pass,
            Verdict::NotAssessed,
            Verdict::InputMissing,
            Verdict::Fail,
            Verdict::DataNok,
        ];
        assert!(ascending.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(ascending.iter().rev().copied().max(), Some(Verdict::DataNok));
        assert_eq!([Verdict::Fail, Verdict::InputMissing].into_iter().max(), Some(Verdict::Fail));
    }

    #[test]
    fn test_aggregate_empty_is_not_assessed() {
        assert_eq!(Verdict::aggregate([]), Verdict::NotAssessed);
        assert_eq!(Verdict::aggregate([Verdict::Pass, Verdict::Pass]), Verdict::Pass);
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(serde_json::to_string(&Verdict::InputMissing).unwrap(), "\"INPUT_MISSING\"");
        assert_eq!(serde_json::to_string(&Verdict::DataNok).unwrap(), "\"DATA_NOK\"");
    }

    #[test]
    fn test_labels_and_colors() {
        assert_eq!(Verdict::Fail.to_string(), "FAILED");
        assert_eq!(Verdict::Pass.color(), "#28a745");
        assert!(!Verdict::NotAssessed.is_assessed());
    }
}
