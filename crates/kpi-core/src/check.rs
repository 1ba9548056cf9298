//! Per-Sample Threshold Checks
//!
//! Checks are applied sample by sample; the outcome keeps the number of
//! violations and the chronologically first one. A NaN sample never passes
//! a numeric check.

use crate::Verdict;
use serde::{Deserialize, Serialize};
use signal_frame::Timestamp;
use std::fmt;

/// One side of a range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Bound {
    Inclusive(f64),
    Exclusive(f64),
    Unbounded,
}

impl Bound {
    fn admits_from_below(&self, value: f64) -> bool {
        match *self {
            Bound::Inclusive(limit) => value >= limit,
            Bound::Exclusive(limit) => value > limit,
            Bound::Unbounded => true,
        }
    }

    fn admits_from_above(&self, value: f64) -> bool {
        match *self {
            Bound::Inclusive(limit) => value <= limit,
            Bound::Exclusive(limit) => value < limit,
            Bound::Unbounded => true,
        }
    }
}

/// Predicate applied to each sample
pub trait SampleCheck {
    /// Check if a sample value passes
    fn passes(&self, value: f64) -> bool;
}

/// Range check with explicit bound inclusivity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeCheck {
    pub lower: Bound,
    pub upper: Bound,
}

impl RangeCheck {
    /// `[min, max]`
    pub fn closed(min: f64, max: f64) -> Self {
        Self {
            lower: Bound::Inclusive(min),
            upper: Bound::Inclusive(max),
        }
    }

    /// `[min, +inf)`
    pub fn at_least(min: f64) -> Self {
        Self {
            lower: Bound::Inclusive(min),
            upper: Bound::Unbounded,
        }
    }

    /// `(min, +inf)`
    pub fn above(min: f64) -> Self {
        Self {
            lower: Bound::Exclusive(min),
            upper: Bound::Unbounded,
        }
    }

    /// `(-inf, max]`
    pub fn at_most(max: f64) -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Inclusive(max),
        }
    }

    /// `(-inf, max)`
    pub fn below(max: f64) -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Exclusive(max),
        }
    }

    /// Check if `value` lies in the range
    pub fn contains(&self, value: f64) -> bool {
        !value.is_nan()
            && self.lower.admits_from_below(value)
            && self.upper.admits_from_above(value)
    }
}

impl SampleCheck for RangeCheck {
    fn passes(&self, value: f64) -> bool {
        self.contains(value)
    }
}

impl fmt::Display for RangeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lower {
            Bound::Inclusive(v) => write!(f, "[{}", v)?,
            Bound::Exclusive(v) => write!(f, "({}", v)?,
            Bound::Unbounded => f.write_str("(-inf")?,
        }
        f.write_str(", ")?;
        match self.upper {
            Bound::Inclusive(v) => write!(f, "{}]", v),
            Bound::Exclusive(v) => write!(f, "{})", v),
            Bound::Unbounded => f.write_str("+inf)"),
        }
    }
}

/// Equality check for enum-coded signals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqualityCheck {
    pub expected: f64,
}

impl SampleCheck for EqualityCheck {
    fn passes(&self, value: f64) -> bool {
        value == self.expected
    }
}

impl fmt::Display for EqualityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "== {}", self.expected)
    }
}

/// A violating sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub index: usize,
    pub timestamp: Timestamp,
    pub value: f64,
}

impl Failure {
    /// Timestamp in seconds
    pub fn seconds(&self) -> f64 {
        self.timestamp as f64 / 1e6
    }

    /// Evaluation sentence naming the failing sample
    pub fn describe(&self, signal: &str, requirement: &str) -> String {
        format!(
            "{} = {} at t = {:.6} s violates {}",
            signal,
            self.value,
            self.seconds(),
            requirement
        )
    }
}

/// Aggregated result of a per-sample check
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Samples evaluated
    pub evaluated: usize,
    /// Samples violating the check
    pub violations: usize,
    /// Chronologically first violation
    pub first_failure: Option<Failure>,
}

impl CheckOutcome {
    /// Record one evaluated sample
    pub fn record(&mut self, index: usize, timestamp: Timestamp, value: f64, passed: bool) {
        self.evaluated += 1;
        if passed {
            return;
        }
        self.violations += 1;
        self.record_failure(Failure {
            index,
            timestamp,
            value,
        });
    }

    /// Merge another outcome, keeping the earliest violation
    pub fn merge(&mut self, other: &CheckOutcome) {
        self.evaluated += other.evaluated;
        self.violations += other.violations;
        if let Some(failure) = other.first_failure {
            self.record_failure(failure);
        }
    }

    fn record_failure(&mut self, failure: Failure) {
        let earlier = self
            .first_failure
            .map_or(true, |first| failure.timestamp < first.timestamp);
        if earlier {
            self.first_failure = Some(failure);
        }
    }

    /// Check if no sample violated the check
    pub fn passed(&self) -> bool {
        self.violations == 0
    }

    /// PASS / FAIL, or NOT_ASSESSED when nothing was evaluated
    pub fn verdict(&self) -> Verdict {
        if self.evaluated == 0 {
            Verdict::NotAssessed
        } else {
            Verdict::from_passed(self.passed())
        }
    }
}

/// Apply a predicate to every sample
pub fn scan_with(
    timestamps: &[Timestamp],
    values: &[f64],
    predicate: impl Fn(f64) -> bool,
) -> CheckOutcome {
    let mut outcome = CheckOutcome::default();
    for (index, (&timestamp, &value)) in timestamps.iter().zip(values).enumerate() {
        outcome.record(index, timestamp, value, !value.is_nan() && predicate(value));
    }
    outcome
}

/// Apply a check to every sample
pub fn scan<C: SampleCheck + ?Sized>(
    timestamps: &[Timestamp],
    values: &[f64],
    check: &C,
) -> CheckOutcome {
    scan_with(timestamps, values, |value| check.passes(value))
}

/// Apply a check to the samples where `mask` is set; others are skipped
pub fn scan_masked<C: SampleCheck + ?Sized>(
    timestamps: &[Timestamp],
    values: &[f64],
    mask: &[bool],
    check: &C,
) -> CheckOutcome {
    let mut outcome = CheckOutcome::default();
    for (index, ((&timestamp, &value), &usable)) in
        timestamps.iter().zip(values).zip(mask).enumerate()
    {
        if usable {
            outcome.record(index, timestamp, value, !value.is_nan() && check.passes(value));
        }
    }
    outcome
}
