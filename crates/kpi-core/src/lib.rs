//! KPI evaluation core
//!
//! Verdicts, per-sample threshold checks, the trigger/deadline window monitor,
//! evaluation results with figures and tables, and test case orchestration.
//! Feature steps implement [`TestStep`] and run through [`TestCase::run`].

mod aggregate;
mod case;
mod check;
mod error;
mod report;
mod result;
mod step;
mod verdict;
mod window;

pub use aggregate::{ResultAggregator, StepRecord};
pub use case::{run_step, StepReport, TestCase, TestCaseReport};
pub use check::{
    scan, scan_masked, scan_with, Bound, CheckOutcome, EqualityCheck, Failure, RangeCheck,
    SampleCheck,
};
pub use error::EvalError;
pub use report::{AdditionalResults, ReportDetails, VerdictEntry};
pub use result::{to_seconds, Cell, EvaluationResult, Figure, Marker, Plot, SummaryTable, Trace};
pub use step::{StepContext, TestStep};
pub use verdict::Verdict;
pub use window::{
    first_index, first_transition_to, skip_leading, window_after, MonitorState, WindowInput,
    WindowMonitor, WindowOutcome, WindowReport,
};
