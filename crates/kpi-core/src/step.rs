//! Test Step Contract

use crate::{EvalError, EvaluationResult};
use signal_frame::{SignalFrame, SignalKey, SignalReader, SignalSchema};

/// Inputs available to a test step
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    /// Recording name, used in explanations and report file names
    pub recording_name: &'a str,
    pub reader: &'a dyn SignalReader,
    pub schema: &'a SignalSchema,
    /// Reader alias holding the frame to evaluate
    pub alias: &'a str,
}

impl<'a> StepContext<'a> {
    /// Frame under evaluation
    pub fn frame(&self) -> Result<&'a SignalFrame, EvalError> {
        Ok(self.reader.frame(self.alias)?)
    }

    /// Column name of a signal
    pub fn column_name(&self, key: &SignalKey) -> Result<&'a str, EvalError> {
        Ok(self.schema.lookup(key)?)
    }

    /// Numeric samples of a signal
    pub fn scalar(&self, key: &SignalKey) -> Result<&'a [f64], EvalError> {
        let name = self.column_name(key)?;
        Ok(self.frame()?.scalar(name)?)
    }

    /// Packed samples of a signal
    pub fn blob(&self, key: &SignalKey) -> Result<&'a [Vec<u8>], EvalError> {
        let name = self.column_name(key)?;
        Ok(self.frame()?.blob(name)?)
    }

    /// Column names of `keys` absent from the frame
    pub fn missing_inputs(&self, keys: &[SignalKey]) -> Result<Vec<String>, EvalError> {
        let frame = self.frame()?;
        let mut names = Vec::with_capacity(keys.len());
        for key in keys {
            names.push(self.column_name(key)?);
        }
        Ok(frame.missing_columns(names))
    }
}

/// One evaluation applied to one recording.
///
/// Steps are pure: everything they report is derived from the context.
pub trait TestStep {
    /// Stable identifier used in reports
    fn id(&self) -> &str;

    /// One-line description of what the step checks
    fn description(&self) -> &str;

    /// Signals that must be present for the step to be assessed
    fn required_signals(&self) -> Vec<SignalKey>;

    /// Evaluate the step
    fn evaluate(&self, ctx: &StepContext<'_>) -> Result<EvaluationResult, EvalError>;
}
