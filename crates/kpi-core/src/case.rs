//! Test Case Orchestration
//!
//! Runs each step exactly once per recording. Missing inputs degrade to
//! INPUT_MISSING and step errors to DATA_NOK; no error escapes a step.

use crate::{
    EvaluationResult, ReportDetails, ResultAggregator, StepContext, StepRecord, TestStep, Verdict,
};
use serde::Serialize;
use tracing::{error, info, warn};

/// Report of one step run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub step_id: String,
    pub description: String,
    pub result: EvaluationResult,
    pub details: ReportDetails,
}

/// Report of one test case on one recording
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCaseReport {
    pub case_id: String,
    pub recording: String,
    pub verdict: Verdict,
    pub steps: Vec<StepReport>,
}

/// Ordered group of test steps
pub struct TestCase {
    id: String,
    description: String,
    steps: Vec<Box<dyn TestStep>>,
}

impl TestCase {
    /// Create an empty test case
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step
    pub fn with_step(mut self, step: impl TestStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Append a boxed step
    pub fn add_step(&mut self, step: Box<dyn TestStep>) {
        self.steps.push(step);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Steps in execution order
    pub fn steps(&self) -> impl Iterator<Item = &dyn TestStep> {
        self.steps.iter().map(|step| step.as_ref())
    }

    /// Run every step on the context's recording and record the verdicts
    pub fn run(&self, ctx: &StepContext<'_>, aggregator: &mut ResultAggregator) -> TestCaseReport {
        info!(
            "Running test case {} ({} steps) on {}",
            self.id,
            self.steps.len(),
            ctx.recording_name
        );

        let mut steps = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let result = run_step(step.as_ref(), ctx);
            aggregator.record(StepRecord {
                case_id: self.id.clone(),
                step_id: step.id().to_string(),
                recording: ctx.recording_name.to_string(),
                verdict: result.verdict,
                explanation: result.explanation.clone(),
            });
            let file_name = format!("{}_{}_{}", ctx.recording_name, self.id, step.id());
            steps.push(StepReport {
                step_id: step.id().to_string(),
                description: step.description().to_string(),
                details: ReportDetails::from_result(file_name, &result),
                result,
            });
        }

        let verdict = Verdict::aggregate(steps.iter().map(|s| s.result.verdict));
        info!("Test case {} on {}: {}", self.id, ctx.recording_name, verdict);
        TestCaseReport {
            case_id: self.id.clone(),
            recording: ctx.recording_name.to_string(),
            verdict,
            steps,
        }
    }
}

/// Evaluate one step behind the error boundary
pub fn run_step(step: &dyn TestStep, ctx: &StepContext<'_>) -> EvaluationResult {
    let precheck = ctx.missing_inputs(&step.required_signals());
    match precheck {
        Ok(missing) if !missing.is_empty() => {
            warn!("Step {}: missing inputs {:?}", step.id(), missing);
            return EvaluationResult::input_missing(&missing);
        }
        Ok(_) => {}
        Err(err) => return degrade(step, err),
    }

    match step.evaluate(ctx) {
        Ok(result) => {
            info!("Step {}: {} - {}", step.id(), result.verdict, result.explanation);
            result
        }
        Err(err) => degrade(step, err),
    }
}

fn degrade(step: &dyn TestStep, err: crate::EvalError) -> EvaluationResult {
    if let Some(missing) = err.missing_inputs() {
        warn!("Step {}: missing inputs {:?}", step.id(), missing);
        EvaluationResult::input_missing(&missing)
    } else {
        error!("Step {} aborted: {}", step.id(), err);
        EvaluationResult::data_nok(format!("Evaluation aborted: {}", err))
            .with_remark(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{scan, EvalError, RangeCheck};
    use signal_frame::{Recording, SignalFrame, SignalKey, SignalKind, SignalSchema};

    struct SpeedLimitStep;

    impl TestStep for SpeedLimitStep {
        fn id(&self) -> &str {
            "speed_limit"
        }

        fn description(&self) -> &str {
            "Vehicle speed stays at or below 10 km/h"
        }

        fn required_signals(&self) -> Vec<SignalKey> {
            vec![SignalKey::vehicle(SignalKind::VehicleSpeed)]
        }

        fn evaluate(&self, ctx: &StepContext<'_>) -> Result<EvaluationResult, EvalError> {
            let frame = ctx.frame()?;
            let speed = ctx.scalar(&SignalKey::vehicle(SignalKind::VehicleSpeed))?;
            let outcome = scan(frame.timestamps(), speed, &RangeCheck::at_most(10.0));
            Ok(EvaluationResult::new(outcome.verdict(), "speed check"))
        }
    }

    struct BrokenStep;

    impl TestStep for BrokenStep {
        fn id(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "Always errors"
        }

        fn required_signals(&self) -> Vec<SignalKey> {
            Vec::new()
        }

        fn evaluate(&self, _ctx: &StepContext<'_>) -> Result<EvaluationResult, EvalError> {
            Err(EvalError::InvalidData("corrupt sample".to_string()))
        }
    }

    fn recording(speed: Option<Vec<f64>>) -> Recording {
        let mut frame = SignalFrame::new(vec![0, 10, 20]).unwrap();
        if let Some(speed) = speed {
            frame = frame.with_scalar("Vehicle.speed_kph", speed).unwrap();
        }
        Recording::single("rec", "MTS", frame)
    }

    #[test]
    fn test_case_runs_every_step_once() {
        let recording = recording(Some(vec![1.0, 2.0, 12.0]));
        let schema = SignalSchema::default_parking();
        let ctx = StepContext {
            recording_name: "rec",
            reader: &recording,
            schema: &schema,
            alias: "MTS",
        };
        let case = TestCase::new("TC", "speed").with_step(SpeedLimitStep).with_step(BrokenStep);
        let mut aggregator = ResultAggregator::new();

        let report = case.run(&ctx, &mut aggregator);
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.steps[0].result.verdict, Verdict::Fail);
        assert_eq!(report.steps[1].result.verdict, Verdict::DataNok);
        assert_eq!(report.verdict, Verdict::DataNok);
        assert_eq!(aggregator.len(), 2);
        assert_eq!(report.steps[0].details.file_name, "rec_TC_speed_limit");
    }

    #[test]
    fn test_missing_signal_is_input_missing() {
        let recording = recording(None);
        let schema = SignalSchema::default_parking();
        let ctx = StepContext {
            recording_name: "rec",
            reader: &recording,
            schema: &schema,
            alias: "MTS",
        };
        let result = run_step(&SpeedLimitStep, &ctx);
        assert_eq!(result.verdict, Verdict::InputMissing);
        assert!(result.explanation.contains("Vehicle.speed_kph"));
    }

    #[test]
    fn test_unknown_reader_is_input_missing() {
        let recording = recording(Some(vec![1.0, 2.0, 3.0]));
        let schema = SignalSchema::default_parking();
        let ctx = StepContext {
            recording_name: "rec",
            reader: &recording,
            schema: &schema,
            alias: "CAN",
        };
        assert_eq!(run_step(&SpeedLimitStep, &ctx).verdict, Verdict::InputMissing);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_any_missing_required_signal_is_input_missing(
                speed in prop::collection::vec(0.0f64..20.0, 3),
                drop_speed in any::<bool>(),
            ) {
                let recording = recording(if drop_speed { None } else { Some(speed) });
                let schema = SignalSchema::default_parking();
                let ctx = StepContext {
                    recording_name: "rec",
                    reader: &recording,
                    schema: &schema,
                    alias: "MTS",
                };
                let verdict = run_step(&SpeedLimitStep, &ctx).verdict;
                prop_assert_eq!(verdict == Verdict::InputMissing, drop_speed);
            }
        }
    }
}
