//! Parking Path Control
//!
//! Fault reaction within the fault tolerant time interval and maneuver start.

use crate::common::{summary_table, SummaryRow};
use kpi_core::{
    first_transition_to, skip_leading, to_seconds, window_after, EvalError, EvaluationResult,
    Figure, StepContext, TestStep, Verdict, WindowInput, WindowMonitor, WindowOutcome,
};
use serde::{Deserialize, Serialize};
use signal_frame::{SignalKey, SignalKind};
use tracing::{debug, info};

/// PPC state machine values as published on `AP.ppc_state`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PpcState {
    Init = 0,
    Scanning = 1,
    PerformParking = 2,
    Finished = 3,
    Error = 4,
}

impl PpcState {
    pub fn raw(self) -> f64 {
        f64::from(self as u8)
    }

    pub fn from_raw(raw: f64) -> Option<Self> {
        if !raw.is_finite() {
            return None;
        }
        match raw as i64 {
            0 => Some(PpcState::Init),
            1 => Some(PpcState::Scanning),
            2 => Some(PpcState::PerformParking),
            3 => Some(PpcState::Finished),
            4 => Some(PpcState::Error),
            _ => None,
        }
    }
}

pub const DEFAULT_MAX_SPEED_KPH: f64 = 10.0;
/// Fault tolerant time interval
pub const DEFAULT_FTTI_US: u64 = 200_000;
/// Initialisation samples ignored before the maneuver start check
pub const DEFAULT_SKIP_LEADING_SAMPLES: usize = 10;

const _: () = assert!(DEFAULT_FTTI_US > 0);

/// PPC evaluation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PpcConfig {
    /// Ego speed at or below which faults are evaluated
    pub max_speed_kph: f64,
    pub ftti_us: u64,
    pub skip_leading_samples: usize,
}

impl Default for PpcConfig {
    fn default() -> Self {
        Self {
            max_speed_kph: DEFAULT_MAX_SPEED_KPH,
            ftti_us: DEFAULT_FTTI_US,
            skip_leading_samples: DEFAULT_SKIP_LEADING_SAMPLES,
        }
    }
}

/// PPC enters the error state within the FTTI after an injected fault
pub struct PpcFttiStep {
    config: PpcConfig,
}

impl PpcFttiStep {
    pub fn new(config: PpcConfig) -> Self {
        Self { config }
    }
}

impl TestStep for PpcFttiStep {
    fn id(&self) -> &str {
        "ppc_ftti"
    }

    fn description(&self) -> &str {
        "PPC reacts to an injected fault within the fault tolerant time interval"
    }

    fn required_signals(&self) -> Vec<SignalKey> {
        vec![
            SignalKey::vehicle(SignalKind::VehicleSpeed),
            SignalKey::vehicle(SignalKind::FaultFlag),
            SignalKey::vehicle(SignalKind::PpcState),
        ]
    }

    fn evaluate(&self, ctx: &StepContext<'_>) -> Result<EvaluationResult, EvalError> {
        let timestamps = ctx.frame()?.timestamps();
        let speed = ctx.scalar(&SignalKey::vehicle(SignalKind::VehicleSpeed))?;
        let fault = ctx.scalar(&SignalKey::vehicle(SignalKind::FaultFlag))?;
        let state = ctx.scalar(&SignalKey::vehicle(SignalKind::PpcState))?;
        let error_state = PpcState::Error.raw();

        // Reaction is the transition into ERROR, not the ERROR level
        let inputs = timestamps.iter().enumerate().map(|(i, &timestamp)| WindowInput {
            timestamp,
            precondition: speed[i] <= self.config.max_speed_kph,
            trigger: fault[i].is_finite() && fault[i] != 0.0,
            reaction: state[i] == error_state && (i == 0 || state[i - 1] != error_state),
        });
        let report = WindowMonitor::run(self.config.ftti_us, inputs);
        info!("PPC FTTI outcome: {:?}", report.outcome);

        let trigger_index = report
            .outcome
            .trigger_at()
            .and_then(|trigger_at| timestamps.binary_search(&trigger_at).ok());
        let error_before_fault =
            trigger_index.filter(|&idx| idx > 0 && state[idx - 1] == error_state);

        let ftti_ms = self.config.ftti_us as f64 / 1e3;
        let (verdict, explanation) = match report.outcome {
            _ if error_before_fault.is_some() => (
                Verdict::NotAssessed,
                format!(
                    "PPC was already in the error state before the fault at t = {:.6} s",
                    to_seconds(error_before_fault.map_or(0, |idx| timestamps[idx]))
                ),
            ),
            WindowOutcome::ReactedInTime {
                trigger_at,
                latency_us,
                ..
            } => (
                Verdict::Pass,
                format!(
                    "PPC entered the error state {:.1} ms after the fault at t = {:.6} s \
                     (FTTI {:.1} ms)",
                    latency_us as f64 / 1e3,
                    to_seconds(trigger_at),
                    ftti_ms
                ),
            ),
            WindowOutcome::DeadlineMissed { trigger_at, deadline } => (
                Verdict::Fail,
                format!(
                    "PPC did not enter the error state between the fault at t = {:.6} s \
                     and the deadline at t = {:.6} s",
                    to_seconds(trigger_at),
                    to_seconds(deadline)
                ),
            ),
            WindowOutcome::RecordingEndedBeforeDeadline { trigger_at, .. } => (
                Verdict::NotAssessed,
                format!(
                    "Recording ended within the FTTI of the fault at t = {:.6} s",
                    to_seconds(trigger_at)
                ),
            ),
            WindowOutcome::TriggerActiveWhenArmed { armed_at } => (
                Verdict::NotAssessed,
                format!(
                    "Fault already active when ego speed reached <= {} km/h at t = {:.6} s, \
                     onset unknown",
                    self.config.max_speed_kph,
                    to_seconds(armed_at)
                ),
            ),
            WindowOutcome::TriggerNeverFired => (
                Verdict::NotAssessed,
                format!("No fault injected at ego speed <= {} km/h", self.config.max_speed_kph),
            ),
            WindowOutcome::PreconditionNeverMet => (
                Verdict::NotAssessed,
                format!("Ego speed never at or below {} km/h", self.config.max_speed_kph),
            ),
        };

        let mut figure = Figure::time_series("PPC fault reaction", "Value")
            .with_series("Ego speed [km/h]", timestamps, speed)
            .with_series("Fault injected", timestamps, fault)
            .with_series("PPC state", timestamps, state);
        let mut result = EvaluationResult::new(verdict, explanation);

        match report.outcome {
            WindowOutcome::ReactedInTime {
                trigger_at,
                reaction_at,
                ..
            } => {
                figure = figure
                    .with_marker("Fault", trigger_at)
                    .with_marker("Error state", reaction_at);
            }
            WindowOutcome::DeadlineMissed { trigger_at, deadline }
            | WindowOutcome::RecordingEndedBeforeDeadline {
                trigger_at,
                deadline,
                ..
            } => {
                figure = figure.with_marker("Fault", trigger_at).with_marker("Deadline", deadline);
            }
            WindowOutcome::TriggerActiveWhenArmed { armed_at } => {
                figure = figure.with_marker("Fault already active", armed_at);
            }
            WindowOutcome::TriggerNeverFired | WindowOutcome::PreconditionNeverMet => {}
        }

        if let Some(start) = trigger_index {
            let window = window_after(timestamps, start, self.config.ftti_us);
            result = result.with_metadata("samples_in_ftti", window.len());
        }
        if report.extra_triggers > 0 {
            result = result.with_remark(format!(
                "{} further fault injections after the first were not evaluated",
                report.extra_triggers
            ));
        }

        let outcome =
            serde_json::to_value(report.outcome).map_err(|e| EvalError::Report(e.to_string()))?;
        Ok(result.with_figure(figure).with_metadata("window", outcome))
    }
}

/// PPC reaches PERFORM_PARKING after initialisation
pub struct PpcManeuverStartStep {
    config: PpcConfig,
}

impl PpcManeuverStartStep {
    pub fn new(config: PpcConfig) -> Self {
        Self { config }
    }
}

impl TestStep for PpcManeuverStartStep {
    fn id(&self) -> &str {
        "ppc_maneuver_start"
    }

    fn description(&self) -> &str {
        "PPC starts the parking maneuver"
    }

    fn required_signals(&self) -> Vec<SignalKey> {
        vec![SignalKey::vehicle(SignalKind::PpcState)]
    }

    fn evaluate(&self, ctx: &StepContext<'_>) -> Result<EvaluationResult, EvalError> {
        let timestamps = ctx.frame()?.timestamps();
        let state = ctx.scalar(&SignalKey::vehicle(SignalKind::PpcState))?;

        let Some(range) = skip_leading(state.len(), self.config.skip_leading_samples) else {
            return Ok(EvaluationResult::not_assessed(format!(
                "No samples left after skipping the first {}",
                self.config.skip_leading_samples
            )));
        };
        let start = range.start;
        let states = &state[range];
        let timestamps_used = &timestamps[start..];
        debug!("Maneuver start check over {} samples", states.len());

        let figure = Figure::time_series("PPC state", "State [-]")
            .with_series("PPC state", timestamps_used, states);
        let first_start = first_transition_to(states, PpcState::PerformParking.raw());
        let (verdict, explanation, figure) = match first_start {
            Some(idx) => {
                let at = timestamps_used[idx];
                (
                    Verdict::Pass,
                    format!("PPC entered PERFORM_PARKING at t = {:.6} s", to_seconds(at)),
                    figure.with_marker("Maneuver start", at),
                )
            }
            None => (Verdict::Fail, "Maneuver never started".to_string(), figure),
        };

        let table = summary_table(
            "PPC maneuver start",
            "Signal",
            &[SummaryRow::new("PPC state", verdict, explanation.clone())],
        )?;
        Ok(EvaluationResult::new(verdict, explanation)
            .with_table(table)
            .with_figure(figure)
            .with_metadata("skipped_samples", start))
    }
}
