//! Trigger Windows
//!
//! Explicit state machine for "after the trigger, react within the deadline"
//! evaluations (FTTI checks):
//!
//! ```text
//! Idle -> ArmedPrecondition -> Triggered -> WithinDeadline -> Evaluated
//! ```
//!
//! The trigger fires on a rising edge only, so the first sample never fires
//! and a trigger already high when the precondition starts holding has no
//! known onset. Only the first trigger is evaluated. Later trigger edges are
//! counted.

use serde::{Deserialize, Serialize};
use signal_frame::Timestamp;
use std::ops::Range;
use tracing::debug;

/// Guards evaluated for one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowInput {
    pub timestamp: Timestamp,
    pub precondition: bool,
    pub trigger: bool,
    pub reaction: bool,
}

/// Terminal result of a trigger window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WindowOutcome {
    /// Precondition never held
    PreconditionNeverMet,
    /// Precondition held but the trigger never fired under it
    TriggerNeverFired,
    /// Trigger was already high when the precondition started holding and
    /// never rose again under it
    TriggerActiveWhenArmed { armed_at: Timestamp },
    /// Reaction observed at or before the deadline
    ReactedInTime {
        trigger_at: Timestamp,
        reaction_at: Timestamp,
        latency_us: u64,
    },
    /// A sample past the deadline arrived without reaction
    DeadlineMissed {
        trigger_at: Timestamp,
        deadline: Timestamp,
    },
    /// Recording ended while the deadline was still open
    RecordingEndedBeforeDeadline {
        trigger_at: Timestamp,
        deadline: Timestamp,
        last_sample: Timestamp,
    },
}

/// Monitor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    ArmedPrecondition,
    Triggered {
        trigger_at: Timestamp,
        deadline: Timestamp,
    },
    WithinDeadline {
        trigger_at: Timestamp,
        deadline: Timestamp,
    },
    Evaluated(WindowOutcome),
}

impl WindowOutcome {
    /// Timestamp of the evaluated trigger, if one fired
    pub fn trigger_at(&self) -> Option<Timestamp> {
        match *self {
            WindowOutcome::ReactedInTime { trigger_at, .. }
            | WindowOutcome::DeadlineMissed { trigger_at, .. }
            | WindowOutcome::RecordingEndedBeforeDeadline { trigger_at, .. } => Some(trigger_at),
            WindowOutcome::PreconditionNeverMet
            | WindowOutcome::TriggerNeverFired
            | WindowOutcome::TriggerActiveWhenArmed { .. } => None,
        }
    }
}

/// Final report of a monitor run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowReport {
    pub outcome: WindowOutcome,
    /// Trigger edges seen after the evaluated trigger
    pub extra_triggers: usize,
}

/// Trigger/deadline state machine
#[derive(Debug, Clone)]
pub struct WindowMonitor {
    deadline_us: u64,
    state: MonitorState,
    precondition_seen: bool,
    previous_trigger: Option<bool>,
    latched_at: Option<Timestamp>,
    extra_triggers: usize,
    last_timestamp: Option<Timestamp>,
}

impl WindowMonitor {
    /// Create a monitor with the allowed reaction time in microseconds
    pub fn new(deadline_us: u64) -> Self {
        Self {
            deadline_us,
            state: MonitorState::Idle,
            precondition_seen: false,
            previous_trigger: None,
            latched_at: None,
            extra_triggers: 0,
            last_timestamp: None,
        }
    }

    /// Current state
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Feed one sample and return the new state
    pub fn step(&mut self, input: WindowInput) -> MonitorState {
        let rising_trigger = input.trigger && self.previous_trigger == Some(false);
        self.previous_trigger = Some(input.trigger);
        self.last_timestamp = Some(input.timestamp);

        self.state = match self.state {
            MonitorState::Idle => {
                if input.precondition {
                    self.precondition_seen = true;
                    self.arm(input, rising_trigger)
                } else {
                    MonitorState::Idle
                }
            }
            MonitorState::ArmedPrecondition => {
                if input.precondition {
                    self.arm(input, rising_trigger)
                } else {
                    MonitorState::Idle
                }
            }
            MonitorState::Triggered {
                trigger_at,
                deadline,
            }
            | MonitorState::WithinDeadline {
                trigger_at,
                deadline,
            } => Self::await_reaction(input, trigger_at, deadline),
            MonitorState::Evaluated(outcome) => {
                if rising_trigger {
                    self.extra_triggers += 1;
                }
                MonitorState::Evaluated(outcome)
            }
        };
        self.state
    }

    /// Armed state: fire on a rising trigger, reacting on the same sample counts
    fn arm(&mut self, input: WindowInput, rising_trigger: bool) -> MonitorState {
        if !input.trigger {
            return MonitorState::ArmedPrecondition;
        }
        if !rising_trigger {
            if self.latched_at.is_none() {
                debug!("Trigger already high when armed at {} us", input.timestamp);
                self.latched_at = Some(input.timestamp);
            }
            return MonitorState::ArmedPrecondition;
        }
        let trigger_at = input.timestamp;
        let deadline = trigger_at.saturating_add(self.deadline_us);
        debug!("Trigger at {} us, deadline {} us", trigger_at, deadline);
        if input.reaction {
            MonitorState::Evaluated(WindowOutcome::ReactedInTime {
                trigger_at,
                reaction_at: trigger_at,
                latency_us: 0,
            })
        } else {
            MonitorState::Triggered {
                trigger_at,
                deadline,
            }
        }
    }

    fn await_reaction(
        input: WindowInput,
        trigger_at: Timestamp,
        deadline: Timestamp,
    ) -> MonitorState {
        if input.timestamp > deadline {
            MonitorState::Evaluated(WindowOutcome::DeadlineMissed {
                trigger_at,
                deadline,
            })
        } else if input.reaction {
            MonitorState::Evaluated(WindowOutcome::ReactedInTime {
                trigger_at,
                reaction_at: input.timestamp,
                latency_us: input.timestamp - trigger_at,
            })
        } else {
            MonitorState::WithinDeadline {
                trigger_at,
                deadline,
            }
        }
    }

    /// Close the scan at the end of the recording
    pub fn finish(self) -> WindowReport {
        let outcome = match self.state {
            MonitorState::Idle | MonitorState::ArmedPrecondition => {
                if let Some(armed_at) = self.latched_at {
                    WindowOutcome::TriggerActiveWhenArmed { armed_at }
                } else if self.precondition_seen {
                    WindowOutcome::TriggerNeverFired
                } else {
                    WindowOutcome::PreconditionNeverMet
                }
            }
            MonitorState::Triggered {
                trigger_at,
                deadline,
            }
            | MonitorState::WithinDeadline {
                trigger_at,
                deadline,
            } => WindowOutcome::RecordingEndedBeforeDeadline {
                trigger_at,
                deadline,
                last_sample: self.last_timestamp.unwrap_or(trigger_at),
            },
            MonitorState::Evaluated(outcome) => outcome,
        };
        WindowReport {
            outcome,
            extra_triggers: self.extra_triggers,
        }
    }

    /// Run a monitor over a whole input sequence
    pub fn run(deadline_us: u64, inputs: impl IntoIterator<Item = WindowInput>) -> WindowReport {
        let mut monitor = Self::new(deadline_us);
        for input in inputs {
            monitor.step(input);
        }
        monitor.finish()
    }
}

/// Index of the first sample satisfying `predicate`
pub fn first_index(values: &[f64], predicate: impl Fn(f64) -> bool) -> Option<usize> {
    values.iter().position(|&v| predicate(v))
}

/// Index of the first sample entering `state` (equal to it, previous sample not)
pub fn first_transition_to(values: &[f64], state: f64) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .position(|(idx, &v)| v == state && (idx == 0 || values[idx - 1] != state))
}

/// Sample indices whose timestamps lie in `[ts[start], ts[start] + duration_us]`
pub fn window_after(timestamps: &[Timestamp], start: usize, duration_us: u64) -> Range<usize> {
    let Some(&origin) = timestamps.get(start) else {
        return timestamps.len()..timestamps.len();
    };
    let end_ts = origin.saturating_add(duration_us);
    let end = start + timestamps[start..].partition_point(|&t| t <= end_ts);
    start..end
}

/// Range left after dropping the first `count` samples, `None` when empty
pub fn skip_leading(len: usize, count: usize) -> Option<Range<usize>> {
    (count < len).then_some(count..len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(
        timestamp: Timestamp,
        precondition: bool,
        trigger: bool,
        reaction: bool,
    ) -> WindowInput {
        WindowInput {
            timestamp,
            precondition,
            trigger,
            reaction,
        }
    }

    #[test]
    fn test_reaction_within_deadline() {
        let report = WindowMonitor::run(
            100,
            [
                input(0, true, false, false),
                input(50, true, true, false),
                input(100, true, true, false),
                input(150, true, true, true),
            ],
        );
        assert_eq!(
            report.outcome,
            WindowOutcome::ReactedInTime {
                trigger_at: 50,
                reaction_at: 150,
                latency_us: 100
            }
        );
    }

    #[test]
    fn test_reaction_after_deadline() {
        let report = WindowMonitor::run(
            100,
            [
                input(0, true, false, false),
                input(10, true, true, false),
                input(110, true, true, false),
                input(111, true, true, true),
            ],
        );
        assert_eq!(
            report.outcome,
            WindowOutcome::DeadlineMissed {
                trigger_at: 10,
                deadline: 110
            }
        );
    }

    #[test]
    fn test_reaction_on_trigger_sample() {
        let report = WindowMonitor::run(
            100,
            [input(0, true, false, false), input(10, true, true, true)],
        );
        assert_eq!(
            report.outcome,
            WindowOutcome::ReactedInTime {
                trigger_at: 10,
                reaction_at: 10,
                latency_us: 0
            }
        );
    }

    #[test]
    fn test_no_precondition() {
        let report = WindowMonitor::run(100, [input(0, false, true, true)]);
        assert_eq!(report.outcome, WindowOutcome::PreconditionNeverMet);
    }

    #[test]
    fn test_no_trigger() {
        let report = WindowMonitor::run(
            100,
            [input(0, true, false, false), input(10, true, false, false)],
        );
        assert_eq!(report.outcome, WindowOutcome::TriggerNeverFired);
    }

    #[test]
    fn test_precondition_drop_disarms() {
        let mut monitor = WindowMonitor::new(100);
        monitor.step(input(0, true, false, false));
        assert_eq!(monitor.state(), MonitorState::ArmedPrecondition);
        monitor.step(input(10, false, true, false));
        assert_eq!(monitor.state(), MonitorState::Idle);
        assert_eq!(monitor.finish().outcome, WindowOutcome::TriggerNeverFired);
    }

    #[test]
    fn test_trigger_at_last_sample() {
        let report = WindowMonitor::run(
            100,
            [input(0, true, false, false), input(10, true, true, false)],
        );
        assert_eq!(
            report.outcome,
            WindowOutcome::RecordingEndedBeforeDeadline {
                trigger_at: 10,
                deadline: 110,
                last_sample: 10
            }
        );
    }

    #[test]
    fn test_extra_triggers_counted() {
        let report = WindowMonitor::run(
            100,
            [
                input(0, true, false, false),
                input(5, true, true, true),
                input(10, true, false, false),
                input(20, true, true, false),
                input(30, true, true, false),
                input(40, true, false, false),
                input(50, true, true, false),
            ],
        );
        assert!(matches!(report.outcome, WindowOutcome::ReactedInTime { .. }));
        assert_eq!(report.extra_triggers, 2);
    }

    #[test]
    fn test_state_progression() {
        let mut monitor = WindowMonitor::new(100);
        assert_eq!(monitor.step(input(0, true, false, false)), MonitorState::ArmedPrecondition);
        assert_eq!(
            monitor.step(input(10, true, true, false)),
            MonitorState::Triggered {
                trigger_at: 10,
                deadline: 110
            }
        );
        assert_eq!(
            monitor.step(input(20, true, true, false)),
            MonitorState::WithinDeadline {
                trigger_at: 10,
                deadline: 110
            }
        );
    }

    #[test]
    fn test_trigger_high_on_first_sample_does_not_fire() {
        let report = WindowMonitor::run(
            100,
            [input(0, true, true, false), input(10, true, true, true)],
        );
        assert_eq!(report.outcome, WindowOutcome::TriggerActiveWhenArmed { armed_at: 0 });
        assert_eq!(report.outcome.trigger_at(), None);
    }

    #[test]
    fn test_trigger_latched_before_precondition() {
        // Fault rises at 10 while the precondition is false and stays high
        let report = WindowMonitor::run(
            100,
            [
                input(0, false, false, false),
                input(10, false, true, false),
                input(20, true, true, false),
                input(30, true, true, true),
            ],
        );
        assert_eq!(report.outcome, WindowOutcome::TriggerActiveWhenArmed { armed_at: 20 });
    }

    #[test]
    fn test_latched_trigger_rising_again_fires() {
        let report = WindowMonitor::run(
            100,
            [
                input(0, false, true, false),
                input(10, true, true, false),
                input(20, true, false, false),
                input(30, true, true, false),
                input(80, true, true, true),
            ],
        );
        assert_eq!(
            report.outcome,
            WindowOutcome::ReactedInTime {
                trigger_at: 30,
                reaction_at: 80,
                latency_us: 50
            }
        );
        assert_eq!(report.outcome.trigger_at(), Some(30));
    }

    #[test]
    fn test_first_transition_to() {
        let values = [3.0, 5.0, 5.0, 2.0, 5.0];
        assert_eq!(first_transition_to(&values, 5.0), Some(1));
        assert_eq!(first_transition_to(&values, 7.0), None);
        assert_eq!(first_transition_to(&[5.0, 5.0], 5.0), Some(0));
    }

    #[test]
    fn test_window_after() {
        let ts = [0, 10, 20, 30, 40];
        assert_eq!(window_after(&ts, 1, 20), 1..4);
        assert_eq!(window_after(&ts, 4, 100), 4..5);
        assert_eq!(window_after(&ts, 9, 100), 5..5);
    }

    #[test]
    fn test_skip_leading() {
        assert_eq!(skip_leading(10, 3), Some(3..10));
        assert_eq!(skip_leading(3, 3), None);
        assert_eq!(skip_leading(0, 0), None);
    }

    #[test]
    fn test_first_index() {
        assert_eq!(first_index(&[1.0, 4.0, 9.0], |v| v > 3.0), Some(1));
    }
}
