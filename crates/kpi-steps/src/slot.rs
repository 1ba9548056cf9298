//! Parking Slot Detection

use crate::common::{check_figure, describe_outcome};
use kpi_core::{scan_masked, EvalError, EvaluationResult, RangeCheck, StepContext, TestStep};
use kpi_geometry::{Point2, Polygon};
use serde::{Deserialize, Serialize};
use signal_frame::{usable_mask, SignalKey, SignalKind};

pub const DEFAULT_IOU_THRESHOLD: f64 = 0.7;
pub const DEFAULT_CORNERS: u16 = 4;

const _: () = assert!(DEFAULT_CORNERS >= 3);

/// Slot detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotConfig {
    pub iou_threshold: f64,
    pub corners: u16,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            corners: DEFAULT_CORNERS,
        }
    }
}

/// Detected slot overlaps the ground truth slot wherever the status is valid
pub struct SlotDetectionStep {
    config: SlotConfig,
}

impl SlotDetectionStep {
    pub fn new(config: SlotConfig) -> Self {
        Self { config }
    }

    fn corner_keys(
        &self,
        x: SignalKind,
        y: SignalKind,
    ) -> impl Iterator<Item = (SignalKey, SignalKey)> {
        (0..self.config.corners)
            .map(move |idx| (SignalKey::indexed(x, idx), SignalKey::indexed(y, idx)))
    }

    fn corners<'a>(
        &self,
        ctx: &StepContext<'a>,
        x: SignalKind,
        y: SignalKind,
    ) -> Result<Vec<(&'a [f64], &'a [f64])>, EvalError> {
        self.corner_keys(x, y)
            .map(|(kx, ky)| -> Result<_, EvalError> { Ok((ctx.scalar(&kx)?, ctx.scalar(&ky)?)) })
            .collect()
    }
}

/// Polygon of one sample, `None` if a corner is missing
fn polygon_at(corners: &[(&[f64], &[f64])], sample: usize) -> Option<Polygon> {
    let vertices = corners.iter().map(|(xs, ys)| Point2::new(xs[sample], ys[sample])).collect();
    Polygon::new(vertices).ok()
}

impl TestStep for SlotDetectionStep {
    fn id(&self) -> &str {
        "slot_detection"
    }

    fn description(&self) -> &str {
        "Detected parking slot matches the ground truth slot"
    }

    fn required_signals(&self) -> Vec<SignalKey> {
        let mut keys = vec![SignalKey::vehicle(SignalKind::SlotStatus)];
        for (x, y) in self
            .corner_keys(SignalKind::SlotCornerX, SignalKind::SlotCornerY)
            .chain(self.corner_keys(SignalKind::SlotGtCornerX, SignalKind::SlotGtCornerY))
        {
            keys.push(x);
            keys.push(y);
        }
        keys
    }

    fn evaluate(&self, ctx: &StepContext<'_>) -> Result<EvaluationResult, EvalError> {
        let timestamps = ctx.frame()?.timestamps();
        let status = ctx.scalar(&SignalKey::vehicle(SignalKind::SlotStatus))?;
        let detected = self.corners(ctx, SignalKind::SlotCornerX, SignalKind::SlotCornerY)?;
        let truth = self.corners(ctx, SignalKind::SlotGtCornerX, SignalKind::SlotGtCornerY)?;

        let mask = usable_mask(status);
        let ious: Vec<f64> = (0..timestamps.len())
            .map(|sample| {
                if !mask[sample] {
                    return f64::NAN;
                }
                match (polygon_at(&detected, sample), polygon_at(&truth, sample)) {
                    (Some(d), Some(t)) => d.iou(&t),
                    _ => f64::NAN,
                }
            })
            .collect();

        let check = RangeCheck::at_least(self.config.iou_threshold);
        let outcome = scan_masked(timestamps, &ious, &mask, &check);
        let explanation = describe_outcome("slot IoU", &check.to_string(), &outcome);
        Ok(EvaluationResult::new(outcome.verdict(), explanation)
            .with_figure(check_figure(
                "Slot IoU",
                "IoU [-]",
                timestamps,
                &[("IoU", ious.as_slice())],
                Some(self.config.iou_threshold),
                &outcome,
            ))
            .with_metadata("valid_samples", outcome.evaluated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kpi_core::{run_step, Verdict};
    use signal_frame::{Recording, SignalFrame, SignalSchema};

    const SQUARE: [(f64, f64); 4] = [(0.0, 0.0), (2.0, 0.0), (2.0, 5.0), (0.0, 5.0)];

    fn recording(status: Vec<f64>, detected_shift: Vec<f64>) -> Recording {
        let detected: Vec<[(f64, f64); 4]> = detected_shift
            .iter()
            .map(|shift| SQUARE.map(|(x, y)| (x + shift, y)))
            .collect();
        recording_with(status, &detected)
    }

    /// One detected polygon per sample against the fixed ground truth slot
    fn recording_with(status: Vec<f64>, detected: &[[(f64, f64); 4]]) -> Recording {
        let schema = SignalSchema::default_parking();
        let n = status.len();
        let ts: Vec<u64> = (0..n as u64).map(|i| i * 100_000).collect();
        let name = |key| schema.lookup(&key).unwrap().to_string();
        let mut frame = SignalFrame::new(ts)
            .unwrap()
            .with_scalar(name(SignalKey::vehicle(SignalKind::SlotStatus)), status)
            .unwrap();
        for (idx, (x, y)) in SQUARE.iter().enumerate() {
            let corner_x: Vec<f64> = detected.iter().map(|polygon| polygon[idx].0).collect();
            let corner_y: Vec<f64> = detected.iter().map(|polygon| polygon[idx].1).collect();
            let idx = idx as u16;
            frame = frame
                .with_scalar(name(SignalKey::indexed(SignalKind::SlotCornerX, idx)), corner_x)
                .unwrap()
                .with_scalar(name(SignalKey::indexed(SignalKind::SlotCornerY, idx)), corner_y)
                .unwrap()
                .with_scalar(name(SignalKey::indexed(SignalKind::SlotGtCornerX, idx)), vec![*x; n])
                .unwrap()
                .with_scalar(name(SignalKey::indexed(SignalKind::SlotGtCornerY, idx)), vec![*y; n])
                .unwrap();
        }
        Recording::single("rec", "MTS", frame)
    }

    fn evaluate(recording: &Recording) -> EvaluationResult {
        let schema = SignalSchema::default_parking();
        let ctx = StepContext {
            recording_name: "rec",
            reader: recording,
            schema: &schema,
            alias: "MTS",
        };
        run_step(&SlotDetectionStep::new(SlotConfig::default()), &ctx)
    }

    #[test]
    fn test_matching_slot_passes() {
        let result = evaluate(&recording(vec![1.0, 1.0], vec![0.0, 0.2]));
        assert_eq!(result.verdict, Verdict::Pass);
    }

    #[test]
    fn test_invalid_status_samples_are_skipped() {
        // Shift of 1 m gives IoU 1/3 but the status is Invalid there
        let result = evaluate(&recording(vec![1.0, 2.0, 0.0], vec![0.0, 1.0, 1.0]));
        assert_eq!(result.verdict, Verdict::Pass);
        assert_eq!(result.metadata["valid_samples"], 1);
    }

    #[test]
    fn test_iou_equal_to_threshold_passes() {
        // Detected slot covers 7 of the 10 m2 ground truth: IoU 0.7, then 0.68
        let at = [(0.0, 0.0), (2.0, 0.0), (2.0, 3.5), (0.0, 3.5)];
        let below = [(0.0, 0.0), (2.0, 0.0), (2.0, 3.4), (0.0, 3.4)];
        let result = evaluate(&recording_with(vec![1.0], &[at]));
        assert_eq!(result.verdict, Verdict::Pass);

        let result = evaluate(&recording_with(vec![1.0, 1.0], &[at, below]));
        assert_eq!(result.verdict, Verdict::Fail);
        assert!(result.explanation.contains("t = 0.100000 s"));
    }

    #[test]
    fn test_shifted_slot_fails() {
        let result = evaluate(&recording(vec![1.0, 1.0], vec![0.0, 1.0]));
        assert_eq!(result.verdict, Verdict::Fail);
        assert!(result.explanation.contains("t = 0.100000 s"));
    }

    #[test]
    fn test_no_valid_status_not_assessed() {
        let result = evaluate(&recording(vec![0.0, 2.0], vec![0.0, 0.0]));
        assert_eq!(result.verdict, Verdict::NotAssessed);
    }

    #[test]
    fn test_missing_corner_while_valid_fails() {
        let result = evaluate(&recording(vec![1.0], vec![f64::NAN]));
        assert_eq!(result.verdict, Verdict::Fail);
    }
}
