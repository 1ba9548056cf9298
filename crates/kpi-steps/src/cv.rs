//! Computer Vision Detections
//!
//! Detection confidences, keypoint placement and bounding box agreement with
//! side-loaded ground truth.

use crate::common::{check_figure, describe_outcome, geometry_error, summary_table, SummaryRow};
use kpi_core::{
    scan_masked, Bound, CheckOutcome, EvalError, EvaluationResult, RangeCheck, StepContext,
    TestStep, Verdict,
};
use kpi_geometry::Polygon;
use serde::{Deserialize, Serialize};
use signal_frame::{Camera, KeypointColumns, SignalKey, SignalKind, Timestamp};
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_DETECTIONS: u16 = 4;
pub const DEFAULT_KEYPOINTS: u16 = 8;
pub const DEFAULT_IMAGE_WIDTH: f64 = 1280.0;
pub const DEFAULT_IMAGE_HEIGHT: f64 = 960.0;
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.5;

const _: () = assert!(DEFAULT_DETECTIONS > 0 && DEFAULT_KEYPOINTS > 0);
const _: () = assert!(DEFAULT_IOU_THRESHOLD > 0.0 && DEFAULT_IOU_THRESHOLD <= 1.0);

/// Computer vision evaluation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CvConfig {
    /// Detection slots evaluated per camera
    pub detections: u16,
    /// Keypoints evaluated per camera
    pub keypoints: u16,
    pub image_width: f64,
    pub image_height: f64,
    /// Minimum IoU against ground truth boxes
    pub iou_threshold: f64,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            detections: DEFAULT_DETECTIONS,
            keypoints: DEFAULT_KEYPOINTS,
            image_width: DEFAULT_IMAGE_WIDTH,
            image_height: DEFAULT_IMAGE_HEIGHT,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }
}

/// Confidence of every reported detection lies in [0, 1]
pub struct CvConfidenceStep {
    config: CvConfig,
}

impl CvConfidenceStep {
    pub fn new(config: CvConfig) -> Self {
        Self { config }
    }
}

impl TestStep for CvConfidenceStep {
    fn id(&self) -> &str {
        "cv_confidence"
    }

    fn description(&self) -> &str {
        "Detection confidences lie in [0, 1]"
    }

    fn required_signals(&self) -> Vec<SignalKey> {
        Camera::ALL
            .into_iter()
            .flat_map(|camera| {
                (0..self.config.detections).map(move |idx| {
                    SignalKey::detection(SignalKind::DetectionConfidence, camera, idx)
                })
            })
            .collect()
    }

    fn evaluate(&self, ctx: &StepContext<'_>) -> Result<EvaluationResult, EvalError> {
        let timestamps = ctx.frame()?.timestamps();
        let check = RangeCheck::closed(0.0, 1.0);
        let requirement = check.to_string();

        let mut rows = Vec::new();
        let mut figures = Vec::new();
        let mut total = CheckOutcome::default();

        for camera in Camera::ALL {
            let mut camera_outcome = CheckOutcome::default();
            let mut series = Vec::with_capacity(self.config.detections as usize);
            for idx in 0..self.config.detections {
                let key = SignalKey::detection(SignalKind::DetectionConfidence, camera, idx);
                let values = ctx.scalar(&key)?;
                // NaN marks an empty detection slot
                let mask: Vec<bool> = values.iter().map(|v| !v.is_nan()).collect();
                camera_outcome.merge(&scan_masked(timestamps, values, &mask, &check));
                series.push((format!("Detection {}", idx), values));
            }
            debug!("CV confidence {} camera: {}", camera, camera_outcome.verdict());

            let subject = format!("{} detection confidence", camera);
            rows.push(SummaryRow::new(
                camera.to_string(),
                camera_outcome.verdict(),
                describe_outcome(&subject, &requirement, &camera_outcome),
            ));
            let named: Vec<(&str, &[f64])> = series
                .iter()
                .map(|(name, v)| (name.as_str(), *v))
                .collect();
            figures.push(check_figure(
                &format!("Detection confidence {} camera", camera),
                "Confidence [-]",
                timestamps,
                &named,
                None,
                &camera_outcome,
            ));
            total.merge(&camera_outcome);
        }

        let verdict = Verdict::aggregate(rows.iter().map(|row| row.verdict));
        let explanation = describe_outcome("detection confidence", &requirement, &total);
        let mut result = EvaluationResult::new(verdict, explanation)
            .with_table(summary_table("Detection confidence per camera", "Camera", &rows)?)
            .with_metadata("violations", total.violations);
        for figure in figures {
            result = result.with_figure(figure);
        }
        Ok(result)
    }
}

/// Reported keypoints lie inside the image
pub struct CvKeypointStep {
    config: CvConfig,
}

impl CvKeypointStep {
    pub fn new(config: CvConfig) -> Self {
        Self { config }
    }

    fn bounds(&self) -> (RangeCheck, RangeCheck) {
        let half_open = |limit: f64| RangeCheck {
            lower: Bound::Inclusive(0.0),
            upper: Bound::Exclusive(limit),
        };
        (half_open(self.config.image_width), half_open(self.config.image_height))
    }
}

impl TestStep for CvKeypointStep {
    fn id(&self) -> &str {
        "cv_keypoints"
    }

    fn description(&self) -> &str {
        "Keypoints lie within the image bounds"
    }

    fn required_signals(&self) -> Vec<SignalKey> {
        Camera::ALL
            .into_iter()
            .flat_map(|camera| {
                (0..self.config.keypoints).flat_map(move |idx| {
                    [
                        SignalKey::detection(SignalKind::KeypointX, camera, idx),
                        SignalKey::detection(SignalKind::KeypointY, camera, idx),
                    ]
                })
            })
            .collect()
    }

    fn evaluate(&self, ctx: &StepContext<'_>) -> Result<EvaluationResult, EvalError> {
        let frame = ctx.frame()?;
        let (x_range, y_range) = self.bounds();
        let requirement = format!("x in {}, y in {}", x_range, y_range);

        let mut rows = Vec::new();
        let mut total = CheckOutcome::default();
        for camera in Camera::ALL {
            let columns =
                KeypointColumns::resolve(frame, ctx.schema, camera, self.config.keypoints)?;
            let mut outcome = CheckOutcome::default();
            for (sample, &timestamp) in frame.timestamps().iter().enumerate() {
                for keypoint in columns.at(sample) {
                    let (value, passed) = if !x_range.contains(keypoint.x) {
                        (keypoint.x, false)
                    } else if !y_range.contains(keypoint.y) {
                        (keypoint.y, false)
                    } else {
                        (keypoint.x, true)
                    };
                    outcome.record(sample, timestamp, value, passed);
                }
            }
            rows.push(SummaryRow::new(
                camera.to_string(),
                outcome.verdict(),
                describe_outcome(&format!("{} keypoint", camera), &requirement, &outcome),
            ));
            total.merge(&outcome);
        }

        let verdict = Verdict::aggregate(rows.iter().map(|row| row.verdict));
        Ok(EvaluationResult::new(verdict, describe_outcome("keypoint", &requirement, &total))
            .with_table(summary_table("Keypoint placement per camera", "Camera", &rows)?)
            .with_metadata("keypoints_checked", total.evaluated))
    }
}

/// Ground truth bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthBox {
    pub timestamp: Timestamp,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Side-loaded ground truth of one camera detection slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub camera: Camera,
    #[serde(default)]
    pub detection: u16,
    #[serde(default)]
    pub boxes: Vec<GroundTruthBox>,
}

impl GroundTruth {
    pub fn from_json(json: &str) -> Result<Self, EvalError> {
        serde_json::from_str(json)
            .map_err(|e| EvalError::InvalidData(format!("ground truth: {}", e)))
    }

    /// Load ground truth from a JSON file
    pub fn load(path: &Path) -> Result<Self, EvalError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| {
                EvalError::InvalidData(format!("ground truth {}: {}", path.display(), e))
            })?;
        let truth = Self::from_json(&contents)?;
        info!("Loaded {} ground truth boxes from {}", truth.boxes.len(), path.display());
        Ok(truth)
    }
}

/// Detections match ground truth boxes by IoU
pub struct CvGroundTruthStep {
    config: CvConfig,
    truth: GroundTruth,
}

impl CvGroundTruthStep {
    pub fn new(config: CvConfig, truth: GroundTruth) -> Self {
        Self { config, truth }
    }

    fn key(&self, kind: SignalKind) -> SignalKey {
        SignalKey::detection(kind, self.truth.camera, self.truth.detection)
    }
}

impl TestStep for CvGroundTruthStep {
    fn id(&self) -> &str {
        "cv_ground_truth"
    }

    fn description(&self) -> &str {
        "Detected bounding boxes overlap the ground truth boxes"
    }

    fn required_signals(&self) -> Vec<SignalKey> {
        [SignalKind::BboxX, SignalKind::BboxY, SignalKind::BboxWidth, SignalKind::BboxHeight]
            .into_iter()
            .map(|kind| self.key(kind))
            .collect()
    }

    fn evaluate(&self, ctx: &StepContext<'_>) -> Result<EvaluationResult, EvalError> {
        if self.truth.boxes.is_empty() {
            return Ok(EvaluationResult::not_assessed("Ground truth holds no boxes"));
        }

        let frame = ctx.frame()?;
        let xs = ctx.scalar(&self.key(SignalKind::BboxX))?;
        let ys = ctx.scalar(&self.key(SignalKind::BboxY))?;
        let widths = ctx.scalar(&self.key(SignalKind::BboxWidth))?;
        let heights = ctx.scalar(&self.key(SignalKind::BboxHeight))?;
        let threshold = self.config.iou_threshold;

        let mut outcome = CheckOutcome::default();
        let mut gt_times = Vec::with_capacity(self.truth.boxes.len());
        let mut ious = Vec::with_capacity(self.truth.boxes.len());
        let mut skipped = 0usize;

        for gt in &self.truth.boxes {
            let Some(sample) = frame.index_at_or_after(gt.timestamp) else {
                skipped += 1;
                continue;
            };
            let truth = Polygon::rect(gt.x, gt.y, gt.width, gt.height).map_err(geometry_error)?;
            // A missing or malformed detection overlaps nothing
            let iou = Polygon::rect(xs[sample], ys[sample], widths[sample], heights[sample])
                .map(|detected| detected.iou(&truth))
                .unwrap_or(0.0);
            outcome.record(sample, gt.timestamp, iou, iou >= threshold);
            gt_times.push(gt.timestamp);
            ious.push(iou);
        }

        let requirement = format!("IoU >= {}", threshold);
        let signal = format!("{} camera detection {}", self.truth.camera, self.truth.detection);
        let explanation = describe_outcome(&signal, &requirement, &outcome);
        let mut result = EvaluationResult::new(outcome.verdict(), explanation)
            .with_figure(check_figure(
                &format!("IoU {}", signal),
                "IoU [-]",
                &gt_times,
                &[("IoU", ious.as_slice())],
                Some(threshold),
                &outcome,
            ))
            .with_metadata("boxes_evaluated", outcome.evaluated);
        if skipped > 0 {
            result = result.with_remark(format!(
                "{} ground truth boxes after the last sample were skipped",
                skipped
            ));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kpi_core::run_step;
    use signal_frame::{Recording, SignalFrame, SignalSchema};

    fn small_config() -> CvConfig {
        CvConfig {
            detections: 1,
            keypoints: 1,
            image_width: 100.0,
            image_height: 50.0,
            ..CvConfig::default()
        }
    }

    fn with_all_cameras(
        mut frame: SignalFrame,
        schema: &SignalSchema,
        key: impl Fn(Camera) -> SignalKey,
        values: impl Fn(Camera) -> Vec<f64>,
    ) -> SignalFrame {
        for camera in Camera::ALL {
            let name = schema.lookup(&key(camera)).unwrap();
            frame = frame.with_scalar(name, values(camera)).unwrap();
        }
        frame
    }

    fn evaluate(
        step: &dyn TestStep,
        frame: SignalFrame,
        schema: &SignalSchema,
    ) -> EvaluationResult {
        let recording = Recording::single("rec", "MTS", frame);
        let ctx = StepContext {
            recording_name: "rec",
            reader: &recording,
            schema,
            alias: "MTS",
        };
        run_step(step, &ctx)
    }

    #[test]
    fn test_confidence_nan_is_skipped() {
        let schema = SignalSchema::default_parking();
        let frame = with_all_cameras(
            SignalFrame::new(vec![0, 10, 20]).unwrap(),
            &schema,
            |camera| SignalKey::detection(SignalKind::DetectionConfidence, camera, 0),
            |_| vec![0.0, f64::NAN, 1.0],
        );
        let result = evaluate(&CvConfidenceStep::new(small_config()), frame, &schema);
        assert_eq!(result.verdict, Verdict::Pass);
        assert_eq!(result.metadata["violations"], 0);
    }

    #[test]
    fn test_confidence_out_of_range_fails() {
        let schema = SignalSchema::default_parking();
        let frame = with_all_cameras(
            SignalFrame::new(vec![0, 1_000_000]).unwrap(),
            &schema,
            |camera| SignalKey::detection(SignalKind::DetectionConfidence, camera, 0),
            |camera| if camera == Camera::Rear { vec![0.5, 1.2] } else { vec![0.5, 0.5] },
        );
        let result = evaluate(&CvConfidenceStep::new(small_config()), frame, &schema);
        assert_eq!(result.verdict, Verdict::Fail);
        assert!(result.explanation.contains("1.2 at t = 1.000000 s"));
    }

    #[test]
    fn test_all_nan_confidence_not_assessed() {
        let schema = SignalSchema::default_parking();
        let frame = with_all_cameras(
            SignalFrame::new(vec![0]).unwrap(),
            &schema,
            |camera| SignalKey::detection(SignalKind::DetectionConfidence, camera, 0),
            |_| vec![f64::NAN],
        );
        let result = evaluate(&CvConfidenceStep::new(small_config()), frame, &schema);
        assert_eq!(result.verdict, Verdict::NotAssessed);
    }

    #[test]
    fn test_keypoint_on_right_edge_fails() {
        let schema = SignalSchema::default_parking();
        let frame = with_all_cameras(
            SignalFrame::new(vec![0, 10]).unwrap(),
            &schema,
            |camera| SignalKey::detection(SignalKind::KeypointX, camera, 0),
            |camera| if camera == Camera::Left { vec![0.0, 100.0] } else { vec![0.0, 99.9] },
        );
        let frame = with_all_cameras(
            frame,
            &schema,
            |camera| SignalKey::detection(SignalKind::KeypointY, camera, 0),
            |_| vec![0.0, 49.9],
        );
        let result = evaluate(&CvKeypointStep::new(small_config()), frame, &schema);
        assert_eq!(result.verdict, Verdict::Fail);
        assert!(result.explanation.contains("= 100 at"));
    }

    #[test]
    fn test_missing_keypoint_column_is_input_missing() {
        let schema = SignalSchema::default_parking();
        let frame = with_all_cameras(
            SignalFrame::new(vec![0]).unwrap(),
            &schema,
            |camera| SignalKey::detection(SignalKind::KeypointX, camera, 0),
            |_| vec![1.0],
        );
        let result = evaluate(&CvKeypointStep::new(small_config()), frame, &schema);
        assert_eq!(result.verdict, Verdict::InputMissing);
    }

    fn bbox_frame(schema: &SignalSchema, x: Vec<f64>) -> SignalFrame {
        let n = x.len();
        sized_bbox_frame(schema, x, vec![10.0; n])
    }

    fn sized_bbox_frame(schema: &SignalSchema, x: Vec<f64>, width: Vec<f64>) -> SignalFrame {
        let key = |kind| schema.lookup(&SignalKey::detection(kind, Camera::Front, 0)).unwrap();
        let n = x.len();
        let ts = (0..n as u64).map(|i| i * 100_000).collect();
        SignalFrame::new(ts)
            .unwrap()
            .with_scalar(key(SignalKind::BboxX), x)
            .unwrap()
            .with_scalar(key(SignalKind::BboxY), vec![0.0; n])
            .unwrap()
            .with_scalar(key(SignalKind::BboxWidth), width)
            .unwrap()
            .with_scalar(key(SignalKind::BboxHeight), vec![10.0; n])
            .unwrap()
    }

    fn truth(timestamps: &[Timestamp]) -> GroundTruth {
        GroundTruth {
            camera: Camera::Front,
            detection: 0,
            boxes: timestamps
                .iter()
                .map(|&timestamp| GroundTruthBox {
                    timestamp,
                    x: 0.0,
                    y: 0.0,
                    width: 10.0,
                    height: 10.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_ground_truth_uses_sample_at_or_after() {
        let schema = SignalSchema::default_parking();
        // IoU 1 at 0 s, 1/3 at 0.1 s, 1 at 0.2 s
        let frame = bbox_frame(&schema, vec![0.0, 5.0, 0.0]);

        let step = CvGroundTruthStep::new(small_config(), truth(&[0, 150_000]));
        let pass = evaluate(&step, frame.clone(), &schema);
        assert_eq!(pass.verdict, Verdict::Pass);

        let step = CvGroundTruthStep::new(small_config(), truth(&[50_000]));
        let fail = evaluate(&step, frame, &schema);
        assert_eq!(fail.verdict, Verdict::Fail);
        assert!(fail.explanation.contains("t = 0.050000 s"));
    }

    #[test]
    fn test_iou_equal_to_threshold_passes() {
        let schema = SignalSchema::default_parking();
        // Half of the ground truth box is detected: IoU 50 / 100 against a 0.5 threshold
        let frame = sized_bbox_frame(&schema, vec![0.0, 0.0], vec![5.0, 4.9]);

        let step = CvGroundTruthStep::new(small_config(), truth(&[0]));
        let at = evaluate(&step, frame.clone(), &schema);
        assert_eq!(small_config().iou_threshold, 0.5);
        assert_eq!(at.verdict, Verdict::Pass);

        let step = CvGroundTruthStep::new(small_config(), truth(&[100_000]));
        let below = evaluate(&step, frame, &schema);
        assert_eq!(below.verdict, Verdict::Fail);
    }

    #[test]
    fn test_empty_ground_truth_not_assessed() {
        let schema = SignalSchema::default_parking();
        let frame = bbox_frame(&schema, vec![0.0]);
        let result = evaluate(&CvGroundTruthStep::new(small_config(), truth(&[])), frame, &schema);
        assert_eq!(result.verdict, Verdict::NotAssessed);
    }

    #[test]
    fn test_missing_detection_has_zero_iou() {
        let schema = SignalSchema::default_parking();
        let frame = bbox_frame(&schema, vec![f64::NAN]);
        let result = evaluate(&CvGroundTruthStep::new(small_config(), truth(&[0])), frame, &schema);
        assert_eq!(result.verdict, Verdict::Fail);
    }

    #[test]
    fn test_ground_truth_json() {
        let truth = GroundTruth::from_json(
            r#"{
                "camera": "front",
                "boxes": [ { "timestamp": 5, "x": 1, "y": 2, "width": 3, "height": 4 } ]
            }"#,
        )
        .unwrap();
        assert_eq!(truth.detection, 0);
        assert_eq!(truth.boxes[0].height, 4.0);
        assert!(GroundTruth::from_json("{}").is_err());
    }
}
