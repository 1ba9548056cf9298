//! Low Speed Collision Avoidance
//!
//! While LSCA requests braking, the ego box shrunk by the lead/lag margins
//! must keep a minimum distance to the object box.

use crate::common::{check_figure, describe_outcome, geometry_error};
use kpi_core::{scan_masked, EvalError, EvaluationResult, RangeCheck, StepContext, TestStep};
use kpi_geometry::{OrientedBox, Point2};
use serde::{Deserialize, Serialize};
use signal_frame::{ColumnStats, SignalKey, SignalKind};
use tracing::debug;

pub const DEFAULT_MIN_DISTANCE_M: f64 = 0.2;
pub const DEFAULT_EGO_LENGTH_M: f64 = 4.8;
pub const DEFAULT_EGO_WIDTH_M: f64 = 1.9;
/// Rear bumper to rear axle, the odometry reference point
pub const DEFAULT_REAR_OVERHANG_M: f64 = 1.0;

const _: () = assert!(DEFAULT_REAR_OVERHANG_M < DEFAULT_EGO_LENGTH_M);
const _: () = assert!(DEFAULT_MIN_DISTANCE_M >= 0.0);

/// LSCA braking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LscaConfig {
    /// Distance at or above this passes
    pub min_distance_m: f64,
    pub ego_length_m: f64,
    pub ego_width_m: f64,
    pub rear_overhang_m: f64,
    /// Front edge moved back by this margin
    pub lead_margin_m: f64,
    /// Rear edge moved forward by this margin
    pub lag_margin_m: f64,
    /// Each side moved inward by this margin
    pub lateral_margin_m: f64,
}

impl Default for LscaConfig {
    fn default() -> Self {
        Self {
            min_distance_m: DEFAULT_MIN_DISTANCE_M,
            ego_length_m: DEFAULT_EGO_LENGTH_M,
            ego_width_m: DEFAULT_EGO_WIDTH_M,
            rear_overhang_m: DEFAULT_REAR_OVERHANG_M,
            lead_margin_m: 0.0,
            lag_margin_m: 0.0,
            lateral_margin_m: 0.0,
        }
    }
}

const REQUIRED: [SignalKind; 9] = [
    SignalKind::LscaBrakeRequest,
    SignalKind::OdoX,
    SignalKind::OdoY,
    SignalKind::OdoYaw,
    SignalKind::ObjectX,
    SignalKind::ObjectY,
    SignalKind::ObjectYaw,
    SignalKind::ObjectLength,
    SignalKind::ObjectWidth,
];

/// Ego keeps the minimum distance to the object while braking is requested
pub struct LscaBrakingStep {
    config: LscaConfig,
}

impl LscaBrakingStep {
    pub fn new(config: LscaConfig) -> Self {
        Self { config }
    }

    fn ego_box(&self, x: f64, y: f64, yaw: f64) -> Result<OrientedBox, EvalError> {
        OrientedBox::from_reference(
            Point2::new(x, y),
            yaw,
            self.config.ego_length_m,
            self.config.ego_width_m,
            self.config.rear_overhang_m,
        )
        .shrink(
            self.config.lead_margin_m,
            self.config.lag_margin_m,
            self.config.lateral_margin_m,
        )
        .map_err(geometry_error)
    }
}

impl TestStep for LscaBrakingStep {
    fn id(&self) -> &str {
        "lsca_braking"
    }

    fn description(&self) -> &str {
        "Ego keeps the minimum distance to the object while LSCA requests braking"
    }

    fn required_signals(&self) -> Vec<SignalKey> {
        REQUIRED.into_iter().map(SignalKey::vehicle).collect()
    }

    fn evaluate(&self, ctx: &StepContext<'_>) -> Result<EvaluationResult, EvalError> {
        let timestamps = ctx.frame()?.timestamps();
        let signal = |kind| ctx.scalar(&SignalKey::vehicle(kind));
        let brake = signal(SignalKind::LscaBrakeRequest)?;
        let (odo_x, odo_y, odo_yaw) = (
            signal(SignalKind::OdoX)?,
            signal(SignalKind::OdoY)?,
            signal(SignalKind::OdoYaw)?,
        );
        let (obj_x, obj_y, obj_yaw) = (
            signal(SignalKind::ObjectX)?,
            signal(SignalKind::ObjectY)?,
            signal(SignalKind::ObjectYaw)?,
        );
        let (obj_len, obj_wid) = (
            signal(SignalKind::ObjectLength)?,
            signal(SignalKind::ObjectWidth)?,
        );

        let active: Vec<bool> = brake.iter().map(|&b| b.is_finite() && b != 0.0).collect();
        if !active.contains(&true) {
            return Ok(EvaluationResult::not_assessed("LSCA never requested braking"));
        }

        let mut distances = vec![f64::NAN; timestamps.len()];
        for (i, distance) in distances.iter_mut().enumerate() {
            if !active[i] {
                continue;
            }
            let pose = [
                odo_x[i], odo_y[i], odo_yaw[i], obj_x[i], obj_y[i], obj_yaw[i], obj_len[i],
                obj_wid[i],
            ];
            // Unknown geometry stays NaN and counts as a violation
            if !pose.iter().all(|v| v.is_finite()) {
                continue;
            }
            let ego = self.ego_box(odo_x[i], odo_y[i], odo_yaw[i])?;
            let object = OrientedBox::new(
                Point2::new(obj_x[i], obj_y[i]),
                obj_yaw[i],
                obj_len[i],
                obj_wid[i],
            );
            *distance = ego.distance_to(&object).map_err(geometry_error)?;
        }

        let check = RangeCheck::at_least(self.config.min_distance_m);
        let outcome = scan_masked(timestamps, &distances, &active, &check);
        let stats = ColumnStats::compute(
            &distances.iter().zip(&active).filter(|(_, &a)| a).map(|(&d, _)| d).collect::<Vec<_>>(),
        );
        debug!(
            "LSCA braking: {} active samples, min distance {:.3} m",
            outcome.evaluated, stats.min
        );

        let requirement = format!("distance {} m", check);
        let stats = serde_json::to_value(stats).map_err(|e| EvalError::Report(e.to_string()))?;
        let explanation = describe_outcome("ego-object distance", &requirement, &outcome);
        Ok(EvaluationResult::new(outcome.verdict(), explanation)
            .with_figure(check_figure(
                "Ego to object distance during braking",
                "Distance [m]",
                timestamps,
                &[("Distance", distances.as_slice()), ("Brake request", brake)],
                Some(self.config.min_distance_m),
                &outcome,
            ))
            .with_metadata("braking_samples", outcome.evaluated)
            .with_metadata("distance_stats", stats))
    }
}
