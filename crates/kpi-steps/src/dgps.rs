//! DGPS Position Accuracy
//!
//! DGPS positions are converted to a local ENU frame anchored at the first
//! finite sample and expressed in the vehicle frame at that sample. Odometry
//! displacements are rotated by the initial odometry yaw into the same frame.

use crate::common::{check_figure, describe_outcome, geometry_error};
use kpi_core::{scan_masked, EvalError, EvaluationResult, RangeCheck, StepContext, TestStep};
use kpi_geometry::{enu_to_vehicle, Geodetic, LocalFrame, Point2};
use serde::{Deserialize, Serialize};
use signal_frame::{ColumnStats, SignalKey, SignalKind};
use tracing::debug;

pub const DEFAULT_MAX_ERROR_M: f64 = 0.5;

const _: () = assert!(DEFAULT_MAX_ERROR_M > 0.0);

/// DGPS accuracy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DgpsConfig {
    /// Position error at or below this passes
    pub max_error_m: f64,
    /// Vehicle heading at the reference sample, counterclockwise from east
    pub initial_heading_deg: f64,
}

impl Default for DgpsConfig {
    fn default() -> Self {
        Self {
            max_error_m: DEFAULT_MAX_ERROR_M,
            initial_heading_deg: 0.0,
        }
    }
}

const REQUIRED: [SignalKind; 5] = [
    SignalKind::DgpsLatitude,
    SignalKind::DgpsLongitude,
    SignalKind::OdoX,
    SignalKind::OdoY,
    SignalKind::OdoYaw,
];

/// Odometry agrees with DGPS within the position tolerance
pub struct DgpsAccuracyStep {
    config: DgpsConfig,
}

impl DgpsAccuracyStep {
    pub fn new(config: DgpsConfig) -> Self {
        Self { config }
    }
}

impl TestStep for DgpsAccuracyStep {
    fn id(&self) -> &str {
        "dgps_accuracy"
    }

    fn description(&self) -> &str {
        "Odometry position stays within the DGPS tolerance"
    }

    fn required_signals(&self) -> Vec<SignalKey> {
        REQUIRED.into_iter().map(SignalKey::vehicle).collect()
    }

    fn evaluate(&self, ctx: &StepContext<'_>) -> Result<EvaluationResult, EvalError> {
        let timestamps = ctx.frame()?.timestamps();
        let signal = |kind| ctx.scalar(&SignalKey::vehicle(kind));
        let lat = signal(SignalKind::DgpsLatitude)?;
        let lon = signal(SignalKind::DgpsLongitude)?;
        let odo_x = signal(SignalKind::OdoX)?;
        let odo_y = signal(SignalKind::OdoY)?;
        let odo_yaw = signal(SignalKind::OdoYaw)?;

        let finite = |i: usize| {
            [lat[i], lon[i], odo_x[i], odo_y[i], odo_yaw[i]]
                .iter()
                .all(|v| v.is_finite())
        };
        let Some(reference) = (0..timestamps.len()).find(|&i| finite(i)) else {
            return Ok(EvaluationResult::not_assessed("No sample with finite DGPS and odometry"));
        };
        debug!("DGPS reference sample {} at {} us", reference, timestamps[reference]);

        let frame = LocalFrame::new(&Geodetic::new(lat[reference], lon[reference], 0.0))
            .map_err(geometry_error)?;
        let heading = self.config.initial_heading_deg.to_radians();
        let odo_origin = Point2::new(odo_x[reference], odo_y[reference]);
        let odo_heading = odo_yaw[reference];

        let mask: Vec<bool> = (0..timestamps.len()).map(|i| i >= reference).collect();
        let errors: Vec<f64> = (0..timestamps.len())
            .map(|i| {
                if i < reference || !finite(i) {
                    return f64::NAN;
                }
                let enu = frame.to_enu(&Geodetic::new(lat[i], lon[i], 0.0));
                let gps = enu_to_vehicle(enu.horizontal(), heading);
                let odo = (Point2::new(odo_x[i], odo_y[i]) - odo_origin).rotate(-odo_heading);
                gps.distance(odo)
            })
            .collect();

        let check = RangeCheck::at_most(self.config.max_error_m);
        let outcome = scan_masked(timestamps, &errors, &mask, &check);
        let stats = serde_json::to_value(ColumnStats::compute(&errors[reference..]))
            .map_err(|e| EvalError::Report(e.to_string()))?;

        Ok(EvaluationResult::new(
            outcome.verdict(),
            describe_outcome("position error", &format!("{} m", check), &outcome),
        )
        .with_figure(check_figure(
            "Odometry position error against DGPS",
            "Error [m]",
            timestamps,
            &[("Position error", errors.as_slice())],
            Some(self.config.max_error_m),
            &outcome,
        ))
        .with_metadata("reference_timestamp", timestamps[reference])
        .with_metadata("error_stats", stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kpi_core::{run_step, Verdict};
    use signal_frame::{Recording, SignalFrame, SignalSchema};

    const LAT0: f64 = 48.0;
    const LON0: f64 = 11.0;
    /// Meters per degree of latitude near 48 N, close enough for a 0.5 m tolerance
    const M_PER_DEG_LAT: f64 = 111_200.0;

    fn recording(
        lat: Vec<f64>,
        lon: Vec<f64>,
        x: Vec<f64>,
        y: Vec<f64>,
        yaw: Vec<f64>,
    ) -> Recording {
        let ts = (0..lat.len() as u64).map(|i| i * 50_000).collect();
        let frame = SignalFrame::new(ts)
            .unwrap()
            .with_scalar("DGPS.latitude_deg", lat)
            .unwrap()
            .with_scalar("DGPS.longitude_deg", lon)
            .unwrap()
            .with_scalar("Odometry.x_m", x)
            .unwrap()
            .with_scalar("Odometry.y_m", y)
            .unwrap()
            .with_scalar("Odometry.yaw_rad", yaw)
            .unwrap();
        Recording::single("rec", "MTS", frame)
    }

    fn evaluate(config: DgpsConfig, recording: &Recording) -> EvaluationResult {
        let schema = SignalSchema::default_parking();
        let ctx = StepContext {
            recording_name: "rec",
            reader: recording,
            schema: &schema,
            alias: "MTS",
        };
        run_step(&DgpsAccuracyStep::new(config), &ctx)
    }

    fn north_config() -> DgpsConfig {
        DgpsConfig {
            initial_heading_deg: 90.0,
            ..DgpsConfig::default()
        }
    }

    #[test]
    fn test_driving_north_matches_odometry() {
        // 10 m north, odometry forward 10 m
        let lat = vec![LAT0, LAT0 + 10.0 / M_PER_DEG_LAT];
        let result = evaluate(
            north_config(),
            &recording(lat, vec![LON0; 2], vec![0.0, 10.0], vec![0.0, 0.0], vec![0.0, 0.0]),
        );
        assert_eq!(result.verdict, Verdict::Pass);
    }

    #[test]
    fn test_odometry_drift_fails() {
        let lat = vec![LAT0, LAT0 + 10.0 / M_PER_DEG_LAT];
        let result = evaluate(
            north_config(),
            &recording(lat, vec![LON0; 2], vec![0.0, 11.0], vec![0.0, 0.0], vec![0.0, 0.0]),
        );
        assert_eq!(result.verdict, Verdict::Fail);
        assert!(result.explanation.contains("t = 0.050000 s"));
    }

    #[test]
    fn test_error_equal_to_tolerance_passes() {
        // DGPS stays at the reference; odometry drifts 0.5 m, then 0.51 m
        let at = evaluate(
            DgpsConfig::default(),
            &recording(vec![LAT0; 2], vec![LON0; 2], vec![0.0, 0.5], vec![0.0; 2], vec![0.0; 2]),
        );
        assert_eq!(at.verdict, Verdict::Pass);
        assert_eq!(at.metadata["error_stats"]["max"], 0.5);

        let beyond = evaluate(
            DgpsConfig::default(),
            &recording(vec![LAT0; 2], vec![LON0; 2], vec![0.0, 0.51], vec![0.0; 2], vec![0.0; 2]),
        );
        assert_eq!(beyond.verdict, Verdict::Fail);
    }

    #[test]
    fn test_initial_odometry_yaw_is_removed() {
        // Odometry frame rotated by 90 degrees: forward motion shows up on +y
        let lat = vec![LAT0, LAT0 + 10.0 / M_PER_DEG_LAT];
        let half_pi = std::f64::consts::FRAC_PI_2;
        let result = evaluate(
            north_config(),
            &recording(lat, vec![LON0; 2], vec![5.0, 5.0], vec![0.0, 10.0], vec![half_pi, half_pi]),
        );
        assert_eq!(result.verdict, Verdict::Pass);
    }

    #[test]
    fn test_reference_is_first_finite_sample() {
        let lat = vec![f64::NAN, LAT0, LAT0];
        let result = evaluate(
            DgpsConfig::default(),
            &recording(lat, vec![LON0; 3], vec![0.0; 3], vec![0.0; 3], vec![0.0; 3]),
        );
        assert_eq!(result.verdict, Verdict::Pass);
        assert_eq!(result.metadata["reference_timestamp"], 50_000);
    }

    #[test]
    fn test_no_finite_sample_not_assessed() {
        let result = evaluate(
            DgpsConfig::default(),
            &recording(vec![f64::NAN; 2], vec![LON0; 2], vec![0.0; 2], vec![0.0; 2], vec![0.0; 2]),
        );
        assert_eq!(result.verdict, Verdict::NotAssessed);
    }

    #[test]
    fn test_dropout_after_reference_fails() {
        let result = evaluate(
            DgpsConfig::default(),
            &recording(
                vec![LAT0, f64::NAN],
                vec![LON0; 2],
                vec![0.0; 2],
                vec![0.0; 2],
                vec![0.0; 2],
            ),
        );
        assert_eq!(result.verdict, Verdict::Fail);
    }
}
