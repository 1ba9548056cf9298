//! Default test case registry

use crate::cv::{CvConfidenceStep, CvGroundTruthStep, CvKeypointStep, GroundTruth};
use crate::dgps::DgpsAccuracyStep;
use crate::lsca::LscaBrakingStep;
use crate::ofc::OfcDensityStep;
use crate::ppc::{PpcFttiStep, PpcManeuverStartStep};
use crate::slot::SlotDetectionStep;
use crate::EvaluationConfig;
use kpi_core::TestCase;
use tracing::debug;

/// Build every feature test case; the ground truth step is added when
/// ground truth is available
pub fn default_test_cases(
    config: &EvaluationConfig,
    ground_truth: Option<GroundTruth>,
) -> Vec<TestCase> {
    let mut cv = TestCase::new("CV", "Computer vision detections")
        .with_step(CvConfidenceStep::new(config.cv.clone()))
        .with_step(CvKeypointStep::new(config.cv.clone()));
    if let Some(truth) = ground_truth {
        cv.add_step(Box::new(CvGroundTruthStep::new(config.cv.clone(), truth)));
    }

    let cases = vec![
        TestCase::new("OFC", "Optical flow density")
            .with_step(OfcDensityStep::new(config.ofc.clone())),
        cv,
        TestCase::new("PPC", "Parking path control")
            .with_step(PpcFttiStep::new(config.ppc.clone()))
            .with_step(PpcManeuverStartStep::new(config.ppc.clone())),
        TestCase::new("LSCA", "Low speed collision avoidance")
            .with_step(LscaBrakingStep::new(config.lsca.clone())),
        TestCase::new("SLOT", "Parking slot detection")
            .with_step(SlotDetectionStep::new(config.slot.clone())),
        TestCase::new("DGPS", "Position accuracy against DGPS")
            .with_step(DgpsAccuracyStep::new(config.dgps.clone())),
    ];
    debug!("Registered {} test cases", cases.len());
    cases
}
