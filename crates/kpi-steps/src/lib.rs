//! Parking Feature Test Steps
//!
//! One module per feature under evaluation:
//! - Optical flow density per camera
//! - Computer vision detection confidence, keypoints and ground truth IoU
//! - PPC fault reaction within the FTTI and maneuver start
//! - LSCA braking distance
//! - Parking slot detection IoU
//! - DGPS position accuracy
//!
//! Each module carries its compile-time defaults and a serde config whose
//! `Default` uses them.

pub mod common;
pub mod config;
pub mod cv;
pub mod dgps;
pub mod lsca;
pub mod ofc;
pub mod ppc;
pub mod registry;
pub mod slot;

pub use config::EvaluationConfig;
pub use cv::{
    CvConfidenceStep, CvConfig, CvGroundTruthStep, CvKeypointStep, GroundTruth, GroundTruthBox,
};
pub use dgps::{DgpsAccuracyStep, DgpsConfig};
pub use lsca::{LscaBrakingStep, LscaConfig};
pub use ofc::{AoiGrid, OfcConfig, OfcDensityStep};
pub use ppc::{PpcConfig, PpcFttiStep, PpcManeuverStartStep, PpcState};
pub use registry::default_test_cases;
pub use slot::{SlotConfig, SlotDetectionStep};
