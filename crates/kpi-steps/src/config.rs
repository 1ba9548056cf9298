//! Evaluation configuration

use crate::cv::CvConfig;
use crate::dgps::DgpsConfig;
use crate::lsca::LscaConfig;
use crate::ofc::OfcConfig;
use crate::ppc::PpcConfig;
use crate::slot::SlotConfig;
use serde::{Deserialize, Serialize};
use signal_frame::SchemaLayout;

/// Reader alias of the main measurement frame
pub const DEFAULT_RECORDING_ALIAS: &str = "MTS";

/// Configuration of every feature evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Reader alias the steps evaluate
    pub recording_alias: String,

    /// Column layout and template overrides
    pub schema: SchemaLayout,

    pub ofc: OfcConfig,
    pub cv: CvConfig,
    pub ppc: PpcConfig,
    pub lsca: LscaConfig,
    pub slot: SlotConfig,
    pub dgps: DgpsConfig,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            recording_alias: DEFAULT_RECORDING_ALIAS.to_string(),
            schema: SchemaLayout::default(),
            ofc: OfcConfig::default(),
            cv: CvConfig::default(),
            ppc: PpcConfig::default(),
            lsca: LscaConfig::default(),
            slot: SlotConfig::default(),
            dgps: DgpsConfig::default(),
        }
    }
}
