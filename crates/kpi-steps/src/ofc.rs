//! Optical Flow Density
//!
//! The image is divided into a grid of AOI cells. A cell counts as covered
//! when at least one flow vector starts and ends inside it; density is the
//! covered share of all cells in percent, rounded to two decimals.

use crate::common::{check_figure, describe_outcome, round2, summary_table, SummaryRow};
use kpi_core::{
    scan_with, CheckOutcome, EvalError, EvaluationResult, StepContext, TestStep, Verdict,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use signal_frame::{decode_flow_blob, Camera, FlowBlobLayout, FlowVector, SignalKey, SignalKind};
use tracing::debug;

pub const DEFAULT_IMAGE_WIDTH: u32 = 1280;
pub const DEFAULT_IMAGE_HEIGHT: u32 = 960;
pub const DEFAULT_CELL_SIZE: u32 = 64;
/// Minimum density per camera and direction, in percent
pub const DEFAULT_THRESHOLD_PERCENT: f64 = 10.0;

const _: () = assert!(DEFAULT_CELL_SIZE > 0);
const _: () =
    assert!(DEFAULT_CELL_SIZE <= DEFAULT_IMAGE_WIDTH && DEFAULT_CELL_SIZE <= DEFAULT_IMAGE_HEIGHT);

/// Optical flow density configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OfcConfig {
    pub image_width: u32,
    pub image_height: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    /// Density at or above this passes
    pub threshold_percent: f64,
    pub blob_layout: FlowBlobLayout,
}

impl Default for OfcConfig {
    fn default() -> Self {
        Self {
            image_width: DEFAULT_IMAGE_WIDTH,
            image_height: DEFAULT_IMAGE_HEIGHT,
            cell_width: DEFAULT_CELL_SIZE,
            cell_height: DEFAULT_CELL_SIZE,
            threshold_percent: DEFAULT_THRESHOLD_PERCENT,
            blob_layout: FlowBlobLayout::default(),
        }
    }
}

/// AOI grid over the image; partial cells at the right and bottom edges count
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AoiGrid {
    width: f64,
    height: f64,
    cell_width: f64,
    cell_height: f64,
    cols: usize,
    rows: usize,
}

impl AoiGrid {
    pub fn new(
        image_width: u32,
        image_height: u32,
        cell_width: u32,
        cell_height: u32,
    ) -> Result<Self, EvalError> {
        if cell_width == 0 || cell_height == 0 || image_width == 0 || image_height == 0 {
            return Err(EvalError::InvalidData(format!(
                "AOI grid {}x{} with cells {}x{}",
                image_width, image_height, cell_width, cell_height
            )));
        }
        Ok(Self {
            width: f64::from(image_width),
            height: f64::from(image_height),
            cell_width: f64::from(cell_width),
            cell_height: f64::from(cell_height),
            cols: image_width.div_ceil(cell_width) as usize,
            rows: image_height.div_ceil(cell_height) as usize,
        })
    }

    pub fn from_config(config: &OfcConfig) -> Result<Self, EvalError> {
        Self::new(config.image_width, config.image_height, config.cell_width, config.cell_height)
    }

    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        self.cols * self.rows
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Cell (row, col) holding an image point, `None` outside the image
    pub fn cell_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !(0.0..self.width).contains(&x) || !(0.0..self.height).contains(&y) {
            return None;
        }
        Some(((y / self.cell_height) as usize, (x / self.cell_width) as usize))
    }

    /// Coverage map: cells holding a flow that starts and ends in them
    pub fn coverage(&self, flows: &[FlowVector]) -> Array2<bool> {
        let mut covered = Array2::from_elem(self.shape(), false);
        for flow in flows {
            let start = self.cell_of(flow.start_x, flow.start_y);
            let end = self.cell_of(flow.end_x, flow.end_y);
            if let (Some(cell), Some(end)) = (start, end) {
                if cell == end {
                    covered[cell] = true;
                }
            }
        }
        covered
    }

    /// Flow density in percent, rounded to two decimals
    pub fn density(&self, flows: &[FlowVector]) -> f64 {
        let covered = self.coverage(flows).iter().filter(|&&c| c).count();
        round2(covered as f64 / self.cell_count() as f64 * 100.0)
    }
}

/// Densities of one camera and direction over time
#[derive(Debug, Clone, PartialEq)]
pub struct DensitySeries {
    pub camera: Camera,
    pub forward: Vec<f64>,
    pub backward: Vec<f64>,
}

fn density_series(
    ctx: &StepContext<'_>,
    grid: &AoiGrid,
    layout: &FlowBlobLayout,
    camera: Camera,
) -> Result<DensitySeries, EvalError> {
    let densities = |kind: SignalKind| -> Result<Vec<f64>, EvalError> {
        ctx.blob(&SignalKey::camera(kind, camera))?
            .iter()
            .map(|blob| -> Result<f64, EvalError> {
                Ok(grid.density(&decode_flow_blob(blob, layout)?))
            })
            .collect()
    };
    Ok(DensitySeries {
        camera,
        forward: densities(SignalKind::OfcForwardFlow)?,
        backward: densities(SignalKind::OfcBackwardFlow)?,
    })
}

/// Flow density of every camera and direction stays at or above the threshold
pub struct OfcDensityStep {
    config: OfcConfig,
}

impl OfcDensityStep {
    pub fn new(config: OfcConfig) -> Self {
        Self { config }
    }
}

impl TestStep for OfcDensityStep {
    fn id(&self) -> &str {
        "ofc_density"
    }

    fn description(&self) -> &str {
        "Forward and backward optical flow density per camera reaches the minimum density"
    }

    fn required_signals(&self) -> Vec<SignalKey> {
        Camera::ALL
            .into_iter()
            .flat_map(|camera| {
                [
                    SignalKey::camera(SignalKind::OfcForwardFlow, camera),
                    SignalKey::camera(SignalKind::OfcBackwardFlow, camera),
                ]
            })
            .collect()
    }

    fn evaluate(&self, ctx: &StepContext<'_>) -> Result<EvaluationResult, EvalError> {
        let frame = ctx.frame()?;
        let timestamps = frame.timestamps();
        let grid = AoiGrid::from_config(&self.config)?;
        let threshold = self.config.threshold_percent;
        let requirement = format!(">= {}%", threshold);

        let mut rows = Vec::with_capacity(Camera::ALL.len());
        let mut figures = Vec::with_capacity(Camera::ALL.len());
        let mut failing = Vec::new();
        let mut first_failures = serde_json::Map::new();

        for camera in Camera::ALL {
            let series = density_series(ctx, &grid, &self.config.blob_layout, camera)?;
            let passes = |density: f64| density >= threshold;
            let mut outcome: CheckOutcome = scan_with(timestamps, &series.forward, passes);
            outcome.merge(&scan_with(timestamps, &series.backward, passes));

            let verdict = outcome.verdict();
            debug!("OFC {} camera: {} ({} violations)", camera, verdict, outcome.violations);
            if let Some(failure) = outcome.first_failure {
                failing.push(camera.to_string());
                first_failures.insert(camera.to_string(), failure.timestamp.into());
            }

            rows.push(SummaryRow::new(
                camera.to_string(),
                verdict,
                describe_outcome(&format!("{} flow density", camera), &requirement, &outcome),
            ));
            figures.push(check_figure(
                &format!("Flow density {} camera", camera),
                "Density [%]",
                timestamps,
                &[("Forward", series.forward.as_slice()), ("Backward", series.backward.as_slice())],
                Some(threshold),
                &outcome,
            ));
        }

        let verdict = Verdict::aggregate(rows.iter().map(|row| row.verdict));
        let explanation = match verdict {
            Verdict::Pass => format!("Flow density of every camera is {}", requirement),
            Verdict::Fail => format!(
                "Flow density below {}% on camera(s): {}",
                threshold,
                failing.join(", ")
            ),
            _ => "No flow samples to evaluate".to_string(),
        };

        let mut result = EvaluationResult::new(verdict, explanation)
            .with_table(summary_table("Flow density per camera", "Camera", &rows)?)
            .with_metadata("grid_cells", grid.cell_count())
            .with_metadata("first_failures", serde_json::Value::Object(first_failures));
        for figure in figures {
            result = result.with_figure(figure);
        }
        Ok(result)
    }
}
