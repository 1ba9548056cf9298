//! Packed Field Decoding
//!
//! Flow vectors arrive as offset-encoded byte blobs; keypoints arrive as one
//! scalar column per keypoint index and axis.

use crate::{Camera, FrameError, SignalFrame, SignalKey, SignalKind, SignalSchema};
use serde::{Deserialize, Serialize};

/// Bytes per packed flow record: x, y, dx, dy as little-endian u16
pub const FLOW_RECORD_LEN: usize = 8;

/// Encoding parameters of a flow blob
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowBlobLayout {
    /// Bias subtracted from the raw offset words
    pub offset_bias: u16,
    /// Sub-pixel divisor applied to the unbiased offsets
    pub subpixel_scale: f64,
}

impl Default for FlowBlobLayout {
    fn default() -> Self {
        Self {
            offset_bias: 32768,
            subpixel_scale: 16.0,
        }
    }
}

/// One optical flow vector in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowVector {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

impl FlowVector {
    /// Flow vector that does not move
    pub fn identity(x: f64, y: f64) -> Self {
        Self {
            start_x: x,
            start_y: y,
            end_x: x,
            end_y: y,
        }
    }

    /// Encode into the packed record format (used for fixtures)
    pub fn encode(&self, layout: &FlowBlobLayout) -> [u8; FLOW_RECORD_LEN] {
        let offset = |delta: f64| -> u16 {
            let raw = (delta * layout.subpixel_scale).round() + f64::from(layout.offset_bias);
            raw.clamp(0.0, f64::from(u16::MAX)) as u16
        };
        let words = [
            self.start_x.round().clamp(0.0, f64::from(u16::MAX)) as u16,
            self.start_y.round().clamp(0.0, f64::from(u16::MAX)) as u16,
            offset(self.end_x - self.start_x),
            offset(self.end_y - self.start_y),
        ];
        let mut out = [0u8; FLOW_RECORD_LEN];
        for (chunk, word) in out.chunks_exact_mut(2).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }
}

/// Decode every flow record in a blob
pub fn decode_flow_blob(
    blob: &[u8],
    layout: &FlowBlobLayout,
) -> Result<Vec<FlowVector>, FrameError> {
    if blob.len() % FLOW_RECORD_LEN != 0 {
        return Err(FrameError::MalformedBlob {
            len: blob.len(),
            record_len: FLOW_RECORD_LEN,
        });
    }

    let scale = if layout.subpixel_scale > 0.0 {
        layout.subpixel_scale
    } else {
        1.0
    };
    let bias = f64::from(layout.offset_bias);

    Ok(blob
        .chunks_exact(FLOW_RECORD_LEN)
        .map(|record| {
            let word = |i: usize| f64::from(u16::from_le_bytes([record[i], record[i + 1]]));
            let start_x = word(0);
            let start_y = word(2);
            FlowVector {
                start_x,
                start_y,
                end_x: start_x + (word(4) - bias) / scale,
                end_y: start_y + (word(6) - bias) / scale,
            }
        })
        .collect())
}

/// Encode flow vectors into one blob
pub fn encode_flow_blob(flows: &[FlowVector], layout: &FlowBlobLayout) -> Vec<u8> {
    flows.iter().flat_map(|flow| flow.encode(layout)).collect()
}

/// Keypoint present at a sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub index: u16,
    pub x: f64,
    pub y: f64,
}

/// Resolved keypoint columns of one camera
#[derive(Debug)]
pub struct KeypointColumns<'a> {
    columns: Vec<(u16, &'a [f64], &'a [f64])>,
}

impl<'a> KeypointColumns<'a> {
    /// Resolve `count` keypoint columns for a camera.
    ///
    /// Fails with every missing column name when any axis is absent.
    pub fn resolve(
        frame: &'a SignalFrame,
        schema: &SignalSchema,
        camera: Camera,
        count: u16,
    ) -> Result<Self, FrameError> {
        let mut names = Vec::with_capacity(count as usize);
        for index in 0..count {
            let x = schema.lookup(&SignalKey::detection(SignalKind::KeypointX, camera, index))?;
            let y = schema.lookup(&SignalKey::detection(SignalKind::KeypointY, camera, index))?;
            names.push((index, x, y));
        }
        frame.require(names.iter().flat_map(|(_, x, y)| [*x, *y]))?;

        let mut columns = Vec::with_capacity(names.len());
        for (index, x, y) in names {
            columns.push((index, frame.scalar(x)?, frame.scalar(y)?));
        }
        Ok(Self { columns })
    }

    /// Keypoints with both coordinates finite at `sample`
    pub fn at(&self, sample: usize) -> Vec<Keypoint> {
        self.columns
            .iter()
            .filter_map(|(index, xs, ys)| {
                let x = *xs.get(sample)?;
                let y = *ys.get(sample)?;
                (x.is_finite() && y.is_finite()).then_some(Keypoint { index: *index, x, y })
            })
            .collect()
    }
}
