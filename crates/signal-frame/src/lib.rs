//! Signal Frames
//!
//! Data model shared by every evaluation:
//! - Timestamp-indexed signal tables with scalar and packed columns
//! - Typed signal schema keyed by kind, camera and index
//! - Decoding of packed flow blobs and indexed keypoint columns
//! - Signal validity status and column statistics
//! - Reader seam over recorded measurements

mod decode;
mod error;
mod frame;
mod reader;
mod schema;
mod stats;
mod status;

pub use decode::{
    decode_flow_blob, encode_flow_blob, FlowBlobLayout, FlowVector, Keypoint, KeypointColumns,
    FLOW_RECORD_LEN,
};
pub use error::FrameError;
pub use frame::{Column, SignalFrame, Timestamp};
pub use reader::{Recording, SignalReader};
pub use schema::{Camera, SchemaLayout, Scope, SignalKey, SignalKind, SignalSchema};
pub use stats::ColumnStats;
pub use status::{usable_mask, usable_samples, SigStatus};
