//! Typed Signal Schema
//!
//! Column names are expanded once from templates when the schema is built.
//! Evaluations look signals up by [`SignalKey`] and never format names
//! themselves.

use crate::FrameError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

const CAM_PLACEHOLDER: &str = "{cam}";
const IDX_PLACEHOLDER: &str = "{idx}";

/// Surround-view camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Camera {
    Front,
    Rear,
    Left,
    Right,
}

impl Camera {
    /// All cameras in report order
    pub const ALL: [Camera; 4] = [Camera::Front, Camera::Rear, Camera::Left, Camera::Right];

    /// Name used in column templates
    pub fn short_name(&self) -> &'static str {
        match self {
            Camera::Front => "front",
            Camera::Rear => "rear",
            Camera::Left => "left",
            Camera::Right => "right",
        }
    }
}

impl fmt::Display for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// How many columns a signal kind expands to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// One column for the vehicle
    Vehicle,
    /// One column per camera
    Camera,
    /// One column per camera and detection index
    CameraDetection,
    /// One column per camera and keypoint index
    CameraKeypoint,
    /// One column per polygon corner
    Corner,
}

/// Signals consumed by the evaluations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    VehicleSpeed,
    PpcState,
    FaultFlag,
    LscaBrakeRequest,
    OdoX,
    OdoY,
    OdoYaw,
    ObjectX,
    ObjectY,
    ObjectYaw,
    ObjectLength,
    ObjectWidth,
    DgpsLatitude,
    DgpsLongitude,
    OfcForwardFlow,
    OfcBackwardFlow,
    DetectionConfidence,
    BboxX,
    BboxY,
    BboxWidth,
    BboxHeight,
    KeypointX,
    KeypointY,
    SlotStatus,
    SlotCornerX,
    SlotCornerY,
    SlotGtCornerX,
    SlotGtCornerY,
}

impl SignalKind {
    /// Every kind, in declaration order
    pub const ALL: [SignalKind; 28] = [
        SignalKind::VehicleSpeed,
        SignalKind::PpcState,
        SignalKind::FaultFlag,
        SignalKind::LscaBrakeRequest,
        SignalKind::OdoX,
        SignalKind::OdoY,
        SignalKind::OdoYaw,
        SignalKind::ObjectX,
        SignalKind::ObjectY,
        SignalKind::ObjectYaw,
        SignalKind::ObjectLength,
        SignalKind::ObjectWidth,
        SignalKind::DgpsLatitude,
        SignalKind::DgpsLongitude,
        SignalKind::OfcForwardFlow,
        SignalKind::OfcBackwardFlow,
        SignalKind::DetectionConfidence,
        SignalKind::BboxX,
        SignalKind::BboxY,
        SignalKind::BboxWidth,
        SignalKind::BboxHeight,
        SignalKind::KeypointX,
        SignalKind::KeypointY,
        SignalKind::SlotStatus,
        SignalKind::SlotCornerX,
        SignalKind::SlotCornerY,
        SignalKind::SlotGtCornerX,
        SignalKind::SlotGtCornerY,
    ];

    /// Expansion scope of this kind
    pub fn scope(&self) -> Scope {
        use SignalKind::*;
        match self {
            OfcForwardFlow | OfcBackwardFlow => Scope::Camera,
            DetectionConfidence | BboxX | BboxY | BboxWidth | BboxHeight => Scope::CameraDetection,
            KeypointX | KeypointY => Scope::CameraKeypoint,
            SlotCornerX | SlotCornerY | SlotGtCornerX | SlotGtCornerY => Scope::Corner,
            _ => Scope::Vehicle,
        }
    }

    /// Built-in column template
    pub fn default_template(&self) -> &'static str {
        use SignalKind::*;
        match self {
            VehicleSpeed => "Vehicle.speed_kph",
            PpcState => "AP.ppc_state",
            FaultFlag => "AP.fault_injected",
            LscaBrakeRequest => "LSCA.brake_request",
            OdoX => "Odometry.x_m",
            OdoY => "Odometry.y_m",
            OdoYaw => "Odometry.yaw_rad",
            ObjectX => "LSCA.object.x_m",
            ObjectY => "LSCA.object.y_m",
            ObjectYaw => "LSCA.object.yaw_rad",
            ObjectLength => "LSCA.object.length_m",
            ObjectWidth => "LSCA.object.width_m",
            DgpsLatitude => "DGPS.latitude_deg",
            DgpsLongitude => "DGPS.longitude_deg",
            OfcForwardFlow => "OFC.{cam}.forward_flow",
            OfcBackwardFlow => "OFC.{cam}.backward_flow",
            DetectionConfidence => "CV.{cam}.det_{idx}.confidence",
            BboxX => "CV.{cam}.det_{idx}.bbox_x",
            BboxY => "CV.{cam}.det_{idx}.bbox_y",
            BboxWidth => "CV.{cam}.det_{idx}.bbox_width",
            BboxHeight => "CV.{cam}.det_{idx}.bbox_height",
            KeypointX => "CV.{cam}.keypoint_x_{idx}",
            KeypointY => "CV.{cam}.keypoint_y_{idx}",
            SlotStatus => "SD.slot.sig_status",
            SlotCornerX => "SD.slot.corner_x_{idx}",
            SlotCornerY => "SD.slot.corner_y_{idx}",
            SlotGtCornerX => "GT.slot.corner_x_{idx}",
            SlotGtCornerY => "GT.slot.corner_y_{idx}",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Key identifying one signal column: kind, camera and index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalKey {
    pub kind: SignalKind,
    pub camera: Option<Camera>,
    pub index: Option<u16>,
}

impl SignalKey {
    /// Vehicle-level signal
    pub fn vehicle(kind: SignalKind) -> Self {
        Self {
            kind,
            camera: None,
            index: None,
        }
    }

    /// Per-camera signal
    pub fn camera(kind: SignalKind, camera: Camera) -> Self {
        Self {
            kind,
            camera: Some(camera),
            index: None,
        }
    }

    /// Per-camera, per-index signal (detections, keypoints)
    pub fn detection(kind: SignalKind, camera: Camera, index: u16) -> Self {
        Self {
            kind,
            camera: Some(camera),
            index: Some(index),
        }
    }

    /// Indexed vehicle-level signal (polygon corners)
    pub fn indexed(kind: SignalKind, index: u16) -> Self {
        Self {
            kind,
            camera: None,
            index: Some(index),
        }
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(camera) = self.camera {
            write!(f, "[{}]", camera)?;
        }
        if let Some(index) = self.index {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}

/// Column layout used to enumerate the schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaLayout {
    /// Detection slots per camera
    pub max_detections: u16,
    /// Keypoints per camera
    pub max_keypoints: u16,
    /// Corners per slot polygon
    pub corners: u16,
    /// Template overrides by kind
    pub templates: BTreeMap<SignalKind, String>,
}

impl Default for SchemaLayout {
    fn default() -> Self {
        Self {
            max_detections: 4,
            max_keypoints: 8,
            corners: 4,
            templates: BTreeMap::new(),
        }
    }
}

/// Lookup from signal keys to column names
#[derive(Debug, Clone, Default)]
pub struct SignalSchema {
    columns: BTreeMap<SignalKey, String>,
}

impl SignalSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema with the built-in parking column names
    pub fn default_parking() -> Self {
        // Built-in templates always carry their placeholders
        Self::from_layout(&SchemaLayout::default()).unwrap_or_default()
    }

    /// Enumerate every kind over cameras and indices
    pub fn from_layout(layout: &SchemaLayout) -> Result<Self, FrameError> {
        let mut schema = Self::new();
        for kind in SignalKind::ALL {
            let template = layout
                .templates
                .get(&kind)
                .map(String::as_str)
                .unwrap_or_else(|| kind.default_template());
            schema.register_template(kind, template, layout)?;
        }
        debug!("Signal schema built with {} columns", schema.len());
        Ok(schema)
    }

    /// Register one column name for a key
    pub fn insert(&mut self, key: SignalKey, name: impl Into<String>) {
        self.columns.insert(key, name.into());
    }

    /// Expand a template for `kind` according to its scope
    pub fn register_template(
        &mut self,
        kind: SignalKind,
        template: &str,
        layout: &SchemaLayout,
    ) -> Result<(), FrameError> {
        let check = |placeholder: &'static str| {
            if template.contains(placeholder) {
                Ok(())
            } else {
                Err(FrameError::InvalidTemplate {
                    kind: kind.to_string(),
                    template: template.to_string(),
                    placeholder,
                })
            }
        };

        match kind.scope() {
            Scope::Vehicle => self.insert(SignalKey::vehicle(kind), template),
            Scope::Camera => {
                check(CAM_PLACEHOLDER)?;
                for camera in Camera::ALL {
                    self.insert(
                        SignalKey::camera(kind, camera),
                        template.replace(CAM_PLACEHOLDER, camera.short_name()),
                    );
                }
            }
            Scope::CameraDetection | Scope::CameraKeypoint => {
                check(CAM_PLACEHOLDER)?;
                check(IDX_PLACEHOLDER)?;
                let count = if kind.scope() == Scope::CameraDetection {
                    layout.max_detections
                } else {
                    layout.max_keypoints
                };
                for camera in Camera::ALL {
                    for index in 0..count {
                        let name = template
                            .replace(CAM_PLACEHOLDER, camera.short_name())
                            .replace(IDX_PLACEHOLDER, &index.to_string());
                        self.insert(SignalKey::detection(kind, camera, index), name);
                    }
                }
            }
            Scope::Corner => {
                check(IDX_PLACEHOLDER)?;
                for index in 0..layout.corners {
                    self.insert(
                        SignalKey::indexed(kind, index),
                        template.replace(IDX_PLACEHOLDER, &index.to_string()),
                    );
                }
            }
        }
        Ok(())
    }

    /// Column name for a key
    pub fn lookup(&self, key: &SignalKey) -> Result<&str, FrameError> {
        self.columns
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| FrameError::UnknownSignal(key.to_string()))
    }

    /// Number of registered columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if no columns are registered
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_enumerates_cameras_and_detections() {
        let schema = SignalSchema::default_parking();

        let key = SignalKey::detection(SignalKind::DetectionConfidence, Camera::Rear, 2);
        assert_eq!(schema.lookup(&key).unwrap(), "CV.rear.det_2.confidence");

        let key = SignalKey::camera(SignalKind::OfcForwardFlow, Camera::Left);
        assert_eq!(schema.lookup(&key).unwrap(), "OFC.left.forward_flow");

        let key = SignalKey::indexed(SignalKind::SlotCornerY, 3);
        assert_eq!(schema.lookup(&key).unwrap(), "SD.slot.corner_y_3");
    }

    #[test]
    fn test_lookup_outside_layout_is_unknown() {
        let schema = SignalSchema::default_parking();
        let key = SignalKey::detection(SignalKind::DetectionConfidence, Camera::Front, 99);
        assert!(matches!(schema.lookup(&key), Err(FrameError::UnknownSignal(_))));
    }

    #[test]
    fn test_template_override() {
        let mut layout = SchemaLayout::default();
        layout
            .templates
            .insert(SignalKind::VehicleSpeed, "Car.v".to_string());
        let schema = SignalSchema::from_layout(&layout).unwrap();
        assert_eq!(
            schema
                .lookup(&SignalKey::vehicle(SignalKind::VehicleSpeed))
                .unwrap(),
            "Car.v"
        );
    }

    #[test]
    fn test_template_missing_placeholder_rejected() {
        let mut layout = SchemaLayout::default();
        layout
            .templates
            .insert(SignalKind::OfcForwardFlow, "OFC.forward".to_string());
        let err = SignalSchema::from_layout(&layout).unwrap_err();
        assert!(matches!(err, FrameError::InvalidTemplate { placeholder: "{cam}", .. }));
    }
}
