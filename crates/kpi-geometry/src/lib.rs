//! Geometry for Parking KPIs
//!
//! - Points and vectors in the vehicle plane
//! - Polygon area, containment, convex intersection and IoU
//! - Oriented boxes with lead/lag shrinkage
//! - WGS-84 geodetic to local east/north/up frames

pub mod geodesy;
pub mod oriented;
pub mod point;
pub mod polygon;

pub use geodesy::{
    enu_to_vehicle, geodetic_to_ecef, vehicle_to_enu, Ecef, Enu, Geodetic, LocalFrame,
};
pub use oriented::OrientedBox;
pub use point::Point2;
pub use polygon::Polygon;

use thiserror::Error;

/// Geometry error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    #[error("Non-finite coordinate in {0}")]
    NonFinite(&'static str),

    #[error("Degenerate shape: {0}")]
    DegenerateShape(String),
}
