//! Oriented Bounding Boxes

use crate::{GeometryError, Point2, Polygon};
use serde::{Deserialize, Serialize};

/// Rectangle with a heading, e.g. the ego vehicle or a tracked object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientedBox {
    pub center: Point2,
    /// Heading of the length axis, counterclockwise from +x
    pub heading: f64,
    pub length: f64,
    pub width: f64,
}

impl OrientedBox {
    pub fn new(center: Point2, heading: f64, length: f64, width: f64) -> Self {
        Self {
            center,
            heading,
            length,
            width,
        }
    }

    /// Box placed from a reference point on its length axis.
    ///
    /// `rear_overhang` is the distance from the rear edge forward to the
    /// reference point, e.g. the rear axle for an odometry pose.
    pub fn from_reference(
        reference: Point2,
        heading: f64,
        length: f64,
        width: f64,
        rear_overhang: f64,
    ) -> Self {
        let forward = Point2::new(1.0, 0.0).rotate(heading);
        Self::new(
            reference + forward * (length / 2.0 - rear_overhang),
            heading,
            length,
            width,
        )
    }

    /// Corners counterclockwise, starting rear right
    pub fn corners(&self) -> [Point2; 4] {
        let hl = self.length / 2.0;
        let hw = self.width / 2.0;
        [
            Point2::new(-hl, -hw),
            Point2::new(hl, -hw),
            Point2::new(hl, hw),
            Point2::new(-hl, hw),
        ]
        .map(|local| self.center + local.rotate(self.heading))
    }

    pub fn to_polygon(&self) -> Result<Polygon, GeometryError> {
        Polygon::new(self.corners().to_vec())
    }

    /// Shrink the box: the front edge moves back by `lead`, the rear edge
    /// forward by `lag` and each side inward by `lateral`. Negative margins
    /// grow the box.
    pub fn shrink(&self, lead: f64, lag: f64, lateral: f64) -> Result<OrientedBox, GeometryError> {
        let length = self.length - lead - lag;
        let width = self.width - 2.0 * lateral;
        if length < 0.0 || width < 0.0 {
            return Err(GeometryError::DegenerateShape(format!(
                "box {} x {} shrunk by lead {} lag {} lateral {}",
                self.length, self.width, lead, lag, lateral
            )));
        }
        let forward = Point2::new(1.0, 0.0).rotate(self.heading);
        Ok(OrientedBox {
            center: self.center + forward * ((lag - lead) / 2.0),
            heading: self.heading,
            length,
            width,
        })
    }

    /// Minimum distance to another box, 0 when they overlap
    pub fn distance_to(&self, other: &OrientedBox) -> Result<f64, GeometryError> {
        Ok(self.to_polygon()?.distance_to(&other.to_polygon()?))
    }
}
