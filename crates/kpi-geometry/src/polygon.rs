//! Simple Polygons
//!
//! Intersection uses Sutherland-Hodgman clipping, so `intersection_area` and
//! `iou` are exact only when the clipping polygon is convex. Slot corners and
//! oriented boxes always are.

use crate::point::segments_intersect;
use crate::{GeometryError, Point2};
use serde::{Deserialize, Serialize};

/// Closed polygon; the last vertex connects back to the first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Point2>,
}

impl Polygon {
    /// Create a polygon from at least three finite vertices
    pub fn new(vertices: Vec<Point2>) -> Result<Self, GeometryError> {
        if vertices.len() < 3 {
            return Err(GeometryError::TooFewVertices(vertices.len()));
        }
        if !vertices.iter().all(Point2::is_finite) {
            return Err(GeometryError::NonFinite("polygon vertex"));
        }
        Ok(Self { vertices })
    }

    /// Axis-aligned rectangle from its top-left corner and size
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Result<Self, GeometryError> {
        if width < 0.0 || height < 0.0 {
            return Err(GeometryError::DegenerateShape(format!(
                "rectangle size {} x {}",
                width, height
            )));
        }
        Self::new(vec![
            Point2::new(x, y),
            Point2::new(x + width, y),
            Point2::new(x + width, y + height),
            Point2::new(x, y + height),
        ])
    }

    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }

    fn edges(&self) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    fn signed_area(&self) -> f64 {
        0.5 * self.edges().map(|(a, b)| a.cross(b)).sum::<f64>()
    }

    /// Absolute area (shoelace formula)
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Point-in-polygon test; points on the boundary count as inside
    pub fn contains(&self, p: Point2) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if p.distance_to_segment(a, b) <= 1e-12 {
                return true;
            }
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Check if the polygons overlap or touch
    pub fn intersects(&self, other: &Polygon) -> bool {
        if self.contains(other.vertices[0]) || other.contains(self.vertices[0]) {
            return true;
        }
        self.edges()
            .any(|(a1, a2)| other.edges().any(|(b1, b2)| segments_intersect(a1, a2, b1, b2)))
    }

    /// Minimum distance between the polygons, 0 when they overlap
    pub fn distance_to(&self, other: &Polygon) -> f64 {
        if self.intersects(other) {
            return 0.0;
        }
        let one_way = |from: &Polygon, to: &Polygon| {
            from.vertices
                .iter()
                .flat_map(|&p| to.edges().map(move |(a, b)| p.distance_to_segment(a, b)))
                .fold(f64::INFINITY, f64::min)
        };
        one_way(self, other).min(one_way(other, self))
    }

    /// Area of the overlap with a convex polygon
    pub fn intersection_area(&self, convex: &Polygon) -> f64 {
        let ccw = convex.signed_area() >= 0.0;
        let mut output = self.vertices.clone();

        for (edge_start, edge_end) in convex.edges() {
            if output.is_empty() {
                break;
            }
            let inside = |p: Point2| {
                let side = (edge_end - edge_start).cross(p - edge_start);
                if ccw {
                    side >= 0.0
                } else {
                    side <= 0.0
                }
            };
            let input = std::mem::take(&mut output);
            for i in 0..input.len() {
                let current = input[i];
                let previous = input[(i + input.len() - 1) % input.len()];
                match (inside(previous), inside(current)) {
                    (true, true) => output.push(current),
                    (true, false) => {
                        output.push(line_intersection(previous, current, edge_start, edge_end))
                    }
                    (false, true) => {
                        output.push(line_intersection(previous, current, edge_start, edge_end));
                        output.push(current);
                    }
                    (false, false) => {}
                }
            }
        }

        if output.len() < 3 {
            return 0.0;
        }
        Polygon { vertices: output }.area()
    }

    /// Intersection over union with a convex polygon; 0 when both are empty
    pub fn iou(&self, convex: &Polygon) -> f64 {
        let intersection = self.intersection_area(convex);
        let union = self.area() + convex.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

fn line_intersection(p1: Point2, p2: Point2, q1: Point2, q2: Point2) -> Point2 {
    let r = p2 - p1;
    let s = q2 - q1;
    let denom = r.cross(s);
    if denom == 0.0 {
        return p2;
    }
    let t = (q1 - p1).cross(s) / denom;
    p1 + r * t
}
