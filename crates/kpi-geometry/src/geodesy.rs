//! WGS-84 Geodesy
//!
//! Geodetic positions are converted to ECEF and then to a local east/north/up
//! frame anchored at a reference position.

use crate::{GeometryError, Point2};
use serde::{Deserialize, Serialize};

/// WGS-84 semi-major axis in meters
const WGS84_A: f64 = 6_378_137.0;
/// WGS-84 flattening
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS-84 first eccentricity squared
const WGS84_E2: f64 = 2.0 * WGS84_F - WGS84_F * WGS84_F;

/// Geodetic position, angles in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geodetic {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_m: f64,
}

impl Geodetic {
    pub fn new(lat_deg: f64, lon_deg: f64, alt_m: f64) -> Self {
        Self {
            lat_deg,
            lon_deg,
            alt_m,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lat_deg.is_finite() && self.lon_deg.is_finite() && self.alt_m.is_finite()
    }
}

/// Earth-centered, earth-fixed position in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ecef {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Local east/north/up offset in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Enu {
    pub east: f64,
    pub north: f64,
    pub up: f64,
}

impl Enu {
    /// Horizontal component
    pub fn horizontal(&self) -> Point2 {
        Point2::new(self.east, self.north)
    }
}

/// Convert a geodetic position to ECEF
pub fn geodetic_to_ecef(position: &Geodetic) -> Ecef {
    let (sin_lat, cos_lat) = position.lat_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = position.lon_deg.to_radians().sin_cos();
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    Ecef {
        x: (n + position.alt_m) * cos_lat * cos_lon,
        y: (n + position.alt_m) * cos_lat * sin_lon,
        z: (n * (1.0 - WGS84_E2) + position.alt_m) * sin_lat,
    }
}

/// Local tangent frame anchored at a reference position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    origin: Ecef,
    sin_lat: f64,
    cos_lat: f64,
    sin_lon: f64,
    cos_lon: f64,
}

impl LocalFrame {
    pub fn new(reference: &Geodetic) -> Result<Self, GeometryError> {
        if !reference.is_finite() {
            return Err(GeometryError::NonFinite("geodetic reference"));
        }
        let (sin_lat, cos_lat) = reference.lat_deg.to_radians().sin_cos();
        let (sin_lon, cos_lon) = reference.lon_deg.to_radians().sin_cos();
        Ok(Self {
            origin: geodetic_to_ecef(reference),
            sin_lat,
            cos_lat,
            sin_lon,
            cos_lon,
        })
    }

    /// Offset of `position` from the reference
    pub fn to_enu(&self, position: &Geodetic) -> Enu {
        let p = geodetic_to_ecef(position);
        let dx = p.x - self.origin.x;
        let dy = p.y - self.origin.y;
        let dz = p.z - self.origin.z;

        Enu {
            east: -self.sin_lon * dx + self.cos_lon * dy,
            north: -self.sin_lat * self.cos_lon * dx - self.sin_lat * self.sin_lon * dy
                + self.cos_lat * dz,
            up: self.cos_lat * self.cos_lon * dx + self.cos_lat * self.sin_lon * dy
                + self.sin_lat * dz,
        }
    }
}

/// Express a horizontal ENU offset in a vehicle frame (x forward, y left)
/// whose heading is counterclockwise from east
pub fn enu_to_vehicle(offset: Point2, heading_rad: f64) -> Point2 {
    offset.rotate(-heading_rad)
}

/// Inverse of [`enu_to_vehicle`]
pub fn vehicle_to_enu(offset: Point2, heading_rad: f64) -> Point2 {
    offset.rotate(heading_rad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_equator_ecef() {
        let ecef = geodetic_to_ecef(&Geodetic::new(0.0, 0.0, 0.0));
        assert!((ecef.x - WGS84_A).abs() < 1e-6);
        assert!(ecef.y.abs() < 1e-6);
        assert!(ecef.z.abs() < 1e-6);
    }

    #[test]
    fn test_reference_maps_to_origin() {
        let reference = Geodetic::new(48.137, 11.575, 520.0);
        let frame = LocalFrame::new(&reference).unwrap();
        let enu = frame.to_enu(&reference);
        assert!(enu.east.abs() < 1e-6 && enu.north.abs() < 1e-6 && enu.up.abs() < 1e-6);
    }

    #[test]
    fn test_small_offsets_point_north_and_east() {
        let reference = Geodetic::new(48.0, 11.0, 0.0);
        let frame = LocalFrame::new(&reference).unwrap();

        // 1e-5 degrees of latitude is about 1.1 m
        let north = frame.to_enu(&Geodetic::new(48.000_01, 11.0, 0.0));
        assert!(north.north > 1.0 && north.north < 1.2);
        assert!(north.east.abs() < 1e-6);

        let east = frame.to_enu(&Geodetic::new(48.0, 11.000_01, 0.0));
        assert!(east.east > 0.7 && east.east < 0.8);
        assert!(east.north.abs() < 1e-3);
    }

    #[test]
    fn test_non_finite_reference() {
        assert!(LocalFrame::new(&Geodetic::new(f64::NAN, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_vehicle_frame_rotation() {
        let north = Point2::new(0.0, 1.0);
        let ahead = enu_to_vehicle(north, FRAC_PI_2);
        assert!((ahead.x - 1.0).abs() < 1e-12 && ahead.y.abs() < 1e-12);
        let back = vehicle_to_enu(ahead, FRAC_PI_2);
        assert!(back.distance(north) < 1e-12);
    }
}
