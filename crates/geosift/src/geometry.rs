//! Planar geometry in the spherical-mercator projection.
//!
//! Candidate geometry arrives from the index already projected: `x` is the
//! longitude in degrees and `y` is the mercator-stretched latitude, also in
//! degrees. Everything that needs real-world units (distances) converts back
//! through [`mercator::to_geographic`].

use std::fmt;

/// A point in the projected plane.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle in the projected plane.
///
/// Bounds are inclusive on every edge, so a degenerate rectangle (a single
/// point) still contains its own corner.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// Build a rectangle from any two opposite corners.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            min: Point::new(x0.min(x1), y0.min(y1)),
            max: Point::new(x0.max(x1), y0.max(y1)),
        }
    }

    /// Zero-sized rectangle around a single point.
    pub const fn from_point(p: Point) -> Self {
        Self { min: p, max: p }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Expand (or shrink) the rectangle by `factor` symmetrically about its center.
    ///
    /// `[(0,0)-(10,10)].scaled(5.0)` is `[(-20,-20)-(30,30)]`.
    pub fn scaled(&self, factor: f64) -> Self {
        let c = self.center();
        let half_w = self.width() * factor / 2.0;
        let half_h = self.height() * factor / 2.0;
        Self {
            min: Point::new(c.x - half_w, c.y - half_h),
            max: Point::new(c.x + half_w, c.y + half_h),
        }
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}-{}]", self.min, self.max)
    }
}

/// Geographic coordinate in decimal degrees.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Conversions between geographic coordinates and the projected plane.
pub mod mercator {
    use super::{LatLon, Point};

    /// Projected `y` range; keeps the poles finite.
    pub const MAX_Y: f64 = 180.0;
    pub const MIN_Y: f64 = -180.0;

    pub const fn lon_to_x(lon: f64) -> f64 {
        lon
    }

    pub const fn x_to_lon(x: f64) -> f64 {
        x
    }

    pub fn lat_to_y(lat: f64) -> f64 {
        let lat = lat.clamp(-86.0, 86.0).to_radians();
        let y = (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln().to_degrees();
        y.clamp(MIN_Y, MAX_Y)
    }

    pub fn y_to_lat(y: f64) -> f64 {
        y.to_radians().sinh().atan().to_degrees()
    }

    pub fn to_geographic(p: Point) -> LatLon {
        LatLon {
            lat: y_to_lat(p.y),
            lon: x_to_lon(p.x),
        }
    }

    pub fn from_geographic(lat: f64, lon: f64) -> Point {
        Point::new(lon_to_x(lon), lat_to_y(lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_is_symmetric_about_center() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        let s = r.scaled(5.0);
        assert_eq!(s, Rect::new(-20.0, -20.0, 30.0, 30.0));
        assert_eq!(s.center(), r.center());

        let s3 = r.scaled(3.0);
        assert_eq!(s3, Rect::new(-10.0, -10.0, 20.0, 20.0));
    }

    #[test]
    fn test_contains_point_is_inclusive() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains_point(Point::new(0.0, 0.0)));
        assert!(r.contains_point(Point::new(10.0, 5.0)));
        assert!(!r.contains_point(Point::new(10.000_001, 5.0)));
        assert!(Rect::from_point(Point::new(1.0, 1.0)).contains_point(Point::new(1.0, 1.0)));
    }

    #[test]
    fn test_new_normalizes_corners() {
        let r = Rect::new(10.0, 4.0, -2.0, -6.0);
        assert_eq!(r.min, Point::new(-2.0, -6.0));
        assert_eq!(r.max, Point::new(10.0, 4.0));
    }

    #[test]
    fn test_mercator_equator_and_inverse() {
        assert!(mercator::lat_to_y(0.0).abs() < 1e-12);
        let y = mercator::lat_to_y(53.9);
        assert!(y > 53.9, "mercator stretches latitudes away from the equator");
        assert!((mercator::y_to_lat(y) - 53.9).abs() < 1e-9);

        let ll = mercator::to_geographic(mercator::from_geographic(-33.86, 151.2));
        assert!((ll.lat + 33.86).abs() < 1e-9);
        assert!((ll.lon - 151.2).abs() < 1e-12);
    }
}
