//! Distance, direction and viewport-visibility metrics between projected points.

use crate::geometry::{Point, Rect, mercator};

/// Sphere radius used for great-circle distances, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_378_000.0;

/// Bucket assigned to points outside every scaled viewport.
pub const FAR_BUCKET: u8 = 3;

/// Scale factors defining the intermediate visibility buckets.
///
/// Bucket 0 is the viewport itself, bucket 1 the viewport expanded by `near`,
/// bucket 2 expanded by `far`, and everything else lands in [`FAR_BUCKET`].
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityScales {
    pub near: f64,
    pub far: f64,
}

impl Default for VisibilityScales {
    fn default() -> Self {
        Self {
            near: 3.0,
            far: 5.0,
        }
    }
}

/// Metrics computed once per candidate against the query's viewport snapshot.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoMetrics {
    /// Great-circle distance from the viewport center, meters.
    pub distance_m: f64,
    /// Direction from the viewport center, radians.
    pub bearing_rad: f64,
    pub visibility: u8,
}

impl GeoMetrics {
    pub fn measure(viewport: &Rect, scales: &VisibilityScales, point: Point) -> Self {
        let center = viewport.center();
        Self {
            distance_m: distance(center, point),
            bearing_rad: bearing(center, point),
            visibility: visibility_bucket(viewport, scales, point),
        }
    }
}

/// Haversine distance in meters between two projected points.
pub fn distance(a: Point, b: Point) -> f64 {
    let a = mercator::to_geographic(a);
    let b = mercator::to_geographic(b);

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Direction from `a` to `b` in radians, measured counter-clockwise from the
/// positive `x` axis of the projected plane.
///
/// Mercator is conformal, so this angle is the true (rhumb-line) heading
/// expressed in math convention rather than compass convention.
pub fn bearing(a: Point, b: Point) -> f64 {
    (b.y - a.y).atan2(b.x - a.x)
}

/// Smallest bucket whose scaled viewport contains `point`, or [`FAR_BUCKET`].
pub fn visibility_bucket(viewport: &Rect, scales: &VisibilityScales, point: Point) -> u8 {
    if viewport.contains_point(point) {
        0
    } else if viewport.scaled(scales.near).contains_point(point) {
        1
    } else if viewport.scaled(scales.far).contains_point(point) {
        2
    } else {
        FAR_BUCKET
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;

    fn viewport() -> Rect {
        Rect::new(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn test_visibility_buckets() {
        let scales = VisibilityScales::default();
        assert_eq!(visibility_bucket(&viewport(), &scales, Point::new(5.0, 5.0)), 0);
        assert_eq!(visibility_bucket(&viewport(), &scales, Point::new(15.0, 5.0)), 1);
        assert_eq!(visibility_bucket(&viewport(), &scales, Point::new(25.0, -15.0)), 2);
        assert_eq!(visibility_bucket(&viewport(), &scales, Point::new(50.0, 50.0)), 3);
    }

    #[test]
    fn test_visibility_uses_configured_scales() {
        let scales = VisibilityScales {
            near: 2.0,
            far: 11.0,
        };
        // Outside 2x ([-5,15]) but inside 11x ([-50,55]).
        assert_eq!(visibility_bucket(&viewport(), &scales, Point::new(50.0, 50.0)), 2);
    }

    #[test]
    fn test_distance_along_equator() {
        let one_degree = distance(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        let expected = EARTH_RADIUS_METERS * 1f64.to_radians();
        assert!((one_degree - expected).abs() < 1e-6);
        assert_eq!(distance(Point::new(3.0, 4.0), Point::new(3.0, 4.0)), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = mercator::from_geographic(53.9, 27.56);
        let b = mercator::from_geographic(52.52, 13.4);
        assert!((distance(a, b) - distance(b, a)).abs() < 1e-6);
        // Minsk to Berlin is roughly 950 km.
        let d = distance(a, b);
        assert!((900_000.0..1_000_000.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_bearing_quadrants() {
        let o = Point::new(0.0, 0.0);
        assert!((bearing(o, Point::new(1.0, 0.0))).abs() < 1e-12);
        assert!((bearing(o, Point::new(0.0, 1.0)) - FRAC_PI_2).abs() < 1e-12);
        assert!((bearing(o, Point::new(-1.0, 0.0)) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_measure_uses_viewport_center() {
        let m = GeoMetrics::measure(&viewport(), &VisibilityScales::default(), Point::new(5.0, 5.0));
        assert_eq!(m.distance_m, 0.0);
        assert_eq!(m.visibility, 0);
    }
}
