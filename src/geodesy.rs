//! Geodesy primitives spec.md §2 treats as an external collaborator: great
//! circle distance and azimuth, destination-point projection, and a
//! length-indexed view over a polyline. Implemented on top of the `geo`
//! crate's `Haversine`/`Euclidean` metric spaces, the same way the teacher
//! this crate grew from uses `Haversine::distance` in
//! `layers/transit_network.rs`.

use geo::{
    Bearing, Destination, Distance, Euclidean, Haversine, Length, LineInterpolatePoint,
    LineLocatePoint, LineString, Point,
};

/// Great-circle distance in metres between two `(lon, lat)` points.
pub fn haversine_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    Haversine::distance(Point::new(a.0, a.1), Point::new(b.0, b.1))
}

/// Forward azimuth in degrees from `a` to `b`, normalised to `(-180, 180]`.
pub fn azimuth(a: (f64, f64), b: (f64, f64)) -> f64 {
    let bearing = Haversine::bearing(Point::new(a.0, a.1), Point::new(b.0, b.1));
    normalize_azimuth(bearing)
}

/// Destination point from `origin` travelling `distance_m` metres along
/// `azimuth_deg` (any azimuth convention accepted by `geo`'s `Destination`).
pub fn destination(origin: (f64, f64), azimuth_deg: f64, distance_m: f64) -> (f64, f64) {
    let p = Haversine::destination(Point::new(origin.0, origin.1), azimuth_deg, distance_m);
    (p.x(), p.y())
}

/// Normalise a bearing in degrees to `(-180, 180]`.
pub fn normalize_azimuth(deg: f64) -> f64 {
    let mut a = deg % 360.0;
    if a <= -180.0 {
        a += 360.0;
    } else if a > 180.0 {
        a -= 360.0;
    }
    a
}

/// A length-indexed view over a polyline, parameterised by cartesian
/// (degree-space) arc length rather than a 0..1 fraction — the
/// "Length-indexed line" wrapper spec.md's Design Notes section describes.
///
/// `project`/`extract_point` both work in the same index units as
/// `start_index()`/`end_index()`; converting to metres is the caller's job
/// via the `scale` spec.md §4.1 derives from `way_len`.
pub struct LengthIndexedLine {
    line: LineString<f64>,
    total_length: f64,
}

impl LengthIndexedLine {
    pub fn new(coords: &[(f64, f64)]) -> LengthIndexedLine {
        let line = LineString::from(coords.to_vec());
        let total_length = line.length::<Euclidean>();
        LengthIndexedLine { line, total_length }
    }

    pub fn start_index(&self) -> f64 {
        0.0
    }

    pub fn end_index(&self) -> f64 {
        self.total_length
    }

    /// Project `point` onto the line, returning its index (arc length from
    /// `start_index()`).
    pub fn project(&self, point: (f64, f64)) -> f64 {
        if self.total_length == 0.0 {
            return 0.0;
        }
        let fraction = self
            .line
            .line_locate_point(&Point::new(point.0, point.1))
            .unwrap_or(0.0);
        fraction * self.total_length
    }

    /// Extract the point at `index`, clamped to `[start_index, end_index]`.
    pub fn extract_point(&self, index: f64) -> (f64, f64) {
        if self.total_length == 0.0 {
            let c = self.line.0.first().copied().unwrap_or(geo_types::coord! { x: 0.0, y: 0.0 });
            return (c.x, c.y);
        }
        let clamped = index.clamp(self.start_index(), self.end_index());
        let fraction = clamped / self.total_length;
        let p = self
            .line
            .line_interpolate_point(fraction)
            .expect("fraction is clamped to [0, 1]");
        (p.x(), p.y())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn azimuth_normalizes_into_range() {
        assert!((-180.0..=180.0).contains(&normalize_azimuth(181.0)));
        assert_eq!(normalize_azimuth(0.0), 0.0);
        assert_eq!(normalize_azimuth(360.0), 0.0);
        assert_eq!(normalize_azimuth(-360.0), 0.0);
    }

    #[test]
    fn haversine_distance_is_symmetric_and_positive() {
        let a = (0.0, 0.0);
        let b = (0.0, 0.001);
        let d_ab = haversine_distance(a, b);
        let d_ba = haversine_distance(b, a);
        assert!(d_ab > 0.0);
        assert!((d_ab - d_ba).abs() < 1e-9);
    }

    #[test]
    fn length_indexed_line_round_trips_endpoints() {
        let coords = vec![(0.0, 0.0), (0.0, 0.0005), (0.0, 0.001)];
        let line = LengthIndexedLine::new(&coords);
        assert_eq!(line.project((0.0, 0.0)), line.start_index());
        assert!((line.project((0.0, 0.001)) - line.end_index()).abs() < 1e-12);
        let mid = line.extract_point(line.end_index() / 2.0);
        assert!((mid.1 - 0.0005).abs() < 1e-9);
    }

    #[test]
    fn destination_and_azimuth_are_roughly_inverse() {
        let origin = (0.0, 0.0);
        let dest = destination(origin, 90.0, 100.0);
        let back = azimuth(origin, dest);
        assert!((back - 90.0).abs() < 0.5);
    }
}
