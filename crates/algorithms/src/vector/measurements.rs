//! Geometric measurements: area and perimeter of polygonal features

use geo::{Area, Euclidean, Length, MultiPolygon, Polygon};

/// Square metres per square kilometre
pub const M2_PER_KM2: f64 = 1_000_000.0;
/// Metres per kilometre
pub const M_PER_KM: f64 = 1_000.0;

/// Planar area of a multipolygon in CRS units squared.
///
/// Holes are subtracted. For a geographic CRS the result is in square
/// degrees; statistics assume a projected, metre-based CRS.
pub fn area(geom: &MultiPolygon<f64>) -> f64 {
    geom.unsigned_area()
}

/// Total boundary length of a polygon: exterior plus every interior ring
pub fn polygon_perimeter(poly: &Polygon<f64>) -> f64 {
    let ext = poly.exterior().length::<Euclidean>();
    let int: f64 = poly.interiors().iter().map(|r| r.length::<Euclidean>()).sum();
    ext + int
}

/// Total boundary length of all parts of a multipolygon
pub fn perimeter(geom: &MultiPolygon<f64>) -> f64 {
    geom.0.iter().map(polygon_perimeter).sum()
}
