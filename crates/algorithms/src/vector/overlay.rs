//! Dissolve and explode
//!
//! `dissolve` merges any number of polygonal geometries into their union;
//! `explode` splits a union back into its connected parts. Together they
//! turn a set of adjacent or overlapping features into non-overlapping
//! contiguous patches.

use geo::{BooleanOps, MultiPolygon, Polygon};

/// Union of all geometries.
///
/// Geometries are merged pairwise in a balanced reduction so no single
/// union has to absorb the whole accumulated result at every step.
pub fn dissolve<'a, I>(geometries: I) -> MultiPolygon<f64>
where
    I: IntoIterator<Item = &'a MultiPolygon<f64>>,
{
    let mut layer: Vec<MultiPolygon<f64>> = geometries
        .into_iter()
        .filter(|g| !g.0.is_empty())
        .cloned()
        .collect();

    while layer.len() > 1 {
        let mut pending = layer.into_iter();
        layer = std::iter::from_fn(|| {
            let a = pending.next()?;
            Some(match pending.next() {
                Some(b) => a.union(&b),
                None => a,
            })
        })
        .collect();
    }

    match layer.pop() {
        // A lone input still goes through one union to merge its own parts
        Some(single) => single.union(&MultiPolygon::new(Vec::new())),
        None => MultiPolygon::new(Vec::new()),
    }
}

/// Connected parts of a dissolved geometry, one polygon each
pub fn explode(geometry: MultiPolygon<f64>) -> Vec<Polygon<f64>> {
    geometry.0
}
