//! Text codec for region boundaries, plus geometry repair
//!
//! Region boundaries travel between vectorization and assembly as GeoJSON
//! geometry text. Decoding accepts Polygon and MultiPolygon only and always
//! yields a `MultiPolygon`, so one region that repairs into several parts
//! keeps a single geometry.

use std::collections::HashMap;

use geo::orient::{Direction, Orient};
use geo::{
    BooleanOps, Contains, Coord, CoordsIter, Geometry, InteriorPoint, LineString, MultiPolygon,
    Polygon,
};
use geojson::{GeoJson, JsonValue};
use riparian_core::{Error, Result};

/// Serialize a polygon as GeoJSON geometry text
pub fn encode_polygon(polygon: &Polygon<f64>) -> Result<String> {
    let geometry = geojson::Geometry::new(geojson::Value::from(polygon));
    Ok(serde_json::to_string(&geometry)?)
}

/// Parse one serialized boundary into a multipolygon.
///
/// `index` is the position of the shape in its batch and is reported in
/// [`Error::GeometryDecode`] on failure.
pub fn decode_shape(index: usize, text: &str) -> Result<MultiPolygon<f64>> {
    let fail = |reason: String| Error::GeometryDecode { index, reason };

    let value: JsonValue = serde_json::from_str(text).map_err(|e| fail(e.to_string()))?;
    let geometry = match GeoJson::from_json_value(value).map_err(|e| fail(e.to_string()))? {
        GeoJson::Geometry(g) => g,
        GeoJson::Feature(_) => return Err(fail("expected a geometry, found a Feature".into())),
        GeoJson::FeatureCollection(_) => {
            return Err(fail("expected a geometry, found a FeatureCollection".into()))
        }
    };

    let multi = match Geometry::<f64>::try_from(geometry).map_err(|e| fail(e.to_string()))? {
        Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
        Geometry::MultiPolygon(mp) => mp,
        other => {
            return Err(fail(format!(
                "expected Polygon or MultiPolygon, found {}",
                geometry_kind(&other)
            )))
        }
    };

    if !multi.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
        return Err(fail("non-finite coordinate".into()));
    }
    for polygon in &multi.0 {
        let short = std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .any(|ring| ring.0.len() < 4);
        if short {
            return Err(fail("ring with fewer than 4 positions".into()));
        }
    }

    Ok(multi)
}

/// Rebuild a geometry into simple rings.
///
/// The geometry is first normalized through a polygon union with the empty
/// set. Every ring is then cut at repeated vertices: loops that keep the
/// orientation of the outer walk become separate shells, loops that reverse
/// it become holes touching their shell at one point. Zero-area loops are
/// dropped. Exteriors come out counter-clockwise and interiors clockwise.
///
/// Covered area is unchanged, and repairing an already repaired geometry
/// yields the same rings.
pub fn repair(geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    let merged = geometry.union(&MultiPolygon::new(Vec::new()));
    let parts: Vec<Polygon<f64>> = merged.0.iter().flat_map(simple_parts).collect();
    MultiPolygon::new(parts).orient(Direction::Default)
}

/// Split one polygon into polygons whose rings never revisit a vertex
fn simple_parts(polygon: &Polygon<f64>) -> Vec<Polygon<f64>> {
    let loops = split_ring(polygon.exterior());
    let Some(outer) = loops
        .iter()
        .map(ring_area)
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
    else {
        return Vec::new();
    };

    let (shells, mut holes): (Vec<_>, Vec<_>) = loops
        .into_iter()
        .partition(|ring| ring_area(ring).signum() == outer.signum());
    holes.extend(polygon.interiors().iter().flat_map(split_ring));

    let mut parts: Vec<(LineString<f64>, Vec<LineString<f64>>)> =
        shells.into_iter().map(|shell| (shell, Vec::new())).collect();
    for hole in holes {
        let owner = if parts.len() == 1 {
            0
        } else {
            Polygon::new(hole.clone(), Vec::new())
                .interior_point()
                .and_then(|inside| {
                    parts
                        .iter()
                        .position(|(shell, _)| Polygon::new(shell.clone(), Vec::new()).contains(&inside))
                })
                .unwrap_or(0)
        };
        parts[owner].1.push(hole);
    }

    parts
        .into_iter()
        .map(|(shell, holes)| Polygon::new(shell, holes))
        .collect()
}

/// Cut a closed ring into simple closed loops at every repeated vertex
fn split_ring(ring: &LineString<f64>) -> Vec<LineString<f64>> {
    let open = match ring.0.split_last() {
        Some((last, rest)) if ring.is_closed() && !rest.is_empty() && rest[0] == *last => rest,
        _ => &ring.0[..],
    };

    let mut loops = Vec::new();
    let mut path: Vec<Coord<f64>> = Vec::with_capacity(open.len());
    let mut seen: HashMap<(u64, u64), usize> = HashMap::new();

    for &c in open {
        let revisit = seen.get(&vertex_key(c)).copied();
        match revisit {
            Some(at) => {
                let tail = path.split_off(at + 1);
                for v in &tail {
                    seen.remove(&vertex_key(*v));
                }
                let mut lp = Vec::with_capacity(tail.len() + 2);
                lp.push(c);
                lp.extend(tail);
                lp.push(c);
                push_loop(&mut loops, lp);
            }
            None => {
                seen.insert(vertex_key(c), path.len());
                path.push(c);
            }
        }
    }
    if let Some(&first) = path.first() {
        path.push(first);
        push_loop(&mut loops, path);
    }

    loops
}

fn push_loop(loops: &mut Vec<LineString<f64>>, coords: Vec<Coord<f64>>) {
    let ring = LineString::new(coords);
    if ring.0.len() >= 4 && ring_area(&ring) != 0.0 {
        loops.push(ring);
    }
}

/// Signed shoelace area, positive when counter-clockwise
fn ring_area(ring: &LineString<f64>) -> f64 {
    ring.lines()
        .map(|l| l.start.x * l.end.y - l.end.x * l.start.y)
        .sum::<f64>()
        / 2.0
}

fn vertex_key(c: Coord<f64>) -> (u64, u64) {
    // -0.0 and 0.0 are the same vertex
    ((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits())
}

fn geometry_kind(g: &Geometry<f64>) -> &'static str {
    match g {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
