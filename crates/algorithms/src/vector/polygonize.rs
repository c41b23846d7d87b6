//! Raster to vector: one polygon per connected region of equal value
//!
//! Regions are labelled with a stack-based flood fill. The boundary of each
//! region is assembled from directed cell edges on the pixel-corner lattice,
//! oriented so the region lies to the right when walking in screen
//! coordinates (row axis pointing down). Rings are then traced edge by edge.
//!
//! Where two diagonal cells of a region meet at a single corner the tracer
//! has to choose between two outgoing edges. With 4-connectivity it turns
//! towards the region, keeping the diagonal cells apart; with 8-connectivity
//! it turns away, joining them. Holes are therefore always connected under
//! the opposite rule, and every region traces to one shell plus its holes.

use std::collections::HashMap;

use geo::orient::{Direction, Orient};
use geo::{Coord, LineString, Polygon};
use riparian_core::{Error, GeoTransform, Raster, RasterElement, Result, CRS};
use tracing::debug;

use super::codec::encode_polygon;

/// Cell adjacency used to decide which cells belong to the same region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Edge neighbours only
    #[default]
    Four,
    /// Edge and corner neighbours
    Eight,
}

impl std::str::FromStr for Connectivity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "4" => Ok(Connectivity::Four),
            "8" => Ok(Connectivity::Eight),
            other => Err(Error::InvalidParameter {
                name: "connectivity",
                value: other.to_string(),
                reason: "expected 4 or 8".into(),
            }),
        }
    }
}

/// Parameters for vectorization
#[derive(Debug, Clone, Copy, Default)]
pub struct PolygonizeParams {
    pub connectivity: Connectivity,
}

/// One vectorized region: serialized boundary and the cell value it covers
#[derive(Debug, Clone, PartialEq)]
pub struct RawShape<T> {
    /// GeoJSON Polygon text in world coordinates
    pub boundary: String,
    pub value: T,
}

/// Output of [`polygonize`]: shapes in region discovery order plus the
/// raster's CRS
#[derive(Debug, Clone)]
pub struct Polygonized<T> {
    pub shapes: Vec<RawShape<T>>,
    pub crs: CRS,
}

impl<T> Polygonized<T> {
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Split into parallel boundary and value sequences
    pub fn into_parts(self) -> (Vec<String>, Vec<T>, CRS) {
        let (boundaries, values) = self
            .shapes
            .into_iter()
            .map(|s| (s.boundary, s.value))
            .unzip();
        (boundaries, values, self.crs)
    }
}

/// Vectorize a classified raster.
///
/// Emits one shape per maximal connected region of cells sharing a value,
/// ordered by the row-major position of each region's first cell. Every
/// cell is covered by exactly one shape. NaN cells of float rasters form
/// regions like any other value.
///
/// Fails with [`Error::MissingCrs`] when the raster carries no CRS.
pub fn polygonize<T: RasterElement>(
    raster: &Raster<T>,
    params: PolygonizeParams,
) -> Result<Polygonized<T>> {
    let crs = raster.require_crs("classified raster")?.clone();
    let transform = raster.transform();

    let regions = label_regions(raster, params.connectivity);
    let edges = region_edges(&regions, raster.rows(), raster.cols());

    let mut shapes = Vec::with_capacity(regions.values.len());
    for (label, region) in edges.iter().enumerate() {
        let polygon = trace_polygon(region, params.connectivity, transform)?;
        shapes.push(RawShape {
            boundary: encode_polygon(&polygon)?,
            value: regions.values[label],
        });
    }

    debug!(
        rows = raster.rows(),
        cols = raster.cols(),
        shapes = shapes.len(),
        connectivity = ?params.connectivity,
        "vectorized raster"
    );

    Ok(Polygonized { shapes, crs })
}

// ---------------------------------------------------------------------------
// Region labelling
// ---------------------------------------------------------------------------

const UNLABELED: usize = usize::MAX;

const FOUR: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const EIGHT: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1), (0, 1),
    (1, -1), (1, 0), (1, 1),
];

struct Regions<T> {
    /// Region label per cell, row-major
    labels: Vec<usize>,
    /// Cell value per region label
    values: Vec<T>,
}

fn label_regions<T: RasterElement>(raster: &Raster<T>, connectivity: Connectivity) -> Regions<T> {
    let (rows, cols) = raster.shape();
    let data = raster.data();
    let offsets: &[(isize, isize)] = match connectivity {
        Connectivity::Four => &FOUR,
        Connectivity::Eight => &EIGHT,
    };

    let mut labels = vec![UNLABELED; rows * cols];
    let mut values = Vec::new();
    let mut stack = Vec::new();

    for row in 0..rows {
        for col in 0..cols {
            if labels[row * cols + col] != UNLABELED {
                continue;
            }
            let label = values.len();
            let value = data[(row, col)];
            values.push(value);

            labels[row * cols + col] = label;
            stack.push((row, col));

            while let Some((r, c)) = stack.pop() {
                for &(dr, dc) in offsets {
                    let nr = r as isize + dr;
                    let nc = c as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    let idx = nr * cols + nc;
                    if labels[idx] == UNLABELED && data[(nr, nc)].same_class(value) {
                        labels[idx] = label;
                        stack.push((nr, nc));
                    }
                }
            }
        }
    }

    Regions { labels, values }
}

// ---------------------------------------------------------------------------
// Boundary edges
// ---------------------------------------------------------------------------

/// Lattice point `(x, y)` = `(col, row)` of a cell corner
type Vertex = (usize, usize);

/// Edge direction on the corner lattice, row axis pointing down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Step {
    East,
    South,
    West,
    North,
}

impl Step {
    fn advance(self, (x, y): Vertex) -> Vertex {
        match self {
            Step::East => (x + 1, y),
            Step::South => (x, y + 1),
            Step::West => (x - 1, y),
            Step::North => (x, y - 1),
        }
    }

    /// Turn towards the region side of an edge
    fn inward(self) -> Step {
        match self {
            Step::East => Step::South,
            Step::South => Step::West,
            Step::West => Step::North,
            Step::North => Step::East,
        }
    }

    /// Turn away from the region side of an edge
    fn outward(self) -> Step {
        match self {
            Step::East => Step::North,
            Step::North => Step::West,
            Step::West => Step::South,
            Step::South => Step::East,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    start: Vertex,
    step: Step,
}

/// Directed boundary edges of every region, indexed by label
fn region_edges<T>(regions: &Regions<T>, rows: usize, cols: usize) -> Vec<Vec<Edge>> {
    let mut edges: Vec<Vec<Edge>> = vec![Vec::new(); regions.values.len()];
    let labels = &regions.labels;

    for row in 0..rows {
        for col in 0..cols {
            let label = labels[row * cols + col];
            let differs = |r: Option<usize>, c: Option<usize>| match (r, c) {
                (Some(r), Some(c)) if r < rows && c < cols => labels[r * cols + c] != label,
                _ => true,
            };
            let out = &mut edges[label];

            if differs(row.checked_sub(1), Some(col)) {
                out.push(Edge { start: (col, row), step: Step::East });
            }
            if differs(Some(row), Some(col + 1)) {
                out.push(Edge { start: (col + 1, row), step: Step::South });
            }
            if differs(Some(row + 1), Some(col)) {
                out.push(Edge { start: (col + 1, row + 1), step: Step::West });
            }
            if differs(Some(row), col.checked_sub(1)) {
                out.push(Edge { start: (col, row + 1), step: Step::North });
            }
        }
    }

    edges
}

// ---------------------------------------------------------------------------
// Ring tracing
// ---------------------------------------------------------------------------

/// Corner vertices of every closed ring formed by `edges`
fn trace_rings(edges: &[Edge], connectivity: Connectivity) -> Result<Vec<Vec<Vertex>>> {
    let index: HashMap<(Vertex, Step), usize> = edges
        .iter()
        .enumerate()
        .map(|(i, e)| ((e.start, e.step), i))
        .collect();

    let successor = |edge: Edge| -> Option<usize> {
        let at = edge.step.advance(edge.start);
        let preference = match connectivity {
            Connectivity::Four => [edge.step.inward(), edge.step, edge.step.outward()],
            Connectivity::Eight => [edge.step.outward(), edge.step, edge.step.inward()],
        };
        preference.iter().find_map(|&step| index.get(&(at, step)).copied())
    };

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for first in 0..edges.len() {
        if used[first] {
            continue;
        }

        let mut ring = Vec::new();
        let mut current = first;
        loop {
            used[current] = true;
            let edge = edges[current];
            let next = successor(edge).ok_or_else(|| {
                Error::Algorithm(format!("open region boundary at {:?}", edge.step.advance(edge.start)))
            })?;

            // Keep corners only
            if edges[next].step != edge.step {
                ring.push(edges[next].start);
            }
            if next == first {
                break;
            }
            if used[next] {
                return Err(Error::Algorithm("region boundary revisits an edge".into()));
            }
            current = next;
        }

        if let Some(&start) = ring.first() {
            ring.push(start);
        }
        rings.push(ring);
    }

    Ok(rings)
}

/// Twice the signed lattice area of a closed ring
fn doubled_area(ring: &[Vertex]) -> i64 {
    ring.windows(2)
        .map(|w| {
            let (x0, y0) = (w[0].0 as i64, w[0].1 as i64);
            let (x1, y1) = (w[1].0 as i64, w[1].1 as i64);
            x0 * y1 - x1 * y0
        })
        .sum()
}

fn trace_polygon(
    edges: &[Edge],
    connectivity: Connectivity,
    transform: &GeoTransform,
) -> Result<Polygon<f64>> {
    let mut rings = trace_rings(edges, connectivity)?;

    let shell = rings
        .iter()
        .enumerate()
        .max_by_key(|(_, r)| doubled_area(r).abs())
        .map(|(i, _)| i)
        .ok_or_else(|| Error::Algorithm("region without boundary".into()))?;
    let exterior = rings.swap_remove(shell);

    let to_world = |ring: Vec<Vertex>| -> LineString<f64> {
        ring.into_iter()
            .map(|(x, y)| {
                let (wx, wy) = transform.corner_to_geo(x, y);
                Coord { x: wx, y: wy }
            })
            .collect()
    };

    let polygon = Polygon::new(
        to_world(exterior),
        rings.into_iter().map(to_world).collect(),
    );
    Ok(polygon.orient(Direction::Default))
}
