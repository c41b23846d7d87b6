//! End-to-end tests: classified raster -> features -> statistics.
//!
//! All rasters use 10 m cells in UTM zone 10N, so one cell is 100 m²
//! (1e-4 km²).

use geo::{CoordsIter, MultiPolygon};
use riparian_algorithms::landscape::{riparian_layers, riparian_stats, Watershed};
use riparian_algorithms::vector::{
    area, decode_shape, extract_features, polygonize, repair, Connectivity, ExtractionParams,
    PolygonizeParams,
};
use riparian_core::io::{read_feature_layer, read_geotiff, write_feature_layer, write_geotiff};
use riparian_core::{ClassCode, ClassCodes, Error, GeoTransform, Raster, CRS};
use riparian_parallel::Workers;

const CELL_AREA: f64 = 100.0;
const CELL_KM2: f64 = 1e-4;

fn classified(data: Vec<u8>, rows: usize, cols: usize) -> Raster<u8> {
    let mut r = Raster::from_vec(data, rows, cols).unwrap();
    r.set_transform(GeoTransform::new(500_000.0, 4_000_000.0, 10.0, -10.0));
    r.set_crs(Some(CRS::from_epsg(32610)));
    r
}

/// Deterministic mix of background, vegetated and non-vegetated cells
fn mixed(rows: usize, cols: usize) -> Raster<u8> {
    let data = (0..rows * cols)
        .map(|i| {
            let (r, c) = (i / cols, i % cols);
            match (r * 7 + c * 13 + (r * c) % 5) % 3 {
                0 => 0,
                1 => 1,
                _ => 255,
            }
        })
        .collect();
    classified(data, rows, cols)
}

/// Pseudo-random three-class raster from a fixed-seed LCG
fn scattered(rows: usize, cols: usize, seed: u64) -> Raster<u8> {
    let mut state = seed;
    let data = (0..rows * cols)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            [0, 1, 255][((state >> 33) % 3) as usize]
        })
        .collect();
    classified(data, rows, cols)
}

fn vertex_key(c: geo::Coord<f64>) -> (u64, u64) {
    ((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits())
}

/// First ring that passes through one of its vertices twice
fn self_touching_ring(mp: &MultiPolygon<f64>) -> Option<&geo::LineString<f64>> {
    mp.0.iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .find(|ring| {
            let open = &ring.0[..ring.0.len().saturating_sub(1)];
            let mut keys: Vec<_> = open.iter().map(|c| vertex_key(*c)).collect();
            keys.sort_unstable();
            keys.dedup();
            keys.len() != open.len()
        })
}

/// Distinct vertices, sorted
fn vertex_set(mp: &MultiPolygon<f64>) -> Vec<(f64, f64)> {
    let mut coords: Vec<_> = mp.coords_iter().map(|c| (c.x, c.y)).collect();
    coords.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    coords.dedup_by(|a, b| (a.0 - b.0).abs() < 1e-6 && (a.1 - b.1).abs() < 1e-6);
    coords
}

fn assert_same_vertices(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) {
    let (a, b) = (vertex_set(a), vertex_set(b));
    assert_eq!(a.len(), b.len());
    for (p, q) in a.iter().zip(&b) {
        assert!((p.0 - q.0).abs() < 1e-6 && (p.1 - q.1).abs() < 1e-6, "{:?} vs {:?}", p, q);
    }
}

fn watershed_over(raster: &Raster<u8>) -> Watershed {
    let (min_x, min_y, max_x, max_y) = raster.bounds();
    let boundary = MultiPolygon::new(vec![geo::Rect::new(
        geo::coord! { x: min_x, y: min_y },
        geo::coord! { x: max_x, y: max_y },
    )
    .to_polygon()]);
    Watershed::new("Test Creek", &boundary, raster.crs().cloned())
}

#[test]
fn block_in_corner_yields_two_features() {
    #[rustfmt::skip]
    let raster = classified(vec![
        1, 1, 0, 0,
        1, 1, 0, 0,
        0, 0, 0, 0,
        0, 0, 0, 0,
    ], 4, 4);

    let shapes = polygonize(&raster, PolygonizeParams::default()).unwrap();
    assert_eq!(shapes.len(), 2);

    let fc = extract_features(&raster, &ExtractionParams::default()).unwrap();
    assert_eq!(fc.len(), 2);

    let veg: Vec<_> = fc.of_class(ClassCode::Vegetated).collect();
    assert_eq!(veg.len(), 1);
    assert!((area(&veg[0].geometry) - 4.0 * CELL_AREA).abs() < 1e-6);

    let stats = riparian_stats(&watershed_over(&raster), &fc).unwrap();
    assert_eq!(stats.n_vegetated, 1);
    assert_eq!(stats.n_non_vegetated, 0);
    assert!((stats.vegetated_area_km2 - 4.0 * CELL_KM2).abs() < 1e-12);
    assert!((stats.watershed_area_km2 - 16.0 * CELL_KM2).abs() < 1e-12);
    assert!(stats.mean_non_vegetated_patch_km2.is_nan());
}

#[test]
fn worker_count_does_not_change_output() {
    // 25 x 40 checkerboard: 1,000 single-cell regions under 4-connectivity
    let data = (0..1000)
        .map(|i| if ((i / 40) + (i % 40)) % 2 == 0 { 1 } else { 255 })
        .collect();
    let raster = classified(data, 25, 40);

    let sequential = extract_features(
        &raster,
        &ExtractionParams {
            workers: Workers::Fixed(1),
            ..Default::default()
        },
    )
    .unwrap();
    let pooled = extract_features(
        &raster,
        &ExtractionParams {
            workers: Workers::Fixed(8),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(sequential.len(), 1000);
    assert_eq!(sequential, pooled);
    let ordinals: Vec<usize> = pooled.iter().map(|f| f.ordinal).collect();
    assert_eq!(ordinals, (0..1000).collect::<Vec<_>>());
}

#[test]
fn disjoint_non_vegetated_patches() {
    #[rustfmt::skip]
    let raster = classified(vec![
        255, 255, 0, 0,   0, 0,
        255, 255, 0, 0,   0, 0,
        0,   0,   0, 0,   0, 0,
        0,   0,   0, 255, 255, 255,
        0,   0,   0, 0,   0, 0,
    ], 5, 6);

    let fc = extract_features(&raster, &ExtractionParams::default()).unwrap();
    let stats = riparian_stats(&watershed_over(&raster), &fc).unwrap();

    assert_eq!(stats.n_non_vegetated, 2);
    assert!((stats.non_vegetated_area_km2 - 7.0 * CELL_KM2).abs() < 1e-12);
    assert!((stats.mean_non_vegetated_patch_km2 - 3.5 * CELL_KM2).abs() < 1e-12);
    assert_eq!(stats.n_riparian_features, 2);
    assert!((stats.non_vegetated_coverage_pct - 100.0).abs() < 1e-9);
    assert!((stats.vegetated_coverage_pct).abs() < 1e-12);
    // 2x2 block: 80 m, 1x3 strip: 80 m
    assert!((stats.non_vegetated_perimeter_km - 0.16).abs() < 1e-9);
}

#[test]
fn features_cover_every_cell_once() {
    let raster = mixed(30, 37);
    for connectivity in [Connectivity::Four, Connectivity::Eight] {
        let params = ExtractionParams {
            connectivity,
            ..Default::default()
        };
        let fc = extract_features(&raster, &params).unwrap();
        let shapes = polygonize(&raster, PolygonizeParams { connectivity }).unwrap();
        assert_eq!(fc.len(), shapes.len());

        let covered: f64 = fc.iter().map(|f| area(&f.geometry)).sum();
        let expected = (30 * 37) as f64 * CELL_AREA;
        assert!((covered - expected).abs() < 1e-6 * expected, "{:?}", connectivity);
    }
}

#[test]
fn dissolve_preserves_riparian_area() {
    let raster = mixed(24, 24);
    let fc = extract_features(&raster, &ExtractionParams::default()).unwrap();
    let stats = riparian_stats(&watershed_over(&raster), &fc).unwrap();

    let subsets = stats.vegetated_area_km2 + stats.non_vegetated_area_km2;
    assert!((subsets - stats.riparian_area_km2).abs() < 1e-9 * subsets.max(1.0));
    assert!((stats.vegetated_coverage_pct + stats.non_vegetated_coverage_pct - 100.0).abs() < 1e-6);

    let layers = riparian_layers(&fc);
    assert_eq!(layers.riparian.len(), stats.n_riparian_features);
    assert!(stats.n_riparian_features <= stats.n_vegetated + stats.n_non_vegetated);
}

#[test]
fn repair_is_idempotent_on_vectorized_shapes() {
    #[rustfmt::skip]
    let raster = classified(vec![
        1, 1, 1, 0,
        1, 0, 1, 0,
        1, 1, 0, 0,
        0, 0, 0, 1,
    ], 4, 4);
    let shapes = polygonize(&raster, PolygonizeParams::default()).unwrap();

    for (i, shape) in shapes.shapes.iter().enumerate() {
        let decoded = decode_shape(i, &shape.boundary).unwrap();
        let once = repair(&decoded);
        let twice = repair(&once);
        assert!((area(&once) - area(&decoded)).abs() < 1e-6);
        assert!((area(&twice) - area(&once)).abs() < 1e-6);
        assert_eq!(once.0.len(), twice.0.len());
        assert_same_vertices(&once, &twice);
    }
}

#[test]
fn pinched_pocket_becomes_interior() {
    #[rustfmt::skip]
    let raster = classified(vec![
        1, 1, 1,
        1, 0, 1,
        1, 1, 0,
    ], 3, 3);

    let fc = extract_features(&raster, &ExtractionParams::default()).unwrap();
    assert_eq!(fc.len(), 3);

    let veg: Vec<_> = fc.of_class(ClassCode::Vegetated).collect();
    assert_eq!(veg.len(), 1);
    let geometry = &veg[0].geometry;
    assert_eq!(geometry.0.len(), 1);
    assert_eq!(geometry.0[0].interiors().len(), 1);
    assert!(self_touching_ring(geometry).is_none(), "{:?}", geometry);
    assert!((area(geometry) - 7.0 * CELL_AREA).abs() < 1e-6);
}

#[test]
fn extracted_rings_are_simple_and_oriented() {
    use geo::Area;

    for seed in [1, 7, 42] {
        let raster = scattered(18, 23, seed);
        for connectivity in [Connectivity::Four, Connectivity::Eight] {
            let params = ExtractionParams {
                connectivity,
                ..Default::default()
            };
            let fc = extract_features(&raster, &params).unwrap();
            for feature in fc.iter() {
                assert!(
                    self_touching_ring(&feature.geometry).is_none(),
                    "seed {} {:?} feature {}",
                    seed,
                    connectivity,
                    feature.ordinal
                );
                for polygon in &feature.geometry.0 {
                    let shell = geo::Polygon::new(polygon.exterior().clone(), vec![]);
                    assert!(shell.signed_area() > 0.0);
                    for hole in polygon.interiors() {
                        assert!(geo::Polygon::new(hole.clone(), vec![]).signed_area() < 0.0);
                    }
                }
            }
        }
    }
}

#[test]
fn raster_without_crs_is_rejected() {
    let mut raster = mixed(4, 4);
    raster.set_crs(None);
    let err = extract_features(&raster, &ExtractionParams::default()).unwrap_err();
    assert!(matches!(err, Error::MissingCrs { context: "classified raster" }));
}

#[test]
fn signed_rasters_need_signed_codes() {
    let mut raster = Raster::<i16>::from_vec(vec![1, -1, 0, 0], 2, 2).unwrap();
    raster.set_crs(Some(CRS::from_epsg(32610)));

    assert!(matches!(
        extract_features(&raster, &ExtractionParams::default()),
        Err(Error::UnknownClass { .. })
    ));

    let params = ExtractionParams {
        class_codes: ClassCodes::signed(),
        ..Default::default()
    };
    let fc = extract_features(&raster, &params).unwrap();
    assert_eq!(fc.of_class(ClassCode::NonVegetated).count(), 1);
}

#[test]
fn geotiff_to_layer_to_statistics() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("classified.tif");
    let layer = dir.path().join("features.geojson");

    let raster = mixed(12, 15);
    write_geotiff(&raster, &tif, None).unwrap();
    let from_disk: Raster<u8> = read_geotiff(&tif).unwrap();

    let codes = ClassCodes::default();
    let fc = extract_features(&from_disk, &ExtractionParams::default()).unwrap();
    write_feature_layer(&layer, "riparian_features", &fc, &codes).unwrap();
    let reread = read_feature_layer(&layer, &codes).unwrap();
    assert_eq!(reread.len(), fc.len());

    let ws = watershed_over(&raster);
    let direct = riparian_stats(&ws, &fc).unwrap();
    let via_layer = riparian_stats(&ws, &reread).unwrap();
    assert_eq!(direct.n_vegetated, via_layer.n_vegetated);
    assert!((direct.riparian_area_km2 - via_layer.riparian_area_km2).abs() < 1e-12);

    let table = dir.path().join("stats.csv");
    direct.append_csv(&table).unwrap();
    via_layer.append_csv(&table).unwrap();
    let text = std::fs::read_to_string(&table).unwrap();
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn watershed_crs_must_match() {
    let raster = mixed(4, 4);
    let fc = extract_features(&raster, &ExtractionParams::default()).unwrap();

    let mut ws = watershed_over(&raster);
    ws.crs = Some(CRS::from_epsg(26910));
    assert!(matches!(riparian_stats(&ws, &fc), Err(Error::CrsMismatch(_, _))));

    ws.crs = None;
    assert!(matches!(
        riparian_stats(&ws, &fc),
        Err(Error::MissingCrs { context: "watershed boundary" })
    ));
}
