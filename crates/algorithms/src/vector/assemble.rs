//! Feature assembly: classified raster to a feature collection
//!
//! Pipeline: vectorize the raster, decode the serialized boundaries on the
//! chunked worker pool, repair each geometry, then pair geometries with
//! their class values. Decoding is the only parallel stage and preserves
//! shape order, so the output is identical for any worker count.

use geo::MultiPolygon;
use riparian_core::{ClassCodes, Error, Feature, FeatureCollection, Raster, RasterElement, Result, CRS};
use riparian_parallel::{ChunkScheduler, Workers};
use tracing::{debug, info};

use super::codec::{decode_shape, repair};
use super::polygonize::{polygonize, Connectivity, PolygonizeParams};

/// Parameters for [`extract_features`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractionParams {
    /// Worker count for boundary decoding
    pub workers: Workers,
    /// Integer codes of the three land-cover classes
    pub class_codes: ClassCodes,
    /// Cell adjacency for region growing
    pub connectivity: Connectivity,
}

/// Vectorize a classified raster into one feature per connected region.
///
/// Every cell value must be one of `params.class_codes`; background regions
/// are kept. The collection inherits the raster's CRS.
pub fn extract_features<T: RasterElement>(
    raster: &Raster<T>,
    params: &ExtractionParams,
) -> Result<FeatureCollection> {
    params.class_codes.validate()?;

    let polygonized = polygonize(
        raster,
        PolygonizeParams {
            connectivity: params.connectivity,
        },
    )?;
    let (boundaries, values, crs) = polygonized.into_parts();

    let decoded = decode_all(&boundaries, params.workers)?;
    let repaired: Vec<MultiPolygon<f64>> = decoded.iter().map(repair).collect();

    let collection = assemble(repaired, &values, crs, &params.class_codes)?;
    info!(
        features = collection.len(),
        workers = %params.workers,
        "extracted features"
    );
    Ok(collection)
}

/// Decode serialized boundaries in order on a bounded worker pool
pub fn decode_all(boundaries: &[String], workers: Workers) -> Result<Vec<MultiPolygon<f64>>> {
    debug!(shapes = boundaries.len(), %workers, "decoding boundaries");
    ChunkScheduler::new(workers).map_ordered(boundaries, |index, text| decode_shape(index, text))
}

/// Pair decoded geometries with class values, position by position.
///
/// Fails with [`Error::Assembly`] if the sequences differ in length and
/// with [`Error::UnknownClass`] if a value is outside `codes`.
pub fn assemble<T: RasterElement>(
    geometries: Vec<MultiPolygon<f64>>,
    values: &[T],
    crs: CRS,
    codes: &ClassCodes,
) -> Result<FeatureCollection> {
    if geometries.len() != values.len() {
        return Err(Error::Assembly {
            geometries: geometries.len(),
            values: values.len(),
        });
    }

    let features = geometries
        .into_iter()
        .zip(values)
        .enumerate()
        .map(|(ordinal, (geometry, &value))| {
            let class = codes.resolve(value)?;
            Ok(Feature::new(ordinal, geometry, class, codes.code(class)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(FeatureCollection::from_features(crs, features))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::measurements::area;
    use geo::polygon;
    use riparian_core::{ClassCode, GeoTransform};

    fn unit() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]])
    }

    #[test]
    fn test_assemble_pairs_in_order() {
        let fc = assemble(
            vec![unit(), unit(), unit()],
            &[1u8, 255, 0],
            CRS::from_epsg(32610),
            &ClassCodes::default(),
        )
        .unwrap();

        let classes: Vec<ClassCode> = fc.iter().map(|f| f.class).collect();
        assert_eq!(
            classes,
            vec![ClassCode::Vegetated, ClassCode::NonVegetated, ClassCode::Background]
        );
        let ordinals: Vec<usize> = fc.iter().map(|f| f.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert_eq!(fc.crs().epsg(), Some(32610));
    }

    #[test]
    fn test_assemble_length_mismatch() {
        let err = assemble(
            vec![unit(), unit()],
            &[1u8, 0, 255],
            CRS::from_epsg(32610),
            &ClassCodes::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Assembly { geometries: 2, values: 3 }));
    }

    #[test]
    fn test_assemble_unknown_class() {
        let err = assemble(vec![unit()], &[7u8], CRS::from_epsg(32610), &ClassCodes::default())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownClass { .. }));
    }

    #[test]
    fn test_assemble_signed_codes() {
        let fc = assemble(vec![unit()], &[-1i16], CRS::from_epsg(32610), &ClassCodes::signed())
            .unwrap();
        assert_eq!(fc.features()[0].class, ClassCode::NonVegetated);
        assert_eq!(fc.features()[0].value, -1);
    }

    #[test]
    fn test_extract_features() {
        #[rustfmt::skip]
        let mut r = Raster::from_vec(vec![
            1u8, 1, 0,
            255, 0, 0,
        ], 2, 3).unwrap();
        r.set_transform(GeoTransform::new(0.0, 20.0, 10.0, -10.0));
        r.set_crs(Some(CRS::from_epsg(32610)));

        let fc = extract_features(&r, &ExtractionParams::default()).unwrap();
        assert_eq!(fc.len(), 3);
        assert_eq!(fc.of_class(ClassCode::Vegetated).count(), 1);
        assert_eq!(fc.of_class(ClassCode::NonVegetated).count(), 1);

        let veg = fc.of_class(ClassCode::Vegetated).next().unwrap();
        assert!((area(&veg.geometry) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_extract_rejects_unknown_values() {
        let mut r = Raster::<u8>::filled(2, 2, 3);
        r.set_crs(Some(CRS::from_epsg(32610)));
        assert!(matches!(
            extract_features(&r, &ExtractionParams::default()),
            Err(Error::UnknownClass { .. })
        ));
    }

    #[test]
    fn test_decode_all_reports_bad_index() {
        let boundaries = vec![
            r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}"#.to_string(),
            "not json".to_string(),
        ];
        let err = decode_all(&boundaries, Workers::Fixed(2)).unwrap_err();
        assert!(matches!(err, Error::GeometryDecode { index: 1, .. }));
    }
}
