//! GeoJSON feature layers
//!
//! Feature collections are persisted as named GeoJSON layers: a
//! FeatureCollection object with a `name` member and a legacy named `crs`
//! member, the same layout GDAL's GeoJSON driver produces. Each feature
//! carries `value` (raw class code), `class` (label) and `ordinal`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use geo_types::{Geometry, MultiPolygon, Polygon};
use geojson::{GeoJson, JsonObject, JsonValue};
use serde_json::json;

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{ClassCodes, Feature, FeatureCollection};

/// Polygonal boundary read from a GeoJSON file (e.g. a watershed)
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryLayer {
    /// All polygons of the layer, in file order
    pub geometry: MultiPolygon<f64>,
    /// CRS from the layer's `crs` member, if present
    pub crs: Option<CRS>,
}

/// Write a feature collection as a named GeoJSON layer
pub fn write_feature_layer<P: AsRef<Path>>(
    path: P,
    layer: &str,
    collection: &FeatureCollection,
    codes: &ClassCodes,
) -> Result<()> {
    write_geojson(path.as_ref(), &to_geojson(layer, collection, codes))
}

/// Write bare polygons (e.g. dissolved patches) as a named GeoJSON layer.
///
/// Each feature carries a `part` property with its position in `polygons`.
pub fn write_polygon_layer<P: AsRef<Path>>(
    path: P,
    layer: &str,
    crs: &CRS,
    polygons: &[Polygon<f64>],
) -> Result<()> {
    let features = polygons
        .iter()
        .enumerate()
        .map(|(part, polygon)| {
            let mut properties = JsonObject::new();
            properties.insert("part".into(), json!(part));
            geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(polygon))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let collection = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(layer_members(layer, crs)),
    };
    write_geojson(path.as_ref(), &collection)
}

fn write_geojson(path: &Path, collection: &geojson::FeatureCollection) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, collection)?;
    writer.flush()?;
    Ok(())
}

fn layer_members(layer: &str, crs: &CRS) -> JsonObject {
    let mut members = JsonObject::new();
    members.insert("name".into(), json!(layer));
    members.insert(
        "crs".into(),
        json!({
            "type": "name",
            "properties": { "name": crs.ogc_urn() }
        }),
    );
    members
}

/// Convert a feature collection into a GeoJSON FeatureCollection object
pub fn to_geojson(layer: &str, collection: &FeatureCollection, codes: &ClassCodes) -> geojson::FeatureCollection {
    let features = collection
        .iter()
        .map(|feature| {
            let mut properties = JsonObject::new();
            properties.insert("value".into(), json!(codes.code(feature.class)));
            properties.insert("class".into(), json!(feature.class.label()));
            properties.insert("ordinal".into(), json!(feature.ordinal));

            geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&feature.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(layer_members(layer, collection.crs())),
    }
}

/// Read a named GeoJSON layer written by [`write_feature_layer`].
///
/// The layer must carry a `crs` member; features must be polygonal and
/// carry an integer `value` property from `codes`.
pub fn read_feature_layer<P: AsRef<Path>>(path: P, codes: &ClassCodes) -> Result<FeatureCollection> {
    let collection = match read_geojson(path.as_ref())? {
        GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(Error::GeoJson(format!(
                "{} is not a FeatureCollection",
                path.as_ref().display()
            )))
        }
    };

    let crs = crs_from_members(collection.foreign_members.as_ref())?
        .ok_or(Error::MissingCrs { context: "feature layer" })?;

    let mut out = FeatureCollection::new(crs);
    for (index, feature) in collection.features.into_iter().enumerate() {
        let value = feature
            .property("value")
            .and_then(JsonValue::as_i64)
            .ok_or_else(|| Error::GeoJson(format!("feature #{} has no integer `value`", index)))?;
        let class = codes
            .classify(value)
            .ok_or_else(|| Error::UnknownClass { value: value.to_string() })?;
        let ordinal = feature
            .property("ordinal")
            .and_then(JsonValue::as_u64)
            .map(|o| o as usize)
            .unwrap_or(index);

        let geometry = feature
            .geometry
            .ok_or_else(|| Error::GeoJson(format!("feature #{} has no geometry", index)))?;
        let polygons = polygons_of(Geometry::<f64>::try_from(geometry)?)
            .ok_or_else(|| Error::GeoJson(format!("feature #{} is not polygonal", index)))?;

        out.push(Feature::new(ordinal, MultiPolygon::new(polygons), class, value));
    }

    Ok(out)
}

/// Read every polygon of a GeoJSON file together with its CRS.
///
/// Accepts a FeatureCollection, a single Feature or a bare Geometry.
/// Non-polygonal features are skipped.
pub fn read_boundary<P: AsRef<Path>>(path: P) -> Result<BoundaryLayer> {
    let (geometries, crs) = match read_geojson(path.as_ref())? {
        GeoJson::FeatureCollection(fc) => {
            let crs = crs_from_members(fc.foreign_members.as_ref())?;
            let geometries = fc.features.into_iter().filter_map(|f| f.geometry).collect();
            (geometries, crs)
        }
        GeoJson::Feature(f) => {
            let crs = crs_from_members(f.foreign_members.as_ref())?;
            (f.geometry.into_iter().collect(), crs)
        }
        GeoJson::Geometry(g) => {
            let crs = crs_from_members(g.foreign_members.as_ref())?;
            (vec![g], crs)
        }
    };

    let mut polygons = Vec::new();
    for geometry in geometries {
        if let Some(parts) = polygons_of(Geometry::<f64>::try_from(geometry)?) {
            polygons.extend(parts);
        }
    }

    Ok(BoundaryLayer {
        geometry: MultiPolygon::new(polygons),
        crs,
    })
}

fn read_geojson(path: &Path) -> Result<GeoJson> {
    let reader = BufReader::new(File::open(path)?);
    let value: JsonValue = serde_json::from_reader(reader)?;
    Ok(GeoJson::from_json_value(value)?)
}

fn polygons_of(geometry: Geometry<f64>) -> Option<Vec<Polygon<f64>>> {
    match geometry {
        Geometry::Polygon(p) => Some(vec![p]),
        Geometry::MultiPolygon(mp) => Some(mp.0),
        Geometry::GeometryCollection(gc) => {
            let mut parts = Vec::new();
            for g in gc.0 {
                parts.extend(polygons_of(g)?);
            }
            Some(parts)
        }
        _ => None,
    }
}

fn crs_from_members(members: Option<&JsonObject>) -> Result<Option<CRS>> {
    let name = members
        .and_then(|m| m.get("crs"))
        .and_then(|crs| crs.pointer("/properties/name"))
        .and_then(JsonValue::as_str);

    match name {
        None => Ok(None),
        Some(n) if n.to_ascii_uppercase().ends_with("CRS84") => Ok(Some(CRS::from_epsg(4326))),
        Some(n) => n.parse().map(Some),
    }
}
