//! Riparian connectivity statistics
//!
//! Splits a classified feature collection into its vegetated and
//! non-vegetated subsets, merges both into contiguous riparian patches, and
//! summarizes areas, perimeters, counts and coverage against a watershed.

use geo::{Area, MultiPolygon, Polygon};
use riparian_core::io::BoundaryLayer;
use riparian_core::{ClassCode, Error, FeatureCollection, Result, CRS};
use tracing::{info, warn};

use super::record::StatRecord;
use crate::vector::{area, dissolve, explode, perimeter, polygon_perimeter, M2_PER_KM2, M_PER_KM};

/// Named watershed boundary
#[derive(Debug, Clone)]
pub struct Watershed {
    pub name: String,
    /// Dissolved boundary geometry
    pub boundary: MultiPolygon<f64>,
    pub crs: Option<CRS>,
}

impl Watershed {
    /// Build a watershed, dissolving the boundary into contiguous parts
    pub fn new(name: impl Into<String>, boundary: &MultiPolygon<f64>, crs: Option<CRS>) -> Self {
        Self {
            name: name.into(),
            boundary: dissolve(std::iter::once(boundary)),
            crs,
        }
    }

    pub fn from_layer(name: impl Into<String>, layer: BoundaryLayer) -> Self {
        Self::new(name, &layer.geometry, layer.crs)
    }
}

/// Class subsets and the dissolved riparian patches of a feature collection
#[derive(Debug, Clone)]
pub struct RiparianLayers {
    pub vegetated: FeatureCollection,
    pub non_vegetated: FeatureCollection,
    /// Union of both subsets, one polygon per contiguous patch
    pub riparian: Vec<Polygon<f64>>,
}

impl RiparianLayers {
    pub fn crs(&self) -> &CRS {
        self.vegetated.crs()
    }
}

/// Split features by class and merge the riparian classes into patches.
/// Background features are ignored.
pub fn riparian_layers(features: &FeatureCollection) -> RiparianLayers {
    let vegetated = features.subset(ClassCode::Vegetated);
    let non_vegetated = features.subset(ClassCode::NonVegetated);

    let merged = dissolve(
        features
            .iter()
            .filter(|f| f.class.is_riparian())
            .map(|f| &f.geometry),
    );

    RiparianLayers {
        vegetated,
        non_vegetated,
        riparian: explode(merged),
    }
}

/// Compute the statistics record for one watershed.
///
/// Fails with [`Error::MissingCrs`] if the watershed has no CRS and with
/// [`Error::CrsMismatch`] if it differs from the features' CRS. Empty class
/// subsets are not errors: their sums and counts are zero and ratios over
/// them are `NaN`.
pub fn riparian_stats(watershed: &Watershed, features: &FeatureCollection) -> Result<StatRecord> {
    check_crs(watershed, features.crs())?;
    Ok(summarize(watershed, &riparian_layers(features)))
}

/// Statistics from precomputed layers (see [`riparian_layers`])
pub fn stats_from_layers(watershed: &Watershed, layers: &RiparianLayers) -> Result<StatRecord> {
    check_crs(watershed, layers.crs())?;
    Ok(summarize(watershed, layers))
}

fn check_crs(watershed: &Watershed, features: &CRS) -> Result<()> {
    let crs = watershed
        .crs
        .as_ref()
        .ok_or(Error::MissingCrs { context: "watershed boundary" })?;
    if !crs.is_equivalent(features) {
        return Err(Error::CrsMismatch(features.identifier(), crs.identifier()));
    }
    Ok(())
}

fn summarize(watershed: &Watershed, layers: &RiparianLayers) -> StatRecord {
    let total_area = |fc: &FeatureCollection| fc.iter().map(|f| area(&f.geometry)).sum::<f64>();
    let total_perimeter =
        |fc: &FeatureCollection| fc.iter().map(|f| perimeter(&f.geometry)).sum::<f64>();

    let vegetated_area = total_area(&layers.vegetated) / M2_PER_KM2;
    let non_vegetated_area = total_area(&layers.non_vegetated) / M2_PER_KM2;
    let riparian_area =
        layers.riparian.iter().map(|p| p.unsigned_area()).sum::<f64>() / M2_PER_KM2;
    let watershed_area = area(&watershed.boundary) / M2_PER_KM2;

    let n_vegetated = layers.vegetated.len();
    let n_non_vegetated = layers.non_vegetated.len();

    let record = StatRecord {
        watershed_name: watershed.name.clone(),
        watershed_area_km2: watershed_area,
        riparian_area_km2: riparian_area,
        vegetated_area_km2: vegetated_area,
        non_vegetated_area_km2: non_vegetated_area,
        vegetated_coverage_pct: ratio("vegetated coverage", vegetated_area, riparian_area) * 100.0,
        mean_non_vegetated_patch_km2: ratio(
            "mean non-vegetated patch size",
            non_vegetated_area,
            n_non_vegetated as f64,
        ),
        non_vegetated_coverage_pct: ratio(
            "non-vegetated coverage",
            non_vegetated_area,
            riparian_area,
        ) * 100.0,
        n_vegetated,
        n_non_vegetated,
        vegetated_perimeter_km: total_perimeter(&layers.vegetated) / M_PER_KM,
        non_vegetated_perimeter_km: total_perimeter(&layers.non_vegetated) / M_PER_KM,
        riparian_perimeter_km: layers.riparian.iter().map(polygon_perimeter).sum::<f64>()
            / M_PER_KM,
        n_riparian_features: layers.riparian.len(),
    };

    info!(
        watershed = %record.watershed_name,
        vegetated = n_vegetated,
        non_vegetated = n_non_vegetated,
        patches = record.n_riparian_features,
        "computed riparian statistics"
    );
    record
}

/// `numerator / denominator`, or NaN when the denominator is zero
fn ratio(metric: &'static str, numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        warn!(metric, "zero denominator; metric is undefined");
        return f64::NAN;
    }
    numerator / denominator
}
