//! Features and feature collections

use geo_types::MultiPolygon;

use crate::crs::CRS;
use crate::vector::ClassCode;

/// A polygonal feature tagged with its land-cover class
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Position of the feature in the collection it was built for
    pub ordinal: usize,
    /// Feature geometry (a single region may repair into several parts)
    pub geometry: MultiPolygon<f64>,
    /// Land-cover class
    pub class: ClassCode,
    /// Raw class code as found in the source raster
    pub value: i64,
}

impl Feature {
    /// Create a new feature
    pub fn new(ordinal: usize, geometry: MultiPolygon<f64>, class: ClassCode, value: i64) -> Self {
        Self {
            ordinal,
            geometry,
            class,
            value,
        }
    }
}

/// Ordered collection of features sharing one coordinate reference system.
///
/// The CRS is held once by the collection, so every feature is in it by
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    features: Vec<Feature>,
    crs: CRS,
}

impl FeatureCollection {
    pub fn new(crs: CRS) -> Self {
        Self {
            features: Vec::new(),
            crs,
        }
    }

    pub fn from_features(crs: CRS, features: Vec<Feature>) -> Self {
        Self { features, crs }
    }

    pub fn crs(&self) -> &CRS {
        &self.crs
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Features of exactly one class, in collection order
    pub fn of_class(&self, class: ClassCode) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter(move |f| f.class == class)
    }

    /// New collection holding clones of the features of one class
    pub fn subset(&self, class: ClassCode) -> FeatureCollection {
        FeatureCollection {
            features: self.of_class(class).cloned().collect(),
            crs: self.crs.clone(),
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
