//! # Riparian Core
//!
//! Core types and I/O for riparian connectivity analysis.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced grid used for classified rasters
//! - `GeoTransform`: affine transformation for georeferencing
//! - `CRS`: coordinate reference system identifiers
//! - `ClassCode` / `ClassCodes`: the closed vegetated / non-vegetated / background domain
//! - `Feature` / `FeatureCollection`: polygon features sharing one CRS
//! - I/O for GeoTIFF rasters and GeoJSON feature layers

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use vector::{ClassCode, ClassCodes, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::vector::{ClassCode, ClassCodes, Feature, FeatureCollection};
}
