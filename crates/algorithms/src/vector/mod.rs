//! Vector side of the pipeline
//!
//! - Polygonize: connected raster regions to serialized boundaries
//! - Codec: boundary text to polygons, plus repair
//! - Assemble: classified raster to a [`FeatureCollection`](riparian_core::FeatureCollection)
//! - Overlay: dissolve and explode
//! - Measurements: area and perimeter

mod assemble;
mod codec;
mod measurements;
mod overlay;
mod polygonize;

pub use assemble::{assemble, decode_all, extract_features, ExtractionParams};
pub use codec::{decode_shape, encode_polygon, repair};
pub use measurements::{area, perimeter, polygon_perimeter, M2_PER_KM2, M_PER_KM};
pub use overlay::{dissolve, explode};
pub use polygonize::{polygonize, Connectivity, PolygonizeParams, Polygonized, RawShape};
