//! # Riparian Algorithms
//!
//! Raster-to-vector feature extraction and riparian connectivity
//! statistics.
//!
//! ## Modules
//!
//! - **vector**: vectorization, geometry codec and repair, feature
//!   assembly, dissolve / explode, measurements
//! - **landscape**: connectivity statistics and the statistics table
//! - **imagery**: NDVI and threshold classification

pub mod imagery;
pub mod landscape;
pub(crate) mod maybe_rayon;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{classify_vegetation, ndvi, ClassifyParams};
    pub use crate::landscape::{
        riparian_layers, riparian_stats, stats_from_layers,
        RiparianLayers, StatRecord, Watershed,
    };
    pub use crate::vector::{
        assemble, dissolve, explode, extract_features, polygonize,
        Connectivity, ExtractionParams, PolygonizeParams,
    };
    pub use riparian_core::prelude::*;
    pub use riparian_parallel::Workers;
}
