//! Imagery preprocessing
//!
//! Produces the classified raster consumed by feature extraction:
//! - NDVI from red and near-infrared bands
//! - Threshold classification into vegetated / non-vegetated / background

mod classify;
mod indices;

pub use classify::{classify_vegetation, ClassifyParams};
pub use indices::{ndvi, normalized_difference};
