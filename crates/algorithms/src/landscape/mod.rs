//! Landscape metrics for riparian corridors
//!
//! - **Connectivity statistics**: areas, perimeters, patch counts and
//!   coverage of vegetated and non-vegetated riparian features
//! - **Statistics record**: the fixed-column table row and its CSV form

mod connectivity;
mod record;

pub use connectivity::{
    riparian_layers, riparian_stats, stats_from_layers,
    RiparianLayers, Watershed,
};
pub use record::StatRecord;
