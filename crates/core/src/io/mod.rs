//! I/O for classified rasters, feature layers and boundaries

mod layer;
mod native;

pub use layer::{
    read_boundary, read_feature_layer, to_geojson, write_feature_layer, write_polygon_layer,
    BoundaryLayer,
};
pub use native::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer, Compression,
    GeoTiffOptions,
};
