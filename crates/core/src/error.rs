//! Error types for riparian connectivity analysis

use thiserror::Error;

/// Main error type for riparian analysis operations.
///
/// Structural failures (missing CRS, undecodable shapes, misaligned
/// assembly) abort a run. Degenerate statistics are not errors: they are
/// carried as NaN in the statistics record.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing coordinate reference system: {context} has no CRS")]
    MissingCrs { context: &'static str },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Geometry decode failed for shape #{index}: {reason}")]
    GeometryDecode { index: usize, reason: String },

    #[error("Feature assembly failed: {geometries} geometries for {values} class values")]
    Assembly { geometries: usize, values: usize },

    #[error("Cell value {value} is not one of the configured class codes")]
    UnknownClass { value: String },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl From<geojson::Error> for Error {
    fn from(e: geojson::Error) -> Self {
        Error::GeoJson(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::GeoJson(e.to_string())
    }
}

/// Result type alias for riparian analysis operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_stage() {
        let e = Error::MissingCrs { context: "classified raster" };
        assert!(e.to_string().contains("classified raster"));

        let e = Error::GeometryDecode { index: 7, reason: "bad ring".into() };
        assert!(e.to_string().contains("#7"));

        let e = Error::Assembly { geometries: 3, values: 4 };
        assert!(e.to_string().contains("3 geometries"));
    }
}
