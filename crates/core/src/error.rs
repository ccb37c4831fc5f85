//! Error types for greentrace

use thiserror::Error;

/// Main error type for greentrace operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

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

    #[error("Geotransform mismatch between bands or layers")]
    TransformMismatch,

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Expected {expected} bands, found {actual}")]
    BandCount { expected: usize, actual: usize },

    #[error("Cannot parse acquisition date from '{0}': expected an 8-digit YYYYMMDD token")]
    DateParse(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Feature {feature} is missing the '{key}' property")]
    MissingProperty { key: String, feature: usize },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Vector parse error: {0}")]
    VectorParse(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for greentrace operations
pub type Result<T> = std::result::Result<T, Error>;
