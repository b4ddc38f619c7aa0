//! Error types for the export crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing or reading output files.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shapefile writer error.
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// SQLite error while building a GeoPackage.
    #[error("GeoPackage error: {0}")]
    GeoPackage(#[from] rusqlite::Error),

    /// CSV read or write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// PNG encoding error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// GeoTIFF encoding error.
    #[error("Raster error: {0}")]
    Raster(#[from] canopy_raster::RasterError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A `geometry_wkt` cell could not be parsed.
    #[error("Invalid WKT geometry for {geoid} in {path}: {reason}")]
    Wkt {
        /// File being read.
        path: PathBuf,
        /// Row GEOID.
        geoid: String,
        /// Parser message.
        reason: String,
    },

    /// A field name or value is not representable.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Field name.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}
