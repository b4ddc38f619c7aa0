//! Error types for the raster crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when fetching or reading canopy rasters.
#[derive(Debug, Error)]
pub enum RasterError {
    /// Requested year has no NLCD canopy layer.
    #[error("No NLCD canopy data for year {year} (available {min}-{max})")]
    UnsupportedYear {
        /// Requested year.
        year: u16,
        /// First supported year.
        min: u16,
        /// Last supported year.
        max: u16,
    },

    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - missing or malformed georeferencing tags.
    #[error("Invalid GeoTIFF {path}: {reason}")]
    InvalidGeoTiff {
        /// File being read.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Unsupported data type in the TIFF file.
    #[error("Unsupported TIFF data type: {0}")]
    UnsupportedDataType(String),

    /// Pixel buffer does not match the raster dimensions.
    #[error("Raster data has {actual} values, expected {expected}")]
    DimensionMismatch {
        /// Width x height.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },

    /// Raster with no pixels.
    #[error("Raster has no pixels ({width}x{height})")]
    EmptyRaster {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },

    /// HTTP request error when downloading a coverage.
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The coverage service URL could not be built.
    #[error("Invalid coverage endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// Configured endpoint.
        endpoint: String,
        /// Parse failure.
        reason: String,
    },

    /// The coverage service answered with an error.
    #[error("Failed to download canopy raster for {year}: {reason}")]
    DownloadFailed {
        /// Requested year.
        year: u16,
        /// Reason for failure.
        reason: String,
    },

    /// Raster not cached and the cache is in offline mode.
    #[error("Canopy raster for {year} not cached at {path} (offline mode)")]
    CacheMiss {
        /// Requested year.
        year: u16,
        /// Expected cache file.
        path: PathBuf,
    },

    /// No pixel inside the boundary holds canopy data.
    #[error("No valid canopy pixels inside the boundary for {year}")]
    NoValidPixels {
        /// Requested year.
        year: u16,
    },

    /// Geometry has no extent to request a raster for.
    #[error("Cannot request a raster for an empty geometry")]
    EmptyExtent,
}
