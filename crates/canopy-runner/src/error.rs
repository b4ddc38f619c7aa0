//! Error types for configuration and the pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid command-line input or sources file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// City name is empty.
    #[error("City name must not be empty")]
    EmptyCity,

    /// State is not a known two-letter abbreviation.
    #[error("Invalid state '{0}': expected a two-letter abbreviation such as OR")]
    InvalidState(String),

    /// Year without an NLCD canopy layer.
    #[error("Year {year} is outside the NLCD canopy range {min}-{max}")]
    YearOutOfRange {
        /// Requested year.
        year: u16,
        /// First available year.
        min: u16,
        /// Last available year.
        max: u16,
    },

    /// End year precedes start year.
    #[error("End year {end} is before start year {start}")]
    YearOrder {
        /// Start year.
        start: u16,
        /// End year.
        end: u16,
    },

    /// Sources file could not be read.
    #[error("Cannot read sources file {path}: {source}")]
    SourcesRead {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Sources file is not valid YAML for [`crate::SourcesConfig`].
    #[error("Invalid sources file {path}: {source}")]
    SourcesParse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: serde_yaml::Error,
    },
}

/// Any fatal error of a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Boundary or tract error.
    #[error(transparent)]
    Census(#[from] canopy_census::CensusError),

    /// Raster fetch or decode error.
    #[error(transparent)]
    Raster(#[from] canopy_raster::RasterError),

    /// No tract has canopy data in both the start and end year.
    #[error("No census tract in {city} has canopy data for both {start_year} and {end_year}")]
    NoTractData {
        city: String,
        start_year: u16,
        end_year: u16,
    },

    /// Output write error.
    #[error(transparent)]
    Export(#[from] canopy_export::ExportError),
}
