//! Error types for the census crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when resolving boundaries or loading tracts.
#[derive(Debug, Error)]
pub enum CensusError {
    /// No place with that name in the state.
    #[error("City '{city}' not found in {state}")]
    NotFound {
        /// Requested city.
        city: String,
        /// State abbreviation.
        state: String,
    },

    /// Several places share the name and none could be preferred.
    #[error(
        "City name '{city}' is ambiguous in {state}: {}; pass a place GEOID to choose one",
        .candidates.join(", ")
    )]
    AmbiguousName {
        /// Requested city.
        city: String,
        /// State abbreviation.
        state: String,
        /// `"name (GEOID)"` for each candidate.
        candidates: Vec<String>,
    },

    /// No census tracts intersect the boundary.
    #[error("No census tracts intersect the boundary of {city}")]
    NoData {
        /// Boundary name.
        city: String,
    },

    /// State abbreviation not in the FIPS table.
    #[error("Unknown state abbreviation '{0}'")]
    UnknownState(String),

    /// HTTP request error.
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("TIGERweb request failed with HTTP {status}: {url}")]
    HttpStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The service answered with an ArcGIS error object.
    #[error("TIGERweb layer {layer} returned an error: {message}")]
    Service {
        /// Layer id queried.
        layer: u32,
        /// Error message from the service.
        message: String,
    },

    /// The service URL could not be built.
    #[error("Invalid TIGERweb URL {url}: {reason}")]
    InvalidEndpoint {
        /// URL that failed to parse.
        url: String,
        /// Parse failure.
        reason: String,
    },

    /// Response or cache file is not valid GeoJSON.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Response or cache file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// GeoJSON document was not a FeatureCollection.
    #[error("Expected a GeoJSON FeatureCollection from layer {layer}")]
    NotFeatureCollection {
        /// Layer id queried.
        layer: u32,
    },

    /// Layer not cached and the client is in offline mode.
    #[error("TIGERweb layer not cached at {path} (offline mode)")]
    CacheMiss {
        /// Expected cache file.
        path: PathBuf,
    },

    /// I/O error reading or writing the cache.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
