//! Run configuration.
//!
//! [`RunConfig`] is validated once from command-line input and passed to the
//! pipeline. [`SourcesConfig`] describes the remote services and can be
//! loaded from YAML; every field has a default, so a file only needs the
//! keys it overrides:
//!
//! ```yaml
//! tigerweb:
//!   vintage: 2020
//! wcs:
//!   endpoint: https://example.org/geoserver/wcs
//! http:
//!   timeout_secs: 120
//! ```

use crate::ConfigError;
use canopy_census::{state_by_abbr, TigerwebSource, DEFAULT_PLACE_LAYERS, DEFAULT_TIGERWEB_URL, DEFAULT_TRACT_LAYER};
use canopy_raster::{WcsSource, DEFAULT_COVERAGE_TEMPLATE, DEFAULT_WCS_ENDPOINT, SUPPORTED_YEARS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default cache directory.
pub const DEFAULT_CACHE_DIR: &str = ".canopy_cache";

/// TIGERweb settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TigerwebConfig {
    pub base_url: String,
    pub vintage: u16,
    /// Place layer ids, highest priority first.
    pub place_layers: Vec<u32>,
    pub tract_layer: u32,
    pub page_size: u32,
}

impl Default for TigerwebConfig {
    fn default() -> Self {
        let source = TigerwebSource::default();
        Self {
            base_url: DEFAULT_TIGERWEB_URL.to_string(),
            vintage: source.vintage,
            place_layers: DEFAULT_PLACE_LAYERS.to_vec(),
            tract_layer: DEFAULT_TRACT_LAYER,
            page_size: source.page_size,
        }
    }
}

/// WCS settings for canopy rasters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WcsConfig {
    pub endpoint: String,
    /// Coverage id with a `{year}` placeholder.
    pub coverage_template: String,
}

impl Default for WcsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_WCS_ENDPOINT.to_string(),
            coverage_template: DEFAULT_COVERAGE_TEMPLATE.to_string(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

/// Remote data sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub tigerweb: TigerwebConfig,
    pub wcs: WcsConfig,
    pub http: HttpConfig,
}

impl SourcesConfig {
    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::SourcesRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::SourcesParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn tigerweb_source(&self) -> TigerwebSource {
        TigerwebSource {
            base_url: self.tigerweb.base_url.clone(),
            vintage: self.tigerweb.vintage,
            place_layers: self.tigerweb.place_layers.clone(),
            tract_layer: self.tigerweb.tract_layer,
            page_size: self.tigerweb.page_size,
        }
    }

    pub fn wcs_source(&self) -> WcsSource {
        WcsSource {
            endpoint: self.wcs.endpoint.clone(),
            coverage_template: self.wcs.coverage_template.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

/// Validated settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Title-cased city name.
    pub city: String,
    /// Upper-cased state abbreviation.
    pub state: String,
    pub start_year: u16,
    pub end_year: u16,
    /// Write maps and data files.
    pub export: bool,
    /// Write the static PNG map of the end year.
    pub plot: bool,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Explicit place GEOID for ambiguous city names.
    pub place_geoid: Option<String>,
    /// Use only cached data.
    pub offline: bool,
    pub sources: SourcesConfig,
}

impl RunConfig {
    /// Validate the required inputs and fill defaults for the rest.
    ///
    /// Exports are enabled, the output directory is
    /// `{City}_{STATE}_outputs` and the cache is [`DEFAULT_CACHE_DIR`].
    pub fn new(city: &str, state: &str, start_year: u16, end_year: u16) -> Result<Self, ConfigError> {
        let city = title_case(city.trim());
        if city.is_empty() {
            return Err(ConfigError::EmptyCity);
        }

        let state = state.trim().to_uppercase();
        if state.len() != 2 || state_by_abbr(&state).is_err() {
            return Err(ConfigError::InvalidState(state));
        }

        for year in [start_year, end_year] {
            if !SUPPORTED_YEARS.contains(&year) {
                return Err(ConfigError::YearOutOfRange {
                    year,
                    min: *SUPPORTED_YEARS.start(),
                    max: *SUPPORTED_YEARS.end(),
                });
            }
        }
        if end_year < start_year {
            return Err(ConfigError::YearOrder {
                start: start_year,
                end: end_year,
            });
        }

        let output_dir = PathBuf::from(default_output_dir(&city, &state));
        Ok(Self {
            city,
            state,
            start_year,
            end_year,
            export: true,
            plot: false,
            output_dir,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            place_geoid: None,
            offline: false,
            sources: SourcesConfig::default(),
        })
    }

    /// Every year analyzed, in order.
    pub fn years(&self) -> RangeInclusive<u16> {
        self.start_year..=self.end_year
    }
}

/// `{city}_{state}_outputs` with spaces replaced by underscores.
pub fn default_output_dir(city: &str, state: &str) -> String {
    format!("{}_{}_outputs", city, state).replace(' ', "_")
}

/// Capitalize the first letter of every word and lower-case the rest.
/// A word starts after any non-alphabetic character.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(ch);
            word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("portland"), "Portland");
        assert_eq!(title_case("SALT LAKE CITY"), "Salt Lake City");
        assert_eq!(title_case("winston-salem"), "Winston-Salem");
        assert_eq!(title_case("o'fallon"), "O'Fallon");
    }

    #[test]
    fn test_run_config_defaults() {
        let config = RunConfig::new(" salt lake city ", "ut", 2011, 2021).unwrap();
        assert_eq!(config.city, "Salt Lake City");
        assert_eq!(config.state, "UT");
        assert_eq!(config.output_dir, PathBuf::from("Salt_Lake_City_UT_outputs"));
        assert_eq!(config.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
        assert!(config.export);
        assert!(!config.plot);
        assert_eq!(config.years().count(), 11);
    }

    #[test]
    fn test_year_validation() {
        assert!(matches!(
            RunConfig::new("Portland", "OR", 2010, 2021),
            Err(ConfigError::YearOutOfRange { year: 2010, .. })
        ));
        assert!(matches!(
            RunConfig::new("Portland", "OR", 2011, 2022),
            Err(ConfigError::YearOutOfRange { year: 2022, .. })
        ));
        assert!(matches!(
            RunConfig::new("Portland", "OR", 2021, 2011),
            Err(ConfigError::YearOrder { start: 2021, end: 2011 })
        ));
        // A single year is allowed
        assert_eq!(RunConfig::new("Portland", "OR", 2016, 2016).unwrap().years().count(), 1);
    }

    #[test]
    fn test_state_and_city_validation() {
        assert!(matches!(
            RunConfig::new("Portland", "Oregon", 2011, 2021),
            Err(ConfigError::InvalidState(s)) if s == "OREGON"
        ));
        assert!(matches!(
            RunConfig::new("Portland", "ZZ", 2011, 2021),
            Err(ConfigError::InvalidState(_))
        ));
        assert!(matches!(
            RunConfig::new("   ", "OR", 2011, 2021),
            Err(ConfigError::EmptyCity)
        ));
    }

    #[test]
    fn test_sources_yaml_partial_override() {
        let yaml = "tigerweb:\n  vintage: 2020\n  place_layers: [28]\nhttp:\n  timeout_secs: 5\n";
        let sources: SourcesConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(sources.tigerweb.vintage, 2020);
        assert_eq!(sources.tigerweb.place_layers, vec![28]);
        assert_eq!(sources.tigerweb.tract_layer, DEFAULT_TRACT_LAYER);
        assert_eq!(sources.wcs, WcsConfig::default());
        assert_eq!(sources.timeout(), Duration::from_secs(5));
        assert_eq!(sources.tigerweb_source().service(), "tigerWMS_ACS2020");
    }

    #[test]
    fn test_sources_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            SourcesConfig::from_file(&missing),
            Err(ConfigError::SourcesRead { .. })
        ));

        let bad = dir.path().join("bad.yaml");
        fs::write(&bad, "http:\n  timeout_secs: soon\n").unwrap();
        assert!(matches!(
            SourcesConfig::from_file(&bad),
            Err(ConfigError::SourcesParse { .. })
        ));
    }
}
