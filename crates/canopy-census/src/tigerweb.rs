//! TIGERweb layer client with local caching.
//!
//! TIGERweb publishes TIGER/Line geographies through ArcGIS MapServer
//! services, one per vintage (e.g. `tigerWMS_ACS2021`). Layers are queried a
//! whole state at a time and returned as GeoJSON in EPSG:4326:
//!
//! ```text
//! {base_url}/tigerWMS_ACS{vintage}/MapServer/{layer}/query
//!     ?where=STATE='41'&outFields=*&outSR=4326&f=geojson
//!     &resultOffset={n}&resultRecordCount={page_size}
//! ```
//!
//! Responses are paged; the pages of one (layer, state) are merged and stored
//! as a single FeatureCollection under
//! `{cache_dir}/tigerweb/tigerWMS_ACS{vintage}_{layer}_{state}.geojson`.
//! A present cache file is served without network access.

use crate::{CensusError, Result};
use geo::{Geometry, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson};
use reqwest::Url;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// TIGERweb REST services root.
pub const DEFAULT_TIGERWEB_URL: &str = "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb";

/// Place layers in priority order: incorporated places, then census designated places.
pub const DEFAULT_PLACE_LAYERS: [u32; 2] = [28, 30];

/// Census tracts layer.
pub const DEFAULT_TRACT_LAYER: u32 = 8;

/// Census vintage of the service.
const DEFAULT_VINTAGE: u16 = 2021;

/// Features requested per page.
const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Default HTTP timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Where census geographies are downloaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TigerwebSource {
    /// REST services root.
    pub base_url: String,
    /// Census vintage; selects the `tigerWMS_ACS{vintage}` service.
    pub vintage: u16,
    /// Place layer ids, highest priority first.
    pub place_layers: Vec<u32>,
    /// Census tract layer id.
    pub tract_layer: u32,
    /// Features requested per page.
    pub page_size: u32,
}

impl Default for TigerwebSource {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TIGERWEB_URL.to_string(),
            vintage: DEFAULT_VINTAGE,
            place_layers: DEFAULT_PLACE_LAYERS.to_vec(),
            tract_layer: DEFAULT_TRACT_LAYER,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TigerwebSource {
    /// MapServer service name for the vintage.
    pub fn service(&self) -> String {
        format!("tigerWMS_ACS{}", self.vintage)
    }

    /// Query URL for one page of a layer within a state.
    pub fn page_url(&self, layer: u32, state_fips: &str, offset: usize) -> Result<Url> {
        let base = format!(
            "{}/{}/MapServer/{}/query",
            self.base_url.trim_end_matches('/'),
            self.service(),
            layer
        );
        let params = [
            ("where", format!("STATE='{}'", state_fips)),
            ("outFields", "*".to_string()),
            ("returnGeometry", "true".to_string()),
            ("outSR", "4326".to_string()),
            ("f", "geojson".to_string()),
            ("resultOffset", offset.to_string()),
            ("resultRecordCount", self.page_size.to_string()),
        ];

        Url::parse_with_params(&base, &params).map_err(|e| CensusError::InvalidEndpoint {
            url: base.clone(),
            reason: e.to_string(),
        })
    }
}

/// TIGERweb client owning a cache directory.
pub struct TigerwebClient {
    /// Cache directory (layers live under `tigerweb/`).
    cache_dir: PathBuf,
    /// Service description.
    source: TigerwebSource,
    /// HTTP client.
    client: reqwest::blocking::Client,
    /// Never download; a cache miss is an error.
    offline: bool,
}

impl std::fmt::Debug for TigerwebClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TigerwebClient")
            .field("cache_dir", &self.cache_dir)
            .field("source", &self.source)
            .field("offline", &self.offline)
            .finish()
    }
}

impl TigerwebClient {
    /// Create a client with the default HTTP timeout.
    pub fn new<P: AsRef<Path>>(cache_dir: P, source: TigerwebSource) -> Result<Self> {
        Self::with_timeout(cache_dir, source, DEFAULT_TIMEOUT)
    }

    /// Create a client with a specific HTTP timeout.
    pub fn with_timeout<P: AsRef<Path>>(
        cache_dir: P,
        source: TigerwebSource,
        timeout: Duration,
    ) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(cache_dir.join("tigerweb"))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("canopy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            cache_dir,
            source,
            client,
            offline: false,
        })
    }

    /// Serve only what is already cached.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Service description.
    pub fn source(&self) -> &TigerwebSource {
        &self.source
    }

    /// Cache file for one layer of one state.
    pub fn layer_cache_path(&self, layer: u32, state_fips: &str) -> PathBuf {
        self.cache_dir.join("tigerweb").join(format!(
            "{}_{}_{}.geojson",
            self.source.service(),
            layer,
            state_fips
        ))
    }

    /// All features of `layer` within a state, from cache or the service.
    pub fn state_features(&self, layer: u32, state_fips: &str) -> Result<Vec<Feature>> {
        let cache_path = self.layer_cache_path(layer, state_fips);

        if cache_path.exists() {
            tracing::debug!(layer, state_fips, path = %cache_path.display(), "TIGERweb cache hit");
            let text = fs::read_to_string(&cache_path)?;
            return match text.parse::<GeoJson>()? {
                GeoJson::FeatureCollection(fc) => Ok(fc.features),
                _ => Err(CensusError::NotFeatureCollection { layer }),
            };
        }

        if self.offline {
            return Err(CensusError::CacheMiss { path: cache_path });
        }

        let features = self.download_layer(layer, state_fips)?;

        let collection = FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        };
        let partial = cache_path.with_extension("geojson.part");
        fs::write(&partial, GeoJson::from(collection.clone()).to_string())?;
        fs::rename(&partial, &cache_path)?;

        Ok(collection.features)
    }

    /// Page through a layer until the service reports no more features.
    fn download_layer(&self, layer: u32, state_fips: &str) -> Result<Vec<Feature>> {
        tracing::info!(
            layer,
            state_fips,
            service = %self.source.service(),
            "downloading TIGERweb layer"
        );

        let mut features = Vec::new();
        loop {
            let (page, exceeded) = self.fetch_page(layer, state_fips, features.len())?;
            let received = page.len();
            features.extend(page);

            tracing::debug!(layer, received, total = features.len(), "TIGERweb page");
            if received == 0 || (!exceeded && received < self.source.page_size as usize) {
                break;
            }
        }

        Ok(features)
    }

    /// Fetch one page, returning its features and whether more remain.
    fn fetch_page(&self, layer: u32, state_fips: &str, offset: usize) -> Result<(Vec<Feature>, bool)> {
        let url = self.source.page_url(layer, state_fips, offset)?;
        let response = self.client.get(url.clone()).send()?;

        if !response.status().is_success() {
            return Err(CensusError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text()?;
        parse_page(layer, &body)
    }
}

/// Parse one query response body.
fn parse_page(layer: u32, body: &str) -> Result<(Vec<Feature>, bool)> {
    let value: JsonValue = serde_json::from_str(body)?;

    // ArcGIS reports failures as {"error": {...}} with a 200 status
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(JsonValue::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(CensusError::Service { layer, message });
    }

    match GeoJson::from_json_value(value)? {
        GeoJson::FeatureCollection(fc) => {
            let exceeded = transfer_limit_exceeded(&fc);
            Ok((fc.features, exceeded))
        }
        _ => Err(CensusError::NotFeatureCollection { layer }),
    }
}

/// ArcGIS flags truncated pages with `exceededTransferLimit`, either at the
/// top level or inside a top-level `properties` object.
fn transfer_limit_exceeded(fc: &FeatureCollection) -> bool {
    let Some(members) = fc.foreign_members.as_ref() else {
        return false;
    };
    let flag = members.get("exceededTransferLimit").or_else(|| {
        members
            .get("properties")
            .and_then(|p| p.get("exceededTransferLimit"))
    });
    flag.and_then(JsonValue::as_bool).unwrap_or(false)
}

/// String form of a feature property; numbers are formatted, other types ignored.
pub fn feature_property(feature: &Feature, key: &str) -> Option<String> {
    match feature.properties.as_ref()?.get(key)? {
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Polygonal part of a feature's geometry, or `None` if it has none.
pub fn feature_multipolygon(feature: &Feature) -> Option<MultiPolygon<f64>> {
    let geometry = feature.geometry.as_ref()?;
    let geometry: Geometry<f64> = geometry.value.clone().try_into().ok()?;

    let polygons: Vec<Polygon<f64>> = polygons_of(geometry)
        .into_iter()
        .filter(|p| p.exterior().0.len() >= 4)
        .collect();

    (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
}

fn polygons_of(geometry: Geometry<f64>) -> Vec<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => vec![p],
        Geometry::MultiPolygon(mp) => mp.0,
        Geometry::GeometryCollection(gc) => gc.0.into_iter().flat_map(polygons_of).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature_from(json: &str) -> Feature {
        match json.parse::<GeoJson>().unwrap() {
            GeoJson::Feature(f) => f,
            other => panic!("expected a feature, got {:?}", other),
        }
    }

    #[test]
    fn test_page_url() {
        let source = TigerwebSource::default();
        let url = source.page_url(8, "41", 2000).unwrap();
        let text = url.as_str();

        assert!(text.starts_with(
            "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb/tigerWMS_ACS2021/MapServer/8/query?"
        ));
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("where".to_string(), "STATE='41'".to_string())));
        assert!(pairs.contains(&("resultOffset".to_string(), "2000".to_string())));
        assert!(pairs.contains(&("f".to_string(), "geojson".to_string())));
    }

    #[test]
    fn test_parse_page_with_transfer_limit() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": null, "properties": {"GEOID": "4159000"}}
            ],
            "properties": {"exceededTransferLimit": true}
        }"#;
        let (features, exceeded) = parse_page(28, body).unwrap();
        assert_eq!(features.len(), 1);
        assert!(exceeded);
    }

    #[test]
    fn test_parse_page_without_flag() {
        let body = r#"{"type": "FeatureCollection", "features": []}"#;
        let (features, exceeded) = parse_page(28, body).unwrap();
        assert!(features.is_empty());
        assert!(!exceeded);
    }

    #[test]
    fn test_parse_page_service_error() {
        let body = r#"{"error": {"code": 400, "message": "Invalid query parameters"}}"#;
        let err = parse_page(8, body).unwrap_err();
        assert!(matches!(
            err,
            CensusError::Service { layer: 8, ref message } if message == "Invalid query parameters"
        ));
    }

    #[test]
    fn test_feature_property_types() {
        let feature = feature_from(
            r#"{"type": "Feature", "geometry": null,
                "properties": {"GEOID": " 41051000100 ", "AREALAND": 12345, "FLAG": true}}"#,
        );
        assert_eq!(feature_property(&feature, "GEOID").as_deref(), Some("41051000100"));
        assert_eq!(feature_property(&feature, "AREALAND").as_deref(), Some("12345"));
        assert_eq!(feature_property(&feature, "FLAG"), None);
        assert_eq!(feature_property(&feature, "MISSING"), None);
    }

    #[test]
    fn test_feature_multipolygon_from_polygon() {
        let feature = feature_from(
            r#"{"type": "Feature", "properties": {},
                "geometry": {"type": "Polygon",
                    "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]]}}"#,
        );
        let mp = feature_multipolygon(&feature).unwrap();
        assert_eq!(mp.0.len(), 1);
    }

    #[test]
    fn test_feature_multipolygon_rejects_non_polygonal() {
        let point = feature_from(
            r#"{"type": "Feature", "properties": {},
                "geometry": {"type": "Point", "coordinates": [0, 0]}}"#,
        );
        assert!(feature_multipolygon(&point).is_none());

        let empty = feature_from(
            r#"{"type": "Feature", "properties": {},
                "geometry": {"type": "MultiPolygon", "coordinates": []}}"#,
        );
        assert!(feature_multipolygon(&empty).is_none());

        let no_geometry = feature_from(r#"{"type": "Feature", "properties": {}, "geometry": null}"#);
        assert!(feature_multipolygon(&no_geometry).is_none());
    }

    #[test]
    fn test_offline_cache_miss() {
        let dir = tempfile::tempdir().unwrap();
        let client = TigerwebClient::new(dir.path(), TigerwebSource::default())
            .unwrap()
            .offline(true);

        let err = client.state_features(8, "41").unwrap_err();
        assert!(matches!(err, CensusError::CacheMiss { .. }));
    }

    #[test]
    fn test_cached_layer_is_served() {
        let dir = tempfile::tempdir().unwrap();
        let client = TigerwebClient::new(dir.path(), TigerwebSource::default())
            .unwrap()
            .offline(true);

        let path = client.layer_cache_path(8, "41");
        assert!(path.ends_with("tigerweb/tigerWMS_ACS2021_8_41.geojson"));
        fs::write(
            &path,
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "geometry": null, "properties": {"GEOID": "41051000100"}},
                {"type": "Feature", "geometry": null, "properties": {"GEOID": "41051000200"}}
            ]}"#,
        )
        .unwrap();

        let features = client.state_features(8, "41").unwrap();
        assert_eq!(features.len(), 2);
    }
}
