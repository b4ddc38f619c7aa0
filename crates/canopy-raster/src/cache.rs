//! NLCD canopy raster fetcher with an explicit on-disk cache.
//!
//! Rasters are requested from the MRLC GeoServer Web Coverage Service (WCS
//! 2.0.1) as GeoTIFFs in EPSG:4326, cropped to the bounding box of the area
//! of interest. Each (year, extent) pair is downloaded at most once: the file
//! is kept under the cache directory and served from there on later runs.
//!
//! ## Cache layout
//!
//! ```text
//! {cache_dir}/nlcd/canopy_{year}_{extent-hash}.tif
//! ```
//!
//! The extent hash is the first 16 hex characters of the SHA-256 of the
//! bounding box rounded to 1e-6 degrees.
//!
//! The cache is read-before-write and is not safe for concurrent runs that
//! share a cache directory.

use crate::{CanopyRaster, RasterBounds, RasterError, Result};
use geo::MultiPolygon;
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Years with an NLCD tree canopy cover layer.
pub const SUPPORTED_YEARS: RangeInclusive<u16> = 2011..=2021;

/// MRLC GeoServer WCS endpoint.
pub const DEFAULT_WCS_ENDPOINT: &str = "https://www.mrlc.gov/geoserver/mrlc_download/wcs";

/// Coverage id for a year; `{year}` is substituted.
pub const DEFAULT_COVERAGE_TEMPLATE: &str = "mrlc_download__nlcd_tcc_conus_{year}_v2021-4";

/// Degrees added around the requested extent so edge pixels are complete.
const EXTENT_MARGIN_DEG: f64 = 0.001;

/// Default HTTP timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// EPSG:4326 as an OGC CRS URI.
const WGS84_URI: &str = "http://www.opengis.net/def/crs/EPSG/0/4326";

/// Fail with [`RasterError::UnsupportedYear`] unless `year` has an NLCD canopy layer.
pub fn check_year(year: u16) -> Result<()> {
    if SUPPORTED_YEARS.contains(&year) {
        Ok(())
    } else {
        Err(RasterError::UnsupportedYear {
            year,
            min: *SUPPORTED_YEARS.start(),
            max: *SUPPORTED_YEARS.end(),
        })
    }
}

/// Where canopy coverages are downloaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WcsSource {
    /// WCS endpoint URL.
    pub endpoint: String,
    /// Coverage id template with a `{year}` placeholder.
    pub coverage_template: String,
}

impl Default for WcsSource {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_WCS_ENDPOINT.to_string(),
            coverage_template: DEFAULT_COVERAGE_TEMPLATE.to_string(),
        }
    }
}

impl WcsSource {
    /// Coverage id for a year.
    pub fn coverage_id(&self, year: u16) -> String {
        self.coverage_template.replace("{year}", &year.to_string())
    }

    /// GetCoverage request URL for a year and extent.
    pub fn coverage_url(&self, year: u16, bounds: &RasterBounds) -> Result<Url> {
        let padded = bounds.expand(EXTENT_MARGIN_DEG);
        let params = [
            ("service", "WCS".to_string()),
            ("version", "2.0.1".to_string()),
            ("request", "GetCoverage".to_string()),
            ("coverageId", self.coverage_id(year)),
            ("format", "image/geotiff".to_string()),
            (
                "subset",
                format!("Long({:.6},{:.6})", padded.min_lon, padded.max_lon),
            ),
            (
                "subset",
                format!("Lat({:.6},{:.6})", padded.min_lat, padded.max_lat),
            ),
            ("subsettingCrs", WGS84_URI.to_string()),
            ("outputCrs", WGS84_URI.to_string()),
        ];

        Url::parse_with_params(&self.endpoint, &params).map_err(|e| RasterError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })
    }
}

/// Download statistics for the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Number of rasters downloaded this session.
    pub rasters_downloaded: usize,
    /// Total bytes downloaded this session.
    pub bytes_downloaded: u64,
}

/// Canopy raster fetcher owning a cache directory.
///
/// Callers decide when to query and populate the cache; nothing is shared
/// between instances except the files on disk.
pub struct RasterCache {
    /// Cache directory for downloaded rasters.
    cache_dir: PathBuf,
    /// Coverage service.
    source: WcsSource,
    /// HTTP client for downloading coverages.
    client: reqwest::blocking::Client,
    /// Never download; a cache miss is an error.
    offline: bool,
    /// Number of rasters downloaded this session.
    rasters_downloaded: AtomicUsize,
    /// Total bytes downloaded this session.
    bytes_downloaded: AtomicU64,
}

impl std::fmt::Debug for RasterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterCache")
            .field("cache_dir", &self.cache_dir)
            .field("source", &self.source)
            .field("offline", &self.offline)
            .finish()
    }
}

impl RasterCache {
    /// Create a cache with the default HTTP timeout.
    pub fn new<P: AsRef<Path>>(cache_dir: P, source: WcsSource) -> Result<Self> {
        Self::with_timeout(cache_dir, source, DEFAULT_TIMEOUT)
    }

    /// Create a cache with a specific HTTP timeout.
    pub fn with_timeout<P: AsRef<Path>>(
        cache_dir: P,
        source: WcsSource,
        timeout: Duration,
    ) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();

        // Create cache directory if it doesn't exist
        fs::create_dir_all(cache_dir.join("nlcd"))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("canopy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            cache_dir,
            source,
            client,
            offline: false,
            rasters_downloaded: AtomicUsize::new(0),
            bytes_downloaded: AtomicU64::new(0),
        })
    }

    /// Serve only what is already cached.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Get the cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get download statistics for this session.
    pub fn download_stats(&self) -> DownloadStats {
        DownloadStats {
            rasters_downloaded: self.rasters_downloaded.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
        }
    }

    /// Cache file for a year and extent.
    pub fn cache_path(&self, year: u16, bounds: &RasterBounds) -> PathBuf {
        self.cache_dir
            .join("nlcd")
            .join(format!("canopy_{}_{}.tif", year, extent_key(bounds)))
    }

    /// Check if a raster is cached locally.
    pub fn is_cached(&self, year: u16, bounds: &RasterBounds) -> bool {
        self.cache_path(year, bounds).exists()
    }

    /// Fetch the raster for a year and extent, using the cache if available.
    ///
    /// Returns the path to the local GeoTIFF.
    pub fn fetch(&self, year: u16, bounds: &RasterBounds) -> Result<PathBuf> {
        check_year(year)?;

        let cache_path = self.cache_path(year, bounds);
        if cache_path.exists() {
            tracing::debug!(year, path = %cache_path.display(), "canopy raster cache hit");
            return Ok(cache_path);
        }

        if self.offline {
            return Err(RasterError::CacheMiss {
                year,
                path: cache_path,
            });
        }

        self.download(year, bounds, &cache_path)?;
        Ok(cache_path)
    }

    /// Download a coverage into the cache.
    fn download(&self, year: u16, bounds: &RasterBounds, cache_path: &Path) -> Result<()> {
        let url = self.source.coverage_url(year, bounds)?;
        tracing::info!(year, %url, "downloading NLCD canopy raster");

        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(RasterError::DownloadFailed {
                year,
                reason: format!("HTTP {}", response.status()),
            });
        }

        // GeoServer reports WCS exceptions as XML with a 200 status
        let is_xml = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("xml"));
        let bytes = response.bytes()?;
        if is_xml {
            let body = String::from_utf8_lossy(&bytes);
            return Err(RasterError::DownloadFailed {
                year,
                reason: body.chars().take(300).collect(),
            });
        }

        // Write beside the final name, then rename so a partial file is never a cache hit
        let partial = cache_path.with_extension("tif.part");
        fs::write(&partial, &bytes)?;
        fs::rename(&partial, cache_path)?;

        self.rasters_downloaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        tracing::debug!(year, bytes = bytes.len(), path = %cache_path.display(), "cached canopy raster");

        Ok(())
    }

    /// Fetch the raster covering `geometry` and mask it to the geometry.
    ///
    /// Pixels whose centers fall outside `geometry` become missing. A result
    /// with no valid pixel left is [`RasterError::NoValidPixels`].
    pub fn load_clipped(&self, year: u16, geometry: &MultiPolygon<f64>) -> Result<CanopyRaster> {
        check_year(year)?;
        let bounds = RasterBounds::of(geometry).ok_or(RasterError::EmptyExtent)?;

        let path = self.fetch(year, &bounds)?;
        let mut raster = CanopyRaster::from_file(&path, year)?;
        raster.mask_to(geometry);

        if raster.valid_count() == 0 {
            return Err(RasterError::NoValidPixels { year });
        }

        tracing::info!(
            year,
            valid_pixels = raster.valid_count(),
            "canopy raster clipped to boundary"
        );
        Ok(raster)
    }
}

/// Stable short key for an extent.
fn extent_key(bounds: &RasterBounds) -> String {
    let canonical = format!(
        "{:.6},{:.6},{:.6},{:.6}",
        bounds.min_lon, bounds.min_lat, bounds.max_lon, bounds.max_lat
    );
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(&digest[..8])
}
