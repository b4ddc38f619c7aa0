//! # canopy-raster
//!
//! NLCD tree canopy cover rasters: GeoTIFF decoding, polygon masking, and a
//! year-keyed on-disk cache backed by the MRLC Web Coverage Service.
//!
//! ## Overview
//!
//! The NLCD Tree Canopy Cover (TCC) product gives, for every 30 m pixel of the
//! contiguous US, the percentage of the pixel covered by tree canopy (0-100).
//! Annual layers exist for 2011 through 2021.
//!
//! Rasters handled here are north-up, georeferenced in WGS84 lon/lat with the
//! GeoTIFF `ModelTiepoint` and `ModelPixelScale` tags (pixel-is-area). Missing
//! pixels are held as `NaN` once loaded, whatever the on-disk nodata value.
//!
//! ## Example
//!
//! ```no_run
//! use canopy_raster::{RasterCache, WcsSource};
//! use geo::{polygon, MultiPolygon};
//!
//! let cache = RasterCache::new("./.canopy_cache", WcsSource::default())?;
//!
//! let city: MultiPolygon<f64> = polygon![
//!     (x: -122.70, y: 45.50),
//!     (x: -122.60, y: 45.50),
//!     (x: -122.60, y: 45.56),
//!     (x: -122.70, y: 45.56),
//! ]
//! .into();
//!
//! // Downloads once, then serves the cached GeoTIFF on later runs
//! let raster = cache.load_clipped(2021, &city)?;
//! println!("{} valid pixels", raster.valid_count());
//! # Ok::<(), canopy_raster::RasterError>(())
//! ```

mod cache;
mod error;
mod mask;
mod raster;

pub use cache::{
    check_year, DownloadStats, RasterCache, WcsSource, DEFAULT_COVERAGE_TEMPLATE,
    DEFAULT_WCS_ENDPOINT, SUPPORTED_YEARS,
};
pub use error::RasterError;
pub use raster::{CanopyRaster, RasterBounds, NLCD_NODATA};

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
