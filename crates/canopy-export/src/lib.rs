//! # canopy-export
//!
//! Writes the results of a canopy change run to disk.
//!
//! | File | Writer |
//! |------|--------|
//! | `canopy_map_{year}.html` | [`html::yearly_map`] |
//! | `canopy_change_map_{start}_{end}.html` | [`html::change_map`] |
//! | `{city}_boundary.shp` | [`shp::write_boundary`] |
//! | `{city}_{start}_{end}.shp` | [`shp::write_results`] |
//! | `{city}_complete_{start}_{end}.gpkg` | [`gpkg::write_geopackage`] |
//! | `{city}_complete_{start}_{end}.geojson` | [`geojson_out::write_geojson`] |
//! | `{city}_complete_{start}_{end}.csv` | [`table::write_results_csv`] |
//! | `{city}_yearly_{start}_{end}.csv` | [`table::write_yearly_csv`] |
//! | `canopy_{year}.tif` | [`canopy_raster::CanopyRaster::write_geotiff`] |
//! | `canopy_{year}.png` | [`static_map::write_static_map`] |
//!
//! [`Exporter`] writes the whole set into one output directory. `{city}` is
//! the city name lower-cased with spaces replaced by underscores.

mod error;
mod exporter;
pub mod geojson_out;
pub mod gpkg;
pub mod html;
pub mod shp;
pub mod static_map;
pub mod table;

pub use error::ExportError;
pub use exporter::{file_stem, ExportInputs, Exporter};
pub use table::read_results_csv;

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;
