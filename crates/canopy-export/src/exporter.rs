//! Writes every output of a run into one directory.

use crate::{geojson_out, gpkg, html, shp, static_map, table, Result};
use canopy_analysis::{ChangeRecord, YearStats};
use canopy_census::{Boundary, Tract};
use canopy_raster::CanopyRaster;
use std::fs;
use std::path::{Path, PathBuf};

/// File-name form of a city: lower case, whitespace runs replaced by `_`.
pub fn file_stem(city: &str) -> String {
    city.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Everything a full export needs.
#[derive(Debug, Clone, Copy)]
pub struct ExportInputs<'a> {
    pub city: &'a str,
    pub boundary: &'a Boundary,
    pub tracts: &'a [Tract],
    /// Per-year statistics, one entry per year in order.
    pub yearly: &'a [YearStats],
    pub records: &'a [ChangeRecord],
    /// Clipped rasters, one per year.
    pub rasters: &'a [CanopyRaster],
    pub start_year: u16,
    pub end_year: u16,
}

/// Output directory writer.
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
}

impl Exporter {
    /// Create the output directory if needed.
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn path(&self, name: String) -> PathBuf {
        self.output_dir.join(name)
    }

    /// Write maps, vector files, tables, and clipped rasters. Returns the
    /// paths written (shapefile sidecars not included).
    pub fn export_all(&self, inputs: &ExportInputs<'_>) -> Result<Vec<PathBuf>> {
        let ExportInputs {
            city,
            boundary,
            tracts,
            yearly,
            records,
            rasters,
            start_year,
            end_year,
        } = *inputs;
        let stem = file_stem(city);
        let span = format!("{}_{}", start_year, end_year);
        let mut written = Vec::new();

        tracing::info!(dir = %self.output_dir.display(), "exporting results");

        for stats in yearly {
            let path = self.path(format!("canopy_map_{}.html", stats.year));
            fs::write(&path, html::yearly_map(boundary, tracts, stats)?)?;
            written.push(path);
        }

        let path = self.path(format!("canopy_change_map_{}.html", span));
        fs::write(&path, html::change_map(boundary, tracts, records, start_year, end_year)?)?;
        written.push(path);

        let path = self.path(format!("{}_boundary.shp", stem));
        shp::write_boundary(boundary, &path)?;
        written.push(path);

        let path = self.path(format!("{}_{}.shp", stem, span));
        shp::write_results(records, &path)?;
        written.push(path);

        let path = self.path(format!("{}_complete_{}.gpkg", stem, span));
        gpkg::write_geopackage(records, &path)?;
        written.push(path);

        let path = self.path(format!("{}_complete_{}.geojson", stem, span));
        geojson_out::write_geojson(records, &path)?;
        written.push(path);

        let path = self.path(format!("{}_complete_{}.csv", stem, span));
        table::write_results_csv(records, &path)?;
        written.push(path);

        let path = self.path(format!("{}_yearly_{}.csv", stem, span));
        table::write_yearly_csv(tracts, yearly, &path)?;
        written.push(path);

        for raster in rasters {
            let path = self.path(format!("canopy_{}.tif", raster.year()));
            raster.write_geotiff(&path)?;
            written.push(path);
        }

        for path in &written {
            tracing::debug!(path = %path.display(), "wrote");
        }
        tracing::info!(files = written.len(), "export complete");

        Ok(written)
    }

    /// Write `canopy_{year}.png` for `raster`.
    pub fn write_static_map(&self, raster: &CanopyRaster, boundary: &Boundary) -> Result<PathBuf> {
        let path = self.path(format!("canopy_{}.png", raster.year()));
        static_map::write_static_map(raster, boundary, &path)?;
        tracing::info!(path = %path.display(), "wrote static map");
        Ok(path)
    }
}
