//! The canopy change pipeline.
//!
//! Steps run in a fixed order and stop at the first fatal error:
//!
//! 1. resolve the city boundary
//! 2. fetch and mask one canopy raster per year
//! 3. load the census tracts intersecting the boundary
//! 4. zonal statistics per year
//! 5. change between the first and last year, and the summary
//! 6. export (optional)
//! 7. static map of the last year (optional)
//!
//! A boundary without valid canopy pixels (step 2) and an empty change table
//! (step 5) are fatal.

use crate::{PipelineError, Result, RunConfig};
use canopy_analysis::{calculate_change, zonal_stats, ChangeRecord, Summary, YearStats};
use canopy_census::{Boundary, BoundaryResolver, TigerwebClient, Tract, TractLoader};
use canopy_export::{ExportInputs, Exporter};
use canopy_raster::{CanopyRaster, DownloadStats, RasterCache};
use std::path::PathBuf;
use std::time::Instant;

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub boundary: Boundary,
    pub tracts: Vec<Tract>,
    /// Clipped rasters, one per year.
    pub rasters: Vec<CanopyRaster>,
    /// Zonal statistics, one entry per year.
    pub yearly: Vec<YearStats>,
    pub records: Vec<ChangeRecord>,
    pub summary: Summary,
    /// Files written by the export step.
    pub written: Vec<PathBuf>,
    /// Static map, when requested.
    pub plot: Option<PathBuf>,
    pub download_stats: DownloadStats,
}

/// A configured run.
pub struct Pipeline {
    config: RunConfig,
    census: TigerwebClient,
    rasters: RasterCache,
}

impl Pipeline {
    /// Set up the census client and raster cache under the configured cache directory.
    pub fn new(config: RunConfig) -> Result<Self> {
        let timeout = config.sources.timeout();
        let census = TigerwebClient::with_timeout(&config.cache_dir, config.sources.tigerweb_source(), timeout)?
            .offline(config.offline);
        let rasters = RasterCache::with_timeout(&config.cache_dir, config.sources.wcs_source(), timeout)?
            .offline(config.offline);

        Ok(Self {
            config,
            census,
            rasters,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every step.
    pub fn run(&self) -> Result<PipelineOutput> {
        let config = &self.config;
        let started = Instant::now();
        tracing::info!(
            city = %config.city,
            state = %config.state,
            start_year = config.start_year,
            end_year = config.end_year,
            "starting canopy analysis"
        );

        tracing::info!("step 1: resolving city boundary");
        let boundary = BoundaryResolver::new(&self.census).resolve(
            &config.city,
            &config.state,
            config.place_geoid.as_deref(),
        )?;

        tracing::info!("step 2: fetching canopy rasters");
        let rasters = config
            .years()
            .map(|year| self.rasters.load_clipped(year, &boundary.geometry))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        tracing::info!("step 3: loading census tracts");
        let tracts = TractLoader::new(&self.census).load(&boundary)?;

        tracing::info!("step 4: computing zonal statistics");
        let yearly: Vec<YearStats> = rasters.iter().map(|r| zonal_stats(&tracts, r)).collect();

        tracing::info!("step 5: computing canopy change");
        let records = match (yearly.first(), yearly.last()) {
            (Some(first), Some(last)) => calculate_change(first, last, &tracts),
            _ => Vec::new(),
        };
        if records.is_empty() {
            return Err(PipelineError::NoTractData {
                city: config.city.clone(),
                start_year: config.start_year,
                end_year: config.end_year,
            });
        }
        let summary = Summary::from_records(&config.city, config.start_year, config.end_year, &records);

        let mut written = Vec::new();
        let mut plot = None;
        if config.export || config.plot {
            let exporter = Exporter::new(&config.output_dir)?;

            if config.export {
                tracing::info!("step 6: exporting results");
                written = exporter.export_all(&ExportInputs {
                    city: &config.city,
                    boundary: &boundary,
                    tracts: &tracts,
                    yearly: &yearly,
                    records: &records,
                    rasters: &rasters,
                    start_year: config.start_year,
                    end_year: config.end_year,
                })?;
            }

            if config.plot {
                tracing::info!("step 7: rendering static map");
                if let Some(raster) = rasters.last() {
                    plot = Some(exporter.write_static_map(raster, &boundary)?);
                }
            }
        }

        let download_stats = self.rasters.download_stats();
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            rasters_downloaded = download_stats.rasters_downloaded,
            bytes_downloaded = download_stats.bytes_downloaded,
            "analysis complete"
        );

        Ok(PipelineOutput {
            boundary,
            tracts,
            rasters,
            yearly,
            records,
            summary,
            written,
            plot,
            download_stats,
        })
    }
}
