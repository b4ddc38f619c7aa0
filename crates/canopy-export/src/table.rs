//! CSV tables: the change table with WKT geometry, and long-format yearly stats.

use crate::{ExportError, Result};
use canopy_analysis::{ChangeCategory, ChangeRecord, YearStats};
use canopy_census::Tract;
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::path::Path;
use wkt::{ToWkt, TryFromWkt};

/// One row of `{city}_complete_{start}_{end}.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ResultRow {
    #[serde(rename = "GEOID")]
    geoid: String,
    name: String,
    start_mean: f64,
    end_mean: f64,
    percent_change: f64,
    relative_change: Option<f64>,
    change_category: String,
    acres_start: f64,
    acres_end: f64,
    acres_change: f64,
    geometry_wkt: String,
}

/// One row of `{city}_yearly_{start}_{end}.csv`; statistics are empty when missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct YearlyRow<'a> {
    #[serde(rename = "GEOID")]
    geoid: &'a str,
    name: &'a str,
    year: u16,
    mean: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    std: Option<f64>,
    sum: Option<f64>,
    pixel_count: usize,
}

/// Write the change records with their geometry as MULTIPOLYGON WKT.
pub fn write_results_csv(records: &[ChangeRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for r in records {
        writer.serialize(ResultRow {
            geoid: r.geoid.clone(),
            name: r.name.clone(),
            start_mean: r.start_mean,
            end_mean: r.end_mean,
            percent_change: r.percent_change,
            relative_change: r.relative_change,
            change_category: r.category.label().to_string(),
            acres_start: r.acres_start,
            acres_end: r.acres_end,
            acres_change: r.acres_change,
            geometry_wkt: r.geometry.wkt_string(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Load change records written by [`write_results_csv`].
pub fn read_results_csv(path: &Path) -> Result<Vec<ChangeRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();

    for row in reader.deserialize() {
        let row: ResultRow = row?;

        let geometry = MultiPolygon::<f64>::try_from_wkt_str(&row.geometry_wkt).map_err(|e| {
            ExportError::Wkt {
                path: path.to_path_buf(),
                geoid: row.geoid.clone(),
                reason: e.to_string(),
            }
        })?;
        let category: ChangeCategory =
            row.change_category
                .parse()
                .map_err(|reason| ExportError::InvalidField {
                    field: "change_category".to_string(),
                    reason,
                })?;

        records.push(ChangeRecord {
            geoid: row.geoid,
            name: row.name,
            start_mean: row.start_mean,
            end_mean: row.end_mean,
            percent_change: row.percent_change,
            relative_change: row.relative_change,
            acres_start: row.acres_start,
            acres_end: row.acres_end,
            acres_change: row.acres_change,
            category,
            geometry,
        });
    }

    Ok(records)
}

/// Write per-year statistics for every tract, one row per (tract, year).
pub fn write_yearly_csv(tracts: &[Tract], yearly: &[YearStats], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for tract in tracts {
        for stats in yearly {
            let zonal = stats.get(&tract.geoid).filter(|s| !s.is_missing());
            writer.serialize(YearlyRow {
                geoid: &tract.geoid,
                name: &tract.name,
                year: stats.year,
                mean: zonal.map(|s| s.mean),
                min: zonal.map(|s| s.min),
                max: zonal.map(|s| s.max),
                std: zonal.map(|s| s.std),
                sum: zonal.map(|s| s.sum),
                pixel_count: zonal.map_or(0, |s| s.count),
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}
