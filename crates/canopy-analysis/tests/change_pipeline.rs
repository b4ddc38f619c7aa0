//! Zonal statistics and change over synthetic in-memory rasters.

use approx::assert_relative_eq;
use canopy_analysis::{calculate_change, zonal_stats, ChangeCategory, Summary, ZonalStats};
use canopy_census::Tract;
use canopy_raster::{CanopyRaster, RasterBounds};
use geo::{polygon, MultiPolygon};

const BOUNDS: RasterBounds = RasterBounds {
    min_lon: -122.70,
    min_lat: 45.50,
    max_lon: -122.60,
    max_lat: 45.60,
};

fn rect_tract(geoid: &str, min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Tract {
    let poly = polygon![
        (x: min_lon, y: min_lat),
        (x: max_lon, y: min_lat),
        (x: max_lon, y: max_lat),
        (x: min_lon, y: max_lat),
        (x: min_lon, y: min_lat),
    ];
    Tract::new(geoid, format!("Census Tract {}", geoid), MultiPolygon::new(vec![poly]))
}

/// 4x4 grid: west half `west`, east half `east`, with the NE pixel missing.
fn raster(year: u16, west: f32, east: f32) -> CanopyRaster {
    let mut data = Vec::with_capacity(16);
    for _row in 0..4 {
        data.extend([west, west, east, east]);
    }
    data[3] = f32::NAN;
    CanopyRaster::from_parts(year, 4, 4, BOUNDS, data).unwrap()
}

fn tracts() -> Vec<Tract> {
    vec![
        rect_tract("41051000100", -122.70, 45.50, -122.65, 45.60),
        rect_tract("41051000200", -122.65, 45.50, -122.60, 45.60),
        // Entirely outside the raster
        rect_tract("41051000300", -120.10, 44.00, -120.00, 44.10),
    ]
}

#[test]
fn test_zonal_stats_per_tract() {
    let stats = zonal_stats(&tracts(), &raster(2011, 20.0, 60.0));

    assert_eq!(stats.year, 2011);
    assert_eq!(stats.by_tract.len(), 3);

    let west = stats.get("41051000100").unwrap();
    assert_eq!(west.count, 8);
    assert_relative_eq!(west.mean, 20.0);
    assert_relative_eq!(west.sum, 160.0);
    assert_relative_eq!(west.std, 0.0);

    let east = stats.get("41051000200").unwrap();
    assert_eq!(east.count, 7);
    assert_relative_eq!(east.mean, 60.0);
}

#[test]
fn test_tract_outside_raster_is_missing() {
    let stats = zonal_stats(&tracts(), &raster(2011, 20.0, 60.0));

    let outside = stats.get("41051000300").unwrap();
    assert!(outside.is_missing());
    assert_eq!(outside.count, ZonalStats::MISSING.count);
    assert!(outside.mean.is_nan());
    assert_eq!(stats.valid_tracts(), 2);
}

#[test]
fn test_change_between_years() {
    let tracts = tracts();
    let start = zonal_stats(&tracts, &raster(2011, 20.0, 60.0));
    let end = zonal_stats(&tracts, &raster(2021, 23.0, 52.0));

    let records = calculate_change(&start, &end, &tracts);
    assert_eq!(records.len(), 2);

    let west = &records[0];
    assert_eq!(west.geoid, "41051000100");
    assert_eq!(west.percent_change, west.end_mean - west.start_mean);
    assert_relative_eq!(west.percent_change, 3.0, epsilon = 1e-9);
    assert_eq!(west.category, ChangeCategory::ModerateGain);

    let east = &records[1];
    assert_relative_eq!(east.percent_change, -8.0, epsilon = 1e-9);
    assert_eq!(east.category, ChangeCategory::MajorLoss);
    assert_relative_eq!(
        east.acres_change,
        tracts[1].city_area_acres() * east.percent_change / 100.0,
        epsilon = 1e-9
    );

    // The tract without data stays in the yearly table only
    assert!(start.get("41051000300").is_some());
    assert!(records.iter().all(|r| r.geoid != "41051000300"));

    let summary = Summary::from_records("Portland", 2011, 2021, &records);
    assert_eq!(summary.tracts, 2);
    assert_eq!(summary.count_of(ChangeCategory::ModerateGain), 1);
    assert_eq!(summary.count_of(ChangeCategory::MajorLoss), 1);
}
