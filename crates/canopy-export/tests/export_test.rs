//! Full export of a small synthetic run into a temporary directory.

use approx::assert_relative_eq;
use canopy_analysis::{calculate_change, zonal_stats};
use canopy_census::{Boundary, Tract};
use canopy_export::{read_results_csv, ExportInputs, Exporter};
use canopy_raster::{CanopyRaster, RasterBounds};
use geo::{polygon, MultiPolygon};
use geojson::GeoJson;
use shapefile::dbase::{FieldValue, Record};
use std::fs;

const BOUNDS: RasterBounds = RasterBounds {
    min_lon: -122.70,
    min_lat: 45.50,
    max_lon: -122.60,
    max_lat: 45.60,
};

fn rect(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon![
        (x: min_lon, y: min_lat),
        (x: max_lon, y: min_lat),
        (x: max_lon, y: max_lat),
        (x: min_lon, y: max_lat),
        (x: min_lon, y: min_lat),
    ]])
}

struct Run {
    boundary: Boundary,
    tracts: Vec<Tract>,
    rasters: Vec<CanopyRaster>,
}

fn run() -> Run {
    let boundary = Boundary {
        name: "Test City city".to_string(),
        state: "OR".to_string(),
        state_fips: "41".to_string(),
        geoid: "4199999".to_string(),
        geometry: rect(-122.70, 45.50, -122.60, 45.60),
    };
    let tracts = vec![
        Tract::new("41051000100", "Census Tract 1", rect(-122.70, 45.50, -122.65, 45.60)),
        Tract::new("41051000200", "Census Tract 2", rect(-122.65, 45.50, -122.60, 45.60)),
        Tract::new("41051000300", "Census Tract 3", rect(-120.10, 44.00, -120.00, 44.10)),
    ];

    let grid = |west: f32, east: f32| {
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend([west, west, east, east]);
        }
        data
    };
    let rasters = vec![
        CanopyRaster::from_parts(2019, 4, 4, BOUNDS, grid(30.0, 50.0)).unwrap(),
        CanopyRaster::from_parts(2020, 4, 4, BOUNDS, grid(31.0, 47.0)).unwrap(),
        CanopyRaster::from_parts(2021, 4, 4, BOUNDS, grid(34.0, 44.0)).unwrap(),
    ];

    Run {
        boundary,
        tracts,
        rasters,
    }
}

#[test]
fn test_export_all_writes_every_output() {
    let dir = tempfile::tempdir().unwrap();
    let run = run();
    let yearly: Vec<_> = run.rasters.iter().map(|r| zonal_stats(&run.tracts, r)).collect();
    let records = calculate_change(&yearly[0], &yearly[2], &run.tracts);
    assert_eq!(records.len(), 2);
    assert_relative_eq!(records[0].percent_change, 4.0);
    assert_relative_eq!(records[1].percent_change, -6.0);

    let exporter = Exporter::new(dir.path().join("test_city_OR_outputs")).unwrap();
    let written = exporter
        .export_all(&ExportInputs {
            city: "Test City",
            boundary: &run.boundary,
            tracts: &run.tracts,
            yearly: &yearly,
            records: &records,
            rasters: &run.rasters,
            start_year: 2019,
            end_year: 2021,
        })
        .unwrap();

    let out = exporter.output_dir();
    let expected = [
        "canopy_map_2019.html",
        "canopy_map_2020.html",
        "canopy_map_2021.html",
        "canopy_change_map_2019_2021.html",
        "test_city_boundary.shp",
        "test_city_boundary.shx",
        "test_city_boundary.dbf",
        "test_city_boundary.prj",
        "test_city_2019_2021.shp",
        "test_city_2019_2021.prj",
        "test_city_complete_2019_2021.gpkg",
        "test_city_complete_2019_2021.geojson",
        "test_city_complete_2019_2021.csv",
        "test_city_yearly_2019_2021.csv",
        "canopy_2019.tif",
        "canopy_2021.tif",
    ];
    for name in expected {
        assert!(out.join(name).exists(), "missing {}", name);
    }
    assert_eq!(written.len(), 3 + 1 + 2 + 4 + 3);

    let change_map = fs::read_to_string(out.join("canopy_change_map_2019_2021.html")).unwrap();
    assert!(change_map.contains("Moderate Gain (1)"));
    assert!(change_map.contains("Major Loss (1)"));
    assert!(change_map.contains("No Data (1)"));
    assert!(change_map.contains("leaflet"));
}

#[test]
fn test_results_csv_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let run = run();
    let start = zonal_stats(&run.tracts, &run.rasters[0]);
    let end = zonal_stats(&run.tracts, &run.rasters[2]);
    let records = calculate_change(&start, &end, &run.tracts);

    let path = dir.path().join("results.csv");
    canopy_export::table::write_results_csv(&records, &path).unwrap();
    let loaded = read_results_csv(&path).unwrap();

    assert_eq!(loaded.len(), records.len());
    for (original, reloaded) in records.iter().zip(&loaded) {
        assert_eq!(reloaded.geoid, original.geoid);
        assert_eq!(reloaded.geometry, original.geometry);
        assert_eq!(reloaded.percent_change, original.percent_change);
        assert_eq!(reloaded.category, original.category);
        assert_eq!(reloaded.relative_change, original.relative_change);
    }
}

#[test]
fn test_vector_outputs_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let run = run();
    let start = zonal_stats(&run.tracts, &run.rasters[0]);
    let end = zonal_stats(&run.tracts, &run.rasters[2]);
    let records = calculate_change(&start, &end, &run.tracts);

    // GeoJSON
    let geojson_path = dir.path().join("out.geojson");
    canopy_export::geojson_out::write_geojson(&records, &geojson_path).unwrap();
    let parsed: GeoJson = fs::read_to_string(&geojson_path).unwrap().parse().unwrap();
    match parsed {
        GeoJson::FeatureCollection(fc) => {
            assert_eq!(fc.features.len(), 2);
            let category = fc.features[1].property("change_category").unwrap();
            assert_eq!(category, "Major Loss");
        }
        other => panic!("expected a FeatureCollection, got {:?}", other),
    }

    // Shapefile
    let shp_path = dir.path().join("out.shp");
    canopy_export::shp::write_results(&records, &shp_path).unwrap();
    let shapes = shapefile::read_as::<_, shapefile::Polygon, Record>(&shp_path).unwrap();
    assert_eq!(shapes.len(), 2);
    match shapes[0].1.get("GEOID") {
        Some(FieldValue::Character(Some(geoid))) => assert_eq!(geoid.trim(), "41051000100"),
        other => panic!("unexpected GEOID field {:?}", other),
    }

    // GeoPackage
    let gpkg_path = dir.path().join("out.gpkg");
    canopy_export::gpkg::write_geopackage(&records, &gpkg_path).unwrap();
    let conn = rusqlite::Connection::open(&gpkg_path).unwrap();
    let app_id: i32 = conn
        .query_row("PRAGMA application_id", [], |row| row.get(0))
        .unwrap();
    assert_eq!(app_id, 0x4750_4B47);
    let (count, gain): (i64, i64) = conn
        .query_row(
            "SELECT COUNT(*), SUM(change_category = 'Moderate Gain') FROM canopy_change",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(gain, 1);
    let geometry_type: String = conn
        .query_row(
            "SELECT geometry_type_name FROM gpkg_geometry_columns WHERE table_name = 'canopy_change'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(geometry_type, "MULTIPOLYGON");

    // Rewriting replaces the file
    drop(conn);
    canopy_export::gpkg::write_geopackage(&records[..1], &gpkg_path).unwrap();
    let conn = rusqlite::Connection::open(&gpkg_path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM canopy_change", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_static_map_png() {
    let dir = tempfile::tempdir().unwrap();
    let run = run();
    let exporter = Exporter::new(dir.path()).unwrap();

    let path = exporter
        .write_static_map(&run.rasters[2], &run.boundary)
        .unwrap();
    assert!(path.ends_with("canopy_2021.png"));
    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
}
