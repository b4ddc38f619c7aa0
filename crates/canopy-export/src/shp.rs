//! ESRI shapefiles of the boundary and the change table.
//!
//! dBase field names are limited to 10 characters, so the results file uses
//! shortened column names. A `.prj` sidecar declares WGS84 geographic
//! coordinates.

use crate::{ExportError, Result};
use canopy_analysis::ChangeRecord;
use canopy_census::Boundary;
use geo::{LineString, MultiPolygon};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing, Writer};
use std::fs;
use std::path::Path;

/// ESRI WKT for EPSG:4326.
pub const WGS84_PRJ: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]]";

/// Results table columns, in file order.
pub const RESULT_FIELDS: [&str; 7] = [
    "GEOID",
    "NAME",
    "start_mean",
    "end_mean",
    "pct_change",
    "category",
    "acres_chg",
];

fn field(name: &str) -> Result<FieldName> {
    FieldName::try_from(name).map_err(|e| ExportError::InvalidField {
        field: name.to_string(),
        reason: format!("{:?}", e),
    })
}

fn ring_points(ring: &LineString<f64>) -> Vec<Point> {
    ring.coords().map(|c| Point::new(c.x, c.y)).collect()
}

/// One shapefile polygon holding every part and hole of `geometry`.
pub fn to_shape(geometry: &MultiPolygon<f64>) -> Polygon {
    let mut rings = Vec::new();
    for polygon in geometry {
        rings.push(PolygonRing::Outer(ring_points(polygon.exterior())));
        for interior in polygon.interiors() {
            rings.push(PolygonRing::Inner(ring_points(interior)));
        }
    }
    Polygon::with_rings(rings)
}

fn character(value: &str) -> FieldValue {
    FieldValue::Character(Some(value.to_string()))
}

fn numeric(value: f64) -> FieldValue {
    FieldValue::Numeric(value.is_finite().then_some(value))
}

fn write_prj(path: &Path) -> Result<()> {
    fs::write(path.with_extension("prj"), WGS84_PRJ)?;
    Ok(())
}

/// Write the city boundary as a single-feature polygon shapefile.
pub fn write_boundary(boundary: &Boundary, path: &Path) -> Result<()> {
    let table = TableWriterBuilder::new()
        .add_character_field(field("NAME")?, 80)
        .add_character_field(field("GEOID")?, 20)
        .add_character_field(field("STATE")?, 2);

    let mut writer = Writer::from_path(path, table)?;
    let mut record = Record::default();
    record.insert("NAME".to_string(), character(&boundary.name));
    record.insert("GEOID".to_string(), character(&boundary.geoid));
    record.insert("STATE".to_string(), character(&boundary.state));
    writer.write_shape_and_record(&to_shape(&boundary.geometry), &record)?;
    drop(writer);

    write_prj(path)
}

/// Write one polygon per change record.
pub fn write_results(records: &[ChangeRecord], path: &Path) -> Result<()> {
    let [geoid, name, start, end, pct, category, acres] = RESULT_FIELDS;
    let table = TableWriterBuilder::new()
        .add_character_field(field(geoid)?, 20)
        .add_character_field(field(name)?, 80)
        .add_numeric_field(field(start)?, 18, 6)
        .add_numeric_field(field(end)?, 18, 6)
        .add_numeric_field(field(pct)?, 18, 6)
        .add_character_field(field(category)?, 16)
        .add_numeric_field(field(acres)?, 18, 6);

    let mut writer = Writer::from_path(path, table)?;
    for r in records {
        let mut record = Record::default();
        record.insert(geoid.to_string(), character(&r.geoid));
        record.insert(name.to_string(), character(&r.name));
        record.insert(start.to_string(), numeric(r.start_mean));
        record.insert(end.to_string(), numeric(r.end_mean));
        record.insert(pct.to_string(), numeric(r.percent_change));
        record.insert(category.to_string(), character(r.category.label()));
        record.insert(acres.to_string(), numeric(r.acres_change));
        writer.write_shape_and_record(&to_shape(&r.geometry), &record)?;
    }
    drop(writer);

    write_prj(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_field_names_fit_dbase() {
        for name in RESULT_FIELDS {
            assert!(name.len() <= 10, "{} is too long", name);
            assert!(field(name).is_ok());
        }
    }

    #[test]
    fn test_to_shape_keeps_holes() {
        let with_hole = polygon!(
            exterior: [
                (x: 0.0, y: 0.0),
                (x: 4.0, y: 0.0),
                (x: 4.0, y: 4.0),
                (x: 0.0, y: 4.0),
                (x: 0.0, y: 0.0),
            ],
            interiors: [
                [
                    (x: 1.0, y: 1.0),
                    (x: 2.0, y: 1.0),
                    (x: 2.0, y: 2.0),
                    (x: 1.0, y: 2.0),
                    (x: 1.0, y: 1.0),
                ],
            ],
        );
        let shape = to_shape(&MultiPolygon::new(vec![with_hole]));
        assert_eq!(shape.rings().len(), 2);
        assert!(matches!(shape.rings()[0], PolygonRing::Outer(_)));
        assert!(matches!(shape.rings()[1], PolygonRing::Inner(_)));
    }

    #[test]
    fn test_numeric_missing() {
        assert_eq!(numeric(f64::NAN), FieldValue::Numeric(None));
        assert_eq!(numeric(2.5), FieldValue::Numeric(Some(2.5)));
    }
}
