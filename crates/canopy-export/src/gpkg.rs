//! GeoPackage 1.3 output.
//!
//! The file is a SQLite database with the mandatory metadata tables and one
//! feature table. Geometries are stored as GeoPackage binary blobs:
//!
//! ```text
//! "GP" | version 0 | flags | srs_id i32 | envelope [minx, maxx, miny, maxy] | WKB
//! ```
//!
//! Flags select little-endian byte order and an XY envelope. The WKB body is
//! a little-endian MultiPolygon.

use crate::Result;
use canopy_analysis::ChangeRecord;
use geo::{BoundingRect, LineString, MultiPolygon, Rect};
use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;

/// Feature table written by [`write_geopackage`].
pub const TABLE_NAME: &str = "canopy_change";

/// `GPKG` as a big-endian integer.
const APPLICATION_ID: i32 = 0x4750_4B47;

/// GeoPackage 1.3.0.
const USER_VERSION: i32 = 10300;

const SRS_ID: i32 = 4326;

const WGS84_DEFINITION: &str = "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563,AUTHORITY[\"EPSG\",\"7030\"]],AUTHORITY[\"EPSG\",\"6326\"]],PRIMEM[\"Greenwich\",0,AUTHORITY[\"EPSG\",\"8901\"]],UNIT[\"degree\",0.0174532925199433,AUTHORITY[\"EPSG\",\"9122\"]],AUTHORITY[\"EPSG\",\"4326\"]]";

const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOLYGON: u32 = 6;

/// Little-endian WKB of a MultiPolygon.
pub fn wkb_multipolygon(geometry: &MultiPolygon<f64>) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(1u8);
    out.extend_from_slice(&WKB_MULTIPOLYGON.to_le_bytes());
    out.extend_from_slice(&(geometry.0.len() as u32).to_le_bytes());

    for polygon in geometry {
        out.push(1u8);
        out.extend_from_slice(&WKB_POLYGON.to_le_bytes());
        out.extend_from_slice(&(1 + polygon.interiors().len() as u32).to_le_bytes());
        write_ring(&mut out, polygon.exterior());
        for interior in polygon.interiors() {
            write_ring(&mut out, interior);
        }
    }
    out
}

fn write_ring(out: &mut Vec<u8>, ring: &LineString<f64>) {
    out.extend_from_slice(&(ring.0.len() as u32).to_le_bytes());
    for coord in ring.coords() {
        out.extend_from_slice(&coord.x.to_le_bytes());
        out.extend_from_slice(&coord.y.to_le_bytes());
    }
}

/// GeoPackage binary geometry: header with XY envelope followed by WKB.
pub fn gpkg_geometry(geometry: &MultiPolygon<f64>) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"GP");
    out.push(0);

    match geometry.bounding_rect() {
        Some(rect) => {
            // little-endian, envelope [minx, maxx, miny, maxy]
            out.push(0b0000_0011);
            out.extend_from_slice(&SRS_ID.to_le_bytes());
            for v in [rect.min().x, rect.max().x, rect.min().y, rect.max().y] {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        None => {
            // little-endian, no envelope, empty geometry
            out.push(0b0001_0001);
            out.extend_from_slice(&SRS_ID.to_le_bytes());
        }
    }

    out.extend(wkb_multipolygon(geometry));
    out
}

fn create_metadata(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "application_id", APPLICATION_ID)?;
    conn.pragma_update(None, "user_version", USER_VERSION)?;

    conn.execute(
        "CREATE TABLE gpkg_spatial_ref_sys (
            srs_name TEXT NOT NULL,
            srs_id INTEGER PRIMARY KEY,
            organization TEXT NOT NULL,
            organization_coordsys_id INTEGER NOT NULL,
            definition TEXT NOT NULL,
            description TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE gpkg_contents (
            table_name TEXT NOT NULL PRIMARY KEY,
            data_type TEXT NOT NULL,
            identifier TEXT UNIQUE,
            description TEXT DEFAULT '',
            last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            min_x DOUBLE,
            min_y DOUBLE,
            max_x DOUBLE,
            max_y DOUBLE,
            srs_id INTEGER,
            CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE gpkg_geometry_columns (
            table_name TEXT NOT NULL,
            column_name TEXT NOT NULL,
            geometry_type_name TEXT NOT NULL,
            srs_id INTEGER NOT NULL,
            z TINYINT NOT NULL,
            m TINYINT NOT NULL,
            CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
            CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
            CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
        )",
        [],
    )?;

    let srs_rows: [(&str, i32, &str, i32, &str, &str); 3] = [
        ("Undefined cartesian SRS", -1, "NONE", -1, "undefined", "undefined cartesian coordinate reference system"),
        ("Undefined geographic SRS", 0, "NONE", 0, "undefined", "undefined geographic coordinate reference system"),
        ("WGS 84 geodetic", SRS_ID, "EPSG", SRS_ID, WGS84_DEFINITION, "longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid"),
    ];
    for (name, id, org, org_id, definition, description) in srs_rows {
        conn.execute(
            "INSERT INTO gpkg_spatial_ref_sys
                (srs_name, srs_id, organization, organization_coordsys_id, definition, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![name, id, org, org_id, definition, description],
        )?;
    }

    Ok(())
}

fn extent_of(records: &[ChangeRecord]) -> Option<Rect<f64>> {
    records
        .iter()
        .filter_map(|r| r.geometry.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
            )
        })
}

/// Write the change records to a new GeoPackage at `path`, replacing any existing file.
pub fn write_geopackage(records: &[ChangeRecord], path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }

    let mut conn = Connection::open(path)?;
    create_metadata(&conn)?;

    conn.execute(
        &format!(
            "CREATE TABLE {} (
                fid INTEGER PRIMARY KEY AUTOINCREMENT,
                geom MULTIPOLYGON,
                GEOID TEXT,
                name TEXT,
                start_mean REAL,
                end_mean REAL,
                percent_change REAL,
                relative_change REAL,
                change_category TEXT,
                acres_change REAL
            )",
            TABLE_NAME
        ),
        [],
    )?;

    let extent = extent_of(records);
    conn.execute(
        "INSERT INTO gpkg_contents
            (table_name, data_type, identifier, description, min_x, min_y, max_x, max_y, srs_id)
         VALUES (?1, 'features', ?1, 'Census tract canopy change', ?2, ?3, ?4, ?5, ?6)",
        params![
            TABLE_NAME,
            extent.map(|r| r.min().x),
            extent.map(|r| r.min().y),
            extent.map(|r| r.max().x),
            extent.map(|r| r.max().y),
            SRS_ID
        ],
    )?;
    conn.execute(
        "INSERT INTO gpkg_geometry_columns (table_name, column_name, geometry_type_name, srs_id, z, m)
         VALUES (?1, 'geom', 'MULTIPOLYGON', ?2, 0, 0)",
        params![TABLE_NAME, SRS_ID],
    )?;

    let tx = conn.transaction()?;
    {
        let mut insert = tx.prepare(&format!(
            "INSERT INTO {} (geom, GEOID, name, start_mean, end_mean, percent_change,
                relative_change, change_category, acres_change)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            TABLE_NAME
        ))?;
        for r in records {
            insert.execute(params![
                gpkg_geometry(&r.geometry),
                r.geoid,
                r.name,
                r.start_mean,
                r.end_mean,
                r.percent_change,
                r.relative_change,
                r.category.label(),
                r.acres_change,
            ])?;
        }
    }
    tx.commit()?;

    Ok(())
}
