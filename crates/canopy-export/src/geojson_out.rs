//! GeoJSON output of the change table.

use crate::Result;
use canopy_analysis::ChangeRecord;
use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue};
use std::fs;
use std::path::Path;

/// A feature with the given geometry and properties.
pub(crate) fn feature(geometry: &MultiPolygon<f64>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(geometry))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

pub(crate) fn collection(features: Vec<Feature>) -> GeoJson {
    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// JSON number, or `null` for NaN and infinities.
pub(crate) fn number(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

/// Properties written for each change record.
pub(crate) fn record_properties(record: &ChangeRecord) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert("GEOID".into(), record.geoid.clone().into());
    properties.insert("name".into(), record.name.clone().into());
    properties.insert("start_mean".into(), number(record.start_mean));
    properties.insert("end_mean".into(), number(record.end_mean));
    properties.insert("percent_change".into(), number(record.percent_change));
    properties.insert(
        "relative_change".into(),
        record.relative_change.map_or(JsonValue::Null, number),
    );
    properties.insert("change_category".into(), record.category.label().into());
    properties.insert("acres_start".into(), number(record.acres_start));
    properties.insert("acres_end".into(), number(record.acres_end));
    properties.insert("acres_change".into(), number(record.acres_change));
    properties
}

/// Write the change records as a GeoJSON FeatureCollection.
pub fn write_geojson(records: &[ChangeRecord], path: &Path) -> Result<()> {
    let features = records
        .iter()
        .map(|r| feature(&r.geometry, record_properties(r)))
        .collect();
    fs::write(path, collection(features).to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_handles_nan() {
        assert_eq!(number(f64::NAN), JsonValue::Null);
        assert_eq!(number(1.5), serde_json::json!(1.5));
    }
}
