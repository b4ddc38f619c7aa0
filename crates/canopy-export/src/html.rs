//! Interactive Leaflet choropleth maps as standalone HTML pages.
//!
//! Pages load Leaflet and CartoDB Positron tiles from public CDNs; the tract
//! and boundary data are embedded as GeoJSON with a precomputed `fill` color
//! and `tooltip` per feature.

use crate::geojson_out::{collection, feature};
use crate::Result;
use canopy_analysis::{ChangeCategory, ChangeRecord, YearStats};
use canopy_census::{Boundary, Tract};
use geo::{BoundingRect, Centroid};
use geojson::JsonObject;
use std::collections::HashMap;

/// ColorBrewer YlGn, six classes.
pub const YLGN_6: [&str; 6] = ["#ffffcc", "#d9f0a3", "#addd8e", "#78c679", "#31a354", "#006837"];

/// Fill for tracts without canopy data.
pub const NO_DATA_FILL: &str = "#d3d3d3";

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>__TITLE__</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
html, body, #map { height: 100%; margin: 0; }
.legend { background: white; border: 2px solid grey; padding: 10px; font: 14px Arial, sans-serif; line-height: 20px; }
.legend i { width: 18px; height: 18px; float: left; margin-right: 6px; opacity: 0.8; }
.leaflet-tooltip { font: 12px Arial, sans-serif; }
</style>
</head>
<body>
<div id="map"></div>
<script>
var map = L.map('map').setView([__LAT__, __LON__], 11);
L.tileLayer('https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png', {
  attribution: '&copy; OpenStreetMap contributors &copy; CARTO',
  subdomains: 'abcd',
  maxZoom: 19
}).addTo(map);
var tracts = L.geoJSON(__TRACTS__, {
  style: function (f) {
    return { fillColor: f.properties.fill, color: '#444444', weight: 0.5, fillOpacity: 0.7 };
  },
  onEachFeature: function (f, layer) {
    layer.bindTooltip(f.properties.tooltip, { sticky: true });
    layer.on({
      mouseover: function (e) { e.target.setStyle({ weight: 3, color: 'black' }); },
      mouseout: function (e) { tracts.resetStyle(e.target); }
    });
  }
}).addTo(map);
var boundary = L.geoJSON(__BOUNDARY__, {
  style: { color: 'red', weight: 3, fill: false }
}).addTo(map);
var overlays = {};
overlays[__LAYER__] = tracts;
overlays['City Boundary'] = boundary;
L.control.layers(null, overlays).addTo(map);
var legend = L.control({ position: 'bottomright' });
legend.onAdd = function () {
  var div = L.DomUtil.create('div', 'legend');
  div.innerHTML = __LEGEND__;
  return div;
};
legend.addTo(map);
</script>
</body>
</html>
"#;

/// Equal-width class edges over `[min, max]`; `classes + 1` values.
pub fn equal_width_breaks(min: f64, max: f64, classes: usize) -> Vec<f64> {
    let width = (max - min) / classes as f64;
    (0..=classes).map(|i| min + width * i as f64).collect()
}

/// Class index of `value` given edges from [`equal_width_breaks`].
pub fn class_of(value: f64, breaks: &[f64]) -> usize {
    if breaks.len() < 2 {
        return 0;
    }
    let classes = breaks.len() - 1;
    let (min, width) = (breaks[0], breaks[1] - breaks[0]);
    if width <= 0.0 {
        return 0;
    }
    let index = ((value - min) / width).floor();
    (index.max(0.0) as usize).min(classes - 1)
}

/// Yearly canopy choropleth (YlGn, six equal-width classes).
pub fn yearly_map(boundary: &Boundary, tracts: &[Tract], stats: &YearStats) -> Result<String> {
    let year = stats.year;
    let means: Vec<f64> = tracts.iter().filter_map(|t| stats.mean_of(&t.geoid)).collect();
    let min = means.iter().copied().fold(f64::INFINITY, f64::min);
    let max = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let breaks = (!means.is_empty()).then(|| equal_width_breaks(min, max, YLGN_6.len()));

    let features = tracts
        .iter()
        .map(|tract| {
            let tract_stats = stats.get(&tract.geoid);
            let mean = stats.mean_of(&tract.geoid);
            let fill = match (mean, breaks.as_deref()) {
                (Some(m), Some(b)) => YLGN_6[class_of(m, b)],
                _ => NO_DATA_FILL,
            };
            let pixels = tract_stats.map_or(0, |s| s.count);
            let tooltip = format!(
                "<b>Tract:</b> {}<br><b>Canopy {}:</b> {}<br><b>Pixels:</b> {}",
                escape_html(&tract.name),
                year,
                mean.map_or_else(|| "no data".to_string(), |m| format!("{:.1}%", m)),
                pixels
            );

            let mut properties = JsonObject::new();
            properties.insert("GEOID".into(), tract.geoid.clone().into());
            properties.insert("fill".into(), fill.into());
            properties.insert("tooltip".into(), tooltip.into());
            feature(&tract.geometry, properties)
        })
        .collect();

    let mut legend = format!("<strong>Tree Canopy Cover {} (%)</strong><br>", year);
    if let Some(b) = &breaks {
        for (i, color) in YLGN_6.iter().enumerate() {
            legend.push_str(&format!(
                "<i style=\"background:{}\"></i>{:.1} - {:.1}<br>",
                color,
                b[i],
                b[i + 1]
            ));
        }
    }
    legend.push_str(&format!("<i style=\"background:{}\"></i>No data", NO_DATA_FILL));

    render(
        &format!("Tree Canopy Cover {}", year),
        boundary,
        collection(features).to_string(),
        &format!("Canopy {}", year),
        &legend,
    )
}

/// Categorical change map. Tracts without a change record are drawn as "No Data".
pub fn change_map(
    boundary: &Boundary,
    tracts: &[Tract],
    records: &[ChangeRecord],
    start_year: u16,
    end_year: u16,
) -> Result<String> {
    let by_geoid: HashMap<&str, &ChangeRecord> =
        records.iter().map(|r| (r.geoid.as_str(), r)).collect();

    let features = tracts
        .iter()
        .map(|tract| {
            let record = by_geoid.get(tract.geoid.as_str());
            let (fill, tooltip) = match record {
                Some(r) => (
                    r.category.color(),
                    format!(
                        "<b>Tract:</b> {}<br><b>Canopy {}:</b> {:.1}%<br><b>Canopy {}:</b> {:.1}%<br>\
                         <b>Change (pct pts):</b> {:+.2}<br><b>Category:</b> {}<br><b>Acres Change:</b> {:+.1}",
                        escape_html(&tract.name),
                        start_year,
                        r.start_mean,
                        end_year,
                        r.end_mean,
                        r.percent_change,
                        r.category,
                        r.acres_change
                    ),
                ),
                None => (
                    ChangeCategory::NO_DATA_COLOR,
                    format!("<b>Tract:</b> {}<br><b>Category:</b> No Data", escape_html(&tract.name)),
                ),
            };

            let mut properties = JsonObject::new();
            properties.insert("GEOID".into(), tract.geoid.clone().into());
            properties.insert("fill".into(), fill.into());
            properties.insert("tooltip".into(), tooltip.into());
            feature(&tract.geometry, properties)
        })
        .collect();

    let mut legend = format!("<strong>Canopy Change</strong><br>{} - {}<br>", start_year, end_year);
    for category in ChangeCategory::ALL {
        let count = records.iter().filter(|r| r.category == category).count();
        if count > 0 {
            legend.push_str(&format!(
                "<i style=\"background:{}\"></i>{} ({})<br>",
                category.color(),
                category,
                count
            ));
        }
    }
    let no_data = tracts.len().saturating_sub(by_geoid.len());
    if no_data > 0 {
        legend.push_str(&format!(
            "<i style=\"background:{}\"></i>No Data ({})",
            ChangeCategory::NO_DATA_COLOR,
            no_data
        ));
    }

    render(
        &format!("Canopy Change {}-{}", start_year, end_year),
        boundary,
        collection(features).to_string(),
        "Canopy Change",
        &legend,
    )
}

fn render(title: &str, boundary: &Boundary, tracts_json: String, layer: &str, legend: &str) -> Result<String> {
    let (lon, lat) = boundary
        .geometry
        .centroid()
        .map(|c| (c.x(), c.y()))
        .or_else(|| {
            boundary
                .geometry
                .bounding_rect()
                .map(|r| (r.center().x, r.center().y))
        })
        .unwrap_or((-98.5, 39.8));

    let boundary_json = collection(vec![feature(&boundary.geometry, JsonObject::new())]).to_string();

    Ok(PAGE
        .replace("__TITLE__", &escape_html(title))
        .replace("__LAT__", &format!("{:.6}", lat))
        .replace("__LON__", &format!("{:.6}", lon))
        .replace("__LAYER__", &script_safe(serde_json::to_string(layer)?))
        .replace("__LEGEND__", &script_safe(serde_json::to_string(legend)?))
        .replace("__BOUNDARY__", &script_safe(boundary_json))
        .replace("__TRACTS__", &script_safe(tracts_json)))
}

/// Keep embedded JSON from closing the surrounding script element.
fn script_safe(json: String) -> String {
    json.replace("</", "<\\/")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
