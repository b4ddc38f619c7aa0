//! Census tracts intersecting a boundary.

use crate::boundary::Boundary;
use crate::tigerweb::{feature_multipolygon, feature_property, TigerwebClient};
use crate::{CensusError, Result};
use geo::{BooleanOps, BoundingRect, GeodesicArea, Intersects, MultiPolygon};

/// Tracts at or below this geodesic area are slivers and are dropped.
pub const MIN_TRACT_AREA_M2: f64 = 100.0;

/// International acre.
pub const SQ_METERS_PER_ACRE: f64 = 4046.8564224;

/// A census tract with its geodesic area.
#[derive(Debug, Clone, PartialEq)]
pub struct Tract {
    /// Eleven-digit tract GEOID.
    pub geoid: String,
    /// Display name, e.g. `"Census Tract 23.03"`.
    pub name: String,
    /// Tract geometry in WGS84 lon/lat.
    pub geometry: MultiPolygon<f64>,
    /// Geodesic area in square meters.
    pub area_m2: f64,
    /// Geodesic area of the part inside the city boundary, in square meters.
    /// Equal to `area_m2` until [`Tract::within_boundary`] is applied.
    pub city_area_m2: f64,
}

impl Tract {
    /// Build a tract, computing its geodesic area.
    pub fn new(geoid: impl Into<String>, name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        let area_m2 = geometry.geodesic_area_unsigned();
        Self {
            geoid: geoid.into(),
            name: name.into(),
            geometry,
            area_m2,
            city_area_m2: area_m2,
        }
    }

    /// Restrict the city area to the part of the tract inside `boundary`.
    ///
    /// The tract geometry itself is left whole.
    pub fn within_boundary(mut self, boundary: &MultiPolygon<f64>) -> Self {
        let inside = self.geometry.intersection(boundary).geodesic_area_unsigned();
        self.city_area_m2 = inside.min(self.area_m2);
        self
    }

    /// Area in acres.
    pub fn area_acres(&self) -> f64 {
        self.area_m2 / SQ_METERS_PER_ACRE
    }

    /// Area inside the city boundary, in acres.
    pub fn city_area_acres(&self) -> f64 {
        self.city_area_m2 / SQ_METERS_PER_ACRE
    }
}

/// Loads the tracts of a boundary's state and keeps those that intersect it.
pub struct TractLoader<'a> {
    client: &'a TigerwebClient,
}

impl<'a> TractLoader<'a> {
    /// Create a loader backed by `client`.
    pub fn new(client: &'a TigerwebClient) -> Self {
        Self { client }
    }

    /// Tracts intersecting `boundary`, ordered by GEOID.
    pub fn load(&self, boundary: &Boundary) -> Result<Vec<Tract>> {
        let no_data = || CensusError::NoData {
            city: boundary.name.clone(),
        };
        let extent = boundary.geometry.bounding_rect().ok_or_else(no_data)?;

        let layer = self.client.source().tract_layer;
        let features = self.client.state_features(layer, &boundary.state_fips)?;
        tracing::debug!(features = features.len(), state = %boundary.state, "state tracts");

        let mut tracts = Vec::new();
        let mut dropped = 0usize;

        for feature in &features {
            let Some(geometry) = feature_multipolygon(feature) else {
                dropped += 1;
                continue;
            };
            let Some(rect) = geometry.bounding_rect() else {
                dropped += 1;
                continue;
            };
            if !rect.intersects(&extent) || !geometry.intersects(&boundary.geometry) {
                continue;
            }

            let Some(geoid) = feature_property(feature, "GEOID") else {
                dropped += 1;
                continue;
            };
            let name = feature_property(feature, "NAME").unwrap_or_else(|| geoid.clone());

            let tract = Tract::new(geoid, name, geometry);
            if tract.area_m2 <= MIN_TRACT_AREA_M2 {
                dropped += 1;
                continue;
            }
            tracts.push(tract.within_boundary(&boundary.geometry));
        }

        if dropped > 0 {
            tracing::warn!(dropped, "dropped tracts with empty geometry or negligible area");
        }

        tracts.sort_by(|a, b| a.geoid.cmp(&b.geoid));
        tracts.dedup_by(|a, b| a.geoid == b.geoid);

        if tracts.is_empty() {
            return Err(no_data());
        }

        tracing::info!(tracts = tracts.len(), city = %boundary.name, "loaded census tracts");
        Ok(tracts)
    }
}
