//! City boundary resolution.

use crate::states::state_by_abbr;
use crate::tigerweb::{feature_multipolygon, feature_property, TigerwebClient};
use crate::{CensusError, Result};
use geo::{BoundingRect, GeodesicArea, MultiPolygon, Rect};

/// A resolved city boundary in WGS84 lon/lat.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    /// Place name as published, e.g. `"Portland city"`.
    pub name: String,
    /// State abbreviation.
    pub state: String,
    /// State FIPS code.
    pub state_fips: String,
    /// Place GEOID.
    pub geoid: String,
    /// Non-empty polygonal geometry.
    pub geometry: MultiPolygon<f64>,
}

impl Boundary {
    /// Bounding box of the geometry.
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }

    /// Geodesic area in square meters.
    pub fn area_m2(&self) -> f64 {
        self.geometry.geodesic_area_unsigned()
    }
}

/// A place whose name matched the requested city.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceCandidate {
    /// Place name as published.
    pub name: String,
    /// Place GEOID.
    pub geoid: String,
    /// Index of the source layer; 0 is the highest priority.
    pub priority: usize,
    /// Place geometry.
    pub geometry: MultiPolygon<f64>,
}

impl PlaceCandidate {
    fn label(&self) -> String {
        format!("{} ({})", self.name, self.geoid)
    }
}

/// Choose one place among the name matches.
///
/// An explicit `place_geoid` always wins. Otherwise a lone candidate is
/// taken, then a lone candidate from the highest-priority layer present.
/// Anything else is [`CensusError::AmbiguousName`].
pub fn select_place(
    city: &str,
    state: &str,
    candidates: Vec<PlaceCandidate>,
    place_geoid: Option<&str>,
) -> Result<PlaceCandidate> {
    let not_found = || CensusError::NotFound {
        city: city.to_string(),
        state: state.to_string(),
    };

    if let Some(geoid) = place_geoid {
        let geoid = geoid.trim();
        return candidates
            .into_iter()
            .find(|c| c.geoid == geoid)
            .ok_or_else(not_found);
    }

    let Some(top) = candidates.iter().map(|c| c.priority).min() else {
        return Err(not_found());
    };

    if candidates.len() == 1 {
        return candidates.into_iter().next().ok_or_else(not_found);
    }

    let preferred: Vec<&PlaceCandidate> = candidates.iter().filter(|c| c.priority == top).collect();
    if let [only] = preferred.as_slice() {
        let others: Vec<String> = candidates
            .iter()
            .filter(|c| c.geoid != only.geoid)
            .map(PlaceCandidate::label)
            .collect();
        tracing::warn!(
            city,
            state,
            selected = %only.label(),
            others = %others.join(", "),
            "city name matches several places; using the higher-priority layer"
        );
        let geoid = only.geoid.clone();
        return candidates
            .into_iter()
            .find(|c| c.geoid == geoid)
            .ok_or_else(not_found);
    }

    Err(CensusError::AmbiguousName {
        city: city.to_string(),
        state: state.to_string(),
        candidates: candidates.iter().map(PlaceCandidate::label).collect(),
    })
}

/// Resolves city names to place boundaries.
pub struct BoundaryResolver<'a> {
    client: &'a TigerwebClient,
}

impl<'a> BoundaryResolver<'a> {
    /// Create a resolver backed by `client`.
    pub fn new(client: &'a TigerwebClient) -> Self {
        Self { client }
    }

    /// Find the boundary of `city` in `state`.
    ///
    /// Place layers are searched in priority order for features whose
    /// `BASENAME` equals the city name, ignoring case and surrounding
    /// whitespace. See [`select_place`] for how multiple matches are handled.
    pub fn resolve(&self, city: &str, state: &str, place_geoid: Option<&str>) -> Result<Boundary> {
        let state = state_by_abbr(state)?;
        let wanted = city.trim().to_lowercase();

        let mut candidates = Vec::new();
        for (priority, &layer) in self.client.source().place_layers.iter().enumerate() {
            let features = self.client.state_features(layer, state.fips)?;

            for feature in &features {
                let Some(basename) = feature_property(feature, "BASENAME") else {
                    continue;
                };
                if basename.to_lowercase() != wanted {
                    continue;
                }

                let geoid = feature_property(feature, "GEOID").unwrap_or_default();
                match feature_multipolygon(feature) {
                    Some(geometry) => candidates.push(PlaceCandidate {
                        name: feature_property(feature, "NAME").unwrap_or(basename),
                        geoid,
                        priority,
                        geometry,
                    }),
                    None => tracing::warn!(
                        layer,
                        geoid = %geoid,
                        "skipping place with empty or non-polygonal geometry"
                    ),
                }
            }
        }

        tracing::debug!(city, state = state.abbr, candidates = candidates.len(), "place candidates");

        let place = select_place(city.trim(), state.abbr, candidates, place_geoid)?;

        tracing::info!(
            place = %place.name,
            geoid = %place.geoid,
            polygons = place.geometry.0.len(),
            "resolved city boundary"
        );

        Ok(Boundary {
            name: place.name,
            state: state.abbr.to_string(),
            state_fips: state.fips.to_string(),
            geoid: place.geoid,
            geometry: place.geometry,
        })
    }
}
