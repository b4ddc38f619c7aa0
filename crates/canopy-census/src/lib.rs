//! # canopy-census
//!
//! City boundaries and census tracts from the Census Bureau's TIGERweb
//! ArcGIS REST service.
//!
//! - [`BoundaryResolver`] turns a city name and state into a single place
//!   boundary, with an explicit policy for ambiguous names.
//! - [`TractLoader`] returns the census tracts intersecting a boundary, each
//!   annotated with its geodesic area.
//!
//! Both work on state-wide layer downloads that [`TigerwebClient`] caches on
//! disk, so several cities in one state share a single download.
//!
//! ```no_run
//! use canopy_census::{BoundaryResolver, TigerwebClient, TigerwebSource, TractLoader};
//!
//! let client = TigerwebClient::new("./.canopy_cache", TigerwebSource::default())?;
//! let boundary = BoundaryResolver::new(&client).resolve("Portland", "OR", None)?;
//! let tracts = TractLoader::new(&client).load(&boundary)?;
//! println!("{} tracts in {}", tracts.len(), boundary.name);
//! # Ok::<(), canopy_census::CensusError>(())
//! ```

mod boundary;
mod error;
mod states;
mod tigerweb;
mod tracts;

pub use boundary::{select_place, Boundary, BoundaryResolver, PlaceCandidate};
pub use error::CensusError;
pub use states::{state_by_abbr, State, STATES};
pub use tigerweb::{
    feature_multipolygon, feature_property, TigerwebClient, TigerwebSource,
    DEFAULT_PLACE_LAYERS, DEFAULT_TIGERWEB_URL, DEFAULT_TRACT_LAYER,
};
pub use tracts::{Tract, TractLoader, MIN_TRACT_AREA_M2, SQ_METERS_PER_ACRE};

/// Result type for census operations.
pub type Result<T> = std::result::Result<T, CensusError>;
