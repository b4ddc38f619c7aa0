//! # canopy-analysis
//!
//! Turns canopy rasters and census tracts into per-tract statistics and
//! change metrics.
//!
//! - [`zonal_stats`] aggregates the pixels of one raster inside each tract.
//! - [`calculate_change`] compares two years and assigns a [`ChangeCategory`].
//! - [`Summary`] condenses the change table for reporting.
//!
//! A tract with no valid pixels gets the [`ZonalStats::MISSING`] sentinel
//! rather than an error; such tracts stay in the per-year tables and are left
//! out of the change table.

mod change;
mod summary;
mod zonal;

pub use change::{calculate_change, ChangeCategory, ChangeRecord};
pub use summary::{CategoryCount, Summary};
pub use zonal::{zonal_stats, YearStats, ZonalStats};
