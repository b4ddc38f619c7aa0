//! Zonal statistics of a canopy raster over census tracts.

use canopy_census::Tract;
use canopy_raster::CanopyRaster;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Aggregate of the valid pixels inside one tract for one year.
///
/// Values are canopy percentages. With no valid pixels every float field is
/// `NaN` and `count` is 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZonalStats {
    /// Arithmetic mean; the tract's canopy percentage.
    pub mean: f64,
    /// Minimum pixel value.
    pub min: f64,
    /// Maximum pixel value.
    pub max: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Sum of pixel values.
    pub sum: f64,
    /// Number of valid pixels.
    pub count: usize,
}

impl ZonalStats {
    /// Sentinel for a tract without valid pixels.
    pub const MISSING: ZonalStats = ZonalStats {
        mean: f64::NAN,
        min: f64::NAN,
        max: f64::NAN,
        std: f64::NAN,
        sum: f64::NAN,
        count: 0,
    };

    /// Aggregate a set of valid pixel values.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::MISSING;
        }

        Self {
            mean: values.mean(),
            min: Statistics::min(values),
            max: Statistics::max(values),
            std: values.population_std_dev(),
            sum: values.iter().sum(),
            count: values.len(),
        }
    }

    /// True for the missing-data sentinel.
    pub fn is_missing(&self) -> bool {
        self.count == 0 || self.mean.is_nan()
    }

    /// Mean, or `None` when missing.
    pub fn mean_value(&self) -> Option<f64> {
        (!self.is_missing()).then_some(self.mean)
    }
}

/// Zonal statistics of every tract for one year, keyed by GEOID.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearStats {
    /// NLCD year.
    pub year: u16,
    /// GEOID to statistics.
    pub by_tract: BTreeMap<String, ZonalStats>,
}

impl YearStats {
    /// Statistics for one tract.
    pub fn get(&self, geoid: &str) -> Option<&ZonalStats> {
        self.by_tract.get(geoid)
    }

    /// Mean canopy of one tract, `None` when absent or missing.
    pub fn mean_of(&self, geoid: &str) -> Option<f64> {
        self.get(geoid).and_then(ZonalStats::mean_value)
    }

    /// Number of tracts with valid data.
    pub fn valid_tracts(&self) -> usize {
        self.by_tract.values().filter(|s| !s.is_missing()).count()
    }
}

/// Aggregate `raster` over each tract.
///
/// A pixel belongs to a tract when its center lies inside the tract polygon
/// (even-odd rule, holes excluded). Every tract appears in the result; one
/// with no valid pixels, including one entirely outside the raster, gets
/// [`ZonalStats::MISSING`].
pub fn zonal_stats(tracts: &[Tract], raster: &CanopyRaster) -> YearStats {
    let by_tract: BTreeMap<String, ZonalStats> = tracts
        .iter()
        .map(|tract| {
            let values = raster.values_within(&tract.geometry);
            (tract.geoid.clone(), ZonalStats::from_values(&values))
        })
        .collect();

    let stats = YearStats {
        year: raster.year(),
        by_tract,
    };

    let missing = stats.by_tract.len() - stats.valid_tracts();
    tracing::info!(
        year = stats.year,
        tracts = stats.by_tract.len(),
        missing,
        "computed zonal statistics"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_values() {
        let stats = ZonalStats::from_values(&[10.0, 20.0, 30.0, 40.0]);
        assert_relative_eq!(stats.mean, 25.0);
        assert_relative_eq!(stats.min, 10.0);
        assert_relative_eq!(stats.max, 40.0);
        assert_relative_eq!(stats.sum, 100.0);
        // Population std of 10..40 step 10
        assert_relative_eq!(stats.std, 125.0_f64.sqrt(), epsilon = 1e-12);
        assert_eq!(stats.count, 4);
        assert!(!stats.is_missing());
    }

    #[test]
    fn test_single_value_has_zero_std() {
        let stats = ZonalStats::from_values(&[42.0]);
        assert_relative_eq!(stats.mean, 42.0);
        assert_relative_eq!(stats.std, 0.0);
    }

    #[test]
    fn test_empty_is_missing() {
        let stats = ZonalStats::from_values(&[]);
        assert!(stats.is_missing());
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_nan() && stats.min.is_nan() && stats.std.is_nan());
        assert_eq!(stats.mean_value(), None);
    }

    #[test]
    fn test_year_stats_lookup() {
        let mut by_tract = BTreeMap::new();
        by_tract.insert("a".to_string(), ZonalStats::from_values(&[50.0]));
        by_tract.insert("b".to_string(), ZonalStats::MISSING);
        let stats = YearStats { year: 2016, by_tract };

        assert_eq!(stats.mean_of("a"), Some(50.0));
        assert_eq!(stats.mean_of("b"), None);
        assert_eq!(stats.mean_of("c"), None);
        assert_eq!(stats.valid_tracts(), 1);
    }
}
