//! Canopy change between two years.

use crate::zonal::YearStats;
use canopy_census::Tract;
use geo::MultiPolygon;
use serde::Serialize;

/// Change class by percentage-point difference in mean canopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ChangeCategory {
    /// Below -5 points.
    #[serde(rename = "Major Loss")]
    MajorLoss,
    /// From -5 up to -2 points.
    #[serde(rename = "Moderate Loss")]
    ModerateLoss,
    /// From -2 up to 2 points.
    #[serde(rename = "Stable")]
    Stable,
    /// From 2 up to 5 points.
    #[serde(rename = "Moderate Gain")]
    ModerateGain,
    /// 5 points or more.
    #[serde(rename = "Major Gain")]
    MajorGain,
}

impl ChangeCategory {
    /// All categories from largest loss to largest gain.
    pub const ALL: [ChangeCategory; 5] = [
        ChangeCategory::MajorLoss,
        ChangeCategory::ModerateLoss,
        ChangeCategory::Stable,
        ChangeCategory::ModerateGain,
        ChangeCategory::MajorGain,
    ];

    /// Fill color for tracts without data on change maps.
    pub const NO_DATA_COLOR: &'static str = "#d9d9d9";

    /// Classify a change in percentage points.
    pub fn from_change(percent_change: f64) -> Self {
        if percent_change < -5.0 {
            ChangeCategory::MajorLoss
        } else if percent_change < -2.0 {
            ChangeCategory::ModerateLoss
        } else if percent_change < 2.0 {
            ChangeCategory::Stable
        } else if percent_change < 5.0 {
            ChangeCategory::ModerateGain
        } else {
            ChangeCategory::MajorGain
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ChangeCategory::MajorLoss => "Major Loss",
            ChangeCategory::ModerateLoss => "Moderate Loss",
            ChangeCategory::Stable => "Stable",
            ChangeCategory::ModerateGain => "Moderate Gain",
            ChangeCategory::MajorGain => "Major Gain",
        }
    }

    /// Map fill color (diverging red-yellow-green).
    pub fn color(&self) -> &'static str {
        match self {
            ChangeCategory::MajorLoss => "#d73027",
            ChangeCategory::ModerateLoss => "#fc8d59",
            ChangeCategory::Stable => "#ffffbf",
            ChangeCategory::ModerateGain => "#91cf60",
            ChangeCategory::MajorGain => "#1a9850",
        }
    }
}

impl std::fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for ChangeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChangeCategory::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown change category '{}'", s))
    }
}

/// Change metrics of one tract between the start and end year.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    /// Tract GEOID.
    pub geoid: String,
    /// Tract display name.
    pub name: String,
    /// Mean canopy percentage in the start year.
    pub start_mean: f64,
    /// Mean canopy percentage in the end year.
    pub end_mean: f64,
    /// `end_mean - start_mean`, in percentage points.
    pub percent_change: f64,
    /// Change relative to the start, in percent; `None` when the start is 0.
    pub relative_change: Option<f64>,
    /// Canopy acres in the start year.
    pub acres_start: f64,
    /// Canopy acres in the end year.
    pub acres_end: f64,
    /// `acres_end - acres_start`.
    pub acres_change: f64,
    /// Change class.
    pub category: ChangeCategory,
    /// Tract geometry.
    pub geometry: MultiPolygon<f64>,
}

impl ChangeRecord {
    /// Derive the change metrics of `tract` from its two yearly means.
    ///
    /// Canopy acres are the geodesic area of the tract's part inside the city
    /// times the canopy fraction, since the means only cover in-city pixels.
    pub fn new(tract: &Tract, start_mean: f64, end_mean: f64) -> Self {
        let percent_change = end_mean - start_mean;
        let relative_change = (start_mean != 0.0).then(|| percent_change / start_mean * 100.0);
        let area_acres = tract.city_area_acres();

        Self {
            geoid: tract.geoid.clone(),
            name: tract.name.clone(),
            start_mean,
            end_mean,
            percent_change,
            relative_change,
            acres_start: area_acres * start_mean / 100.0,
            acres_end: area_acres * end_mean / 100.0,
            acres_change: area_acres * percent_change / 100.0,
            category: ChangeCategory::from_change(percent_change),
            geometry: tract.geometry.clone(),
        }
    }
}

/// Change records for every tract with data in both years, in tract order.
pub fn calculate_change(start: &YearStats, end: &YearStats, tracts: &[Tract]) -> Vec<ChangeRecord> {
    let records: Vec<ChangeRecord> = tracts
        .iter()
        .filter_map(|tract| {
            let start_mean = start.mean_of(&tract.geoid)?;
            let end_mean = end.mean_of(&tract.geoid)?;
            Some(ChangeRecord::new(tract, start_mean, end_mean))
        })
        .collect();

    let excluded = tracts.len() - records.len();
    if excluded > 0 {
        tracing::warn!(
            excluded,
            start_year = start.year,
            end_year = end.year,
            "tracts without canopy data in both years left out of the change table"
        );
    }
    tracing::info!(records = records.len(), "computed canopy change");

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zonal::ZonalStats;
    use approx::assert_relative_eq;
    use geo::polygon;
    use std::collections::BTreeMap;

    fn tract(geoid: &str) -> Tract {
        let square = polygon![
            (x: -122.70, y: 45.50),
            (x: -122.69, y: 45.50),
            (x: -122.69, y: 45.51),
            (x: -122.70, y: 45.51),
            (x: -122.70, y: 45.50),
        ];
        Tract::new(geoid, format!("Census Tract {}", geoid), MultiPolygon::new(vec![square]))
    }

    fn year(year: u16, entries: &[(&str, Option<f64>)]) -> YearStats {
        let by_tract: BTreeMap<String, ZonalStats> = entries
            .iter()
            .map(|(geoid, mean)| {
                let stats = match mean {
                    Some(m) => ZonalStats::from_values(&[*m]),
                    None => ZonalStats::MISSING,
                };
                (geoid.to_string(), stats)
            })
            .collect();
        YearStats { year, by_tract }
    }

    #[test]
    fn test_category_thresholds() {
        assert_eq!(ChangeCategory::from_change(-5.01), ChangeCategory::MajorLoss);
        assert_eq!(ChangeCategory::from_change(-5.0), ChangeCategory::ModerateLoss);
        assert_eq!(ChangeCategory::from_change(-2.01), ChangeCategory::ModerateLoss);
        assert_eq!(ChangeCategory::from_change(-2.0), ChangeCategory::Stable);
        assert_eq!(ChangeCategory::from_change(0.0), ChangeCategory::Stable);
        assert_eq!(ChangeCategory::from_change(1.99), ChangeCategory::Stable);
        assert_eq!(ChangeCategory::from_change(2.0), ChangeCategory::ModerateGain);
        assert_eq!(ChangeCategory::from_change(4.99), ChangeCategory::ModerateGain);
        assert_eq!(ChangeCategory::from_change(5.0), ChangeCategory::MajorGain);
    }

    #[test]
    fn test_category_labels_parse_back() {
        for category in ChangeCategory::ALL {
            assert_eq!(category.label().parse::<ChangeCategory>(), Ok(category));
        }
        assert!("No Data".parse::<ChangeCategory>().is_err());
    }

    #[test]
    fn test_change_record_metrics() {
        let t = tract("41051000100");
        let record = ChangeRecord::new(&t, 40.0, 33.5);

        assert_eq!(record.percent_change, 33.5 - 40.0);
        assert_eq!(record.category, ChangeCategory::MajorLoss);
        assert_relative_eq!(record.relative_change.unwrap(), -16.25, epsilon = 1e-12);
        assert_relative_eq!(record.acres_change, t.city_area_acres() * -6.5 / 100.0, epsilon = 1e-9);
        assert_relative_eq!(
            record.acres_change,
            record.acres_end - record.acres_start,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_edge_tract_acres_use_city_part() {
        // City covers the western half of the tract
        let city = polygon![
            (x: -122.80, y: 45.40),
            (x: -122.695, y: 45.40),
            (x: -122.695, y: 45.60),
            (x: -122.80, y: 45.60),
            (x: -122.80, y: 45.40),
        ];
        let t = tract("41051000100").within_boundary(&MultiPolygon::new(vec![city]));
        let record = ChangeRecord::new(&t, 40.0, 30.0);

        assert_relative_eq!(record.acres_start, t.area_acres() / 2.0 * 0.40, max_relative = 1e-3);
        assert_relative_eq!(record.acres_change, t.city_area_acres() * -0.10, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_start_has_no_relative_change() {
        let record = ChangeRecord::new(&tract("1"), 0.0, 3.0);
        assert_eq!(record.relative_change, None);
        assert_eq!(record.category, ChangeCategory::ModerateGain);
    }

    #[test]
    fn test_calculate_change_excludes_missing() {
        let tracts = vec![tract("a"), tract("b"), tract("c"), tract("d")];
        let start = year(2011, &[("a", Some(30.0)), ("b", None), ("c", Some(10.0))]);
        let end = year(2021, &[("a", Some(31.0)), ("b", Some(5.0)), ("c", Some(20.0))]);

        let records = calculate_change(&start, &end, &tracts);
        let geoids: Vec<&str> = records.iter().map(|r| r.geoid.as_str()).collect();
        assert_eq!(geoids, vec!["a", "c"]);

        for record in &records {
            assert_eq!(record.percent_change, record.end_mean - record.start_mean);
        }
        assert_eq!(records[0].category, ChangeCategory::Stable);
        assert_eq!(records[1].category, ChangeCategory::MajorGain);
    }

    #[test]
    fn test_same_year_is_stable() {
        let tracts = vec![tract("a")];
        let stats = year(2016, &[("a", Some(27.25))]);

        let records = calculate_change(&stats, &stats, &tracts);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].percent_change, 0.0);
        assert_eq!(records[0].acres_change, 0.0);
        assert_eq!(records[0].category, ChangeCategory::Stable);
    }
}
