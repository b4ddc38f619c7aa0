//! Run summary of a change table.

use crate::change::{ChangeCategory, ChangeRecord};
use statrs::statistics::Statistics;
use std::fmt;

/// Tracts in one change category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryCount {
    pub category: ChangeCategory,
    pub count: usize,
    /// Percent of all tracts in the change table.
    pub share: f64,
}

/// City-wide figures derived from the change table.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub city: String,
    pub start_year: u16,
    pub end_year: u16,
    /// Tracts in the change table.
    pub tracts: usize,
    /// Mean of tract canopy means in the start year.
    pub mean_start: f64,
    /// Mean of tract canopy means in the end year.
    pub mean_end: f64,
    /// Mean change in percentage points.
    pub mean_change: f64,
    /// Non-empty categories, from largest loss to largest gain.
    pub categories: Vec<CategoryCount>,
    pub acres_start: f64,
    pub acres_end: f64,
    pub acres_change: f64,
}

impl Summary {
    /// Summarize `records`. Means are `NaN` when there are no records.
    pub fn from_records(city: &str, start_year: u16, end_year: u16, records: &[ChangeRecord]) -> Self {
        let tracts = records.len();

        let categories = ChangeCategory::ALL
            .into_iter()
            .filter_map(|category| {
                let count = records.iter().filter(|r| r.category == category).count();
                (count > 0).then(|| CategoryCount {
                    category,
                    count,
                    share: count as f64 / tracts as f64 * 100.0,
                })
            })
            .collect();

        Self {
            city: city.to_string(),
            start_year,
            end_year,
            tracts,
            mean_start: records.iter().map(|r| r.start_mean).mean(),
            mean_end: records.iter().map(|r| r.end_mean).mean(),
            mean_change: records.iter().map(|r| r.percent_change).mean(),
            categories,
            acres_start: records.iter().map(|r| r.acres_start).sum(),
            acres_end: records.iter().map(|r| r.acres_end).sum(),
            acres_change: records.iter().map(|r| r.acres_change).sum(),
        }
    }

    /// Count for one category (0 when absent).
    pub fn count_of(&self, category: ChangeCategory) -> usize {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .map_or(0, |c| c.count)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{}", rule)?;
        writeln!(f, "{} CANOPY ANALYSIS SUMMARY", self.city.to_uppercase())?;
        writeln!(f, "{}", rule)?;
        writeln!(f)?;
        writeln!(f, "Total census tracts analyzed: {}", self.tracts)?;
        writeln!(f)?;
        writeln!(f, "Canopy Coverage:")?;
        writeln!(f, "  {}: {:.2}% (mean)", self.start_year, self.mean_start)?;
        writeln!(f, "  {}: {:.2}% (mean)", self.end_year, self.mean_end)?;
        writeln!(f, "  Change: {:.2} percentage points", self.mean_change)?;
        writeln!(f)?;
        writeln!(f, "Change Categories:")?;
        for c in &self.categories {
            writeln!(f, "  {}: {} tracts ({:.1}%)", c.category, c.count, c.share)?;
        }
        writeln!(f)?;
        writeln!(f, "Total Canopy Acres:")?;
        writeln!(f, "  {}: {:.0} acres", self.start_year, self.acres_start)?;
        writeln!(f, "  {}: {:.0} acres", self.end_year, self.acres_end)?;
        writeln!(f, "  Change: {:.0} acres", self.acres_change)?;
        write!(f, "{}", rule)
    }
}
