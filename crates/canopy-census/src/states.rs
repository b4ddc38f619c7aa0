//! State abbreviations and FIPS codes.

use crate::{CensusError, Result};

/// A state or state-equivalent with TIGER geographies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    /// USPS abbreviation, e.g. `"OR"`.
    pub abbr: &'static str,
    /// Two-digit FIPS code, e.g. `"41"`.
    pub fips: &'static str,
    /// Full name.
    pub name: &'static str,
}

const fn state(abbr: &'static str, fips: &'static str, name: &'static str) -> State {
    State { abbr, fips, name }
}

/// The 50 states, the District of Columbia, and Puerto Rico.
pub const STATES: &[State] = &[
    state("AL", "01", "Alabama"),
    state("AK", "02", "Alaska"),
    state("AZ", "04", "Arizona"),
    state("AR", "05", "Arkansas"),
    state("CA", "06", "California"),
    state("CO", "08", "Colorado"),
    state("CT", "09", "Connecticut"),
    state("DE", "10", "Delaware"),
    state("DC", "11", "District of Columbia"),
    state("FL", "12", "Florida"),
    state("GA", "13", "Georgia"),
    state("HI", "15", "Hawaii"),
    state("ID", "16", "Idaho"),
    state("IL", "17", "Illinois"),
    state("IN", "18", "Indiana"),
    state("IA", "19", "Iowa"),
    state("KS", "20", "Kansas"),
    state("KY", "21", "Kentucky"),
    state("LA", "22", "Louisiana"),
    state("ME", "23", "Maine"),
    state("MD", "24", "Maryland"),
    state("MA", "25", "Massachusetts"),
    state("MI", "26", "Michigan"),
    state("MN", "27", "Minnesota"),
    state("MS", "28", "Mississippi"),
    state("MO", "29", "Missouri"),
    state("MT", "30", "Montana"),
    state("NE", "31", "Nebraska"),
    state("NV", "32", "Nevada"),
    state("NH", "33", "New Hampshire"),
    state("NJ", "34", "New Jersey"),
    state("NM", "35", "New Mexico"),
    state("NY", "36", "New York"),
    state("NC", "37", "North Carolina"),
    state("ND", "38", "North Dakota"),
    state("OH", "39", "Ohio"),
    state("OK", "40", "Oklahoma"),
    state("OR", "41", "Oregon"),
    state("PA", "42", "Pennsylvania"),
    state("RI", "44", "Rhode Island"),
    state("SC", "45", "South Carolina"),
    state("SD", "46", "South Dakota"),
    state("TN", "47", "Tennessee"),
    state("TX", "48", "Texas"),
    state("UT", "49", "Utah"),
    state("VT", "50", "Vermont"),
    state("VA", "51", "Virginia"),
    state("WA", "53", "Washington"),
    state("WV", "54", "West Virginia"),
    state("WI", "55", "Wisconsin"),
    state("WY", "56", "Wyoming"),
    state("PR", "72", "Puerto Rico"),
];

/// Look up a state by its USPS abbreviation (case-insensitive).
pub fn state_by_abbr(abbr: &str) -> Result<&'static State> {
    let abbr = abbr.trim();
    STATES
        .iter()
        .find(|s| s.abbr.eq_ignore_ascii_case(abbr))
        .ok_or_else(|| CensusError::UnknownState(abbr.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup() {
        assert_eq!(state_by_abbr("OR").unwrap().fips, "41");
        assert_eq!(state_by_abbr("wa").unwrap().name, "Washington");
        assert_eq!(state_by_abbr(" dc ").unwrap().fips, "11");
        assert!(matches!(
            state_by_abbr("ZZ"),
            Err(CensusError::UnknownState(s)) if s == "ZZ"
        ));
    }

    #[test]
    fn test_table_is_consistent() {
        assert_eq!(STATES.len(), 52);
        let abbrs: HashSet<_> = STATES.iter().map(|s| s.abbr).collect();
        let fips: HashSet<_> = STATES.iter().map(|s| s.fips).collect();
        assert_eq!(abbrs.len(), STATES.len());
        assert_eq!(fips.len(), STATES.len());
        assert!(STATES.iter().all(|s| s.fips.len() == 2 && s.abbr.len() == 2));
    }
}
