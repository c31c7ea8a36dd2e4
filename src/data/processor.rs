//! Data Processor Module
//! Builds the base table (normalize + derive) and filters it per country.

use super::mappings::{activity_level, remap_country};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

pub const COUNTRY: &str = "Country";
pub const TYPE: &str = "Type";
pub const LAST_KNOWN: &str = "Last Known";
pub const LATITUDE: &str = "Latitude";
pub const LONGITUDE: &str = "Longitude";
pub const VOLCANO_NAME: &str = "Volcano Name";
pub const ACTIVE_STATE: &str = "Active State";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Required column '{0}' is missing")]
    MissingColumn(String),
    #[error("Unmapped 'Last Known' activity codes: {}", .0.join(", "))]
    UnmappedActivityCode(Vec<String>),
}

/// What to do with a "Last Known" code that has no activity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedActivityPolicy {
    /// Treat the code like the other unknown codes (level 0) and log it.
    #[default]
    Zero,
    /// Refuse to build the table.
    Reject,
}

/// Country filter chosen in the control panel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CountrySelection {
    #[default]
    All,
    Country(String),
}

impl fmt::Display for CountrySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountrySelection::All => f.write_str("All"),
            CountrySelection::Country(name) => f.write_str(name),
        }
    }
}

/// Header names a CSV writer leaves on an exported row index.
fn is_index_column(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name.starts_with("Unnamed") || name == "column_1"
}

/// Handles cleaning, derivation and filtering of the volcano table.
pub struct DataProcessor;

impl DataProcessor {
    /// Build the base table from a freshly loaded frame.
    pub fn prepare(
        raw: &DataFrame,
        policy: UnmappedActivityPolicy,
    ) -> Result<DataFrame, ProcessorError> {
        let normalized = Self::normalize(raw)?;
        Self::derive_activity_levels(&normalized, policy)
    }

    /// Drop the leading index column and rewrite country names.
    ///
    /// Returns a new frame; `df` is left untouched.
    pub fn normalize(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let first = df
            .get_column_names()
            .first()
            .map(|name| name.to_string());

        let trimmed = match first {
            Some(name) if is_index_column(&name) => {
                debug!(column = %name, "Dropping index column");
                df.drop(&name)?
            }
            _ => df.clone(),
        };

        Self::remap_countries(&trimmed)
    }

    /// Rewrite the Country column through the fixed remap table.
    pub fn remap_countries(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let country = Self::string_column(df, COUNTRY)?;
        let remapped: Vec<Option<String>> = country
            .str()?
            .into_iter()
            .map(|value| value.map(|name| remap_country(name).to_string()))
            .collect();

        let mut out = df.clone();
        out.with_column(Column::new(COUNTRY.into(), remapped))?;
        Ok(out)
    }

    /// Append the integer "Active State" column derived from "Last Known".
    pub fn derive_activity_levels(
        df: &DataFrame,
        policy: UnmappedActivityPolicy,
    ) -> Result<DataFrame, ProcessorError> {
        let codes = Self::string_column(df, LAST_KNOWN)?;
        let mut unmapped: BTreeSet<String> = BTreeSet::new();

        let levels: Vec<i32> = codes
            .str()?
            .into_iter()
            .map(|code| match code.and_then(activity_level) {
                Some(level) => level,
                None => {
                    unmapped.insert(code.unwrap_or("<missing>").to_string());
                    0
                }
            })
            .collect();

        if !unmapped.is_empty() {
            let codes: Vec<String> = unmapped.into_iter().collect();
            match policy {
                UnmappedActivityPolicy::Reject => {
                    return Err(ProcessorError::UnmappedActivityCode(codes));
                }
                UnmappedActivityPolicy::Zero => {
                    warn!(codes = ?codes, "Unmapped activity codes set to level 0");
                }
            }
        }

        let mut out = df.clone();
        out.with_column(Column::new(ACTIVE_STATE.into(), levels))?;
        Ok(out)
    }

    /// Rows of `df` matching the selection. "All" returns the whole table.
    pub fn filter_by_country(
        df: &DataFrame,
        selection: &CountrySelection,
    ) -> Result<DataFrame, ProcessorError> {
        match selection {
            CountrySelection::All => Ok(df.clone()),
            CountrySelection::Country(name) => {
                if df.column(COUNTRY).is_err() {
                    return Err(ProcessorError::MissingColumn(COUNTRY.to_string()));
                }
                let filtered = df
                    .clone()
                    .lazy()
                    .filter(col(COUNTRY).eq(lit(name.as_str())))
                    .collect()?;
                Ok(filtered)
            }
        }
    }

    /// Sorted distinct country names for the selector.
    pub fn countries(df: &DataFrame) -> Result<Vec<String>, ProcessorError> {
        let country = Self::string_column(df, COUNTRY)?;
        let unique: BTreeSet<String> = country
            .str()?
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();
        Ok(unique.into_iter().collect())
    }

    fn string_column(df: &DataFrame, name: &str) -> Result<Column, ProcessorError> {
        let column = df
            .column(name)
            .map_err(|_| ProcessorError::MissingColumn(name.to_string()))?;
        Ok(column.cast(&DataType::String)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_frame() -> DataFrame {
        df!(
            "" => [0i64, 1, 2, 3, 4],
            "Volcano Name" => ["Mount St. Helens", "Kilimanjaro", "Fuji", "Mauna Loa", "Pico"],
            "Country" => ["United States", "Tanzania", "Japan", "United States", "Sao Tome & Principe"],
            "Type" => ["Stratovolcano", "Stratovolcano", "Stratovolcano", "Shield volcano", "Stratovolcano"],
            "Last Known" => ["D2", "U", "D3", "D1", "U1"],
            "Latitude" => [46.2, -3.07, 35.35, 19.47, 0.2],
            "Longitude" => [-122.2, 37.35, 138.73, -155.6, 6.65]
        )
        .unwrap()
    }

    fn country_values(df: &DataFrame) -> Vec<Option<String>> {
        df.column(COUNTRY)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn normalize_drops_index_and_remaps_countries() {
        let raw = raw_frame();
        let df = DataProcessor::normalize(&raw).unwrap();

        assert!(df.column("").is_err());
        assert_eq!(df.width(), raw.width() - 1);
        assert_eq!(
            country_values(&df)[0].as_deref(),
            Some("United States of America")
        );
        assert_eq!(
            country_values(&df)[1].as_deref(),
            Some("United Republic of Tanzania")
        );
        assert_eq!(country_values(&df)[2].as_deref(), Some("Japan"));
    }

    #[test]
    fn normalize_leaves_input_untouched() {
        let raw = raw_frame();
        let _ = DataProcessor::normalize(&raw).unwrap();

        assert!(raw.column("").is_ok());
        assert_eq!(country_values(&raw)[0].as_deref(), Some("United States"));
    }

    #[test]
    fn normalize_keeps_first_column_when_not_an_index() {
        let df = df!("Country" => ["Japan"], "Last Known" => ["D1"]).unwrap();
        let out = DataProcessor::normalize(&df).unwrap();
        assert_eq!(out.width(), 2);
    }

    #[test]
    fn country_remap_is_idempotent() {
        let once = DataProcessor::remap_countries(&raw_frame()).unwrap();
        let twice = DataProcessor::remap_countries(&once).unwrap();
        assert_eq!(country_values(&once), country_values(&twice));
    }

    #[test]
    fn null_country_stays_null() {
        let df = df!("Country" => [Some("Tanzania"), None]).unwrap();
        let out = DataProcessor::remap_countries(&df).unwrap();
        assert_eq!(
            country_values(&out),
            vec![Some("United Republic of Tanzania".to_string()), None]
        );
    }

    #[test]
    fn missing_country_column_is_integrity_error() {
        let df = df!("Name" => ["x"]).unwrap();
        assert!(matches!(
            DataProcessor::normalize(&df),
            Err(ProcessorError::MissingColumn(c)) if c == COUNTRY
        ));
    }

    #[test]
    fn derived_levels_match_mapping() {
        let df = DataProcessor::prepare(&raw_frame(), UnmappedActivityPolicy::Reject).unwrap();
        let levels: Vec<Option<i32>> = df
            .column(ACTIVE_STATE)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(levels, vec![Some(2), Some(0), Some(3), Some(1), Some(0)]);
    }

    #[test]
    fn st_helens_scenario() {
        let raw = df!(
            "" => [0i64],
            "Country" => ["United States"],
            "Type" => ["Stratovolcano"],
            "Last Known" => ["D2"],
            "Latitude" => [46.2],
            "Longitude" => [-122.2]
        )
        .unwrap();
        let df = DataProcessor::prepare(&raw, UnmappedActivityPolicy::Zero).unwrap();

        assert_eq!(
            country_values(&df)[0].as_deref(),
            Some("United States of America")
        );
        let level = df.column(ACTIVE_STATE).unwrap().i32().unwrap().get(0);
        assert_eq!(level, Some(2));
    }

    #[test]
    fn unmapped_code_defaults_to_zero() {
        let df = df!("Country" => ["A", "B"], "Last Known" => [Some("X9"), None]).unwrap();
        let out =
            DataProcessor::derive_activity_levels(&df, UnmappedActivityPolicy::Zero).unwrap();
        let levels: Vec<Option<i32>> = out
            .column(ACTIVE_STATE)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(levels, vec![Some(0), Some(0)]);
    }

    #[test]
    fn unmapped_code_rejected_under_strict_policy() {
        let df = df!("Country" => ["A", "B"], "Last Known" => ["D1", "X9"]).unwrap();
        let err = DataProcessor::derive_activity_levels(&df, UnmappedActivityPolicy::Reject)
            .unwrap_err();
        match err {
            ProcessorError::UnmappedActivityCode(codes) => assert_eq!(codes, vec!["X9"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn filter_all_returns_every_row() {
        let df = DataProcessor::prepare(&raw_frame(), UnmappedActivityPolicy::Zero).unwrap();
        let all = DataProcessor::filter_by_country(&df, &CountrySelection::All).unwrap();
        assert_eq!(all.height(), df.height());
    }

    #[test]
    fn filter_returns_only_selected_country() {
        let df = DataProcessor::prepare(&raw_frame(), UnmappedActivityPolicy::Zero).unwrap();
        for country in DataProcessor::countries(&df).unwrap() {
            let selection = CountrySelection::Country(country.clone());
            let subset = DataProcessor::filter_by_country(&df, &selection).unwrap();
            assert!(subset.height() > 0);
            assert!(country_values(&subset)
                .iter()
                .all(|v| v.as_deref() == Some(country.as_str())));
        }

        let usa = CountrySelection::Country("United States of America".to_string());
        let subset = DataProcessor::filter_by_country(&df, &usa).unwrap();
        assert_eq!(subset.height(), 2);
    }

    #[test]
    fn filter_without_matches_is_empty_not_error() {
        let df = DataProcessor::prepare(&raw_frame(), UnmappedActivityPolicy::Zero).unwrap();
        let selection = CountrySelection::Country("Iceland".to_string());
        let subset = DataProcessor::filter_by_country(&df, &selection).unwrap();
        assert_eq!(subset.height(), 0);
        assert_eq!(df.height(), 5);
    }

    #[test]
    fn countries_are_sorted_and_distinct() {
        let df = DataProcessor::prepare(&raw_frame(), UnmappedActivityPolicy::Zero).unwrap();
        assert_eq!(
            DataProcessor::countries(&df).unwrap(),
            vec![
                "Japan",
                "Sao Tome and Principe",
                "United Republic of Tanzania",
                "United States of America",
            ]
        );
    }

    #[test]
    fn selection_display() {
        assert_eq!(CountrySelection::All.to_string(), "All");
        assert_eq!(
            CountrySelection::Country("Japan".into()).to_string(),
            "Japan"
        );
    }
}
