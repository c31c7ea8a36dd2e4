//! View data for the four dashboard panels.
//!
//! Everything here is computed from a filtered subset and holds no reference
//! to it, so views can be rebuilt on every interaction and rendered by either
//! backend.

use crate::data::{
    CountrySelection, ACTIVE_STATE, COUNTRY, LATITUDE, LONGITUDE, TYPE, VOLCANO_NAME,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

/// Label used for rows whose category is missing.
pub const MISSING_LABEL: &str = "(missing)";

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Required column '{0}' is missing")]
    MissingColumn(String),
}

/// Chart shape for the categorical views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartStyle {
    Pie,
    Bar,
}

impl fmt::Display for ChartStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartStyle::Pie => f.write_str("Pie"),
            ChartStyle::Bar => f.write_str("Bar"),
        }
    }
}

/// How charts are drawn: live egui_plot widgets or plotters bitmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartBackend {
    #[default]
    Interactive,
    Static,
}

impl fmt::Display for ChartBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartBackend::Interactive => f.write_str("Interactive"),
            ChartBackend::Static => f.write_str("Static"),
        }
    }
}

/// The independently toggled dashboard panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewKind {
    Table,
    TypeDistribution,
    Map,
    Activity,
}

impl ViewKind {
    pub const ALL: [ViewKind; 4] = [
        ViewKind::Table,
        ViewKind::TypeDistribution,
        ViewKind::Map,
        ViewKind::Activity,
    ];

    /// Label of the sidebar checkbox.
    pub fn toggle_label(self) -> &'static str {
        match self {
            ViewKind::Table => "Show Dataframe",
            ViewKind::TypeDistribution => "Amount of Volcanoes per Type",
            ViewKind::Map => "Map of the world",
            ViewKind::Activity => "Active & Inactive",
        }
    }

    /// Heading shown above the panel.
    pub fn heading(self) -> &'static str {
        match self {
            ViewKind::Table => "Feel free to explore it :)",
            ViewKind::TypeDistribution => "Amount of Volcanoes per Type",
            ViewKind::Map => "Map of the World's volcanoes",
            ViewKind::Activity => "Active & Inactive volcanoes per Country",
        }
    }

    /// File stem used for PNG export.
    pub fn file_stem(self) -> &'static str {
        match self {
            ViewKind::Table => "table",
            ViewKind::TypeDistribution => "type_distribution",
            ViewKind::Map => "world_map",
            ViewKind::Activity => "activity_breakdown",
        }
    }

    /// Whether the view can be drawn as a chart (the table cannot).
    pub fn is_chart(self) -> bool {
        !matches!(self, ViewKind::Table)
    }
}

/// Display text for one cell. Strings are taken as-is; Display would quote them.
fn cell_text(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}

fn required<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, ViewError> {
    df.column(name)
        .map_err(|_| ViewError::MissingColumn(name.to_string()))
}

/// The subset rendered verbatim as text cells.
#[derive(Debug, Clone, Default)]
pub struct TablePreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TablePreview {
    pub fn from_frame(df: &DataFrame) -> Result<Self, ViewError> {
        let headers = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let columns = df.get_columns();
        let mut rows = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let mut row = Vec::with_capacity(columns.len());
            for column in columns {
                row.push(cell_text(column.get(i)?));
            }
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

/// Frequency of each volcano type, most common first.
#[derive(Debug, Clone, Default)]
pub struct TypeDistribution {
    pub entries: Vec<CategoryCount>,
}

impl TypeDistribution {
    pub fn from_frame(df: &DataFrame) -> Result<Self, ViewError> {
        let types = required(df, TYPE)?.cast(&DataType::String)?;

        let mut counts: HashMap<String, usize> = HashMap::new();
        for value in types.str()?.into_iter() {
            let label = value.unwrap_or(MISSING_LABEL).to_string();
            *counts.entry(label).or_default() += 1;
        }

        let mut entries: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(label, count)| CategoryCount { label, count })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));

        Ok(Self { entries })
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Share of each type in percent, in the same order as `entries`.
    pub fn proportions(&self) -> Vec<(String, f64)> {
        let total = self.total();
        if total == 0 {
            return Vec::new();
        }
        self.entries
            .iter()
            .map(|e| (e.label.clone(), e.count as f64 * 100.0 / total as f64))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Volcano positions; rows without both coordinates are skipped.
#[derive(Debug, Clone, Default)]
pub struct GeoPoints {
    pub points: Vec<GeoPoint>,
}

impl GeoPoints {
    pub fn from_frame(df: &DataFrame) -> Result<Self, ViewError> {
        let latitude = required(df, LATITUDE)?.cast(&DataType::Float64)?;
        let longitude = required(df, LONGITUDE)?.cast(&DataType::Float64)?;
        let names = match df.column(VOLCANO_NAME) {
            Ok(column) => Some(column.cast(&DataType::String)?),
            Err(_) => None,
        };
        let names = match &names {
            Some(column) => Some(column.str()?),
            None => None,
        };

        let points = latitude
            .f64()?
            .into_iter()
            .zip(longitude.f64()?.into_iter())
            .enumerate()
            .filter_map(|(i, (lat, lon))| {
                let (latitude, longitude) = (lat?, lon?);
                if latitude.is_nan() || longitude.is_nan() {
                    return None;
                }
                let name = names
                    .and_then(|n| n.get(i))
                    .unwrap_or_default()
                    .to_string();
                Some(GeoPoint {
                    name,
                    latitude,
                    longitude,
                })
            })
            .collect();

        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityCount {
    pub country: String,
    pub level: i32,
    pub count: usize,
}

/// Volcano counts grouped by (country, activity level).
#[derive(Debug, Clone, Default)]
pub struct ActivityBreakdown {
    pub counts: Vec<ActivityCount>,
    pub selection: CountrySelection,
}

impl ActivityBreakdown {
    /// Rows with a missing country are left out, as a group-by would.
    pub fn from_frame(df: &DataFrame, selection: &CountrySelection) -> Result<Self, ViewError> {
        let countries = required(df, COUNTRY)?.cast(&DataType::String)?;
        let levels = required(df, ACTIVE_STATE)?.cast(&DataType::Int32)?;

        let mut grouped: BTreeMap<(String, i32), usize> = BTreeMap::new();
        for (country, level) in countries
            .str()?
            .into_iter()
            .zip(levels.i32()?.into_iter())
        {
            if let (Some(country), Some(level)) = (country, level) {
                *grouped.entry((country.to_string(), level)).or_default() += 1;
            }
        }

        let counts = grouped
            .into_iter()
            .map(|((country, level), count)| ActivityCount {
                country,
                level,
                count,
            })
            .collect();

        Ok(Self {
            counts,
            selection: selection.clone(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|c| c.count).sum()
    }

    /// Distinct countries, sorted.
    pub fn countries(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.counts.iter().map(|c| c.country.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Distinct activity levels, ascending.
    pub fn levels(&self) -> Vec<i32> {
        let set: BTreeSet<i32> = self.counts.iter().map(|c| c.level).collect();
        set.into_iter().collect()
    }

    pub fn count_for(&self, country: &str, level: i32) -> usize {
        self.counts
            .iter()
            .find(|c| c.country == country && c.level == level)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    /// Counts per level summed over all countries, for the donut view.
    pub fn level_totals(&self) -> Vec<(i32, usize)> {
        let mut totals: BTreeMap<i32, usize> = BTreeMap::new();
        for c in &self.counts {
            *totals.entry(c.level).or_default() += c.count;
        }
        totals.into_iter().collect()
    }

    pub fn title(&self) -> String {
        match &self.selection {
            CountrySelection::All => "Active & Inactive Volcanoes in All Countries".to_string(),
            CountrySelection::Country(name) => {
                format!("Active & Inactive Volcanoes in {}", name)
            }
        }
    }
}

/// All panel data for one interaction.
///
/// Each view is computed on its own; a view that fails keeps its error and
/// leaves the others usable.
#[derive(Debug)]
pub struct ViewSet {
    pub selection: CountrySelection,
    pub row_count: usize,
    pub table: Result<TablePreview, ViewError>,
    pub types: Result<TypeDistribution, ViewError>,
    pub geo: Result<GeoPoints, ViewError>,
    pub activity: Result<ActivityBreakdown, ViewError>,
}

impl Default for ViewSet {
    fn default() -> Self {
        Self {
            selection: CountrySelection::All,
            row_count: 0,
            table: Ok(TablePreview::default()),
            types: Ok(TypeDistribution::default()),
            geo: Ok(GeoPoints::default()),
            activity: Ok(ActivityBreakdown::default()),
        }
    }
}

impl ViewSet {
    pub fn compute(subset: &DataFrame, selection: &CountrySelection) -> Self {
        Self {
            selection: selection.clone(),
            row_count: subset.height(),
            table: TablePreview::from_frame(subset),
            types: TypeDistribution::from_frame(subset),
            geo: GeoPoints::from_frame(subset),
            activity: ActivityBreakdown::from_frame(subset, selection),
        }
    }

    /// The error that stopped a view from being computed, if any.
    pub fn error_for(&self, kind: ViewKind) -> Option<&ViewError> {
        match kind {
            ViewKind::Table => self.table.as_ref().err(),
            ViewKind::TypeDistribution => self.types.as_ref().err(),
            ViewKind::Map => self.geo.as_ref().err(),
            ViewKind::Activity => self.activity.as_ref().err(),
        }
    }
}
