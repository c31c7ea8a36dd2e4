//! Application configuration.
//!
//! Read from `volcano_explorer.toml` in the working directory when present.
//! Every section has defaults, so a partial file only overrides what it names.

use crate::charts::{ChartBackend, ChartStyle};
use crate::data::UnmappedActivityPolicy;
use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE: &str = "volcano_explorer.toml";
pub const DEFAULT_DATA_PATH: &str = "./data/raw/volcano_ds_pop.csv";
pub const DEFAULT_BOUNDARIES_URL: &str =
    "https://raw.githubusercontent.com/plotly/datasets/master/geojson-counties-fips.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// CSV loaded at startup.
    pub data_path: PathBuf,
    /// Handling of "Last Known" codes outside the activity table.
    pub unmapped_activity: UnmappedActivityPolicy,
    /// Backend selected when the app opens.
    pub backend: ChartBackend,
    pub boundaries: BoundariesConfig,
    pub views: ViewsConfig,
    pub export: ExportConfig,
    pub window: WindowConfig,
    pub log: LogSettings,
    /// Values replaced while loading, reported once logging is up.
    #[serde(skip)]
    pub corrections: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            unmapped_activity: UnmappedActivityPolicy::default(),
            backend: ChartBackend::default(),
            boundaries: BoundariesConfig::default(),
            views: ViewsConfig::default(),
            export: ExportConfig::default(),
            window: WindowConfig::default(),
            log: LogSettings::default(),
            corrections: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundariesConfig {
    pub enabled: bool,
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for BoundariesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_BOUNDARIES_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl BoundariesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Chart styles offered by one view; the first is preselected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub styles: Vec<ChartStyle>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            styles: vec![ChartStyle::Pie, ChartStyle::Bar],
        }
    }
}

impl ViewConfig {
    pub fn default_style(&self) -> ChartStyle {
        self.styles.first().copied().unwrap_or(ChartStyle::Pie)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    pub type_distribution: ViewConfig,
    pub activity: ViewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub width: u32,
    pub height: u32,
    /// Open the export directory after writing.
    pub open_after_export: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            open_after_export: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1400.0,
            height: 900.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load from a specific path. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut config: AppConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.sanitize();
        Ok(config)
    }

    /// Replace values that cannot work with their defaults.
    ///
    /// Runs before the subscriber exists, so each replacement is recorded in
    /// `corrections` instead of being logged here.
    fn sanitize(&mut self) {
        for (name, view) in [
            ("type_distribution", &mut self.views.type_distribution),
            ("activity", &mut self.views.activity),
        ] {
            let mut seen = HashSet::new();
            view.styles.retain(|style| seen.insert(*style));
            if view.styles.is_empty() {
                self.corrections.push(format!(
                    "No chart styles configured for views.{}, using defaults",
                    name
                ));
                *view = ViewConfig::default();
            }
        }

        let defaults = ExportConfig::default();
        if self.export.width < 200 || self.export.height < 200 {
            self.corrections.push(format!(
                "Export size {}x{} too small, using {}x{}",
                self.export.width, self.export.height, defaults.width, defaults.height
            ));
            self.export.width = defaults.width;
            self.export.height = defaults.height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join(CONFIG_FILE)).unwrap();

        assert_eq!(config.data_path, PathBuf::from(DEFAULT_DATA_PATH));
        assert!(config.boundaries.enabled);
        assert_eq!(config.boundaries.url, DEFAULT_BOUNDARIES_URL);
        assert_eq!(config.unmapped_activity, UnmappedActivityPolicy::Zero);
        assert_eq!(config.views.activity.default_style(), ChartStyle::Pie);
        assert!(config.corrections.is_empty());
    }

    #[test]
    fn partial_file_merges_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
data_path = "volcanoes.csv"
unmapped_activity = "reject"
backend = "static"

[boundaries]
enabled = false

[views.activity]
styles = ["Bar"]
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.data_path, PathBuf::from("volcanoes.csv"));
        assert_eq!(config.unmapped_activity, UnmappedActivityPolicy::Reject);
        assert_eq!(config.backend, ChartBackend::Static);
        assert!(!config.boundaries.enabled);
        assert_eq!(config.boundaries.timeout(), Duration::from_secs(30));
        assert_eq!(config.views.activity.styles, vec![ChartStyle::Bar]);
        assert_eq!(config.views.activity.default_style(), ChartStyle::Bar);
        assert_eq!(
            config.views.type_distribution.styles,
            vec![ChartStyle::Pie, ChartStyle::Bar]
        );
        assert_eq!(config.export.width, 1200);
    }

    #[test]
    fn empty_style_list_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[views.type_distribution]\nstyles = []\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.views.type_distribution, ViewConfig::default());
        assert_eq!(config.corrections.len(), 1);
        assert!(config.corrections[0].contains("views.type_distribution"));
    }

    #[test]
    fn repeated_styles_keep_first_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "[views.activity]\nstyles = [\"Pie\", \"Bar\", \"Pie\", \"Bar\"]\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(
            config.views.activity.styles,
            vec![ChartStyle::Pie, ChartStyle::Bar]
        );
        assert!(config.corrections.is_empty());
    }

    #[test]
    fn tiny_export_size_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[export]\nwidth = 10\nheight = 10\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.export.width, 1200);
        assert_eq!(config.export.height, 800);
        assert_eq!(
            config.corrections,
            vec!["Export size 10x10 too small, using 1200x800".to_string()]
        );
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "backend = \"holographic\"\n").unwrap();

        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&AppConfig::default()).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.data_path, PathBuf::from(DEFAULT_DATA_PATH));
        assert_eq!(parsed.export.height, 800);
    }
}
