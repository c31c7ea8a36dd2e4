//! Volcano Explorer Main Application
//! Owns the base table and wires the control panel to the chart viewer.

use crate::charts::{ChartJob, StaticChartRenderer, ViewKind, ViewSet};
use crate::config::AppConfig;
use crate::data::boundaries::{self, BoundaryCollection};
use crate::data::{DataLoader, DataProcessor, UnmappedActivityPolicy};
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use anyhow::Context;
use egui::SidePanel;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use tracing::{debug, error, info, warn};

/// Load, normalize and derive: the base table for one CSV path.
pub fn build_base_table(
    loader: &mut DataLoader,
    path: &Path,
    policy: UnmappedActivityPolicy,
) -> anyhow::Result<DataFrame> {
    let raw = loader.load_csv(path)?;
    let base = DataProcessor::prepare(&raw, policy)
        .with_context(|| format!("Failed to prepare {}", path.display()))?;
    Ok(base)
}

/// Filter the base table and compute every view for the selection.
///
/// Only the filter can fail here; a view that cannot be built carries its
/// own error inside the returned set.
pub fn compute_views(
    base: &DataFrame,
    selection: &crate::data::CountrySelection,
) -> anyhow::Result<ViewSet> {
    let subset = DataProcessor::filter_by_country(base, selection)
        .with_context(|| format!("Failed to filter for {}", selection))?;
    let views = ViewSet::compute(&subset, selection);
    for kind in ViewKind::ALL {
        if let Some(e) = views.error_for(kind) {
            warn!(view = ?kind, selection = %selection, error = %e, "View unavailable");
        }
    }
    Ok(views)
}

/// Main application window.
pub struct VolcanoApp {
    config: AppConfig,
    loader: DataLoader,
    base: Option<DataFrame>,
    data_path: PathBuf,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,

    // Background boundary download
    boundary_rx: Option<Receiver<Result<BoundaryCollection, String>>>,
}

impl VolcanoApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let boundary_rx = config.boundaries.enabled.then(|| {
            boundaries::spawn_fetch(config.boundaries.url.clone(), config.boundaries.timeout())
        });

        let mut app = Self {
            loader: DataLoader::new(),
            base: None,
            data_path: config.data_path.clone(),
            control_panel: ControlPanel::new(&config),
            chart_viewer: ChartViewer::new(),
            boundary_rx,
            config,
        };
        let path = app.data_path.clone();
        app.load_base(path);
        app
    }

    /// Build the base table for `path` and refresh every view.
    fn load_base(&mut self, path: PathBuf) {
        self.control_panel.csv_path = Some(path.clone());
        self.data_path = path;

        match build_base_table(
            &mut self.loader,
            &self.data_path,
            self.config.unmapped_activity,
        ) {
            Ok(base) => {
                match DataProcessor::countries(&base) {
                    Ok(countries) => self.control_panel.update_countries(countries),
                    Err(e) => warn!(error = %e, "Could not list countries"),
                }
                self.control_panel.set_status(format!(
                    "Loaded {} volcanoes from {}",
                    base.height(),
                    self.data_path.display()
                ));
                self.base = Some(base);
                self.refresh_views();
            }
            Err(e) => {
                error!(path = %self.data_path.display(), error = %format!("{:#}", e), "Cannot build base table");
                self.base = None;
                self.control_panel.update_countries(Vec::new());
                self.control_panel.set_status(format!("Error: {:#}", e));
                self.chart_viewer.set_error(format!("{:#}", e));
            }
        }
    }

    /// Recompute views from the base table for the current selection.
    fn refresh_views(&mut self) {
        let Some(base) = &self.base else {
            return;
        };
        let selection = self.control_panel.selection.clone();

        match compute_views(base, &selection) {
            Ok(views) => {
                debug!(selection = %selection, rows = views.row_count, "Views recomputed");
                self.chart_viewer.set_views(views);
            }
            Err(e) => {
                error!(selection = %selection, error = %format!("{:#}", e), "Cannot build views");
                self.control_panel.set_status(format!("Error: {:#}", e));
                self.chart_viewer.set_error(format!("{:#}", e));
            }
        }
    }

    /// Handle CSV file selection
    fn handle_browse_csv(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        {
            info!(path = %path.display(), "CSV selected");
            self.load_base(path);
        }
    }

    /// Re-read the current CSV from disk
    fn handle_reload(&mut self) {
        self.loader.invalidate(&self.data_path);
        let path = self.data_path.clone();
        info!(path = %path.display(), "Reloading CSV");
        self.load_base(path);
    }

    /// Render every enabled chart view to PNG in a chosen directory
    fn handle_export_png(&mut self) {
        let Some(views) = self.chart_viewer.views() else {
            self.control_panel.set_status("No charts to export");
            return;
        };

        let mut failures = Vec::new();
        let mut jobs: Vec<(String, ChartJob)> = Vec::new();
        for kind in self.control_panel.toggles.enabled() {
            if !kind.is_chart() {
                continue;
            }
            if let Some(e) = views.error_for(kind) {
                failures.push(format!("{}: {}", kind.file_stem(), e));
                continue;
            }
            let style = self.control_panel.style_for(kind);
            if let Some(job) = ChartViewer::chart_job(views, kind, style) {
                jobs.push((kind.file_stem().to_string(), job));
            }
        }
        if jobs.is_empty() {
            if failures.is_empty() {
                self.control_panel.set_status("No charts to export");
            } else {
                self.control_panel
                    .set_status(format!("Error: nothing exported: {}", failures.join("; ")));
            }
            return;
        }
        let attempted = jobs.len() + failures.len();

        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return; // User cancelled
        };

        let results = StaticChartRenderer::export_pngs(
            &jobs,
            &dir,
            self.config.export.width,
            self.config.export.height,
        );

        let mut written = 0;
        for result in results {
            match result {
                Ok(path) => {
                    info!(path = %path.display(), "Chart exported");
                    written += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Chart export failed");
                    failures.push(e.to_string());
                }
            }
        }

        if failures.is_empty() {
            self.control_panel
                .set_status(format!("Exported {} charts to {}", written, dir.display()));
        } else {
            self.control_panel.set_status(format!(
                "Error: {} of {} charts failed: {}",
                failures.len(),
                attempted,
                failures.join("; ")
            ));
        }

        if written > 0 && self.config.export.open_after_export {
            if let Err(e) = open::that(&dir) {
                warn!(path = %dir.display(), error = %e, "Could not open export directory");
            }
        }
    }

    /// Check for the boundary download result
    fn check_boundary_result(&mut self) {
        let Some(rx) = self.boundary_rx.take() else {
            return;
        };

        match rx.try_recv() {
            // No view draws the boundaries yet; only the feature count is kept
            Ok(Ok(collection)) => {
                self.control_panel.boundary_status = format!(
                    "Boundaries: {} features ({} with geometry)",
                    collection.feature_count(),
                    collection.drawable_count()
                );
            }
            Ok(Err(e)) => {
                self.control_panel.boundary_status = format!("Boundaries unavailable: {}", e);
            }
            Err(std::sync::mpsc::TryRecvError::Empty) => {
                self.boundary_rx = Some(rx);
            }
            Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                self.control_panel.boundary_status = "Boundaries unavailable".to_string();
            }
        }
    }
}

impl eframe::App for VolcanoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_boundary_result();

        // Keep polling while the download runs
        if self.boundary_rx.is_some() {
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(280.0)
            .max_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::BrowseCsv => self.handle_browse_csv(),
                        ControlPanelAction::Reload => self.handle_reload(),
                        ControlPanelAction::CountryChanged => self.refresh_views(),
                        ControlPanelAction::DisplayChanged => {
                            self.chart_viewer.invalidate_textures()
                        }
                        ControlPanelAction::ExportPng => self.handle_export_png(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Chart Viewer
        let static_size = (self.config.export.width, self.config.export.height);
        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer
                .show(ui, &self.control_panel, static_size);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CountrySelection, LoaderError};
    use std::io::Write;

    const SAMPLE: &str = "\
,Number,Volcano Name,Country,Region,Latitude,Longitude,Elev,Type,Status,Last Known
0,1001,Mount St. Helens,United States,US-Washington,46.2,-122.18,2549,Stratovolcano,Historical,D2
1,1002,Kilauea,United States,Hawaiian Is,19.42,-155.29,1222,Shield volcano,Historical,D1
2,1003,Kilimanjaro,Tanzania,Africa-E,-3.07,37.35,5895,Stratovolcano,Holocene,U
3,1004,Fuji,Japan,Honshu-Japan,35.35,138.73,3776,Stratovolcano,Historical,D3
";

    fn sample_csv(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("volcano_ds_pop.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        path
    }

    #[test]
    fn pipeline_builds_base_table_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_csv(&dir);
        let mut loader = DataLoader::new();

        let base = build_base_table(&mut loader, &path, UnmappedActivityPolicy::Reject).unwrap();
        assert_eq!(base.height(), 4);
        assert!(base.column("").is_err());
        assert_eq!(
            DataProcessor::countries(&base).unwrap(),
            vec![
                "Japan",
                "United Republic of Tanzania",
                "United States of America"
            ]
        );

        let views = compute_views(&base, &CountrySelection::All).unwrap();
        assert_eq!(views.row_count, 4);
        assert_eq!(views.types.as_ref().unwrap().total(), 4);
        assert_eq!(views.geo.as_ref().unwrap().len(), 4);

        let usa = CountrySelection::Country("United States of America".to_string());
        let views = compute_views(&base, &usa).unwrap();
        let activity = views.activity.as_ref().unwrap();
        assert_eq!(views.row_count, 2);
        assert_eq!(activity.level_totals(), vec![(1, 1), (2, 1)]);
        assert_eq!(
            activity.title(),
            "Active & Inactive Volcanoes in United States of America"
        );
    }

    #[test]
    fn csv_without_coordinates_keeps_other_views() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_coordinates.csv");
        std::fs::write(
            &path,
            "Country,Type,Last Known\nJapan,Stratovolcano,D1\nUnited States,Shield,D2\n",
        )
        .unwrap();
        let mut loader = DataLoader::new();

        let base = build_base_table(&mut loader, &path, UnmappedActivityPolicy::Zero).unwrap();
        let views = compute_views(&base, &CountrySelection::All).unwrap();

        assert!(views.error_for(ViewKind::Map).is_some());
        assert_eq!(views.table.as_ref().unwrap().row_count(), 2);
        assert_eq!(views.types.as_ref().unwrap().total(), 2);
        assert_eq!(
            views.activity.as_ref().unwrap().countries(),
            vec!["Japan", "United States of America"]
        );
    }

    #[test]
    fn pipeline_surfaces_loader_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = DataLoader::new();
        let err = build_base_table(
            &mut loader,
            &dir.path().join("missing.csv"),
            UnmappedActivityPolicy::Zero,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LoaderError>(),
            Some(LoaderError::FileAccess { .. })
        ));
    }

    #[test]
    fn reload_after_fix_sees_new_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_csv(&dir);
        let mut loader = DataLoader::new();
        build_base_table(&mut loader, &path, UnmappedActivityPolicy::Zero).unwrap();

        let mut extended = SAMPLE.to_string();
        extended.push_str("4,1005,Hekla,Iceland,Iceland-S,63.98,-19.7,1491,Stratovolcano,Historical,D1\n");
        std::fs::write(&path, extended).unwrap();

        let cached = build_base_table(&mut loader, &path, UnmappedActivityPolicy::Zero).unwrap();
        assert_eq!(cached.height(), 4);

        loader.invalidate(&path);
        let fresh = build_base_table(&mut loader, &path, UnmappedActivityPolicy::Zero).unwrap();
        assert_eq!(fresh.height(), 5);
    }
}
