//! Control Panel Widget
//! Left side panel with the country selector, view toggles and chart options.

use crate::charts::{ChartBackend, ChartStyle, ViewKind};
use crate::config::AppConfig;
use crate::data::CountrySelection;
use egui::{Color32, ComboBox, RichText};
use std::path::PathBuf;

/// Which panels are switched on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewToggles {
    pub table: bool,
    pub types: bool,
    pub map: bool,
    pub activity: bool,
}

impl ViewToggles {
    pub fn is_enabled(&self, kind: ViewKind) -> bool {
        match kind {
            ViewKind::Table => self.table,
            ViewKind::TypeDistribution => self.types,
            ViewKind::Map => self.map,
            ViewKind::Activity => self.activity,
        }
    }

    fn flag_mut(&mut self, kind: ViewKind) -> &mut bool {
        match kind {
            ViewKind::Table => &mut self.table,
            ViewKind::TypeDistribution => &mut self.types,
            ViewKind::Map => &mut self.map,
            ViewKind::Activity => &mut self.activity,
        }
    }

    /// Enabled views in display order.
    pub fn enabled(&self) -> Vec<ViewKind> {
        ViewKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }
}

/// Left side control panel.
pub struct ControlPanel {
    pub csv_path: Option<PathBuf>,
    pub countries: Vec<String>,
    pub selection: CountrySelection,
    pub toggles: ViewToggles,
    pub type_style: ChartStyle,
    pub activity_style: ChartStyle,
    pub backend: ChartBackend,
    type_styles: Vec<ChartStyle>,
    activity_styles: Vec<ChartStyle>,
    pub status: String,
    pub boundary_status: String,
}

impl ControlPanel {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            csv_path: None,
            countries: Vec::new(),
            selection: CountrySelection::All,
            toggles: ViewToggles::default(),
            type_style: config.views.type_distribution.default_style(),
            activity_style: config.views.activity.default_style(),
            backend: config.backend,
            type_styles: config.views.type_distribution.styles.clone(),
            activity_styles: config.views.activity.styles.clone(),
            status: "Ready".to_string(),
            boundary_status: if config.boundaries.enabled {
                "Boundaries: downloading...".to_string()
            } else {
                "Boundaries: disabled".to_string()
            },
        }
    }

    /// Replace the selectable countries, keeping the current choice when it still exists.
    pub fn update_countries(&mut self, countries: Vec<String>) {
        if let CountrySelection::Country(name) = &self.selection {
            if !countries.contains(name) {
                self.selection = CountrySelection::All;
            }
        }
        self.countries = countries;
    }

    /// Style currently chosen for a chart view.
    pub fn style_for(&self, kind: ViewKind) -> ChartStyle {
        match kind {
            ViewKind::Activity => self.activity_style,
            _ => self.type_style,
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        // Title
        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🌋 Volcanoes of the World")
                    .size(20.0)
                    .color(Color32::from_rgb(231, 76, 60)),
            );
            ui.label(
                RichText::new("Use the sidebar to explore the data")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Source =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                let path_text = self
                    .csv_path
                    .as_ref()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "No file loaded".to_string());
                ui.label(RichText::new(&path_text).size(12.0));

                ui.horizontal(|ui| {
                    if ui.button("📂 Browse").clicked() {
                        action = ControlPanelAction::BrowseCsv;
                    }
                    if ui
                        .add_enabled(self.csv_path.is_some(), egui::Button::new("⟳ Reload"))
                        .clicked()
                    {
                        action = ControlPanelAction::Reload;
                    }
                });
            });

        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Country =====
        ui.label(RichText::new("🌍 Choose a country").size(14.0).strong());
        ui.add_space(5.0);

        let before = self.selection.clone();
        ComboBox::from_id_salt("country")
            .width(220.0)
            .selected_text(self.selection.to_string())
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut self.selection, CountrySelection::All, "All");
                for country in &self.countries {
                    ui.selectable_value(
                        &mut self.selection,
                        CountrySelection::Country(country.clone()),
                        country,
                    );
                }
            });
        if self.selection != before {
            action = ControlPanelAction::CountryChanged;
        }

        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Views =====
        ui.label(RichText::new("📊 Views").size(14.0).strong());
        ui.add_space(5.0);

        let display_before = (
            self.toggles,
            self.type_style,
            self.activity_style,
            self.backend,
        );

        for kind in ViewKind::ALL {
            ui.checkbox(self.toggles.flag_mut(kind), kind.toggle_label());
            let styles = match kind {
                ViewKind::TypeDistribution => Some((&self.type_styles, &mut self.type_style)),
                ViewKind::Activity => Some((&self.activity_styles, &mut self.activity_style)),
                _ => None,
            };
            if let Some((styles, current)) = styles {
                if self.toggles.is_enabled(kind) && styles.len() > 1 {
                    ui.horizontal(|ui| {
                        ui.add_space(22.0);
                        for style in styles {
                            ui.radio_value(current, *style, style.to_string());
                        }
                    });
                }
            }
        }

        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Rendering =====
        ui.label(RichText::new("🎨 Rendering").size(14.0).strong());
        ui.horizontal(|ui| {
            ui.radio_value(&mut self.backend, ChartBackend::Interactive, "Interactive");
            ui.radio_value(&mut self.backend, ChartBackend::Static, "Static");
        });

        if action == ControlPanelAction::None
            && display_before
                != (
                    self.toggles,
                    self.type_style,
                    self.activity_style,
                    self.backend,
                )
        {
            action = ControlPanelAction::DisplayChanged;
        }

        ui.add_space(10.0);
        ui.vertical_centered(|ui| {
            let any_chart = self.toggles.enabled().iter().any(|kind| kind.is_chart());
            ui.add_enabled_ui(any_chart, |ui| {
                let button = egui::Button::new(RichText::new("🖼 Export PNG").size(14.0))
                    .min_size(egui::vec2(150.0, 30.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::ExportPng;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Status =====
        let status_color = if self.status.starts_with("Error") {
            Color32::from_rgb(220, 53, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));
        ui.label(
            RichText::new(&self.boundary_status)
                .size(11.0)
                .color(Color32::GRAY),
        );

        action
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseCsv,
    Reload,
    CountryChanged,
    DisplayChanged,
    ExportPng,
}
