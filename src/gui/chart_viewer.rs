//! Chart Viewer Widget
//! Central scrollable area showing every enabled view for the current selection.

use crate::charts::{
    ChartBackend, ChartJob, ChartPlotter, ChartStyle, StaticChartRenderer, ViewKind, ViewSet,
};
use crate::gui::ControlPanel;
use egui::{Color32, RichText, ScrollArea, TextureHandle};
use std::collections::HashMap;
use tracing::warn;

const VIEW_SPACING: f32 = 15.0;

/// Static bitmaps are drawn at this fraction of the export size.
const STATIC_PREVIEW_SCALE: f32 = 0.75;

/// Scrollable area for the dashboard views.
#[derive(Default)]
pub struct ChartViewer {
    views: Option<ViewSet>,
    error: Option<String>,
    /// Uploaded static charts, keyed by view and the style they were drawn with.
    textures: HashMap<(ViewKind, ChartStyle), TextureHandle>,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn views(&self) -> Option<&ViewSet> {
        self.views.as_ref()
    }

    /// Replace the views; any previous error is cleared.
    pub fn set_views(&mut self, views: ViewSet) {
        self.views = Some(views);
        self.error = None;
        self.textures.clear();
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.views = None;
        self.error = Some(error.into());
        self.textures.clear();
    }

    /// Forget static bitmaps so they are redrawn with the current options.
    pub fn invalidate_textures(&mut self) {
        self.textures.clear();
    }

    /// Build the render job for a chart view; `None` for the table or a failed view.
    pub fn chart_job(views: &ViewSet, kind: ViewKind, style: ChartStyle) -> Option<ChartJob> {
        match kind {
            ViewKind::Table => None,
            ViewKind::TypeDistribution => views
                .types
                .as_ref()
                .ok()
                .map(|types| ChartJob::Types(types.clone(), style)),
            ViewKind::Map => views.geo.as_ref().ok().map(|geo| ChartJob::Map(geo.clone())),
            ViewKind::Activity => views
                .activity
                .as_ref()
                .ok()
                .map(|activity| ChartJob::Activity(activity.clone(), style)),
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, panel: &ControlPanel, static_size: (u32, u32)) {
        if let Some(error) = &self.error {
            ui.centered_and_justified(|ui| {
                ui.label(
                    RichText::new(format!("⚠ {}", error))
                        .size(16.0)
                        .color(Color32::from_rgb(220, 53, 69)),
                );
            });
            return;
        }

        let Some(views) = self.views.take() else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        };

        ui.heading("Volcanoes of the World");
        ui.label(
            RichText::new(format!(
                "{} volcanoes, country: {}",
                views.row_count, views.selection
            ))
            .color(Color32::GRAY),
        );
        ui.add_space(VIEW_SPACING);

        let enabled = panel.toggles.enabled();
        if enabled.is_empty() {
            ui.label("Tick a view in the sidebar to get started.");
        }

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for kind in enabled {
                    egui::Frame::none()
                        .rounding(8.0)
                        .fill(ui.visuals().widgets.noninteractive.bg_fill)
                        .inner_margin(12.0)
                        .show(ui, |ui| {
                            ui.set_width(ui.available_width());
                            ui.label(RichText::new(kind.heading()).size(16.0).strong());
                            ui.add_space(8.0);
                            self.draw_view(ui, &views, kind, panel, static_size);
                        });
                    ui.add_space(VIEW_SPACING);
                }
            });

        self.views = Some(views);
    }

    fn draw_view(
        &mut self,
        ui: &mut egui::Ui,
        views: &ViewSet,
        kind: ViewKind,
        panel: &ControlPanel,
        static_size: (u32, u32),
    ) {
        let style = panel.style_for(kind);

        // Only this card shows the failure; the other views still draw
        if let Some(error) = views.error_for(kind) {
            ui.label(
                RichText::new(format!("⚠ {}", error)).color(Color32::from_rgb(220, 53, 69)),
            );
            return;
        }

        match (kind, panel.backend) {
            (ViewKind::Table, _) => {
                if let Ok(table) = &views.table {
                    ChartPlotter::draw_table(ui, table);
                }
            }
            (_, ChartBackend::Static) => self.draw_static(ui, views, kind, style, static_size),
            (ViewKind::TypeDistribution, ChartBackend::Interactive) => {
                if let Ok(types) = &views.types {
                    ChartPlotter::draw_type_distribution(ui, types, style);
                }
            }
            (ViewKind::Map, ChartBackend::Interactive) => {
                if let Ok(geo) = &views.geo {
                    ChartPlotter::draw_geo_map(ui, geo);
                }
            }
            (ViewKind::Activity, ChartBackend::Interactive) => {
                if let Ok(activity) = &views.activity {
                    ChartPlotter::draw_activity(ui, activity, style);
                }
            }
        }
    }

    fn draw_static(
        &mut self,
        ui: &mut egui::Ui,
        views: &ViewSet,
        kind: ViewKind,
        style: ChartStyle,
        static_size: (u32, u32),
    ) {
        let key = (kind, style);
        if !self.textures.contains_key(&key) {
            let Some(job) = Self::chart_job(views, kind, style) else {
                return;
            };
            let (width, height) = (
                (static_size.0 as f32 * STATIC_PREVIEW_SCALE) as u32,
                (static_size.1 as f32 * STATIC_PREVIEW_SCALE) as u32,
            );
            match StaticChartRenderer::render(&job, width, height) {
                Ok(chart) => {
                    let image = egui::ColorImage::from_rgb(
                        [chart.width as usize, chart.height as usize],
                        &chart.rgb,
                    );
                    let texture = ui.ctx().load_texture(
                        format!("static_{}", kind.file_stem()),
                        image,
                        egui::TextureOptions::LINEAR,
                    );
                    self.textures.insert(key, texture);
                }
                Err(e) => {
                    warn!(view = ?kind, error = %e, "Static chart rendering failed");
                    ui.label(
                        RichText::new(format!("Rendering failed: {}", e))
                            .color(Color32::from_rgb(220, 53, 69)),
                    );
                    return;
                }
            }
        }

        if let Some(texture) = self.textures.get(&key) {
            ui.add(
                egui::Image::new(egui::load::SizedTexture::from_handle(texture))
                    .max_width(ui.available_width()),
            );
        }
    }
}
