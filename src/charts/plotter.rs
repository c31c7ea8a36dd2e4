//! Chart Plotter Module
//! Creates interactive visualizations using egui_plot and the egui painter.

use crate::charts::views::{
    ActivityBreakdown, ChartStyle, GeoPoints, TablePreview, TypeDistribution,
};
use crate::data::mappings::MAX_ACTIVITY_LEVEL;
use egui::{Align2, Color32, FontId, Pos2, RichText, ScrollArea, Shape, Stroke};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};
use std::f32::consts::{FRAC_PI_2, TAU};

pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(231, 76, 60),  // Red
    Color32::from_rgb(46, 204, 113), // Green
    Color32::from_rgb(155, 89, 182), // Purple
    Color32::from_rgb(243, 156, 18), // Orange
    Color32::from_rgb(26, 188, 156), // Teal
    Color32::from_rgb(233, 30, 99),  // Pink
    Color32::from_rgb(0, 188, 212),  // Cyan
    Color32::from_rgb(255, 87, 34),  // Deep Orange
    Color32::from_rgb(121, 85, 72),  // Brown
    Color32::from_rgb(96, 125, 139), // Blue Grey
];

/// Activity level colors, dormant grey through bright red.
pub const LEVEL_COLORS: [Color32; MAX_ACTIVITY_LEVEL as usize + 1] = [
    Color32::from_rgb(149, 165, 166),
    Color32::from_rgb(52, 152, 219),
    Color32::from_rgb(26, 188, 156),
    Color32::from_rgb(46, 204, 113),
    Color32::from_rgb(241, 196, 15),
    Color32::from_rgb(243, 156, 18),
    Color32::from_rgb(230, 126, 34),
    Color32::from_rgb(231, 76, 60),
];

pub const VOLCANO_COLOR: Color32 = Color32::from_rgb(231, 76, 60);

/// Inner radius of the donut charts as a fraction of the outer radius.
pub const HOLE_RATIO: f32 = 0.3;

const CHART_HEIGHT: f32 = 320.0;
const TABLE_ROW_HEIGHT: f32 = 20.0;
const TABLE_COL_WIDTH: f32 = 130.0;
const TABLE_MAX_HEIGHT: f32 = 420.0;
const DONUT_SIZE: f32 = 300.0;
// Radians per drawn donut segment; keeps every piece convex.
const DONUT_STEP: f32 = 0.05;

/// Creates the dashboard's interactive charts.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn category_color(index: usize) -> Color32 {
        PALETTE[index % PALETTE.len()]
    }

    pub fn level_color(level: i32) -> Color32 {
        let idx = level.clamp(0, LEVEL_COLORS.len() as i32 - 1) as usize;
        LEVEL_COLORS[idx]
    }

    /// Render the filtered subset as a scrollable grid.
    pub fn draw_table(ui: &mut egui::Ui, table: &TablePreview) {
        if table.headers.is_empty() {
            ui.label("No columns");
            return;
        }

        ScrollArea::horizontal()
            .id_salt("volcano_table_h")
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.horizontal(|ui| {
                        for header in &table.headers {
                            ui.add_sized(
                                [TABLE_COL_WIDTH, TABLE_ROW_HEIGHT],
                                egui::Label::new(RichText::new(header).strong()).truncate(),
                            );
                        }
                    });
                    ui.separator();

                    ScrollArea::vertical()
                        .id_salt("volcano_table_v")
                        .max_height(TABLE_MAX_HEIGHT)
                        .auto_shrink([false, true])
                        .show_rows(ui, TABLE_ROW_HEIGHT, table.row_count(), |ui, row_range| {
                            for row in &table.rows[row_range] {
                                ui.horizontal(|ui| {
                                    for cell in row {
                                        ui.add_sized(
                                            [TABLE_COL_WIDTH, TABLE_ROW_HEIGHT],
                                            egui::Label::new(cell.as_str()).truncate(),
                                        );
                                    }
                                });
                            }
                        });
                });
            });

        ui.label(
            RichText::new(format!("{} rows", table.row_count()))
                .size(11.0)
                .color(Color32::GRAY),
        );
    }

    /// Volcano types as a donut or a bar chart.
    pub fn draw_type_distribution(ui: &mut egui::Ui, types: &TypeDistribution, style: ChartStyle) {
        if types.is_empty() {
            ui.label("No volcanoes match the current selection");
            return;
        }

        match style {
            ChartStyle::Pie => {
                let slices: Vec<(String, usize, Color32)> = types
                    .entries
                    .iter()
                    .enumerate()
                    .map(|(i, e)| (e.label.clone(), e.count, Self::category_color(i)))
                    .collect();
                Self::draw_donut(ui, "Volcano Types Distribution", &slices);
            }
            ChartStyle::Bar => {
                let labels: Vec<String> = types.entries.iter().map(|e| e.label.clone()).collect();
                let bars: Vec<Bar> = types
                    .entries
                    .iter()
                    .zip(types.proportions())
                    .enumerate()
                    .map(|(i, (e, (_, share)))| {
                        Bar::new(i as f64, e.count as f64)
                            .name(format!("{} ({:.1}%)", e.label, share))
                            .fill(Self::category_color(i))
                    })
                    .collect();

                Plot::new("type_distribution_bar")
                    .height(CHART_HEIGHT)
                    .allow_scroll(false)
                    .x_axis_label("Type")
                    .y_axis_label("Amount")
                    .include_y(0.0)
                    .x_axis_formatter(move |mark, _range| Self::category_label(&labels, mark.value))
                    .show(ui, |plot_ui| {
                        plot_ui.bar_chart(BarChart::new(bars).width(0.6).name("Amount"));
                    });
            }
        }
    }

    /// Volcano positions over longitude/latitude axes.
    pub fn draw_geo_map(ui: &mut egui::Ui, geo: &GeoPoints) {
        if geo.is_empty() {
            ui.label("No coordinates to show for the current selection");
        }

        let positions: Vec<(String, [f64; 2])> = geo
            .points
            .iter()
            .map(|p| (p.name.clone(), [p.longitude, p.latitude]))
            .collect();
        let points: PlotPoints = positions.iter().map(|(_, xy)| *xy).collect();

        let frame: PlotPoints = vec![
            [-180.0, -90.0],
            [180.0, -90.0],
            [180.0, 90.0],
            [-180.0, 90.0],
            [-180.0, -90.0],
        ]
        .into();
        let equator: PlotPoints = vec![[-180.0, 0.0], [180.0, 0.0]].into();

        Plot::new("world_map")
            .height(CHART_HEIGHT + 80.0)
            .data_aspect(1.0)
            .include_x(-180.0)
            .include_x(180.0)
            .include_y(-90.0)
            .include_y(90.0)
            .x_axis_label("Longitude")
            .y_axis_label("Latitude")
            .label_formatter(move |_name, value| {
                let nearest = positions.iter().min_by(|a, b| {
                    let da = (a.1[0] - value.x).powi(2) + (a.1[1] - value.y).powi(2);
                    let db = (b.1[0] - value.x).powi(2) + (b.1[1] - value.y).powi(2);
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                });
                match nearest {
                    Some((name, xy))
                        if (xy[0] - value.x).abs() < 2.0 && (xy[1] - value.y).abs() < 2.0 =>
                    {
                        format!("{}\nlat {:.2}, lon {:.2}", name, xy[1], xy[0])
                    }
                    _ => format!("lat {:.2}, lon {:.2}", value.y, value.x),
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.line(Line::new(frame).color(Color32::GRAY).width(1.0));
                plot_ui.line(
                    Line::new(equator)
                        .color(Color32::GRAY.gamma_multiply(0.5))
                        .width(0.5),
                );
                plot_ui.points(
                    Points::new(points)
                        .radius(3.0)
                        .color(VOLCANO_COLOR.gamma_multiply(0.8))
                        .name("Volcanoes"),
                );
            });

        ui.label(
            RichText::new(format!("{} volcanoes plotted", geo.len()))
                .size(11.0)
                .color(Color32::GRAY),
        );
    }

    /// Stacked bars per country, or a donut of activity-level shares.
    pub fn draw_activity(ui: &mut egui::Ui, activity: &ActivityBreakdown, style: ChartStyle) {
        if activity.is_empty() {
            ui.label("No volcanoes match the current selection");
            return;
        }

        match style {
            ChartStyle::Pie => {
                let slices: Vec<(String, usize, Color32)> = activity
                    .level_totals()
                    .into_iter()
                    .map(|(level, count)| {
                        (format!("Level {}", level), count, Self::level_color(level))
                    })
                    .collect();
                Self::draw_donut(ui, &activity.title(), &slices);
            }
            ChartStyle::Bar => {
                let countries = activity.countries();
                let mut charts: Vec<BarChart> = Vec::new();

                for level in activity.levels() {
                    let bars: Vec<Bar> = countries
                        .iter()
                        .enumerate()
                        .map(|(i, country)| {
                            Bar::new(i as f64, activity.count_for(country, level) as f64)
                                .name(country)
                        })
                        .collect();

                    let chart = {
                        let below: Vec<&BarChart> = charts.iter().collect();
                        BarChart::new(bars)
                            .name(format!("Level {}", level))
                            .color(Self::level_color(level))
                            .width(0.6)
                            .stack_on(&below)
                    };
                    charts.push(chart);
                }

                ui.label(RichText::new(activity.title()).size(14.0).strong());
                ui.label(
                    RichText::new(format!("{} volcanoes", activity.total()))
                        .size(11.0)
                        .color(Color32::GRAY),
                );
                Plot::new("activity_bar")
                    .height(CHART_HEIGHT)
                    .allow_scroll(false)
                    .legend(Legend::default())
                    .x_axis_label("Country")
                    .y_axis_label("Amount")
                    .include_y(0.0)
                    .x_axis_formatter(move |mark, _range| {
                        Self::category_label(&countries, mark.value)
                    })
                    .show(ui, |plot_ui| {
                        for chart in charts {
                            plot_ui.bar_chart(chart);
                        }
                    });
            }
        }
    }

    /// Axis label for a bar index; blank between bars.
    fn category_label(labels: &[String], value: f64) -> String {
        let idx = value.round();
        if (value - idx).abs() > 1e-6 || idx < 0.0 {
            return String::new();
        }
        labels.get(idx as usize).cloned().unwrap_or_default()
    }

    /// Donut chart drawn with the painter; egui_plot has no pie primitive.
    pub fn draw_donut(ui: &mut egui::Ui, title: &str, slices: &[(String, usize, Color32)]) {
        ui.label(RichText::new(title).size(14.0).strong());

        let total: usize = slices.iter().map(|(_, count, _)| *count).sum();
        if total == 0 {
            ui.label("No data");
            return;
        }

        ui.horizontal(|ui| {
            let (response, painter) =
                ui.allocate_painter(egui::vec2(DONUT_SIZE, DONUT_SIZE), egui::Sense::hover());
            let center = response.rect.center();
            let outer = response.rect.width().min(response.rect.height()) / 2.0 - 8.0;
            let inner = outer * HOLE_RATIO;

            let mut start = -FRAC_PI_2;
            for (_, count, color) in slices {
                let fraction = *count as f32 / total as f32;
                let sweep = TAU * fraction;
                let steps = ((sweep / DONUT_STEP).ceil() as usize).max(1);

                for s in 0..steps {
                    let a0 = start + sweep * s as f32 / steps as f32;
                    let a1 = start + sweep * (s + 1) as f32 / steps as f32;
                    let quad = vec![
                        Self::polar(center, inner, a0),
                        Self::polar(center, outer, a0),
                        Self::polar(center, outer, a1),
                        Self::polar(center, inner, a1),
                    ];
                    painter.add(Shape::convex_polygon(quad, *color, Stroke::NONE));
                }

                if fraction >= 0.04 {
                    painter.text(
                        Self::polar(center, (inner + outer) / 2.0, start + sweep / 2.0),
                        Align2::CENTER_CENTER,
                        format!("{:.1}%", fraction * 100.0),
                        FontId::proportional(11.0),
                        Color32::WHITE,
                    );
                }
                start += sweep;
            }

            if response.hovered() {
                if let Some(pointer) = response.hover_pos() {
                    if let Some(idx) = Self::slice_at(center, inner, outer, pointer, slices, total) {
                        let (label, count, _) = &slices[idx];
                        response.on_hover_text(format!(
                            "{}: {} ({:.1}%)",
                            label,
                            count,
                            *count as f32 * 100.0 / total as f32
                        ));
                    }
                }
            }

            ui.vertical(|ui| {
                for (label, count, color) in slices {
                    ui.horizontal(|ui| {
                        let (rect, _) =
                            ui.allocate_exact_size(egui::vec2(14.0, 14.0), egui::Sense::hover());
                        ui.painter().rect_filled(rect, 3.0, *color);
                        ui.label(RichText::new(format!("{} ({})", label, count)).size(12.0));
                    });
                }
            });
        });
    }

    fn polar(center: Pos2, radius: f32, angle: f32) -> Pos2 {
        center + egui::vec2(angle.cos(), angle.sin()) * radius
    }

    /// Index of the slice under `pointer`, if it lies on the ring.
    fn slice_at(
        center: Pos2,
        inner: f32,
        outer: f32,
        pointer: Pos2,
        slices: &[(String, usize, Color32)],
        total: usize,
    ) -> Option<usize> {
        let offset = pointer - center;
        let distance = offset.length();
        if distance < inner || distance > outer {
            return None;
        }
        // Angle measured clockwise from twelve o'clock, matching the draw order
        let angle = (offset.y.atan2(offset.x) + FRAC_PI_2).rem_euclid(TAU);
        let mut start = 0.0;
        for (i, (_, count, _)) in slices.iter().enumerate() {
            let sweep = TAU * *count as f32 / total as f32;
            if angle >= start && angle < start + sweep {
                return Some(i);
            }
            start += sweep;
        }
        None
    }
}
