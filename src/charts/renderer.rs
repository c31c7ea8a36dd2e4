//! Static Chart Renderer
//! Draws the chart views into RGB bitmaps with plotters.
//!
//! Bitmaps are either uploaded as egui textures (static backend) or written
//! to PNG files on export.

use crate::charts::views::{ActivityBreakdown, ChartStyle, GeoPoints, TypeDistribution};
use crate::data::mappings::MAX_ACTIVITY_LEVEL;
use plotters::coord::Shift;
use plotters::prelude::*;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Colors (RGB)
const PALETTE: [RGBColor; 10] = [
    RGBColor(231, 76, 60),
    RGBColor(46, 204, 113),
    RGBColor(155, 89, 182),
    RGBColor(243, 156, 18),
    RGBColor(26, 188, 156),
    RGBColor(233, 30, 99),
    RGBColor(0, 188, 212),
    RGBColor(255, 87, 34),
    RGBColor(121, 85, 72),
    RGBColor(96, 125, 139),
];
const LEVEL_COLORS: [RGBColor; MAX_ACTIVITY_LEVEL as usize + 1] = [
    RGBColor(149, 165, 166),
    RGBColor(52, 152, 219),
    RGBColor(26, 188, 156),
    RGBColor(46, 204, 113),
    RGBColor(241, 196, 15),
    RGBColor(243, 156, 18),
    RGBColor(230, 126, 34),
    RGBColor(231, 76, 60),
];
const VOLCANO: RGBColor = RGBColor(231, 76, 60);
const GRID: RGBColor = RGBColor(200, 200, 200);

const HOLE_RATIO: f64 = 0.3;
const FONT: &str = "sans-serif";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Drawing(String),
    #[error("Bitmap size {width}x{height} does not match buffer")]
    Buffer { width: u32, height: u32 },
    #[error("Failed to write {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

fn drawing<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> RenderError {
    RenderError::Drawing(e.to_string())
}

/// An RGB bitmap produced by the renderer.
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl RenderedChart {
    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        let img = image::RgbImage::from_raw(self.width, self.height, self.rgb.clone()).ok_or(
            RenderError::Buffer {
                width: self.width,
                height: self.height,
            },
        )?;
        img.save(path).map_err(|source| RenderError::Image {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// One chart to render, owning its data so jobs can run on any thread.
#[derive(Debug, Clone)]
pub enum ChartJob {
    Types(TypeDistribution, ChartStyle),
    Map(GeoPoints),
    Activity(ActivityBreakdown, ChartStyle),
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    pub fn render(job: &ChartJob, width: u32, height: u32) -> Result<RenderedChart, RenderError> {
        let mut rgb = vec![0u8; (width as usize) * (height as usize) * 3];
        {
            let root = BitMapBackend::with_buffer(&mut rgb, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(drawing)?;

            match job {
                ChartJob::Types(types, ChartStyle::Pie) => Self::draw_types_pie(&root, types)?,
                ChartJob::Types(types, ChartStyle::Bar) => Self::draw_types_bar(&root, types)?,
                ChartJob::Map(geo) => Self::draw_map(&root, geo)?,
                ChartJob::Activity(activity, ChartStyle::Pie) => {
                    Self::draw_activity_pie(&root, activity)?
                }
                ChartJob::Activity(activity, ChartStyle::Bar) => {
                    Self::draw_activity_bar(&root, activity)?
                }
            }

            root.present().map_err(drawing)?;
        }

        Ok(RenderedChart { width, height, rgb })
    }

    /// Render every job to `<dir>/<stem>.png` in parallel.
    pub fn export_pngs(
        jobs: &[(String, ChartJob)],
        dir: &Path,
        width: u32,
        height: u32,
    ) -> Vec<Result<PathBuf, RenderError>> {
        jobs.par_iter()
            .map(|(stem, job)| -> Result<PathBuf, RenderError> {
                let path = dir.join(format!("{}.png", stem));
                Self::render(job, width, height)?.save_png(&path)?;
                Ok(path)
            })
            .collect()
    }

    fn draw_empty(root: &DrawingArea<BitMapBackend, Shift>, title: &str) -> Result<(), RenderError> {
        let (w, h) = root.dim_in_pixel();
        root.draw(&Text::new(
            title.to_string(),
            (20, 20),
            (FONT, 22).into_font().color(&BLACK),
        ))
        .map_err(drawing)?;
        root.draw(&Text::new(
            "No volcanoes match the current selection",
            (w as i32 / 2 - 180, h as i32 / 2),
            (FONT, 18).into_font().color(&BLACK),
        ))
        .map_err(drawing)?;
        Ok(())
    }

    fn draw_donut(
        root: &DrawingArea<BitMapBackend, Shift>,
        title: &str,
        sizes: &[f64],
        colors: &[RGBColor],
        labels: &[String],
    ) -> Result<(), RenderError> {
        let (w, h) = root.dim_in_pixel();
        root.draw(&Text::new(
            title.to_string(),
            (20, 20),
            (FONT, 22).into_font().color(&BLACK),
        ))
        .map_err(drawing)?;

        let center = (w as i32 / 2, h as i32 / 2 + 15);
        let radius = (w.min(h) as f64 / 2.0 - 70.0).max(20.0);
        let mut pie = Pie::new(&center, &radius, sizes, colors, labels);
        pie.start_angle(-90.0);
        pie.donut_hole(radius * HOLE_RATIO);
        pie.label_style((FONT, 14).into_font().color(&BLACK));
        pie.percentages((FONT, 13).into_font().color(&WHITE));
        root.draw(&pie).map_err(drawing)?;
        Ok(())
    }

    fn draw_types_pie(
        root: &DrawingArea<BitMapBackend, Shift>,
        types: &TypeDistribution,
    ) -> Result<(), RenderError> {
        let title = "Volcano Types Distribution";
        if types.is_empty() {
            return Self::draw_empty(root, title);
        }
        let sizes: Vec<f64> = types.entries.iter().map(|e| e.count as f64).collect();
        let colors: Vec<RGBColor> = (0..sizes.len())
            .map(|i| PALETTE[i % PALETTE.len()])
            .collect();
        let labels: Vec<String> = types.entries.iter().map(|e| e.label.clone()).collect();
        Self::draw_donut(root, title, &sizes, &colors, &labels)
    }

    fn draw_types_bar(
        root: &DrawingArea<BitMapBackend, Shift>,
        types: &TypeDistribution,
    ) -> Result<(), RenderError> {
        let title = "Amount of Volcanoes per Type";
        if types.is_empty() {
            return Self::draw_empty(root, title);
        }

        let labels: Vec<String> = types.entries.iter().map(|e| e.label.clone()).collect();
        let max = types.entries.iter().map(|e| e.count).max().unwrap_or(1) as u32;
        let n = labels.len() as u32;

        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 22))
            .margin(15)
            .x_label_area_size(90)
            .y_label_area_size(50)
            .build_cartesian_2d((0u32..n).into_segmented(), 0u32..(max + max / 10 + 1))
            .map_err(drawing)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(WHITE)
            .bold_line_style(GRID)
            .x_desc("Type")
            .y_desc("Amount")
            .x_labels(labels.len())
            .x_label_style((FONT, 12).into_font().transform(FontTransform::Rotate90))
            .x_label_formatter(&|v| Self::segment_label(&labels, v))
            .draw()
            .map_err(drawing)?;

        chart
            .draw_series(types.entries.iter().enumerate().map(|(i, e)| {
                let i = i as u32;
                let mut bar = Rectangle::new(
                    [
                        (SegmentValue::Exact(i), 0u32),
                        (SegmentValue::Exact(i + 1), e.count as u32),
                    ],
                    PALETTE[i as usize % PALETTE.len()].filled(),
                );
                bar.set_margin(0, 0, 6, 6);
                bar
            }))
            .map_err(drawing)?;

        Ok(())
    }

    fn draw_map(
        root: &DrawingArea<BitMapBackend, Shift>,
        geo: &GeoPoints,
    ) -> Result<(), RenderError> {
        let mut chart = ChartBuilder::on(root)
            .caption("Map of the World's volcanoes", (FONT, 22))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(-180f64..180f64, -90f64..90f64)
            .map_err(drawing)?;

        chart
            .configure_mesh()
            .light_line_style(WHITE)
            .bold_line_style(GRID)
            .x_desc("Longitude")
            .y_desc("Latitude")
            .draw()
            .map_err(drawing)?;

        chart
            .draw_series(
                geo.points
                    .iter()
                    .map(|p| Circle::new((p.longitude, p.latitude), 3, VOLCANO.mix(0.8).filled())),
            )
            .map_err(drawing)?;

        Ok(())
    }

    fn draw_activity_pie(
        root: &DrawingArea<BitMapBackend, Shift>,
        activity: &ActivityBreakdown,
    ) -> Result<(), RenderError> {
        let title = activity.title();
        if activity.is_empty() {
            return Self::draw_empty(root, &title);
        }
        let totals = activity.level_totals();
        let sizes: Vec<f64> = totals.iter().map(|(_, count)| *count as f64).collect();
        let colors: Vec<RGBColor> = totals
            .iter()
            .map(|(level, _)| Self::level_color(*level))
            .collect();
        let labels: Vec<String> = totals
            .iter()
            .map(|(level, _)| format!("Level {}", level))
            .collect();
        Self::draw_donut(root, &title, &sizes, &colors, &labels)
    }

    fn draw_activity_bar(
        root: &DrawingArea<BitMapBackend, Shift>,
        activity: &ActivityBreakdown,
    ) -> Result<(), RenderError> {
        let title = activity.title();
        if activity.is_empty() {
            return Self::draw_empty(root, &title);
        }

        let countries = activity.countries();
        let levels = activity.levels();
        let stack_heights: Vec<u32> = countries
            .iter()
            .map(|country| {
                levels
                    .iter()
                    .map(|level| activity.count_for(country, *level) as u32)
                    .sum()
            })
            .collect();
        let max = stack_heights.iter().copied().max().unwrap_or(1);
        let n = countries.len() as u32;

        let chart_width = (root.dim_in_pixel().0 as i32 - 130).max(1);
        let (chart_area, legend_area) = root.split_horizontally(chart_width);

        let mut chart = ChartBuilder::on(&chart_area)
            .caption(&title, (FONT, 22))
            .margin(15)
            .x_label_area_size(120)
            .y_label_area_size(50)
            .build_cartesian_2d((0u32..n).into_segmented(), 0u32..(max + max / 10 + 1))
            .map_err(drawing)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(WHITE)
            .bold_line_style(GRID)
            .x_desc("Country")
            .y_desc("Amount")
            .x_labels(countries.len())
            .x_label_style((FONT, 11).into_font().transform(FontTransform::Rotate90))
            .x_label_formatter(&|v| Self::segment_label(&countries, v))
            .draw()
            .map_err(drawing)?;

        for (i, country) in countries.iter().enumerate() {
            let i = i as u32;
            let mut bottom = 0u32;
            let mut segments = Vec::new();
            for level in &levels {
                let count = activity.count_for(country, *level) as u32;
                if count == 0 {
                    continue;
                }
                let mut bar = Rectangle::new(
                    [
                        (SegmentValue::Exact(i), bottom),
                        (SegmentValue::Exact(i + 1), bottom + count),
                    ],
                    Self::level_color(*level).filled(),
                );
                bar.set_margin(0, 0, 3, 3);
                segments.push(bar);
                bottom += count;
            }
            chart.draw_series(segments).map_err(drawing)?;
        }

        for (row, level) in levels.iter().enumerate() {
            let y = 60 + row as i32 * 22;
            legend_area
                .draw(&Rectangle::new(
                    [(10, y), (24, y + 14)],
                    Self::level_color(*level).filled(),
                ))
                .map_err(drawing)?;
            legend_area
                .draw(&Text::new(
                    format!("Level {}", level),
                    (30, y),
                    (FONT, 13).into_font().color(&BLACK),
                ))
                .map_err(drawing)?;
        }

        Ok(())
    }

    fn level_color(level: i32) -> RGBColor {
        LEVEL_COLORS[level.clamp(0, LEVEL_COLORS.len() as i32 - 1) as usize]
    }

    fn segment_label(labels: &[String], value: &SegmentValue<u32>) -> String {
        match value {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                labels.get(*i as usize).cloned().unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_labels() {
        let labels = vec!["Japan".to_string(), "Chile".to_string()];
        assert_eq!(
            StaticChartRenderer::segment_label(&labels, &SegmentValue::CenterOf(1)),
            "Chile"
        );
        assert_eq!(
            StaticChartRenderer::segment_label(&labels, &SegmentValue::Exact(0)),
            "Japan"
        );
        assert_eq!(
            StaticChartRenderer::segment_label(&labels, &SegmentValue::Last),
            ""
        );
        assert_eq!(
            StaticChartRenderer::segment_label(&labels, &SegmentValue::CenterOf(5)),
            ""
        );
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let chart = RenderedChart {
            width: 10,
            height: 10,
            rgb: vec![0; 12],
        };
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            chart.save_png(&dir.path().join("x.png")),
            Err(RenderError::Buffer { .. })
        ));
    }

    #[test]
    fn saves_png_of_matching_size() {
        let chart = RenderedChart {
            width: 4,
            height: 3,
            rgb: vec![255; 4 * 3 * 3],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.png");
        chart.save_png(&path).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (4, 3));
    }

    use crate::charts::views::{ActivityCount, CategoryCount, GeoPoint};
    use crate::data::CountrySelection;

    /// Titles and axis labels are drawn with the system sans-serif font.
    fn system_font_available() -> bool {
        (FONT, 12).into_font().box_size("Ag").is_ok()
    }

    fn types() -> TypeDistribution {
        TypeDistribution {
            entries: vec![
                CategoryCount {
                    label: "Stratovolcano".into(),
                    count: 2,
                },
                CategoryCount {
                    label: "Shield".into(),
                    count: 1,
                },
            ],
        }
    }

    fn activity() -> ActivityBreakdown {
        ActivityBreakdown {
            counts: vec![
                ActivityCount {
                    country: "Japan".into(),
                    level: 3,
                    count: 1,
                },
                ActivityCount {
                    country: "United States of America".into(),
                    level: 1,
                    count: 2,
                },
                ActivityCount {
                    country: "United States of America".into(),
                    level: 3,
                    count: 1,
                },
            ],
            selection: CountrySelection::All,
        }
    }

    fn geo() -> GeoPoints {
        GeoPoints {
            points: vec![GeoPoint {
                name: "Fuji".into(),
                latitude: 35.35,
                longitude: 138.73,
            }],
        }
    }

    fn every_job() -> Vec<(String, ChartJob)> {
        vec![
            ("types_pie".into(), ChartJob::Types(types(), ChartStyle::Pie)),
            ("types_bar".into(), ChartJob::Types(types(), ChartStyle::Bar)),
            ("map".into(), ChartJob::Map(geo())),
            ("activity_pie".into(), ChartJob::Activity(activity(), ChartStyle::Pie)),
            ("activity_bar".into(), ChartJob::Activity(activity(), ChartStyle::Bar)),
            ("empty_types".into(), ChartJob::Types(TypeDistribution::default(), ChartStyle::Bar)),
            ("empty_map".into(), ChartJob::Map(GeoPoints::default())),
            (
                "empty_activity".into(),
                ChartJob::Activity(ActivityBreakdown::default(), ChartStyle::Pie),
            ),
        ]
    }

    #[test]
    fn every_job_renders_full_bitmap() {
        let fonts = system_font_available();
        for (name, job) in every_job() {
            match StaticChartRenderer::render(&job, 480, 320) {
                Ok(chart) => {
                    assert_eq!((chart.width, chart.height), (480, 320), "{}", name);
                    assert_eq!(chart.rgb.len(), 480 * 320 * 3, "{}", name);
                    // Something other than the white background was drawn
                    assert!(chart.rgb.iter().any(|&b| b != 255), "{}", name);
                }
                Err(e) => {
                    assert!(!fonts, "{} failed with a font available: {}", name, e);
                    assert!(matches!(e, RenderError::Drawing(_)), "{}", name);
                }
            }
        }
    }

    #[test]
    fn export_writes_one_png_per_job() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = every_job();
        let results = StaticChartRenderer::export_pngs(&jobs, dir.path(), 400, 300);
        assert_eq!(results.len(), jobs.len());

        if !system_font_available() {
            assert!(results.iter().all(|r| matches!(r, Err(RenderError::Drawing(_)))));
            return;
        }

        for ((stem, _), result) in jobs.iter().zip(&results) {
            let path = result.as_ref().unwrap();
            assert_eq!(path, &dir.path().join(format!("{}.png", stem)));
            let img = image::open(path).unwrap();
            assert_eq!((img.width(), img.height()), (400, 300));
        }
    }
}
