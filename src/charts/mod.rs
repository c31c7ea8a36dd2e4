//! Charts module - View data and chart rendering

mod plotter;
mod renderer;
pub mod views;

pub use plotter::ChartPlotter;
pub use renderer::{ChartJob, StaticChartRenderer};
pub use views::{ChartBackend, ChartStyle, ViewKind, ViewSet};
