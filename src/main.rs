//! Volcano Explorer - Volcanoes of the World dashboard
//!
//! Loads the volcano CSV, normalizes it, and shows a table, a type
//! distribution, a map and an activity breakdown filtered by country.

mod charts;
mod config;
mod data;
mod gui;
mod logging;

use anyhow::anyhow;
use config::{AppConfig, CONFIG_FILE};
use eframe::egui;
use gui::VolcanoApp;
use logging::LogConfig;
use std::path::Path;
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    // Logging is not up yet, so a config error is reported after init
    let (config, config_error) = match AppConfig::load_from(Path::new(CONFIG_FILE)) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    logging::init_logging(&LogConfig::new(config.log.level.clone(), config.log.format));
    if let Some(e) = config_error {
        warn!(file = CONFIG_FILE, error = %e, "Using default configuration");
    }
    for correction in &config.corrections {
        warn!(file = CONFIG_FILE, "{}", correction);
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_path = %config.data_path.display(),
        backend = ?config.backend,
        "Starting Volcano Explorer"
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window.width, config.window.height])
            .with_min_inner_size([900.0, 600.0])
            .with_title("Volcanoes of the World"),
        ..Default::default()
    };

    eframe::run_native(
        "Volcano Explorer",
        options,
        Box::new(move |cc| Ok(Box::new(VolcanoApp::new(cc, config)))),
    )
    .map_err(|e| anyhow!("GUI terminated with an error: {e}"))
}
