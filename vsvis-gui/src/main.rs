//! vsvis GUI application entry point.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod message;
mod pipeline;
mod state;
mod ui;
mod util;
mod viewer;

use std::path::PathBuf;

use app::ViewerApp;
use eframe::egui;
use log::{info, warn};
use vsvis_core::ViewerConfig;

/// Reads `--config <file>` from the command line, falling back to defaults
/// when the flag is absent or the file is unusable.
fn load_config() -> ViewerConfig {
    let mut args = std::env::args().skip(1);
    let mut path = None;
    while let Some(arg) = args.next() {
        if arg == "--config" {
            path = args.next().map(PathBuf::from);
        }
    }
    let Some(path) = path else {
        return ViewerConfig::default();
    };

    let parsed = std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|text| {
            serde_json::from_str::<ViewerConfig>(&text).map_err(|e| e.to_string())
        })
        .and_then(|config| config.validate().map(|()| config).map_err(|e| e.to_string()));
    match parsed {
        Ok(config) => {
            info!("loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            warn!("ignoring configuration {}: {e}", path.display());
            ViewerConfig::default()
        }
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let config = load_config();
    let opts = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 820.0]),
        ..Default::default()
    };
    eframe::run_native(
        "vsvis",
        opts,
        Box::new(|cc| {
            ui::theme::configure_style(&cc.egui_ctx);
            Ok(Box::new(ViewerApp::new(config)))
        }),
    )
}
