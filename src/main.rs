// Hide console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

//! LexDoka - Main Entry Point
//!
//! A document template editor: authors place typed variables in a rich-text
//! document or on a free-form canvas, fillers complete their values.

mod app;
mod canvas;
mod config;
mod document;
mod error;
mod session;
mod storage;
mod sync;
mod theme;
mod ui;
mod variables;

use app::LexdokaApp;
use config::load_config;
use log::info;

/// Window title.
const WINDOW_TITLE: &str = "LexDoka";

fn main() -> eframe::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting {}", WINDOW_TITLE);

    let settings = load_config();
    let window_size = &settings.window_size;

    info!(
        "Window configuration: {}x{}, maximized: {}",
        window_size.width, window_size.height, window_size.maximized
    );

    let mut viewport = eframe::egui::ViewportBuilder::default()
        .with_title(WINDOW_TITLE)
        .with_inner_size([window_size.width, window_size.height])
        .with_min_inner_size([480.0, 360.0]);

    if let (Some(x), Some(y)) = (window_size.x, window_size.y) {
        viewport = viewport.with_position([x, y]);
    }
    if window_size.maximized {
        viewport = viewport.with_maximized(true);
    }

    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        WINDOW_TITLE,
        native_options,
        Box::new(|cc| Ok(Box::new(LexdokaApp::new(cc, settings)))),
    )
}
