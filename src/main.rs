mod app;
mod color;
mod config;
mod data;
mod debounce;
mod imaging;
mod state;
mod ui;
mod worker;

use app::ElementalScopeApp;
use config::AppConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = AppConfig::load();
    log::info!("Settings from {}: {config:?}", AppConfig::path().display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "ElementalScope – EDX Tile Stitcher",
        options,
        Box::new(|cc| Ok(Box::new(ElementalScopeApp::new(cc, config)))),
    )
}
