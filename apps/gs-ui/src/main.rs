#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod colormap;

use app::GridscopeApp;

fn main() -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Gridscope"),
        ..Default::default()
    };

    eframe::run_native(
        "Gridscope",
        options,
        Box::new(|cc| Ok(Box::new(GridscopeApp::new(cc)))),
    )
}
