use glass_overlay::logging;
use glass_overlay::settings::OverlaySettings;
use glass_overlay::shell::OverlayApp;

use anyhow::Context;
use eframe::egui;

fn main() -> anyhow::Result<()> {
    let loaded = OverlaySettings::load("settings.json").context("loading settings.json")?;
    let settings = loaded.settings;
    logging::init(settings.debug_logging, settings.log_file.clone());
    if loaded.repaired {
        tracing::warn!("settings.json contained out-of-range values; repaired");
    }

    let config = settings.window_config();
    tracing::info!(?config, "starting overlay");
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.size.width as f32, config.size.height as f32])
            .with_min_inner_size([
                settings.min_window_size as f32,
                settings.min_window_size as f32,
            ])
            .with_decorations(!config.frameless)
            .with_transparent(config.transparent)
            .with_resizable(config.resizable)
            .with_always_on_top(),
        ..Default::default()
    };

    eframe::run_native(
        "Glass Overlay",
        native_options,
        Box::new(move |_cc| Box::new(OverlayApp::new(settings))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
