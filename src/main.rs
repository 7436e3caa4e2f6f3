use data_measurements::app::DataMeasurementsApp;
use data_measurements::config::Settings;
use data_measurements::logging;
use eframe::egui;

fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    logging::init(&settings.log_dir)?;
    log::info!(
        "Catalog {}, cache {}",
        settings.catalog_path.display(),
        settings.cache_dir.display()
    );
    if settings.server_url.is_none() {
        log::warn!("SERVER_URL is not set; measurement requests are disabled");
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([700.0, 450.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Data Measurements Tool",
        options,
        Box::new(|_cc| Ok(Box::new(DataMeasurementsApp::new(settings)))),
    )
    .map_err(|e| anyhow::anyhow!("running the UI: {e}"))
}
