mod app;

use flowsketch::settings;
use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    let settings_path = settings::config_path();
    let loaded = settings_path.as_deref().map(settings::load_settings);
    let settings = match &loaded {
        Some(Ok(s)) => s.clone(),
        _ => settings::Settings::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match (&settings_path, loaded) {
        (Some(path), Some(Ok(_))) => tracing::info!(path = %path.display(), "settings loaded"),
        (Some(_), Some(Err(e))) => tracing::warn!(error = %e, "using default settings"),
        _ => tracing::debug!("no settings file, using defaults"),
    }

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Flowsketch",
        native_options,
        Box::new(move |cc| Ok(Box::new(app::FlowsketchApp::new(cc, settings, settings_path)))),
    )
}
