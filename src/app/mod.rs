use eframe::egui;
use flowsketch::persist::FileStorage;
use flowsketch::session::DiagramSession;
use flowsketch::settings::Settings;
use std::path::PathBuf;

mod actions;
mod help;
mod render;
mod update;

pub struct FlowsketchApp {
    session: DiagramSession,
    settings: Settings,
    settings_path: PathBuf,
    show_grid: bool,
    show_help: bool,
    confirm_clear: bool,
    /// A primary press started on the canvas and has not been released yet.
    pointer_captured: bool,
    status: Option<String>,
}

impl FlowsketchApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: Settings,
        settings_path: Option<PathBuf>,
    ) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::light());

        let storage_dir = settings.storage_dir();
        tracing::info!(dir = %storage_dir.display(), "opening diagram storage");
        let mut session = DiagramSession::open(Box::new(FileStorage::new(storage_dir)));
        session.set_snap(settings.snap_to_grid);
        session.set_connector_kind(settings.connector_kind);

        Self {
            session,
            show_grid: settings.show_grid,
            settings,
            settings_path: settings_path.unwrap_or_else(|| PathBuf::from("settings.toml")),
            show_help: false,
            confirm_clear: false,
            pointer_captured: false,
            status: None,
        }
    }
}
