use flowsketch::export;
use flowsketch::interaction::KeyCommand;
use flowsketch::settings;

use super::FlowsketchApp;

impl FlowsketchApp {
    pub(super) fn run_command(&mut self, command: KeyCommand) {
        if !self.session.handle_key(command) {
            return;
        }
        self.status = match command {
            KeyCommand::Undo => Some("Undone".to_string()),
            KeyCommand::Redo => Some("Redone".to_string()),
            KeyCommand::Duplicate => Some("Duplicated shape".to_string()),
            KeyCommand::Delete => None,
        };
    }

    pub(super) fn save(&mut self) {
        match self.session.save() {
            Ok(_) => self.status = Some(format!("Saved \"{}\"", self.session.name())),
            Err(e) => {
                tracing::error!(error = %e, "save failed");
                self.status = Some(format!("Save failed: {e}"));
            }
        }
    }

    pub(super) fn clear(&mut self) {
        self.session.clear();
        self.pointer_captured = false;
        self.status = Some("Diagram cleared".to_string());
    }

    pub(super) fn export_pdf_dialog(&mut self) {
        let surface = self.session.export_surface();
        let mut dialog = rfd::FileDialog::new()
            .set_file_name(surface.file_name())
            .add_filter("PDF", &["pdf"]);
        if let Some(dir) = self.settings.export_dir.as_deref() {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else {
            return;
        };
        let result = export::export_pdf(&surface, self.settings.export_scale())
            .and_then(|doc| doc.write_to(&path));
        self.status = match result {
            Ok(()) => Some(format!("Exported {}", path.display())),
            Err(e) => {
                tracing::error!(error = %e, "export failed");
                Some(format!("Export failed: {e}"))
            }
        };
    }

    /// Writes view preferences back so the next launch starts the same way.
    pub(super) fn persist_settings(&mut self) {
        self.settings.snap_to_grid = self.session.snap_enabled();
        self.settings.show_grid = self.show_grid;
        self.settings.connector_kind = self.session.connector_kind();
        if let Err(e) = settings::save_settings(&self.settings_path, &self.settings) {
            tracing::warn!(error = %e, "settings not saved");
            self.status = Some(format!("Settings save failed: {e}"));
        }
    }
}
