use eframe::egui;

pub(super) fn draw_help_window(ctx: &egui::Context, open: &mut bool) {
    egui::Window::new("Help")
        .open(open)
        .resizable(true)
        .default_width(460.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Keyboard Shortcuts");
                ui.separator();
                help_row(ui, "⌘Z", "Undo");
                help_row(ui, "⌘⇧Z / ⌘Y", "Redo");
                help_row(ui, "⌘D", "Duplicate selected shape");
                help_row(ui, "Delete / Backspace", "Delete selected shape or connector");
                help_row(ui, "⌘S", "Save diagram");
                help_row(ui, "F1", "Show this window");

                ui.add_space(10.0);
                ui.heading("Canvas");
                ui.separator();
                help_row(ui, "Drag shape", "Move it (snaps to the 20 px grid when Snap is on)");
                help_row(ui, "Drag corner", "Resize the selected shape");
                help_row(ui, "Click line", "Select a connector");
                help_row(ui, "Connect", "Click a source shape, then a destination shape");

                ui.add_space(10.0);
                ui.heading("Files");
                ui.separator();
                ui.label("• Save stores the diagram and restores it on the next launch");
                ui.label("• Export PDF renders the canvas at 2× into a single page");
                ui.label("• Clear removes every shape, connector and the saved copy");
                ui.label("• Settings are read from ~/.config/flowsketch.toml or settings.toml");
            });
        });
}

fn help_row(ui: &mut egui::Ui, shortcut: &str, description: &str) {
    ui.horizontal(|ui| {
        ui.add_sized(
            [130.0, 16.0],
            egui::Label::new(egui::RichText::new(shortcut).monospace().strong()),
        );
        ui.label(description);
    });
}
