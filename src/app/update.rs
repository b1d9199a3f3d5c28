use eframe::egui;
use flowsketch::interaction::KeyCommand;
use flowsketch::model::{self, ConnectorKind, ShapeKind};
use flowsketch::store::{Selection, ShapeUpdate};

use super::FlowsketchApp;
use super::help::draw_help_window;
use super::render::{Projection, color_button, draw_background, draw_diagram, draw_hint};

impl eframe::App for FlowsketchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let wants_keyboard = ctx.wants_keyboard_input();
        let mut command = None;
        let mut save_requested = false;
        ctx.input_mut(|i| {
            if i.consume_key(egui::Modifiers::NONE, egui::Key::F1) {
                self.show_help = true;
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::S) {
                save_requested = true;
            }
            if wants_keyboard {
                return;
            }
            if i.consume_key(
                egui::Modifiers::COMMAND | egui::Modifiers::SHIFT,
                egui::Key::Z,
            ) || i.consume_key(egui::Modifiers::COMMAND, egui::Key::Y)
            {
                command = Some(KeyCommand::Redo);
            } else if i.consume_key(egui::Modifiers::COMMAND, egui::Key::Z) {
                command = Some(KeyCommand::Undo);
            } else if i.consume_key(egui::Modifiers::COMMAND, egui::Key::D) {
                command = Some(KeyCommand::Duplicate);
            } else if i.consume_key(egui::Modifiers::NONE, egui::Key::Delete)
                || i.consume_key(egui::Modifiers::NONE, egui::Key::Backspace)
            {
                command = Some(KeyCommand::Delete);
            }
        });
        if let Some(command) = command {
            self.run_command(command);
        }
        if save_requested {
            self.save();
        }

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                let mut name = self.session.name().to_string();
                if ui
                    .add(egui::TextEdit::singleline(&mut name).desired_width(180.0))
                    .changed()
                {
                    self.session.set_name(name);
                }
                ui.separator();

                for kind in ShapeKind::ALL {
                    if ui.button(kind.label()).clicked() {
                        self.session.add_shape(kind);
                        self.status = None;
                    }
                }
                ui.separator();

                let connecting = self.session.controller().is_connecting();
                if ui.selectable_label(connecting, "Connect").clicked() {
                    self.session.toggle_connect();
                }
                let mut kind = self.session.connector_kind();
                egui::ComboBox::from_id_salt("connector_kind")
                    .selected_text(kind.label())
                    .show_ui(ui, |ui| {
                        for k in ConnectorKind::ALL {
                            ui.selectable_value(&mut kind, k, k.label());
                        }
                    });
                if kind != self.session.connector_kind() {
                    self.session.set_connector_kind(kind);
                    self.persist_settings();
                }
                ui.separator();

                if ui
                    .add_enabled(self.session.can_undo(), egui::Button::new("↶ Undo"))
                    .clicked()
                {
                    self.run_command(KeyCommand::Undo);
                }
                if ui
                    .add_enabled(self.session.can_redo(), egui::Button::new("↷ Redo"))
                    .clicked()
                {
                    self.run_command(KeyCommand::Redo);
                }
                ui.separator();

                let zoom = self.session.zoom();
                if ui
                    .add_enabled(zoom.can_zoom_out(), egui::Button::new("−"))
                    .clicked()
                {
                    self.session.zoom_out();
                }
                ui.label(format!("{}%", zoom.percent()));
                if ui
                    .add_enabled(zoom.can_zoom_in(), egui::Button::new("+"))
                    .clicked()
                {
                    self.session.zoom_in();
                }
                ui.separator();

                let mut show_grid = self.show_grid;
                let mut snap = self.session.snap_enabled();
                let grid_toggled = ui.checkbox(&mut show_grid, "Grid").changed();
                let snap_toggled = ui.checkbox(&mut snap, "Snap").changed();
                if grid_toggled || snap_toggled {
                    self.show_grid = show_grid;
                    self.session.set_snap(snap);
                    self.persist_settings();
                }
                ui.label("Background:");
                let mut background = self.session.background();
                if color_button(ui, &mut background) {
                    self.session.set_background(background);
                }
                ui.separator();

                if ui.button("Save").clicked() {
                    self.save();
                }
                if ui.button("Export PDF").clicked() {
                    self.export_pdf_dialog();
                }
                if ui.button("Clear").clicked() {
                    self.confirm_clear = true;
                }
                if ui.button("?").clicked() {
                    self.show_help = true;
                }
            });
        });

        egui::SidePanel::right("properties")
            .resizable(true)
            .min_width(220.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.heading("Properties");
                    ui.separator();
                    self.properties(ui);
                });
            });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let hint = self.session.controller().connect_hint();
                match (&self.status, hint) {
                    (_, Some(hint)) => ui.label(hint),
                    (Some(status), None) => ui.label(status),
                    (None, None) => ui.label("Ready"),
                };
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("Zoom: {}%", self.session.zoom().percent()));
                    ui.separator();
                    ui.label(format!("Connectors: {}", self.session.connectors().len()));
                    ui.separator();
                    ui.label(format!("Shapes: {}", self.session.shapes().len()));
                });
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let (rect, response) =
                    ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
                let proj = Projection {
                    origin: rect.min,
                    zoom: self.session.zoom(),
                };

                let (pressed, released, moved, pos) = ctx.input(|i| {
                    (
                        i.pointer.primary_pressed(),
                        i.pointer.primary_released(),
                        i.pointer.delta() != egui::Vec2::ZERO,
                        i.pointer.interact_pos(),
                    )
                });
                if let Some(pos) = pos {
                    if pressed && response.hovered() {
                        self.session.pointer_down(proj.to_viewport(pos));
                        self.pointer_captured = true;
                        self.status = None;
                    } else if self.pointer_captured && moved {
                        self.session.pointer_move(proj.to_viewport(pos));
                    }
                }
                if released && self.pointer_captured {
                    self.session.pointer_up();
                    self.pointer_captured = false;
                }

                let painter = ui.painter_at(rect);
                draw_background(
                    &painter,
                    rect,
                    self.session.background(),
                    proj.zoom,
                    self.show_grid,
                );
                draw_diagram(&painter, proj, &self.session);
                if let Some(hint) = self.session.controller().connect_hint() {
                    draw_hint(&painter, rect, hint);
                }
            });

        if self.confirm_clear {
            let mut open = true;
            let mut confirmed = false;
            egui::Window::new("Clear diagram?")
                .collapsible(false)
                .resizable(false)
                .open(&mut open)
                .show(ctx, |ui| {
                    ui.label("All shapes, connectors and undo history will be removed.");
                    ui.horizontal(|ui| {
                        if ui.button("Clear").clicked() {
                            confirmed = true;
                        }
                        if ui.button("Cancel").clicked() {
                            self.confirm_clear = false;
                        }
                    });
                });
            if confirmed {
                self.clear();
                self.confirm_clear = false;
            }
            if !open {
                self.confirm_clear = false;
            }
        }

        draw_help_window(ctx, &mut self.show_help);
    }
}

impl FlowsketchApp {
    fn properties(&mut self, ui: &mut egui::Ui) {
        match self.session.selection().clone() {
            Selection::Nothing => {
                ui.label("Select a shape or connector to edit it.");
            }
            Selection::Connector(id) => {
                if let Some(connector) = self.session.store().connector(&id) {
                    ui.label(format!("Connector: {}", connector.kind.label()));
                }
                if ui.button("Delete connector").clicked() {
                    self.session.delete_connector(&id);
                }
            }
            Selection::Shape(id) => {
                let Some(shape) = self.session.store().shape(&id).cloned() else {
                    return;
                };
                ui.horizontal(|ui| {
                    if ui.button("Duplicate").clicked() {
                        self.session.duplicate_shape(&id);
                    }
                    if ui.button("Delete").clicked() {
                        self.session.delete_shape(&id);
                    }
                });
                if self.session.store().shape(&id).is_none() {
                    return;
                }
                let mut update = ShapeUpdate::default();

                ui.separator();
                ui.horizontal(|ui| {
                    ui.label("Fill:");
                    let mut color = shape.color;
                    if color_button(ui, &mut color) {
                        update.color = Some(color);
                    }
                });

                ui.separator();
                ui.label("Size");
                let (mut width, mut height) = (shape.width, shape.height);
                ui.horizontal(|ui| {
                    ui.label("W:");
                    let w = ui.add(
                        egui::DragValue::new(&mut width)
                            .range(model::MIN_SHAPE_SIZE..=model::MAX_SHAPE_SIZE)
                            .speed(1.0),
                    );
                    ui.label("H:");
                    let h = ui.add(
                        egui::DragValue::new(&mut height)
                            .range(model::MIN_SHAPE_SIZE..=model::MAX_SHAPE_SIZE)
                            .speed(1.0),
                    );
                    if w.changed() || h.changed() {
                        update.width = Some(width);
                        update.height = Some(height);
                    }
                });
                ui.label("Position");
                let (mut x, mut y) = (shape.x, shape.y);
                ui.horizontal(|ui| {
                    ui.label("X:");
                    let xr = ui.add(egui::DragValue::new(&mut x).range(0.0..=model::MAX_COORD));
                    ui.label("Y:");
                    let yr = ui.add(egui::DragValue::new(&mut y).range(0.0..=model::MAX_COORD));
                    if xr.changed() || yr.changed() {
                        update.x = Some(x);
                        update.y = Some(y);
                    }
                });

                ui.separator();
                ui.label("Text");
                let mut text = shape.text.clone();
                if ui
                    .add(egui::TextEdit::multiline(&mut text).desired_rows(3))
                    .changed()
                {
                    update.text = Some(text);
                }
                ui.horizontal(|ui| {
                    ui.label("Font:");
                    let mut family = shape.text_style.font_family.clone();
                    egui::ComboBox::from_id_salt("font_family")
                        .selected_text(family.as_str())
                        .show_ui(ui, |ui| {
                            for f in model::FONT_FAMILIES {
                                ui.selectable_value(&mut family, f.to_string(), f);
                            }
                        });
                    if family != shape.text_style.font_family {
                        update.font_family = Some(family);
                    }
                });
                ui.horizontal(|ui| {
                    ui.label("Size:");
                    let mut size = shape.text_style.font_size;
                    if ui
                        .add(
                            egui::DragValue::new(&mut size)
                                .range(model::MIN_FONT_SIZE..=model::MAX_FONT_SIZE),
                        )
                        .changed()
                    {
                        update.font_size = Some(size);
                    }
                    ui.label("Color:");
                    let mut color = shape.text_style.color;
                    if color_button(ui, &mut color) {
                        update.text_color = Some(color);
                    }
                });

                if !update.is_empty() {
                    self.session.update_shape(&id, update);
                }
            }
        }
    }
}
