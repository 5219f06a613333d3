use eframe::egui;

use crate::editor::{Command, EditorState};
use crate::render::visible_painted_count;

/// Step navigation plus view/clear controls along the bottom edge.
#[derive(Default)]
pub struct StepBar {
    confirm_clear: bool,
}

impl StepBar {
    pub fn new() -> Self {
        Self::default()
    }

    /// `viewport` is the canvas size from the previous frame.
    pub fn show(&mut self, ui: &mut egui::Ui, state: &EditorState, viewport: Option<(f64, f64)>) -> Option<Command> {
        let mut command = None;
        let layers = &state.layers;
        let count = layers.step_count();
        let cursor = layers.cursor();

        ui.horizontal(|ui| {
            if ui.add_enabled(!layers.is_at_first(), egui::Button::new("◀")).clicked() {
                command = Some(Command::SetStep(cursor.saturating_sub(1)));
            }
            ui.label(format!("Step {} / {}", cursor + 1, count));
            if ui.add_enabled(!layers.is_at_last(), egui::Button::new("▶")).clicked() {
                command = Some(Command::SetStep(cursor + 1));
            }
            if count > 1 {
                let mut shown = cursor + 1;
                if ui
                    .add(egui::Slider::new(&mut shown, 1..=count).show_value(false))
                    .changed()
                {
                    command = Some(Command::SetStep(shown - 1));
                }
            }

            ui.separator();
            ui.label(format!("{:.0}%", state.view.zoom() * 100.0));
            if ui.button("Reset view").clicked() {
                command = Some(Command::ResetView);
            }

            ui.separator();
            if self.confirm_clear {
                ui.label("Clear everything?");
                if ui.button("Yes").clicked() {
                    command = Some(Command::Clear);
                    self.confirm_clear = false;
                }
                if ui.button("No").clicked() {
                    self.confirm_clear = false;
                }
            } else if ui.button("Clear").clicked() {
                self.confirm_clear = true;
            }

            ui.separator();
            let cells = state.visible_cells();
            let mut status = format!("{} beads", cells.len());
            if let Some(b) = cells.key_bounds() {
                let (cols, rows) = b.size();
                status.push_str(&format!(", {}×{} cells", cols, rows));
            }
            if let Some((w, h)) = viewport {
                status.push_str(&format!(", {} on screen", visible_painted_count(&state.view, cells, w, h)));
            }
            ui.label(egui::RichText::new(status).small().weak());
        });
        command
    }
}
