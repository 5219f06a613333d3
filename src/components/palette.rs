use std::collections::BTreeMap;

use eframe::egui;
use egui::{Color32, RichText, Stroke, Vec2};

use crate::canvas::to_color32;
use crate::color::CellColor;
use crate::editor::{Command, EditorState};
use crate::settings::AppSettings;
use crate::steps::MAX_COPIES;

const SWATCH_SIZE: f32 = 22.0;

/// What the palette asked for this frame.
#[derive(Default)]
pub struct PaletteOutput {
    pub commands: Vec<Command>,
    pub settings_changed: bool,
}

// ============================================================================
// PalettePanel – brush/background pickers, replication, project colors
// ============================================================================

#[derive(Default)]
pub struct PalettePanel {
    /// Hex text being typed per stored color; dropped when the field loses
    /// focus so it resyncs with the color map.
    hex_drafts: BTreeMap<CellColor, String>,
}

impl PalettePanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, ui: &mut egui::Ui, state: &EditorState, settings: &mut AppSettings) -> PaletteOutput {
        let mut out = PaletteOutput::default();

        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                ui.label(RichText::new("Brush").small().weak());
                let mut rgb = state.brush.rgb();
                if ui.color_edit_button_srgb(&mut rgb).changed() {
                    out.commands.push(Command::SetBrush(CellColor::from_rgb(rgb[0], rgb[1], rgb[2])));
                }
            });
            ui.vertical(|ui| {
                ui.label(RichText::new("Background").small().weak());
                let mut rgb = state.background.rgb();
                if ui.color_edit_button_srgb(&mut rgb).changed() {
                    out.commands.push(Command::SetBackground(CellColor::from_rgb(rgb[0], rgb[1], rgb[2])));
                }
            });
        });

        ui.add_space(6.0);
        ui.label(RichText::new(format!("Copies: {}", settings.copies)).small().weak());
        out.settings_changed |= ui
            .add(egui::Slider::new(&mut settings.copies, 0..=MAX_COPIES).show_value(false))
            .changed();
        ui.horizontal(|ui| {
            ui.label(RichText::new("Shift").small().weak());
            out.settings_changed |= ui
                .add(egui::DragValue::new(&mut settings.shift).clamp_range(-64..=64))
                .changed();
        });
        out.settings_changed |= ui.checkbox(&mut settings.show_empty_slots, "Show empty slots").changed();

        let colors = state.unique_colors();
        if !colors.is_empty() {
            ui.separator();
            ui.label(RichText::new("Colors in project").small().strong());
            egui::ScrollArea::vertical()
                .id_source("palette_colors")
                .max_height(320.0)
                .show(ui, |ui| {
                    for stored in colors {
                        self.color_row(ui, state, stored, &mut out.commands);
                    }
                });
        }

        // Drafts for colors that disappeared from the canvas.
        let visible = state.unique_colors();
        self.hex_drafts.retain(|c, _| visible.contains(c));
        out
    }

    /// Swatch (click = use as brush), remap picker and hex field for one
    /// stored color.
    fn color_row(&mut self, ui: &mut egui::Ui, state: &EditorState, stored: CellColor, commands: &mut Vec<Command>) {
        let display = state.color_map.resolve(stored);
        ui.horizontal(|ui| {
            let (rect, resp) = ui.allocate_exact_size(Vec2::splat(SWATCH_SIZE), egui::Sense::click());
            let stroke = if state.brush == display {
                Stroke::new(2.0, Color32::WHITE)
            } else {
                Stroke::new(1.0, Color32::from_white_alpha(60))
            };
            ui.painter().rect(rect, 4.0, to_color32(display), stroke);
            if resp.on_hover_text(format!("stored {}", stored)).clicked() {
                commands.push(Command::PickSwatch(stored));
            }

            let mut rgb = display.rgb();
            if ui.color_edit_button_srgb(&mut rgb).changed() {
                commands.push(Command::RemapColor {
                    stored,
                    display: CellColor::from_rgb(rgb[0], rgb[1], rgb[2]),
                });
            }

            let mut text = self.hex_drafts.get(&stored).cloned().unwrap_or_else(|| display.to_hex());
            let resp = ui.add_sized(
                [72.0, 18.0],
                egui::TextEdit::singleline(&mut text).font(egui::TextStyle::Monospace),
            );
            if resp.lost_focus() {
                self.hex_drafts.remove(&stored);
                if ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    match text.parse::<CellColor>() {
                        Ok(color) => commands.push(Command::RemapColor { stored, display: color }),
                        Err(e) => {
                            log_warn!("Ignoring remap for {}: {}", stored, e);
                        }
                    }
                }
            } else if resp.has_focus() || resp.changed() {
                self.hex_drafts.insert(stored, text);
            }
        });
    }
}
