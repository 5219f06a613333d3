// ============================================================================
// BEAD CANVAS – egui widget hosting the editor
// ============================================================================
//
// Raw egui input events are translated into editor `Command`s in arrival
// order, then the current display list is painted with the egui painter.
// Coordinates handed to the editor are relative to the canvas rect.

use eframe::egui;
use egui::{Color32, Pos2, Rect, Stroke};

use crate::color::CellColor;
use crate::editor::{apply_command, Command, EditorState, Effects, NavKey, PointerButton};
use crate::render::{build_display_list, RenderOptions, OUTLINE_ALPHA, OUTLINE_WIDTH};

pub fn to_color32(c: CellColor) -> Color32 {
    let [r, g, b] = c.rgb();
    Color32::from_rgb(r, g, b)
}

#[derive(Default)]
pub struct BeadCanvas {
    /// Screen rect of the canvas last frame.
    pub last_rect: Option<Rect>,
}

impl BeadCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canvas size in points, once it has been laid out.
    pub fn viewport(&self) -> Option<(f64, f64)> {
        self.last_rect.map(|r| (r.width() as f64, r.height() as f64))
    }

    /// Route this frame's input to the editor and draw it. `input_blocked`
    /// suppresses new strokes (a modal is open), but releases still end
    /// strokes in progress.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        state: &mut EditorState,
        options: &RenderOptions,
        input_blocked: bool,
    ) -> Effects {
        let sense = egui::Sense::click_and_drag().union(egui::Sense::hover());
        let (response, painter) = ui.allocate_painter(ui.available_size(), sense);
        let rect = response.rect;
        self.last_rect = Some(rect);

        let mut effects = Effects::default();
        let text_input_focused = ui.ctx().wants_keyboard_input();
        let hovered = response.hovered() && !input_blocked;
        let events = ui.input(|i| i.events.clone());
        let local = |p: Pos2| -> (f64, f64) { ((p.x - rect.min.x) as f64, (p.y - rect.min.y) as f64) };

        for event in events {
            let command = match event {
                egui::Event::PointerButton { pos, button, pressed: true, .. } if hovered && rect.contains(pos) => {
                    let Some(button) = map_button(button) else { continue };
                    let (x, y) = local(pos);
                    Some(Command::PointerDown { button, x, y })
                }
                egui::Event::PointerButton { pressed: false, .. } => Some(Command::PointerUp),
                egui::Event::PointerMoved(pos) if forwards_move(rect, pos, state.is_panning()) => {
                    let (x, y) = local(pos);
                    Some(Command::PointerMove { x, y })
                }
                egui::Event::PointerGone => Some(Command::PointerUp),
                egui::Event::Scroll(delta) if hovered => {
                    let pos = ui.input(|i| i.pointer.hover_pos());
                    match pos {
                        // egui reports "scroll up" as positive; the editor
                        // follows wheel-event sign (negative = zoom in)
                        Some(pos) if delta.y != 0.0 => {
                            let (x, y) = local(pos);
                            Some(Command::Wheel { delta_y: -delta.y as f64, x, y })
                        }
                        _ => None,
                    }
                }
                egui::Event::Key { key, pressed: true, .. } if !input_blocked => match key {
                    egui::Key::ArrowLeft => Some(Command::Key { key: NavKey::ArrowLeft, text_input_focused }),
                    egui::Key::ArrowRight => Some(Command::Key { key: NavKey::ArrowRight, text_input_focused }),
                    _ => None,
                },
                _ => None,
            };
            if let Some(command) = command {
                effects.merge(apply_command(state, command));
            }
        }

        if state.is_panning() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        } else if state.is_painting() || state.is_erasing() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Crosshair);
        }

        self.paint(&painter, rect, state, options);
        effects
    }

    fn paint(&self, painter: &egui::Painter, rect: Rect, state: &EditorState, options: &RenderOptions) {
        painter.rect_filled(rect, 0.0, to_color32(state.background));

        let list = build_display_list(
            &state.view,
            state.visible_cells(),
            &state.color_map,
            rect.width() as f64,
            rect.height() as f64,
            options,
        );
        let outline = if list.outline {
            Stroke::new(OUTLINE_WIDTH, Color32::from_black_alpha((OUTLINE_ALPHA * 255.0).round() as u8))
        } else {
            Stroke::NONE
        };
        let origin = rect.min.to_vec2();
        for disc in &list.discs {
            let center = Pos2::new(disc.cx as f32, disc.cy as f32) + origin;
            painter.circle(center, disc.radius as f32, to_color32(disc.color), outline);
        }
    }
}

/// Stroke moves outside the canvas are dropped; a pan follows the pointer anywhere.
fn forwards_move(rect: Rect, pos: Pos2, panning: bool) -> bool {
    panning || rect.contains(pos)
}

fn map_button(button: egui::PointerButton) -> Option<PointerButton> {
    match button {
        egui::PointerButton::Primary => Some(PointerButton::Primary),
        egui::PointerButton::Secondary => Some(PointerButton::Secondary),
        egui::PointerButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}
