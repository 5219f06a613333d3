// ============================================================================
// EDITOR STATE + COMMAND DISPATCHER
// ============================================================================
//
// All editing state lives in one `EditorState` owned by the caller. Input is
// translated into `Command`s by the host (egui canvas, CLI, tests) and
// applied synchronously with `apply_command`, which reports what needs to be
// redrawn or persisted.

use crate::cells::{EditMode, PaintedCells};
use crate::color::{coerce_brush_color, CellColor, ColorMap};
use crate::geometry::CellKey;
use crate::steps::{replicate, StepLayers};
use crate::view::ViewTransform;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    /// Paint with the brush color.
    Primary,
    /// Erase.
    Secondary,
    /// Pan.
    Middle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavKey {
    ArrowLeft,
    ArrowRight,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    PointerDown { button: PointerButton, x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    /// One wheel tick at the cursor position.
    Wheel { delta_y: f64, x: f64, y: f64 },
    /// Step navigation key. Ignored while a text field has keyboard focus.
    Key { key: NavKey, text_input_focused: bool },
    SetStep(usize),
    SetBrush(CellColor),
    SetBackground(CellColor),
    /// Use a palette swatch (a stored color) as the brush: the brush becomes
    /// the swatch's display color.
    PickSwatch(CellColor),
    RemapColor { stored: CellColor, display: CellColor },
    /// Replace the canvas with a loaded pattern, replicated `copies` times.
    LoadPattern { steps: Vec<PaintedCells>, copies: u32, shift: i32 },
    Clear,
    ResetView,
}

/// What a command changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Effects {
    pub redraw: bool,
    pub persist_cells: bool,
    pub persist_brush: bool,
    pub persist_background: bool,
}

impl Effects {
    fn redraw() -> Self {
        Self { redraw: true, ..Self::default() }
    }

    fn cells_changed() -> Self {
        Self { redraw: true, persist_cells: true, ..Self::default() }
    }

    pub fn any_persist(&self) -> bool {
        self.persist_cells || self.persist_brush || self.persist_background
    }

    /// Accumulate the effects of several commands applied in one frame.
    pub fn merge(&mut self, other: Effects) {
        self.redraw |= other.redraw;
        self.persist_cells |= other.persist_cells;
        self.persist_brush |= other.persist_brush;
        self.persist_background |= other.persist_background;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum Stroke {
    #[default]
    Idle,
    Painting,
    Erasing,
    Panning { last_x: f64, last_y: f64 },
}

#[derive(Clone, Debug)]
pub struct EditorState {
    pub view: ViewTransform,
    pub layers: StepLayers,
    pub color_map: ColorMap,
    pub brush: CellColor,
    pub background: CellColor,
    pub mode: EditMode,
    stroke: Stroke,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(ViewTransform::default())
    }
}

impl EditorState {
    pub fn new(view: ViewTransform) -> Self {
        Self {
            view,
            layers: StepLayers::new(),
            color_map: ColorMap::new(),
            brush: CellColor::DEFAULT_BRUSH,
            background: CellColor::DEFAULT_BACKGROUND,
            mode: EditMode::Freehand,
            stroke: Stroke::Idle,
        }
    }

    /// Restore a session: cells become the single base step.
    pub fn restore(view: ViewTransform, cells: PaintedCells, brush: CellColor, background: CellColor, mode: EditMode) -> Self {
        let mut state = Self::new(view);
        state.layers.load(vec![cells]);
        state.brush = coerce_brush_color(brush);
        state.background = background;
        state.mode = mode;
        state.sync_color_map();
        state
    }

    pub fn visible_cells(&self) -> &PaintedCells {
        self.layers.visible_cells()
    }

    pub fn unique_colors(&self) -> Vec<CellColor> {
        self.visible_cells().unique_colors()
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.stroke, Stroke::Panning { .. })
    }

    pub fn is_painting(&self) -> bool {
        self.stroke == Stroke::Painting
    }

    pub fn is_erasing(&self) -> bool {
        self.stroke == Stroke::Erasing
    }

    /// Give every newly visible stored color an identity display entry.
    pub fn sync_color_map(&mut self) -> usize {
        let colors = self.unique_colors();
        self.color_map.observe(colors)
    }

    fn paint_key(&mut self, key: CellKey) -> bool {
        let (brush, mode) = (self.brush, self.mode);
        self.layers.mutate_at_cursor(|cells| cells.paint(key, brush, mode))
    }

    fn erase_key(&mut self, key: CellKey) -> bool {
        let mode = self.mode;
        self.layers.mutate_at_cursor(|cells| cells.erase(key, mode))
    }

    /// Apply the active stroke at a screen position.
    fn stroke_at(&mut self, x: f64, y: f64) -> bool {
        let key = self.view.screen_to_cell(x, y);
        match self.stroke {
            Stroke::Painting => self.paint_key(key),
            Stroke::Erasing => self.erase_key(key),
            _ => false,
        }
    }
}

/// Apply one command. Every mutation of the editor goes through here.
pub fn apply_command(state: &mut EditorState, command: Command) -> Effects {
    let effects = match command {
        Command::PointerDown { button, x, y } => match button {
            PointerButton::Middle => {
                state.stroke = Stroke::Panning { last_x: x, last_y: y };
                Effects::default()
            }
            PointerButton::Primary | PointerButton::Secondary => {
                state.stroke = if button == PointerButton::Primary {
                    Stroke::Painting
                } else {
                    Stroke::Erasing
                };
                if state.stroke_at(x, y) {
                    Effects::cells_changed()
                } else {
                    Effects::default()
                }
            }
        },

        Command::PointerMove { x, y } => match state.stroke {
            Stroke::Panning { last_x, last_y } => {
                state.view.pan_by(x - last_x, y - last_y);
                state.stroke = Stroke::Panning { last_x: x, last_y: y };
                Effects::redraw()
            }
            Stroke::Painting | Stroke::Erasing => {
                if state.stroke_at(x, y) {
                    Effects::cells_changed()
                } else {
                    Effects::default()
                }
            }
            Stroke::Idle => Effects::default(),
        },

        Command::PointerUp => {
            state.stroke = Stroke::Idle;
            Effects::default()
        }

        Command::Wheel { delta_y, x, y } => {
            if state.view.wheel(delta_y, x, y) {
                Effects::redraw()
            } else {
                Effects::default()
            }
        }

        Command::Key { key, text_input_focused } => {
            if text_input_focused {
                return Effects::default();
            }
            let moved = match key {
                NavKey::ArrowLeft => state.layers.retreat(),
                NavKey::ArrowRight => state.layers.advance(),
            };
            // the persisted snapshot is the merged view at the cursor
            if moved { Effects::cells_changed() } else { Effects::default() }
        }

        Command::SetStep(index) => {
            if state.layers.set_cursor(index) {
                Effects::cells_changed()
            } else {
                Effects::default()
            }
        }

        Command::SetBrush(color) => {
            let color = coerce_brush_color(color);
            if color == state.brush {
                Effects::default()
            } else {
                state.brush = color;
                Effects { persist_brush: true, ..Effects::default() }
            }
        }

        Command::SetBackground(color) => {
            if color == state.background {
                Effects::default()
            } else {
                state.background = color;
                Effects { redraw: true, persist_background: true, ..Effects::default() }
            }
        }

        Command::PickSwatch(stored) => {
            let display = state.color_map.resolve(stored);
            return apply_command(state, Command::SetBrush(display));
        }

        Command::RemapColor { stored, display } => {
            if state.color_map.remap(stored, display) {
                Effects::redraw()
            } else {
                Effects::default()
            }
        }

        Command::LoadPattern { steps, copies, shift } => {
            state.layers.load(replicate(&steps, copies, shift));
            state.mode = EditMode::Overlay;
            state.stroke = Stroke::Idle;
            Effects::cells_changed()
        }

        Command::Clear => {
            state.layers.clear();
            state.mode = EditMode::Freehand;
            state.stroke = Stroke::Idle;
            Effects::cells_changed()
        }

        Command::ResetView => {
            state.view.reset();
            Effects::redraw()
        }
    };

    if effects.redraw {
        state.sync_color_map();
    }
    effects
}
