//! End-to-end editing scenarios driven through `apply_command`, plus the
//! session store round trip on a real file.

use brickbead::cells::{EditMode, PaintedCells};
use brickbead::color::CellColor;
use brickbead::editor::{apply_command, Command, EditorState, NavKey, PointerButton};
use brickbead::geometry::CellKey;
use brickbead::pattern::parse_pattern;
use brickbead::persist::{load_snapshot, persist_effects, FileStore, KeyValueStore, MemoryStore, KEY_CELLS};
use brickbead::render::{render, RenderOptions};
use brickbead::view::ViewTransform;

fn keys(cells: &PaintedCells) -> Vec<String> {
    cells.keys().map(|k| k.to_string()).collect()
}

fn click(state: &mut EditorState, button: PointerButton, col: i32, row: i32) -> brickbead::Effects {
    let (x, y) = state.view.cell_center_screen(CellKey::new(col, row));
    let fx = apply_command(state, Command::PointerDown { button, x, y });
    apply_command(state, Command::PointerUp);
    fx
}

#[test]
fn replicated_scheme_load() {
    let steps = parse_pattern(r##"[{"0,0":"#bfbfbf","1,0":"#bfbfbf"}]"##).unwrap();
    let mut state = EditorState::default();
    apply_command(&mut state, Command::LoadPattern { steps, copies: 2, shift: 4 });
    assert_eq!(keys(state.visible_cells()), ["0,0", "1,0", "4,0", "5,0", "8,0", "9,0"]);
    assert!(state.visible_cells().iter().all(|(_, c)| c == CellColor::EMPTY));
    assert_eq!(state.unique_colors(), [CellColor::EMPTY]);
}

#[test]
fn multi_step_scheme_walkthrough() {
    let steps = parse_pattern(
        r##"[{"22,3":"#bfbfbf","21,4":"#bfbfbf"},{"20,4":"#bfbfbf","19,5":"#bfbfbf"},{"20,5":"#bfbfbf","24,3":"#bfbfbf"}]"##,
    )
    .unwrap();
    let mut state = EditorState::default();
    apply_command(&mut state, Command::LoadPattern { steps, copies: 0, shift: 4 });
    assert_eq!(state.visible_cells().len(), 2);

    let right = Command::Key { key: NavKey::ArrowRight, text_input_focused: false };
    apply_command(&mut state, right.clone());
    apply_command(&mut state, right.clone());
    assert_eq!(state.visible_cells().len(), 6);
    // already at the last step
    assert!(!apply_command(&mut state, right).redraw);

    // recolor a bead that belongs to step 1 while looking at step 3
    apply_command(&mut state, Command::SetBrush("#0000ff".parse().unwrap()));
    click(&mut state, PointerButton::Primary, 22, 3);
    assert_eq!(state.visible_cells().get(&CellKey::new(22, 3)), Some("#0000ff".parse().unwrap()));

    apply_command(&mut state, Command::SetStep(0));
    assert_eq!(state.visible_cells().get(&CellKey::new(22, 3)), Some(CellColor::EMPTY));
}

#[test]
fn freehand_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.cfg");

    {
        let mut store = FileStore::open(&path).unwrap();
        let mut state = EditorState::default();
        let fx = apply_command(&mut state, Command::SetBrush("#123456".parse().unwrap()));
        persist_effects(&mut store, &state, fx);
        for col in 0..3 {
            let fx = click(&mut state, PointerButton::Primary, col, 2);
            persist_effects(&mut store, &state, fx);
        }
        let fx = click(&mut state, PointerButton::Secondary, 1, 2);
        persist_effects(&mut store, &state, fx);
        let fx = apply_command(&mut state, Command::SetBackground("#000000".parse().unwrap()));
        persist_effects(&mut store, &state, fx);
    }

    let store = FileStore::open(&path).unwrap();
    let snap = load_snapshot(&store);
    assert_eq!(keys(&snap.cells), ["0,2", "2,2"]);
    assert_eq!(snap.brush.to_hex(), "#123456");
    assert_eq!(snap.background.to_hex(), "#000000");
    assert_eq!(snap.mode, EditMode::Freehand);

    let restored = EditorState::restore(ViewTransform::default(), snap.cells.clone(), snap.brush, snap.background, snap.mode);
    assert_eq!(restored.visible_cells(), &snap.cells);
}

#[test]
fn step_navigation_is_what_the_next_launch_restores() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.cfg");
    let steps = parse_pattern(r##"[{"0,0":"#bfbfbf"},{"1,0":"#bfbfbf"},{"2,0":"#bfbfbf"}]"##).unwrap();

    let visible = {
        let mut store = FileStore::open(&path).unwrap();
        let mut state = EditorState::default();
        let fx = apply_command(&mut state, Command::LoadPattern { steps, copies: 0, shift: 4 });
        persist_effects(&mut store, &state, fx);
        let right = Command::Key { key: NavKey::ArrowRight, text_input_focused: false };
        let fx = apply_command(&mut state, right);
        persist_effects(&mut store, &state, fx);
        assert_eq!(load_snapshot(&store).cells, *state.visible_cells());

        let fx = apply_command(&mut state, Command::SetStep(2));
        persist_effects(&mut store, &state, fx);
        let fx = apply_command(&mut state, Command::Key { key: NavKey::ArrowLeft, text_input_focused: false });
        persist_effects(&mut store, &state, fx);
        state.visible_cells().clone()
    };
    assert_eq!(keys(&visible), ["0,0", "1,0"]);

    let snap = load_snapshot(&FileStore::open(&path).unwrap());
    assert_eq!(snap.cells, visible);
    assert_eq!(snap.mode, EditMode::Overlay);
    let restored = EditorState::restore(ViewTransform::default(), snap.cells, snap.brush, snap.background, snap.mode);
    assert_eq!(restored.visible_cells(), &visible);
}

#[test]
fn store_round_trip_is_exact() {
    let original = PaintedCells::from_json(r##"{"-5,7":"#010203","0,0":"#bfbfbf","12,-3":"#fcfcfc"}"##).unwrap();
    let mut store = MemoryStore::new();
    store.set(KEY_CELLS, &original.to_json().unwrap()).unwrap();
    assert_eq!(load_snapshot(&store).cells, original);
}

#[test]
fn white_click_on_empty_canvas_stores_nothing() {
    let mut state = EditorState::default();
    apply_command(&mut state, Command::SetBrush(CellColor::WHITE));
    // the brush is coerced, so clicking paints near-white instead
    click(&mut state, PointerButton::Primary, 0, 0);
    assert_eq!(state.visible_cells().get(&CellKey::new(0, 0)), Some(CellColor::NEAR_WHITE));

    let mut cells = PaintedCells::new();
    assert!(!cells.paint(CellKey::new(0, 0), CellColor::WHITE, EditMode::Freehand));
    assert!(cells.is_empty());
}

#[test]
fn remap_changes_rendering_only() {
    let steps = parse_pattern(r##"{"0,0":"#bfbfbf"}"##).unwrap();
    let mut state = EditorState::default();
    apply_command(&mut state, Command::LoadPattern { steps, copies: 0, shift: 4 });
    apply_command(&mut state, Command::RemapColor { stored: CellColor::EMPTY, display: "#ff00ff".parse().unwrap() });

    let img = render(&state.view, state.visible_cells(), &state.color_map, state.background, 40, 80, &RenderOptions::default());
    let (cx, cy) = state.view.cell_center_screen(CellKey::new(0, 0));
    assert_eq!(img.get_pixel(cx as u32, cy as u32).0, [0xff, 0x00, 0xff, 0xff]);
    assert_eq!(state.visible_cells().get(&CellKey::new(0, 0)), Some(CellColor::EMPTY));
}
