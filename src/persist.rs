// ============================================================================
// PERSISTENCE BRIDGE – key-value store for the editing session
// ============================================================================
//
// Values are plain strings: the visible cells as a JSON object, colors as
// hex. Reads never fail the session; anything absent or unparsable falls
// back to its default. Write failures are logged and the session carries on
// in memory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cells::{EditMode, PaintedCells};
use crate::color::CellColor;
use crate::editor::{EditorState, Effects};

pub const KEY_CELLS: &str = "paintedCells";
pub const KEY_BRUSH: &str = "brushColor";
pub const KEY_BACKGROUND: &str = "bgColor";
pub const KEY_MODE: &str = "editMode";

pub const STORE_FILE_NAME: &str = "brickbead_store.cfg";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("value for '{key}' spans multiple lines")]
    MultilineValue { key: String },

    #[error("invalid store key '{0}'")]
    InvalidKey(String),

    #[error("could not serialize cells: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

// ============================================================================
// Backends
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        check_entry(key, value)?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// `key=value` lines in a text file. The whole file is rewritten on every
/// `set`; the store holds a handful of keys.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// `<data dir>/BrickBead/brickbead_store.cfg`
    pub fn default_path() -> PathBuf {
        crate::logger::app_data_dir().join(STORE_FILE_NAME)
    }

    /// Open a store file. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => parse_lines(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut content = String::new();
        for (key, value) in &self.values {
            content.push_str(key);
            content.push('=');
            content.push_str(value);
            content.push('\n');
        }
        std::fs::write(&self.path, content).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        check_entry(key, value)?;
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

fn check_entry(key: &str, value: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains(['=', '\n', '\r']) {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    if value.contains(['\n', '\r']) {
        return Err(StoreError::MultilineValue { key: key.to_string() });
    }
    Ok(())
}

fn parse_lines(content: &str) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    for line in content.lines() {
        let Some((key, val)) = line.split_once('=') else { continue };
        values.insert(key.trim().to_string(), val.trim().to_string());
    }
    values
}

// ============================================================================
// Session snapshot
// ============================================================================

/// Everything restored at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub cells: PaintedCells,
    pub brush: CellColor,
    pub background: CellColor,
    pub mode: EditMode,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            cells: PaintedCells::new(),
            brush: CellColor::DEFAULT_BRUSH,
            background: CellColor::DEFAULT_BACKGROUND,
            mode: EditMode::Freehand,
        }
    }
}

/// Read the session back, falling back per key to defaults.
pub fn load_snapshot(store: &dyn KeyValueStore) -> Snapshot {
    let mut snap = Snapshot::default();

    if let Some(raw) = store.get(KEY_CELLS) {
        match PaintedCells::from_json(&raw) {
            Ok(cells) => snap.cells = cells,
            Err(e) => {
                log_warn!("Stored '{}' is unreadable, starting empty: {}", KEY_CELLS, e);
            }
        }
    }
    if let Some(raw) = store.get(KEY_BRUSH) {
        match raw.parse() {
            Ok(c) => snap.brush = c,
            Err(e) => {
                log_warn!("Stored '{}' is unreadable: {}", KEY_BRUSH, e);
            }
        }
    }
    if let Some(raw) = store.get(KEY_BACKGROUND) {
        match raw.parse() {
            Ok(c) => snap.background = c,
            Err(e) => {
                log_warn!("Stored '{}' is unreadable: {}", KEY_BACKGROUND, e);
            }
        }
    }
    match store.get(KEY_MODE).as_deref().map(EditMode::from_name) {
        Some(Some(mode)) => snap.mode = mode,
        Some(None) => {
            log_warn!("Stored '{}' is unreadable", KEY_MODE);
        }
        None => {}
    }
    snap
}

pub fn save_cells(store: &mut dyn KeyValueStore, cells: &PaintedCells, mode: EditMode) -> Result<(), StoreError> {
    store.set(KEY_CELLS, &cells.to_json()?)?;
    store.set(KEY_MODE, mode.as_str())
}

pub fn save_brush(store: &mut dyn KeyValueStore, brush: CellColor) -> Result<(), StoreError> {
    store.set(KEY_BRUSH, &brush.to_hex())
}

pub fn save_background(store: &mut dyn KeyValueStore, background: CellColor) -> Result<(), StoreError> {
    store.set(KEY_BACKGROUND, &background.to_hex())
}

/// Write whatever `effects` asks for. Failures are logged, never returned:
/// the in-memory session stays authoritative.
pub fn persist_effects(store: &mut dyn KeyValueStore, state: &EditorState, effects: Effects) {
    if !effects.any_persist() {
        return;
    }
    if effects.persist_cells
        && let Err(e) = save_cells(store, state.visible_cells(), state.mode)
    {
        log_err!("Failed to persist cells: {}", e);
    }
    if effects.persist_brush
        && let Err(e) = save_brush(store, state.brush)
    {
        log_err!("Failed to persist brush color: {}", e);
    }
    if effects.persist_background
        && let Err(e) = save_background(store, state.background)
    {
        log_err!("Failed to persist background color: {}", e);
    }
}
