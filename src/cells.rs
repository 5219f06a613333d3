// ============================================================================
// PAINTED CELL STORE
// ============================================================================

use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::color::CellColor;
use crate::geometry::{unit_origin, CellKey, X_SCALE_FACTOR};

/// How paint/erase treat the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EditMode {
    /// Blank canvas: painting creates beads, erasing removes them.
    #[default]
    Freehand,
    /// A pattern is loaded: only existing beads can be recolored, and
    /// erasing leaves an `EMPTY` placeholder bead behind.
    Overlay,
}

impl EditMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EditMode::Freehand => "freehand",
            EditMode::Overlay => "overlay",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "freehand" => Some(EditMode::Freehand),
            "overlay" => Some(EditMode::Overlay),
            _ => None,
        }
    }
}

/// Cell key → stored color. Never holds a transparent marker: a cleared
/// bead is either absent or explicitly `CellColor::EMPTY`.
///
/// Serializes as a JSON object `{"col,row": "#rrggbb", ...}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaintedCells {
    cells: BTreeMap<CellKey, CellColor>,
}

/// Inclusive lattice bounding box of a set of cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyBounds {
    pub min: CellKey,
    pub max: CellKey,
}

impl KeyBounds {
    /// Columns and rows spanned, inclusive. Widened so extreme keys cannot overflow.
    pub fn size(&self) -> (u64, u64) {
        let cols = self.max.col as i64 - self.min.col as i64 + 1;
        let rows = self.max.row as i64 - self.min.row as i64 + 1;
        (cols as u64, rows as u64)
    }
}

impl PaintedCells {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, key: &CellKey) -> Option<CellColor> {
        self.cells.get(key).copied()
    }

    pub fn contains(&self, key: &CellKey) -> bool {
        self.cells.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellKey, CellColor)> + '_ {
        self.cells.iter().map(|(k, c)| (*k, *c))
    }

    pub fn keys(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.cells.keys().copied()
    }

    /// Raw write, bypassing the paint rules. Used when building patterns.
    pub fn insert(&mut self, key: CellKey, color: CellColor) -> Option<CellColor> {
        self.cells.insert(key, color)
    }

    pub fn remove(&mut self, key: &CellKey) -> Option<CellColor> {
        self.cells.remove(key)
    }

    /// Copy every cell of `other` over this map (`other` wins on collisions).
    pub fn overlay(&mut self, other: &PaintedCells) {
        self.cells.extend(other.iter());
    }

    // ------------------------------------------------------------------------
    // Editing rules
    // ------------------------------------------------------------------------

    /// Paint one bead. White deletes the bead; in overlay mode beads that
    /// are not part of the pattern are left alone. Returns whether the map
    /// changed.
    pub fn paint(&mut self, key: CellKey, color: CellColor, mode: EditMode) -> bool {
        if mode == EditMode::Overlay && !self.contains(&key) {
            return false;
        }
        if color.is_white() {
            return self.cells.remove(&key).is_some();
        }
        self.cells.insert(key, color) != Some(color)
    }

    /// Erase one bead. Absent beads are never touched.
    pub fn erase(&mut self, key: CellKey, mode: EditMode) -> bool {
        match (mode, self.cells.entry(key)) {
            (_, btree_map::Entry::Vacant(_)) => false,
            (EditMode::Freehand, btree_map::Entry::Occupied(e)) => {
                e.remove();
                true
            }
            (EditMode::Overlay, btree_map::Entry::Occupied(mut e)) => {
                if *e.get() == CellColor::EMPTY {
                    false
                } else {
                    e.insert(CellColor::EMPTY);
                    true
                }
            }
        }
    }

    /// Remove every bead. Returns whether anything was removed.
    pub fn clear(&mut self) -> bool {
        let had_cells = !self.cells.is_empty();
        self.cells.clear();
        had_cells
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Distinct stored colors, sorted.
    pub fn unique_colors(&self) -> Vec<CellColor> {
        self.cells.values().copied().collect::<BTreeSet<_>>().into_iter().collect()
    }

    /// A copy with every key moved by `(d_col, d_row)`.
    pub fn shifted(&self, d_col: i32, d_row: i32) -> Self {
        self.iter().map(|(k, c)| (k.shifted(d_col, d_row), c)).collect()
    }

    pub fn key_bounds(&self) -> Option<KeyBounds> {
        let mut keys = self.keys();
        let first = keys.next()?;
        let (mut min, mut max) = (first, first);
        for k in keys {
            min.col = min.col.min(k.col);
            min.row = min.row.min(k.row);
            max.col = max.col.max(k.col);
            max.row = max.row.max(k.row);
        }
        Some(KeyBounds { min, max })
    }

    /// Bounding box of the cell rectangles on the unit lattice (cell
    /// height 1): `(min_x, min_y, max_x, max_y)`.
    pub fn unit_extent(&self) -> Option<(f64, f64, f64, f64)> {
        let mut extent: Option<(f64, f64, f64, f64)> = None;
        for key in self.keys() {
            let (x, y) = unit_origin(key);
            let (x1, y1) = (x + X_SCALE_FACTOR, y + 1.0);
            extent = Some(match extent {
                None => (x, y, x1, y1),
                Some((a, b, c, d)) => (a.min(x), b.min(y), c.max(x1), d.max(y1)),
            });
        }
        extent
    }

    // ------------------------------------------------------------------------
    // JSON
    // ------------------------------------------------------------------------

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl FromIterator<(CellKey, CellColor)> for PaintedCells {
    fn from_iter<I: IntoIterator<Item = (CellKey, CellColor)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl Extend<(CellKey, CellColor)> for PaintedCells {
    fn extend<I: IntoIterator<Item = (CellKey, CellColor)>>(&mut self, iter: I) {
        self.cells.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> CellKey {
        s.parse().unwrap()
    }

    fn color(s: &str) -> CellColor {
        s.parse().unwrap()
    }

    #[test]
    fn white_paint_on_empty_store_stays_empty() {
        let mut cells = PaintedCells::new();
        assert!(!cells.paint(key("0,0"), CellColor::WHITE, EditMode::Freehand));
        assert!(cells.is_empty());
    }

    #[test]
    fn white_paint_deletes_existing_bead() {
        let mut cells = PaintedCells::new();
        cells.insert(key("2,3"), color("#123456"));
        assert!(cells.paint(key("2,3"), CellColor::WHITE, EditMode::Overlay));
        assert!(!cells.contains(&key("2,3")));
    }

    #[test]
    fn freehand_paint_creates_and_reports_changes() {
        let mut cells = PaintedCells::new();
        assert!(cells.paint(key("-1,4"), color("#AA0000"), EditMode::Freehand));
        assert_eq!(cells.get(&key("-1,4")), Some(color("#aa0000")));
        assert!(!cells.paint(key("-1,4"), color("#aa0000"), EditMode::Freehand));
    }

    #[test]
    fn overlay_paint_only_recolors_pattern_beads() {
        let mut cells = PaintedCells::new();
        cells.insert(key("0,0"), CellColor::EMPTY);
        assert!(!cells.paint(key("5,5"), color("#00ff00"), EditMode::Overlay));
        assert!(!cells.contains(&key("5,5")));
        assert!(cells.paint(key("0,0"), color("#00ff00"), EditMode::Overlay));
        assert_eq!(cells.get(&key("0,0")), Some(color("#00ff00")));
    }

    #[test]
    fn erase_semantics_per_mode() {
        let mut cells = PaintedCells::new();
        cells.insert(key("0,0"), color("#00ff00"));
        cells.insert(key("1,0"), color("#00ff00"));

        assert!(cells.erase(key("0,0"), EditMode::Overlay));
        assert_eq!(cells.get(&key("0,0")), Some(CellColor::EMPTY));
        assert!(!cells.erase(key("0,0"), EditMode::Overlay));

        assert!(cells.erase(key("1,0"), EditMode::Freehand));
        assert!(!cells.contains(&key("1,0")));

        // absent keys are a no-op in both modes
        assert!(!cells.erase(key("9,9"), EditMode::Freehand));
        assert!(!cells.erase(key("9,9"), EditMode::Overlay));
        assert_eq!(cells.len(), 1);
    }

    #[test]
    fn clear_reports_whether_anything_was_removed() {
        let mut cells: PaintedCells = [(key("0,0"), CellColor::EMPTY)].into_iter().collect();
        assert!(cells.clear());
        assert!(!cells.clear());
    }

    #[test]
    fn json_uses_col_row_keys() {
        let cells = PaintedCells::from_json(r##"{"1,-2":"#ABCDEF","0,0":"#bfbfbf"}"##).unwrap();
        assert_eq!(cells.get(&key("1,-2")), Some(color("#abcdef")));
        let json = cells.to_json().unwrap();
        assert_eq!(json, r##"{"0,0":"#bfbfbf","1,-2":"#abcdef"}"##);
        assert!(PaintedCells::from_json(r##"{"x":"#bfbfbf"}"##).is_err());
        assert!(PaintedCells::from_json(r##"{"0,0":"nope"}"##).is_err());
    }

    #[test]
    fn unique_colors_and_bounds() {
        let cells = PaintedCells::from_json(
            r##"{"0,0":"#bfbfbf","3,1":"#ff0000","-2,5":"#bfbfbf"}"##,
        )
        .unwrap();
        assert_eq!(cells.unique_colors(), vec![color("#bfbfbf"), color("#ff0000")]);
        let b = cells.key_bounds().unwrap();
        assert_eq!(b.min, key("-2,0"));
        assert_eq!(b.max, key("3,5"));
        assert_eq!(b.size(), (6, 6));
        let (x0, y0, x1, y1) = cells.unit_extent().unwrap();
        assert_eq!((x0, y0, x1, y1), (-1.0, 0.5, 2.0, 6.5));
    }

    #[test]
    fn bounds_size_spans_the_whole_key_range() {
        let json = format!(r##"{{"{min},{min}":"#bfbfbf","{max},{max}":"#bfbfbf"}}"##, min = i32::MIN, max = i32::MAX);
        let b = PaintedCells::from_json(&json).unwrap().key_bounds().unwrap();
        assert_eq!(b.size(), (1u64 << 32, 1u64 << 32));
    }

    #[test]
    fn mode_names_round_trip() {
        for mode in [EditMode::Freehand, EditMode::Overlay] {
            assert_eq!(EditMode::from_name(mode.as_str()), Some(mode));
        }
        assert_eq!(EditMode::from_name("paint"), None);
    }
}
