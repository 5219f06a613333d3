// ============================================================================
// STAGGERED LATTICE GEOMETRY
// ============================================================================
//
// Cells sit on a brick-laid lattice. Columns are half a cell wide and every
// even column is pushed down by half a cell height, so each bead has six
// neighbours at (visually) equal distance while storage stays a plain
// (column, row) grid.
//
//   x = col * w + w/2
//   y = row * h + (col even ? h/2 : 0) + h/2
//
// All coordinates here are "world" pixels: screen pixels before the pan
// offset is applied. See `view.rs` for the screen side.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Cell height in pixels at zoom 1.0.
pub const BASE_CELL_SIZE: f64 = 40.0;
/// Cell width as a fraction of the cell height.
pub const X_SCALE_FACTOR: f64 = 0.5;
/// Drawn disc radius as a fraction of the cell height.
pub const DISC_RADIUS_FACTOR: f64 = 0.3;
/// Below (or at) this zoom the disc outlines are skipped.
pub const STROKE_MIN_ZOOM: f64 = 0.4;

// ============================================================================
// CELL KEY
// ============================================================================

/// One lattice position. Serialized as `"col,row"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub col: i32,
    pub row: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid cell key '{0}' (expected \"col,row\")")]
pub struct KeyParseError(pub String);

impl CellKey {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Even columns carry the half-cell vertical stagger. Uses the Euclidean
    /// remainder so `-1` counts as odd and `-2` as even.
    pub fn is_even_column(self) -> bool {
        self.col.rem_euclid(2) == 0
    }

    pub fn shifted(self, d_col: i32, d_row: i32) -> Self {
        Self {
            col: self.col.saturating_add(d_col),
            row: self.row.saturating_add(d_row),
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.col, self.row)
    }
}

impl FromStr for CellKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || KeyParseError(s.to_string());
        let (col, row) = s.split_once(',').ok_or_else(err)?;
        let col = col.trim().parse::<i32>().map_err(|_| err())?;
        let row = row.trim().parse::<i32>().map_err(|_| err())?;
        Ok(Self { col, row })
    }
}

impl Serialize for CellKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// CELL METRICS – per-zoom cell dimensions + forward/inverse mapping
// ============================================================================

/// Cell dimensions for one zoom level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellMetrics {
    pub cell_height: f64,
    pub cell_width: f64,
}

impl CellMetrics {
    pub fn new(base_cell_size: f64, zoom: f64) -> Self {
        let cell_height = base_cell_size * zoom;
        Self {
            cell_height,
            cell_width: cell_height * X_SCALE_FACTOR,
        }
    }

    /// Vertical offset of a column's cells.
    pub fn stagger(&self, col: i32) -> f64 {
        if CellKey::new(col, 0).is_even_column() {
            self.cell_height / 2.0
        } else {
            0.0
        }
    }

    /// Disc center of `key` in world pixels.
    pub fn center(&self, key: CellKey) -> (f64, f64) {
        let x = key.col as f64 * self.cell_width + self.cell_width / 2.0;
        let y = key.row as f64 * self.cell_height + self.stagger(key.col) + self.cell_height / 2.0;
        (x, y)
    }

    /// Top-left corner of the cell rectangle of `key` in world pixels.
    pub fn origin(&self, key: CellKey) -> (f64, f64) {
        (
            key.col as f64 * self.cell_width,
            key.row as f64 * self.cell_height + self.stagger(key.col),
        )
    }

    /// Hit-test a world point. The column is resolved first because the
    /// row depends on that column's stagger.
    pub fn cell_at(&self, x: f64, y: f64) -> CellKey {
        let col = (x / self.cell_width).floor() as i32;
        let row = ((y - self.stagger(col)) / self.cell_height).floor() as i32;
        CellKey { col, row }
    }

    pub fn radius(&self) -> f64 {
        self.cell_height * DISC_RADIUS_FACTOR
    }
}

/// Whether disc outlines are drawn at this zoom.
pub fn draws_outline(zoom: f64) -> bool {
    zoom > STROKE_MIN_ZOOM
}

/// Top-left corner of a cell on the unit lattice (cell height 1), used for
/// zoom-independent layout such as scheme thumbnails.
pub fn unit_origin(key: CellKey) -> (f64, f64) {
    let y_offset = if key.is_even_column() { 0.5 } else { 0.0 };
    (key.col as f64 * X_SCALE_FACTOR, key.row as f64 + y_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_parses_and_prints() {
        let key: CellKey = "-3, 12".parse().unwrap();
        assert_eq!(key, CellKey::new(-3, 12));
        assert_eq!(key.to_string(), "-3,12");
        assert!("3".parse::<CellKey>().is_err());
        assert!("a,1".parse::<CellKey>().is_err());
        assert!("1,2,3".parse::<CellKey>().is_err());
    }

    #[test]
    fn negative_columns_keep_parity() {
        assert!(CellKey::new(-2, 0).is_even_column());
        assert!(!CellKey::new(-1, 0).is_even_column());
        assert!(CellKey::new(0, 0).is_even_column());
    }

    #[test]
    fn origin_cell_center_matches_formula() {
        let m = CellMetrics::new(BASE_CELL_SIZE, 1.0);
        assert_eq!(m.cell_width, 20.0);
        // even column: staggered down by h/2
        assert_eq!(m.center(CellKey::new(0, 0)), (10.0, 40.0));
        assert_eq!(m.center(CellKey::new(1, 0)), (30.0, 20.0));
        assert_eq!(m.radius(), 12.0);
    }

    #[test]
    fn hit_test_near_origin_uses_floor() {
        let m = CellMetrics::new(BASE_CELL_SIZE, 1.0);
        // just left of x = 0 is column -1 (odd, no stagger)
        assert_eq!(m.cell_at(-0.5, 5.0), CellKey::new(-1, 0));
        // just above y = 0 in odd column is row -1
        assert_eq!(m.cell_at(25.0, -0.5), CellKey::new(1, -1));
        // even column at y = 10 is still above its staggered first row
        assert_eq!(m.cell_at(5.0, 10.0), CellKey::new(0, -1));
        assert_eq!(m.cell_at(-25.0, 30.0), CellKey::new(-2, 0));
    }

    #[test]
    fn adjacent_columns_differ_by_half_a_cell() {
        let m = CellMetrics::new(BASE_CELL_SIZE, 2.3);
        for col in -5..5 {
            let (_, y0) = m.center(CellKey::new(col, 7));
            let (_, y1) = m.center(CellKey::new(col + 1, 7));
            assert!(((y0 - y1).abs() - m.cell_height / 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn outline_cutoff_is_exclusive() {
        assert!(!draws_outline(0.4));
        assert!(draws_outline(0.5));
    }

    #[test]
    fn unit_origin_staggers_even_columns() {
        assert_eq!(unit_origin(CellKey::new(0, 0)), (0.0, 0.5));
        assert_eq!(unit_origin(CellKey::new(3, 2)), (1.5, 2.0));
    }
}
