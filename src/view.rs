// ============================================================================
// VIEW TRANSFORM – pan offset + zoom
// ============================================================================
//
// Pan is stored in screen pixels and is never scaled by zoom; zoom only
// changes the cell size. A screen point therefore maps to the world as
// `screen - pan`, and then through the lattice geometry.

use crate::geometry::{BASE_CELL_SIZE, CellKey, CellMetrics};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 5.0;
/// Zoom change per wheel tick.
pub const ZOOM_STEP: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub pan_x: f64,
    pub pan_y: f64,
    zoom: f64,
    base_cell_size: f64,
}

/// Inclusive column/row range of lattice positions touching the viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellBounds {
    pub min_col: i32,
    pub max_col: i32,
    pub min_row: i32,
    pub max_row: i32,
}

impl CellBounds {
    pub fn contains(&self, key: CellKey) -> bool {
        key.col >= self.min_col
            && key.col <= self.max_col
            && key.row >= self.min_row
            && key.row <= self.max_row
    }

    /// Number of lattice positions inside the bounds.
    pub fn area(&self) -> u64 {
        let cols = (self.max_col as i64 - self.min_col as i64 + 1).max(0) as u64;
        let rows = (self.max_row as i64 - self.min_row as i64 + 1).max(0) as u64;
        cols * rows
    }

    /// Every key inside the bounds, column-major (same order as `CellKey`'s `Ord`).
    pub fn keys(&self) -> impl Iterator<Item = CellKey> + '_ {
        (self.min_col..=self.max_col)
            .flat_map(move |col| (self.min_row..=self.max_row).map(move |row| CellKey::new(col, row)))
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new(BASE_CELL_SIZE)
    }
}

impl ViewTransform {
    pub fn new(base_cell_size: f64) -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
            base_cell_size,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn base_cell_size(&self) -> f64 {
        self.base_cell_size
    }

    pub fn metrics(&self) -> CellMetrics {
        CellMetrics::new(self.base_cell_size, self.zoom)
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    // ------------------------------------------------------------------------
    // Coordinate conversion
    // ------------------------------------------------------------------------

    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (sx - self.pan_x, sy - self.pan_y)
    }

    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        (wx + self.pan_x, wy + self.pan_y)
    }

    /// Hit-test a screen point.
    pub fn screen_to_cell(&self, sx: f64, sy: f64) -> CellKey {
        let (wx, wy) = self.screen_to_world(sx, sy);
        self.metrics().cell_at(wx, wy)
    }

    /// Disc center of `key` in screen pixels.
    pub fn cell_center_screen(&self, key: CellKey) -> (f64, f64) {
        let (wx, wy) = self.metrics().center(key);
        self.world_to_screen(wx, wy)
    }

    /// The zoom-independent world point under a screen position, in
    /// base-cell pixels. This is what stays fixed under an anchored zoom.
    pub fn anchor_point(&self, sx: f64, sy: f64) -> (f64, f64) {
        ((sx - self.pan_x) / self.zoom, (sy - self.pan_y) / self.zoom)
    }

    // ------------------------------------------------------------------------
    // Pan / zoom
    // ------------------------------------------------------------------------

    /// Accumulate a drag delta. The plane is unbounded, so no clamping.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Zoom to `target` (clamped) keeping the point under `(ax, ay)` fixed.
    /// Returns whether the zoom changed.
    pub fn set_zoom_around(&mut self, target: f64, ax: f64, ay: f64) -> bool {
        let new_zoom = target.clamp(MIN_ZOOM, MAX_ZOOM);
        if new_zoom == self.zoom {
            return false;
        }
        let ratio = new_zoom / self.zoom;
        self.pan_x = ax - (ax - self.pan_x) * ratio;
        self.pan_y = ay - (ay - self.pan_y) * ratio;
        self.zoom = new_zoom;
        true
    }

    /// One wheel tick at the cursor: scrolling up (negative delta) zooms in.
    /// A zero delta is ignored.
    pub fn wheel(&mut self, delta_y: f64, ax: f64, ay: f64) -> bool {
        if delta_y == 0.0 || delta_y.is_nan() {
            return false;
        }
        let direction = if delta_y < 0.0 { 1.0 } else { -1.0 };
        self.set_zoom_around(self.zoom + direction * ZOOM_STEP, ax, ay)
    }

    /// Center `extent` (world pixels at zoom 1: min_x, min_y, max_x, max_y)
    /// in a `width`×`height` viewport, zooming so it fits with `margin` px
    /// on each side.
    pub fn fit(&mut self, extent: (f64, f64, f64, f64), width: f64, height: f64, margin: f64) {
        let (x0, y0, x1, y1) = extent;
        let content_w = (x1 - x0).max(f64::EPSILON);
        let content_h = (y1 - y0).max(f64::EPSILON);
        let avail_w = (width - 2.0 * margin).max(1.0);
        let avail_h = (height - 2.0 * margin).max(1.0);
        self.zoom = (avail_w / content_w).min(avail_h / content_h).clamp(MIN_ZOOM, MAX_ZOOM);
        let scaled_w = content_w * self.zoom;
        let scaled_h = content_h * self.zoom;
        self.pan_x = (width - scaled_w) / 2.0 - x0 * self.zoom;
        self.pan_y = (height - scaled_h) / 2.0 - y0 * self.zoom;
    }

    // ------------------------------------------------------------------------
    // Culling
    // ------------------------------------------------------------------------

    /// Lattice range covering a `width`×`height` viewport, found by
    /// inverse-mapping its four corners. Padded by one cell on every side:
    /// discs are wider than their column and the stagger shifts rows.
    pub fn visible_bounds(&self, width: f64, height: f64) -> CellBounds {
        let corners = [
            self.screen_to_cell(0.0, 0.0),
            self.screen_to_cell(width, 0.0),
            self.screen_to_cell(0.0, height),
            self.screen_to_cell(width, height),
        ];
        let mut b = CellBounds {
            min_col: i32::MAX,
            max_col: i32::MIN,
            min_row: i32::MAX,
            max_row: i32::MIN,
        };
        for c in corners {
            b.min_col = b.min_col.min(c.col);
            b.max_col = b.max_col.max(c.col);
            b.min_row = b.min_row.min(c.row);
            b.max_row = b.max_row.max(c.row);
        }
        CellBounds {
            min_col: b.min_col.saturating_sub(1),
            max_col: b.max_col.saturating_add(1),
            min_row: b.min_row.saturating_sub(1),
            max_row: b.max_row.saturating_add(1),
        }
    }
}
