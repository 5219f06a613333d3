// ============================================================================
// STEP LAYER MODEL – cumulative pattern layers behind a cursor
// ============================================================================
//
// A scheme is an ordered list of partial cell maps ("steps"). The cursor
// selects how many are visible: the visible state is the union of
// steps[0..=cursor], later steps overwriting earlier ones.
//
// The merged view is memoized and tagged with the (version, cursor) it was
// built for. Moving the cursor forward by one only folds one more step into
// the cache; everything else rebuilds it.

use crate::cells::PaintedCells;

/// Maximum number of replicated copies the UI and CLI accept.
pub const MAX_COPIES: u32 = 40;

#[derive(Clone, Debug)]
pub struct StepLayers {
    steps: Vec<PaintedCells>,
    cursor: usize,
    /// Bumped whenever the step list or any step's contents change.
    version: u64,
    merged: PaintedCells,
    merged_for: (u64, usize),
}

impl Default for StepLayers {
    fn default() -> Self {
        Self::new()
    }
}

impl StepLayers {
    /// A single empty step.
    pub fn new() -> Self {
        Self {
            steps: vec![PaintedCells::new()],
            cursor: 0,
            version: 0,
            merged: PaintedCells::new(),
            merged_for: (0, 0),
        }
    }

    pub fn from_steps(steps: Vec<PaintedCells>) -> Self {
        let mut layers = Self::new();
        layers.load(steps);
        layers
    }

    /// Replace every step and rewind to the base layer. An empty list is
    /// stored as one empty step so the cursor always has a target.
    pub fn load(&mut self, mut steps: Vec<PaintedCells>) {
        if steps.is_empty() {
            steps.push(PaintedCells::new());
        }
        self.steps = steps;
        self.cursor = 0;
        self.version += 1;
        self.refresh();
    }

    /// Drop every step (back to one empty step).
    pub fn clear(&mut self) {
        self.load(Vec::new());
    }

    pub fn steps(&self) -> &[PaintedCells] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&PaintedCells> {
        self.steps.get(index)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_at_first(&self) -> bool {
        self.cursor == 0
    }

    pub fn is_at_last(&self) -> bool {
        self.cursor + 1 >= self.steps.len()
    }

    /// The `(version, cursor)` the cached merge was built for.
    pub fn cache_key(&self) -> (u64, usize) {
        self.merged_for
    }

    // ------------------------------------------------------------------------
    // Navigation (always clamped)
    // ------------------------------------------------------------------------

    pub fn advance(&mut self) -> bool {
        if self.is_at_last() {
            return false;
        }
        let cache_was_current = self.merged_for == (self.version, self.cursor);
        self.cursor += 1;
        if cache_was_current {
            let step = &self.steps[self.cursor];
            self.merged.overlay(step);
            self.merged_for = (self.version, self.cursor);
        } else {
            self.refresh();
        }
        true
    }

    pub fn retreat(&mut self) -> bool {
        if self.is_at_first() {
            return false;
        }
        self.cursor -= 1;
        self.refresh();
        true
    }

    /// Jump to `index` (clamped). Returns whether the cursor moved.
    pub fn set_cursor(&mut self, index: usize) -> bool {
        let target = index.min(self.steps.len() - 1);
        if target == self.cursor {
            return false;
        }
        if target == self.cursor + 1 {
            return self.advance();
        }
        self.cursor = target;
        self.refresh();
        true
    }

    pub fn first(&mut self) -> bool {
        self.set_cursor(0)
    }

    pub fn last(&mut self) -> bool {
        self.set_cursor(usize::MAX)
    }

    // ------------------------------------------------------------------------
    // Merged view
    // ------------------------------------------------------------------------

    /// Union of `steps[0..=cursor]`.
    pub fn visible_cells(&self) -> &PaintedCells {
        &self.merged
    }

    /// Union of `steps[0..=index]` for an arbitrary index (clamped), without
    /// touching the cursor.
    pub fn merged_through(&self, index: usize) -> PaintedCells {
        let end = index.min(self.steps.len() - 1) + 1;
        merge_steps(&self.steps[..end])
    }

    fn refresh(&mut self) {
        let key = (self.version, self.cursor);
        if self.merged_for == key {
            return;
        }
        self.merged = merge_steps(&self.steps[..=self.cursor]);
        self.merged_for = key;
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    /// Edit the visible state as if it were a single map, storing only the
    /// difference against the earlier steps back into the current step.
    ///
    /// Keys deleted by `updater` that are owned by an earlier step cannot be
    /// represented as a delta and stay visible. Steps other than the
    /// current one are never touched.
    pub fn mutate_at_cursor<R>(&mut self, updater: impl FnOnce(&mut PaintedCells) -> R) -> R {
        let baseline = merge_steps(&self.steps[..self.cursor]);
        let mut working = baseline.clone();
        working.overlay(&self.steps[self.cursor]);

        let out = updater(&mut working);

        let delta: PaintedCells = working
            .iter()
            .filter(|(key, color)| baseline.get(key) != Some(*color))
            .collect();

        if delta != self.steps[self.cursor] {
            self.steps[self.cursor] = delta;
            self.version += 1;
        }

        let mut merged = baseline;
        merged.overlay(&self.steps[self.cursor]);
        self.merged = merged;
        self.merged_for = (self.version, self.cursor);
        out
    }
}

/// Left fold of `steps` in order; later steps win on key collisions.
pub fn merge_steps(steps: &[PaintedCells]) -> PaintedCells {
    let mut merged = PaintedCells::new();
    for step in steps {
        merged.overlay(step);
    }
    merged
}

/// Repeat a motif: every step gains `copies` extra copies of itself, copy
/// `n` shifted right by `shift * n` columns. Applied per step so the whole
/// sequence stays consistent.
pub fn replicate(steps: &[PaintedCells], copies: u32, shift: i32) -> Vec<PaintedCells> {
    let copies = copies.min(MAX_COPIES);
    steps
        .iter()
        .map(|step| {
            let mut all = step.clone();
            for n in 1..=copies as i32 {
                all.overlay(&step.shifted(shift.saturating_mul(n), 0));
            }
            all
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::EditMode;
    use crate::color::CellColor;
    use crate::geometry::CellKey;

    fn cells(json: &str) -> PaintedCells {
        PaintedCells::from_json(json).unwrap()
    }

    fn two_steps() -> StepLayers {
        StepLayers::from_steps(vec![
            cells(r##"{"0,0":"#111111"}"##),
            cells(r##"{"0,0":"#222222","1,0":"#333333"}"##),
        ])
    }

    #[test]
    fn merge_later_step_wins() {
        let mut layers = two_steps();
        assert_eq!(layers.visible_cells(), &cells(r##"{"0,0":"#111111"}"##));
        assert!(layers.advance());
        assert_eq!(
            layers.visible_cells(),
            &cells(r##"{"0,0":"#222222","1,0":"#333333"}"##)
        );
    }

    #[test]
    fn navigation_is_clamped() {
        let mut layers = two_steps();
        assert!(!layers.retreat());
        assert!(layers.advance());
        assert!(!layers.advance());
        assert_eq!(layers.cursor(), 1);
        assert!(!layers.set_cursor(99));
        assert!(layers.first());
        assert_eq!(layers.cursor(), 0);
        assert!(layers.last());
        assert_eq!(layers.cursor(), 1);
    }

    #[test]
    fn empty_load_keeps_one_step() {
        let mut layers = two_steps();
        layers.advance();
        layers.load(Vec::new());
        assert_eq!(layers.step_count(), 1);
        assert_eq!(layers.cursor(), 0);
        assert!(layers.visible_cells().is_empty());
    }

    #[test]
    fn incremental_advance_matches_full_merge() {
        let mut layers = StepLayers::from_steps(vec![
            cells(r##"{"0,0":"#111111"}"##),
            cells(r##"{"1,0":"#222222"}"##),
            cells(r##"{"0,0":"#333333"}"##),
        ]);
        layers.advance();
        layers.advance();
        assert_eq!(layers.visible_cells(), &layers.merged_through(2));
        assert_eq!(layers.cache_key(), (layers.version(), 2));
        layers.retreat();
        assert_eq!(layers.visible_cells(), &layers.merged_through(1));
    }

    #[test]
    fn mutation_stores_only_the_delta() {
        let mut layers = two_steps();
        layers.advance();
        let changed = layers.mutate_at_cursor(|cells| {
            cells.paint(CellKey::new(0, 0), "#111111".parse().unwrap(), EditMode::Overlay)
        });
        assert!(changed);
        // painting back to the base color removes the override
        assert_eq!(layers.step(1).unwrap(), &cells(r##"{"1,0":"#333333"}"##));
        assert_eq!(layers.step(0).unwrap(), &cells(r##"{"0,0":"#111111"}"##));
        assert_eq!(
            layers.visible_cells(),
            &cells(r##"{"0,0":"#111111","1,0":"#333333"}"##)
        );
    }

    #[test]
    fn mutation_never_leaks_into_earlier_cursors() {
        let mut layers = two_steps();
        let before = layers.merged_through(0);
        layers.advance();
        layers.mutate_at_cursor(|cells| {
            cells.erase(CellKey::new(0, 0), EditMode::Overlay);
            cells.paint(CellKey::new(1, 0), "#abcdef".parse().unwrap(), EditMode::Overlay);
        });
        assert_eq!(layers.merged_through(0), before);
        layers.retreat();
        assert_eq!(layers.visible_cells(), &before);
        assert_eq!(
            layers.merged_through(1).get(&CellKey::new(0, 0)),
            Some(CellColor::EMPTY)
        );
    }

    #[test]
    fn deleting_an_earlier_step_bead_is_not_representable() {
        let mut layers = two_steps();
        layers.advance();
        layers.mutate_at_cursor(|cells| {
            cells.paint(CellKey::new(0, 0), CellColor::WHITE, EditMode::Overlay);
        });
        // the override is gone, the base layer bead shows through
        assert_eq!(
            layers.visible_cells().get(&CellKey::new(0, 0)),
            Some("#111111".parse().unwrap())
        );
    }

    #[test]
    fn replicate_shifts_columns_per_copy() {
        let base = vec![cells(r##"{"0,0":"#bfbfbf","1,0":"#bfbfbf"}"##)];
        let out = replicate(&base, 2, 4);
        assert_eq!(out.len(), 1);
        let keys: Vec<String> = out[0].keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["0,0", "1,0", "4,0", "5,0", "8,0", "9,0"]);
        assert!(out[0].iter().all(|(_, c)| c == CellColor::EMPTY));
    }

    #[test]
    fn replicate_zero_copies_is_identity() {
        let base = vec![cells(r##"{"3,4":"#010203"}"##), cells(r##"{"5,4":"#010203"}"##)];
        assert_eq!(replicate(&base, 0, 4), base);
    }
}
