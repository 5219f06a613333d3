// ============================================================================
// RENDERER – display list of discs + CPU rasteriser
// ============================================================================
//
// Rendering is a pure function of (view, visible cells, color map). It first
// builds a display list of discs in screen space; the desktop canvas hands
// that list to the egui painter, the headless path rasterises it here.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::cells::PaintedCells;
use crate::color::{CellColor, ColorMap};
use crate::geometry::{draws_outline, unit_origin, CellKey, DISC_RADIUS_FACTOR, X_SCALE_FACTOR};
use crate::view::{CellBounds, ViewTransform};

/// Outline drawn around every disc when zoomed in: rgba(0, 0, 0, 0.1), 1 px.
pub const OUTLINE_ALPHA: f32 = 0.1;
pub const OUTLINE_WIDTH: f32 = 1.0;
/// Don't lay out empty lattice slots beyond this many positions.
const MAX_SLOT_POSITIONS: u64 = 1_000_000;

/// One filled circle in screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Disc {
    pub key: CellKey,
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
    /// Display color (after the color map).
    pub color: CellColor,
    /// `false` for an empty lattice slot drawn as a guide.
    pub painted: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DisplayList {
    pub discs: Vec<Disc>,
    pub outline: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOptions {
    /// Draw every unpainted lattice position in `slot_color`.
    pub show_empty_slots: bool,
    pub slot_color: CellColor,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_empty_slots: false,
            slot_color: CellColor::from_rgb(0x3a, 0x3a, 0x3a),
        }
    }
}

/// Lay out the discs visible in a `width`×`height` viewport.
///
/// Cull bounds come from the view's inverse-mapped corners. Small stores
/// are walked key by key; stores larger than the viewport are walked
/// through the viewport's lattice positions instead. Both walks visit keys
/// in the same order, so the paint order is stable.
pub fn build_display_list(
    view: &ViewTransform,
    cells: &PaintedCells,
    colors: &ColorMap,
    width: f64,
    height: f64,
    options: &RenderOptions,
) -> DisplayList {
    let metrics = view.metrics();
    let radius = metrics.radius();
    let bounds = view.visible_bounds(width, height);
    let disc = |key: CellKey, color: CellColor, painted: bool| {
        let (cx, cy) = view.cell_center_screen(key);
        Disc { key, cx, cy, radius, color, painted }
    };

    let mut discs = Vec::new();

    if options.show_empty_slots && bounds.area() <= MAX_SLOT_POSITIONS {
        discs.extend(
            bounds
                .keys()
                .filter(|k| !cells.contains(k))
                .map(|k| disc(k, options.slot_color, false)),
        );
    }

    if (cells.len() as u64) < bounds.area() {
        discs.extend(
            cells
                .iter()
                .filter(|(k, _)| bounds.contains(*k))
                .map(|(k, c)| disc(k, colors.resolve(c), true)),
        );
    } else {
        discs.extend(
            bounds
                .keys()
                .filter_map(|k| cells.get(&k).map(|c| disc(k, colors.resolve(c), true))),
        );
    }

    DisplayList {
        discs,
        outline: draws_outline(view.zoom()),
    }
}

/// Full redraw into a new image: background, then every visible disc.
pub fn render(
    view: &ViewTransform,
    cells: &PaintedCells,
    colors: &ColorMap,
    background: CellColor,
    width: u32,
    height: u32,
    options: &RenderOptions,
) -> RgbaImage {
    let list = build_display_list(view, cells, colors, width as f64, height as f64, options);
    let [r, g, b] = background.rgb();
    let mut img = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));
    rasterize(&mut img, &list);
    img
}

/// Draw a display list on top of `img`.
///
/// Discs are bucketed by the scanlines they touch, then rows are filled in
/// parallel. Within a row the discs keep display-list order.
pub fn rasterize(img: &mut RgbaImage, list: &DisplayList) {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let mut rows: Vec<Vec<u32>> = vec![Vec::new(); height as usize];
    for (i, d) in list.discs.iter().enumerate() {
        let reach = d.radius + 1.0;
        let y0 = (d.cy - reach).floor().max(0.0);
        let y1 = (d.cy + reach).ceil().min(height as f64 - 1.0);
        if y1 < y0 || d.cx + reach < 0.0 || d.cx - reach > width as f64 {
            continue;
        }
        for y in y0 as usize..=y1 as usize {
            rows[y].push(i as u32);
        }
    }

    let row_bytes = width as usize * 4;
    let discs = &list.discs;
    let outline = list.outline;
    let raw: &mut [u8] = img.as_mut();
    raw.par_chunks_mut(row_bytes)
        .zip(rows.par_iter())
        .enumerate()
        .for_each(|(y, (row, bucket))| {
            let py = y as f64 + 0.5;
            for &i in bucket {
                let d = &discs[i as usize];
                let reach = d.radius + 1.0;
                let x0 = (d.cx - reach).floor().max(0.0) as usize;
                let x1 = ((d.cx + reach).ceil().max(0.0) as usize).min(width as usize - 1);
                let rgb = d.color.rgb();
                for x in x0..=x1 {
                    let px = x as f64 + 0.5;
                    let dist = ((px - d.cx).powi(2) + (py - d.cy).powi(2)).sqrt() - d.radius;
                    let px_buf = &mut row[x * 4..x * 4 + 4];
                    let fill = (0.5 - dist).clamp(0.0, 1.0) as f32;
                    if fill > 0.0 {
                        blend_over(px_buf, rgb, fill);
                    }
                    if outline {
                        let band = dist.abs() as f32 - OUTLINE_WIDTH / 2.0;
                        let cov = (0.5 - band).clamp(0.0, 1.0);
                        if cov > 0.0 {
                            blend_over(px_buf, [0, 0, 0], cov * OUTLINE_ALPHA);
                        }
                    }
                }
            }
        });
}

/// Source-over blend of an opaque color at `alpha` onto an RGBA pixel.
fn blend_over(dst: &mut [u8], rgb: [u8; 3], alpha: f32) {
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = alpha + dst_a * (1.0 - alpha);
    if out_a <= 0.0 {
        return;
    }
    for c in 0..3 {
        let src = rgb[c] as f32;
        let bg = dst[c] as f32;
        let v = (src * alpha + bg * dst_a * (1.0 - alpha)) / out_a;
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

// ============================================================================
// SCHEME PREVIEW – fit a pattern into a small transparent thumbnail
// ============================================================================

pub const PREVIEW_SIZE: u32 = 60;
pub const PREVIEW_PADDING: f64 = 6.0;

/// Thumbnail of `cells` in stored colors on a transparent square.
/// Empty patterns give a fully transparent image.
pub fn render_preview(cells: &PaintedCells, size: u32, padding: f64) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));
    let Some((min_x, min_y, max_x, max_y)) = cells.unit_extent() else {
        return img;
    };
    let available = (size as f64 - padding * 2.0).max(1.0);
    let content_w = max_x - min_x;
    let content_h = max_y - min_y;
    let scale = available / content_w.max(content_h).max(f64::EPSILON);
    let off_x = padding + (available - content_w * scale) / 2.0;
    let off_y = padding + (available - content_h * scale) / 2.0;

    let discs = cells
        .iter()
        .map(|(key, color)| {
            let (ux, uy) = unit_origin(key);
            Disc {
                key,
                cx: off_x + (ux - min_x) * scale + X_SCALE_FACTOR * scale / 2.0,
                cy: off_y + (uy - min_y) * scale + scale / 2.0,
                radius: scale * DISC_RADIUS_FACTOR,
                color,
                painted: true,
            }
        })
        .collect();
    rasterize(&mut img, &DisplayList { discs, outline: false });
    img
}

/// Painted cells that fall inside the drawn viewport.
pub fn visible_painted_count(view: &ViewTransform, cells: &PaintedCells, width: f64, height: f64) -> usize {
    let bounds: CellBounds = view.visible_bounds(width, height);
    cells.keys().filter(|k| bounds.contains(*k)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(json: &str) -> PaintedCells {
        PaintedCells::from_json(json).unwrap()
    }

    #[test]
    fn display_list_uses_color_map_and_geometry() {
        let view = ViewTransform::default();
        let pattern = cells(r##"{"0,0":"#bfbfbf","1,0":"#ff0000"}"##);
        let mut colors = ColorMap::new();
        colors.observe(pattern.unique_colors());
        colors.remap(CellColor::EMPTY, CellColor::from_rgb(0, 0, 255));

        let list = build_display_list(&view, &pattern, &colors, 200.0, 200.0, &RenderOptions::default());
        assert!(list.outline);
        assert_eq!(list.discs.len(), 2);
        let first = list.discs[0];
        assert_eq!((first.cx, first.cy, first.radius), (10.0, 40.0, 12.0));
        assert_eq!(first.color, CellColor::from_rgb(0, 0, 255));
        assert_eq!(list.discs[1].color, CellColor::from_rgb(255, 0, 0));
    }

    #[test]
    fn offscreen_cells_are_culled() {
        let view = ViewTransform::default();
        let pattern = cells(r##"{"0,0":"#bfbfbf","500,500":"#bfbfbf","-50,0":"#bfbfbf"}"##);
        let list = build_display_list(&view, &pattern, &ColorMap::new(), 100.0, 100.0, &RenderOptions::default());
        let keys: Vec<CellKey> = list.discs.iter().map(|d| d.key).collect();
        assert_eq!(keys, vec![CellKey::new(0, 0)]);
        assert_eq!(visible_painted_count(&view, &pattern, 100.0, 100.0), 1);
    }

    #[test]
    fn dense_store_walks_viewport_lattice() {
        let view = ViewTransform::default();
        let mut dense = PaintedCells::new();
        for col in -20..40 {
            for row in -20..40 {
                dense.insert(CellKey::new(col, row), CellColor::EMPTY);
            }
        }
        let list = build_display_list(&view, &dense, &ColorMap::new(), 60.0, 60.0, &RenderOptions::default());
        let bounds = view.visible_bounds(60.0, 60.0);
        assert_eq!(list.discs.len() as u64, bounds.area());
        let mut sorted = list.discs.iter().map(|d| d.key).collect::<Vec<_>>();
        sorted.sort();
        assert_eq!(sorted, list.discs.iter().map(|d| d.key).collect::<Vec<_>>());
    }

    #[test]
    fn outline_disabled_when_zoomed_out() {
        let mut view = ViewTransform::default();
        view.set_zoom_around(0.3, 0.0, 0.0);
        let list = build_display_list(&view, &PaintedCells::new(), &ColorMap::new(), 10.0, 10.0, &RenderOptions::default());
        assert!(!list.outline);
    }

    #[test]
    fn empty_slots_fill_the_rest_of_the_lattice() {
        let view = ViewTransform::default();
        let pattern = cells(r##"{"0,0":"#ff0000"}"##);
        let options = RenderOptions { show_empty_slots: true, ..RenderOptions::default() };
        let list = build_display_list(&view, &pattern, &ColorMap::new(), 40.0, 40.0, &options);
        let area = view.visible_bounds(40.0, 40.0).area() as usize;
        assert_eq!(list.discs.len(), area);
        assert_eq!(list.discs.iter().filter(|d| d.painted).count(), 1);
        // painted discs are drawn last, over the guides
        assert!(list.discs.last().unwrap().painted);
    }

    #[test]
    fn raster_paints_disc_center_and_keeps_background() {
        let view = ViewTransform::default();
        let pattern = cells(r##"{"0,0":"#ff0000"}"##);
        let bg = CellColor::DEFAULT_BACKGROUND;
        let img = render(&view, &pattern, &ColorMap::new(), bg, 64, 64, &RenderOptions::default());
        assert_eq!(img.get_pixel(10, 40), &Rgba([255, 0, 0, 255]));
        assert_eq!(img.get_pixel(60, 5), &Rgba([0x1a, 0x1a, 0x1a, 255]));
    }

    #[test]
    fn preview_is_transparent_around_the_pattern() {
        let pattern = cells(r##"{"0,0":"#00ff00","1,0":"#00ff00"}"##);
        let img = render_preview(&pattern, PREVIEW_SIZE, PREVIEW_PADDING);
        assert_eq!(img.dimensions(), (60, 60));
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert!(img.pixels().any(|p| p == &Rgba([0, 255, 0, 255])));
        let empty = render_preview(&PaintedCells::new(), 16, 2.0);
        assert!(empty.pixels().all(|p| p[3] == 0));
    }
}
