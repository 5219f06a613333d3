use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};

use eframe::egui;
use egui::{RichText, TextureHandle, Vec2};
use image::RgbaImage;
use uuid::Uuid;

use crate::pattern::fetch_pattern;
use crate::render::{render_preview, PREVIEW_PADDING, PREVIEW_SIZE};
use crate::scheme::SchemeEntry;
use crate::steps::merge_steps;

enum Preview {
    Pending,
    Ready(TextureHandle),
    Failed,
}

/// What the scheme list asked for this frame.
#[derive(Default)]
pub struct SchemesOutput {
    /// Confirmed: replace the canvas with this scheme.
    pub load: Option<SchemeEntry>,
    /// Picked from disk; add to the list.
    pub added: Option<SchemeEntry>,
    pub removed: Option<Uuid>,
}

// ============================================================================
// SchemesPanel – scheme list with thumbnails + load confirmation
// ============================================================================

pub struct SchemesPanel {
    previews: HashMap<Uuid, Preview>,
    preview_tx: Sender<(Uuid, Result<RgbaImage, String>)>,
    preview_rx: Receiver<(Uuid, Result<RgbaImage, String>)>,
    /// Scheme waiting for the user to confirm replacing the canvas.
    confirm: Option<SchemeEntry>,
}

impl Default for SchemesPanel {
    fn default() -> Self {
        let (preview_tx, preview_rx) = mpsc::channel();
        Self {
            previews: HashMap::new(),
            preview_tx,
            preview_rx,
            confirm: None,
        }
    }
}

impl SchemesPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A confirmation window is open; the canvas should ignore new input.
    pub fn is_modal_open(&self) -> bool {
        self.confirm.is_some()
    }

    /// Thumbnails are fetched independently of canvas loads; they never
    /// touch the editor.
    fn request_preview(&mut self, entry: &SchemeEntry) {
        self.previews.insert(entry.id, Preview::Pending);
        let tx = self.preview_tx.clone();
        let (id, source) = (entry.id, entry.source());
        rayon::spawn(move || {
            let result = fetch_pattern(&source)
                .map(|steps| render_preview(&merge_steps(&steps), PREVIEW_SIZE, PREVIEW_PADDING))
                .map_err(|e| e.to_string());
            let _ = tx.send((id, result));
        });
    }

    fn poll_previews(&mut self, ctx: &egui::Context) {
        while let Ok((id, result)) = self.preview_rx.try_recv() {
            let preview = match result {
                Ok(img) => {
                    let size = [img.width() as usize, img.height() as usize];
                    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw());
                    let tex = ctx.load_texture(format!("scheme_preview_{}", id), color_image, egui::TextureOptions::LINEAR);
                    Preview::Ready(tex)
                }
                Err(e) => {
                    log_warn!("Scheme preview failed: {}", e);
                    Preview::Failed
                }
            };
            self.previews.insert(id, preview);
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, schemes: &[SchemeEntry], loading: bool) -> SchemesOutput {
        let mut out = SchemesOutput::default();
        self.poll_previews(ui.ctx());
        self.previews.retain(|id, _| schemes.iter().any(|s| s.id == *id));

        ui.label(RichText::new("AVAILABLE SCHEMES").small().strong().weak());
        ui.add_space(4.0);

        egui::ScrollArea::vertical()
            .id_source("scheme_list")
            .max_height((ui.available_height() - 40.0).max(PREVIEW_SIZE as f32))
            .show(ui, |ui| {
                for entry in schemes {
                    if !self.previews.contains_key(&entry.id) {
                        self.request_preview(entry);
                    }
                    let resp = ui
                        .add_enabled_ui(!loading, |ui| self.scheme_row(ui, entry))
                        .inner;
                    if resp.clicked() {
                        self.confirm = Some(entry.clone());
                    }
                    resp.context_menu(|ui| {
                        if ui.button("Remove from list").clicked() {
                            out.removed = Some(entry.id);
                            ui.close_menu();
                        }
                    });
                }
            });

        ui.add_space(4.0);
        if ui.add_enabled(!loading, egui::Button::new("Open pattern…")).clicked()
            && let Some(path) = rfd::FileDialog::new()
                .add_filter("Pattern JSON", &["json"])
                .pick_file()
        {
            let entry = SchemeEntry::from_path(&path);
            self.confirm = Some(entry.clone());
            out.added = Some(entry);
        }
        if loading {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(RichText::new("Loading…").small());
            });
        }

        if let Some(entry) = self.show_confirm(ui.ctx()) {
            out.load = Some(entry);
        }
        out
    }

    fn scheme_row(&self, ui: &mut egui::Ui, entry: &SchemeEntry) -> egui::Response {
        let frame = egui::Frame::group(ui.style()).inner_margin(6.0);
        let inner = frame.show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label(RichText::new(&entry.name).strong());
                    ui.label(RichText::new(".json").small().italics().weak());
                });
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let size = Vec2::splat(PREVIEW_SIZE as f32);
                    match self.previews.get(&entry.id) {
                        Some(Preview::Ready(tex)) => {
                            let sized = egui::load::SizedTexture::from_handle(tex);
                            ui.add(egui::Image::from_texture(sized).fit_to_exact_size(size));
                        }
                        Some(Preview::Failed) => {
                            ui.allocate_ui(size, |ui| ui.label(RichText::new("no preview").small().weak()));
                        }
                        _ => {
                            ui.allocate_ui(size, |ui| ui.spinner());
                        }
                    }
                });
            });
        });
        inner
            .response
            .interact(egui::Sense::click())
            .on_hover_text(entry.url.as_str())
    }

    /// Returns the entry once the user confirms.
    fn show_confirm(&mut self, ctx: &egui::Context) -> Option<SchemeEntry> {
        let entry = self.confirm.as_ref()?;
        let mut decision = None;
        egui::Window::new("confirm_scheme_load")
            .title_bar(false)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(300.0);
                ui.label(format!("Load \"{}\"? The current drawing will be replaced.", entry.name));
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Load").clicked() {
                        decision = Some(true);
                    }
                    if ui.button("Cancel").clicked() {
                        decision = Some(false);
                    }
                });
            });
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            decision = Some(false);
        }
        match decision {
            Some(true) => self.confirm.take(),
            Some(false) => {
                self.confirm = None;
                None
            }
            None => None,
        }
    }
}
