// ============================================================================
// BrickBeadApp – eframe application shell
// ============================================================================
//
// Owns the single `EditorState`, the persistent store, the settings and the
// background pattern loader. Every frame: poll the loader, show the panels,
// route canvas input, then persist whatever the frame's commands changed.

use std::time::Duration;

use eframe::egui;

use crate::canvas::BeadCanvas;
use crate::components::palette::PalettePanel;
use crate::components::schemes::SchemesPanel;
use crate::components::step_bar::StepBar;
use crate::editor::{apply_command, Command, EditorState, Effects};
use crate::pattern::{LoadOutcome, PatternLoader};
use crate::persist::{load_snapshot, persist_effects, FileStore, KeyValueStore, MemoryStore};
use crate::render::RenderOptions;
use crate::scheme::SchemeEntry;
use crate::settings::AppSettings;
use crate::view::ViewTransform;

pub struct BrickBeadApp {
    pub editor: EditorState,
    store: Box<dyn KeyValueStore>,
    pub settings: AppSettings,
    loader: PatternLoader,
    canvas: BeadCanvas,
    palette: PalettePanel,
    schemes: SchemesPanel,
    step_bar: StepBar,
    /// Last load failure, shown in the status bar until the next load.
    last_error: Option<String>,
}

impl BrickBeadApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let settings = AppSettings::load();
        let path = FileStore::default_path();
        let store: Box<dyn KeyValueStore> = match FileStore::open(&path) {
            Ok(store) => {
                log_info!("Session store: {}", path.display());
                Box::new(store)
            }
            Err(e) => {
                log_err!("Could not open session store, changes will not be kept: {}", e);
                Box::new(MemoryStore::new())
            }
        };
        Self::with_store(store, settings)
    }

    /// Restore the last session from `store`.
    pub fn with_store(store: Box<dyn KeyValueStore>, settings: AppSettings) -> Self {
        let snap = load_snapshot(store.as_ref());
        log_info!(
            "Restored {} beads, brush {}, background {}, mode {}",
            snap.cells.len(),
            snap.brush,
            snap.background,
            snap.mode.as_str()
        );
        let editor = EditorState::restore(
            ViewTransform::new(settings.base_cell_size),
            snap.cells,
            snap.brush,
            snap.background,
            snap.mode,
        );
        Self {
            editor,
            store,
            settings,
            loader: PatternLoader::new(),
            canvas: BeadCanvas::new(),
            palette: PalettePanel::new(),
            schemes: SchemesPanel::new(),
            step_bar: StepBar::new(),
            last_error: None,
        }
    }

    /// Apply one command and persist its effects immediately.
    pub fn apply(&mut self, command: Command) -> Effects {
        let effects = apply_command(&mut self.editor, command);
        persist_effects(self.store.as_mut(), &self.editor, effects);
        effects
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_busy()
    }

    /// Start loading a scheme. Returns `false` while another load runs.
    pub fn request_scheme(&mut self, entry: &SchemeEntry) -> bool {
        self.loader.request(entry.source())
    }

    /// Apply a finished load. Failures leave the canvas untouched.
    pub fn handle_load(&mut self, outcome: LoadOutcome) {
        match outcome.result {
            Ok(steps) => {
                log_info!(
                    "Loaded {} step(s) from {} (copies {}, shift {})",
                    steps.len(),
                    outcome.source,
                    self.settings.copies,
                    self.settings.shift
                );
                self.last_error = None;
                self.apply(Command::LoadPattern {
                    steps,
                    copies: self.settings.copies,
                    shift: self.settings.shift,
                });
            }
            Err(e) => {
                log_err!("Failed to load {}: {}", outcome.source, e);
                self.last_error = Some(format!("Could not load {}: {}", outcome.source, e));
            }
        }
    }

    /// Block until the in-flight load (if any) finishes and apply it.
    pub fn finish_loading(&mut self, timeout: Duration) -> bool {
        match self.loader.wait(timeout) {
            Some(outcome) => {
                self.handle_load(outcome);
                true
            }
            None => false,
        }
    }

    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            show_empty_slots: self.settings.show_empty_slots,
            ..RenderOptions::default()
        }
    }
}

impl eframe::App for BrickBeadApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Poll background pattern load ---
        if let Some(outcome) = self.loader.poll() {
            self.handle_load(outcome);
        }
        if self.loader.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        // --- Left: palette ---
        let palette_out = egui::SidePanel::left("palette")
            .resizable(false)
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.add_space(6.0);
                self.palette.show(ui, &self.editor, &mut self.settings)
            })
            .inner;
        for command in palette_out.commands {
            self.apply(command);
        }
        if palette_out.settings_changed {
            self.settings.save();
        }

        // --- Right: scheme list ---
        let loading = self.loader.is_busy();
        let schemes_out = egui::SidePanel::right("schemes")
            .resizable(false)
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.add_space(6.0);
                self.schemes.show(ui, &self.settings.schemes, loading)
            })
            .inner;
        if let Some(entry) = schemes_out.added {
            self.settings.schemes.push(entry);
            self.settings.save();
        }
        if let Some(id) = schemes_out.removed {
            self.settings.schemes.retain(|s| s.id != id);
            self.settings.save();
        }
        if let Some(entry) = schemes_out.load {
            self.request_scheme(&entry);
        }

        // --- Bottom: steps + status ---
        let viewport = self.canvas.viewport();
        let step_command = egui::TopBottomPanel::bottom("step_bar")
            .show(ctx, |ui| {
                let command = self.step_bar.show(ui, &self.editor, viewport);
                if let Some(source) = self.loader.pending_source() {
                    ui.label(egui::RichText::new(format!("Loading {}…", source)).small().weak());
                }
                if let Some(err) = &self.last_error {
                    ui.colored_label(ui.visuals().error_fg_color, err.as_str());
                }
                command
            })
            .inner;
        if let Some(command) = step_command {
            self.apply(command);
        }

        // --- Canvas fills the rest ---
        let options = self.render_options();
        let modal = self.schemes.is_modal_open();
        let effects = egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.canvas.show(ui, &mut self.editor, &options, modal))
            .inner;
        persist_effects(self.store.as_mut(), &self.editor, effects);
    }
}
