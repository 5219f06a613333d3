//! BrickBead: a paint editor for staggered brick-stitch bead schemes.
//!
//! The editing core (`geometry` through `persist`) has no GUI dependency and
//! is shared by the egui app and the headless CLI renderer.

#[macro_use]
pub mod logger;

pub mod cells;
pub mod cli;
pub mod color;
pub mod editor;
pub mod geometry;
pub mod pattern;
pub mod persist;
pub mod render;
pub mod scheme;
pub mod settings;
pub mod steps;
pub mod view;

pub mod app;
pub mod canvas;
pub mod components;

pub use cells::{EditMode, PaintedCells};
pub use color::{CellColor, ColorMap};
pub use editor::{apply_command, Command, EditorState, Effects};
pub use geometry::CellKey;
pub use steps::StepLayers;
pub use view::ViewTransform;
