//! Character-grid rendering of the dependency graph.

pub mod glyph;
pub mod grid;
pub mod scene;

pub use glyph::CellGlyph;
pub use grid::Grid;
pub use scene::{card_origin, status_color, Scene, SPINNER_FRAMES};
