pub mod config;
pub mod error;
pub mod log;
pub mod util;

// Domain
pub mod canvas;
pub mod graph;
pub mod progress;
pub mod source;

// Decoupled game loop architecture
pub mod actors;
pub mod app;
pub mod render;
pub mod tea;
pub mod ui;

pub use error::{Error, Result};
