use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::graph::{Graph, Layout};
use crate::progress::Progress;
use crate::tea::{DetailState, GraphStatus, Notification};

static VERSION_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn next_version() -> u64 {
    VERSION_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Immutable view of the model handed to the render thread.
///
/// Graph and layout are shared, everything else is a cheap copy taken
/// only when the model is dirty.
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    pub version: u64,
    pub graph: Option<Arc<Graph>>,
    pub layout: Option<Arc<Layout>>,
    pub graph_status: GraphStatus,
    pub progress: BTreeMap<String, Progress>,
    /// False until the first refresh cycle lands; cards show a spinner.
    pub progress_loaded: bool,
    pub selected: Option<String>,
    pub detail: Option<Box<DetailState>>,
    pub notification: Option<Notification>,
    /// Whether the keymap legend is expanded (toggled by '?')
    pub show_keymap: bool,
    pub spinner_frame: usize,
    /// A progress fetch is running.
    pub refreshing: bool,
}

impl RenderState {
    /// Soft problems worth a banner above the canvas.
    pub fn warnings(&self) -> Vec<String> {
        let Some(graph) = &self.graph else {
            return Vec::new();
        };
        let mut warnings = Vec::new();
        if graph.has_cycle {
            warnings.push("dependency cycle detected; cyclic nodes share the last level".to_string());
        }
        warnings.extend(graph.errors.iter().cloned());
        warnings
    }
}
