//! Model for the TEA (The Elm Architecture) pattern.
//!
//! The Model is pure application state - no channels, no handles, no runtime infrastructure.

use std::sync::Arc;

use crate::config::Config;
use crate::graph::{Graph, Layout, Node};
use crate::progress::ProgressAggregator;
use crate::render::{next_version, RenderState};

use super::detail::DetailState;

/// Level of a notification message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Error notification - displayed in red with "Error:" prefix
    Error,
    /// Informational notification - displayed in green
    Info,
}

/// A notification message to display to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Lifecycle of the dependency graph itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GraphStatus {
    #[default]
    Loading,
    Ready,
    /// The graph could not be built at all; the dashboard has nothing to show.
    Failed(String),
}

/// Which screen owns the keyboard.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum View {
    #[default]
    Dashboard,
    Detail(Box<DetailState>),
}

/// Bookkeeping for the periodic dashboard refresh.
///
/// At most one timer is meaningful at a time: `timer` holds the generation
/// of the armed one and any other `RefreshDue` is stale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshState {
    pub in_flight: bool,
    pub timer: Option<u64>,
    /// A refresh was due while a detail view was open.
    pub suspended: bool,
    next: u64,
}

impl RefreshState {
    /// Arm a new timer, invalidating any previous one.
    pub fn arm(&mut self) -> u64 {
        self.next += 1;
        self.timer = Some(self.next);
        self.suspended = false;
        self.next
    }

    /// Consume the armed timer if `generation` matches it.
    pub fn fire(&mut self, generation: u64) -> bool {
        if self.timer == Some(generation) {
            self.timer = None;
            true
        } else {
            false
        }
    }
}

/// Pure application state - the single source of truth.
pub struct Model {
    // Graph
    pub graph: Option<Arc<Graph>>,
    pub layout: Option<Arc<Layout>>,
    pub graph_status: GraphStatus,

    // Progress overlay
    pub progress: ProgressAggregator,
    pub refresh: RefreshState,

    // Navigation
    /// Index into the level-ordered node sequence.
    pub cursor: usize,
    pub view: View,
    next_generation: u64,

    // UI state
    pub notification: Option<Notification>,
    /// Whether the keymap legend is expanded (toggled by '?')
    pub show_keymap: bool,
    pub spinner_frame: usize,
    pub viewport: (u16, u16),

    // Dirty flag - set when state changes and render is needed
    pub dirty: bool,

    // Config (immutable after init)
    pub config: Config,
}

impl Model {
    pub fn new(config: Config) -> Self {
        Self {
            graph: None,
            layout: None,
            graph_status: GraphStatus::Loading,
            progress: ProgressAggregator::default(),
            refresh: RefreshState::default(),
            cursor: 0,
            view: View::Dashboard,
            next_generation: 0,
            notification: None,
            show_keymap: false,
            spinner_frame: 0,
            viewport: (0, 0),
            dirty: true,
            config,
        }
    }

    /// Fresh generation for a detail view and its background work.
    pub fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    pub fn selected_id(&self) -> Option<&str> {
        let layout = self.layout.as_ref()?;
        layout.sequence().get(self.cursor).copied()
    }

    pub fn selected_node(&self) -> Option<&Node> {
        let id = self.selected_id()?;
        self.graph.as_ref()?.node(id)
    }

    pub fn detail(&self) -> Option<&DetailState> {
        match &self.view {
            View::Detail(detail) => Some(detail),
            View::Dashboard => None,
        }
    }

    pub fn detail_mut(&mut self) -> Option<&mut DetailState> {
        match &mut self.view {
            View::Detail(detail) => Some(detail),
            View::Dashboard => None,
        }
    }

    /// Detail view for `generation`, if it is still the open one.
    pub fn detail_for(&mut self, generation: u64) -> Option<&mut DetailState> {
        self.detail_mut().filter(|d| d.generation == generation)
    }

    /// Rows available to a detail pane body.
    pub fn page_size(&self) -> usize {
        usize::from(self.viewport.1).saturating_sub(8).max(1)
    }

    /// Whether a spinner is visible and needs animation frames.
    pub fn is_loading(&self) -> bool {
        match &self.view {
            View::Detail(detail) => detail.is_loading(),
            View::Dashboard => {
                self.graph_status == GraphStatus::Loading
                    || (self.graph.is_some() && !self.progress.is_loaded())
            }
        }
    }

    /// Create an immutable snapshot for the render thread.
    ///
    /// Each snapshot gets a monotonically increasing version number so the
    /// render thread can skip redundant draws.
    pub fn snapshot(&self) -> RenderState {
        RenderState {
            version: next_version(),
            graph: self.graph.clone(),
            layout: self.layout.clone(),
            graph_status: self.graph_status.clone(),
            progress: self.progress.merged().clone(),
            progress_loaded: self.progress.is_loaded(),
            selected: self.selected_id().map(str::to_string),
            detail: self.detail().cloned().map(Box::new),
            notification: self.notification.clone(),
            show_keymap: self.show_keymap,
            spinner_frame: self.spinner_frame,
            refreshing: self.refresh.in_flight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_timer_generations() {
        let mut refresh = RefreshState::default();
        let first = refresh.arm();
        let second = refresh.arm();
        assert_ne!(first, second);
        assert!(!refresh.fire(first));
        assert!(refresh.fire(second));
        assert!(!refresh.fire(second));
    }

    #[test]
    fn test_arm_clears_suspension() {
        let mut refresh = RefreshState {
            suspended: true,
            ..RefreshState::default()
        };
        refresh.arm();
        assert!(!refresh.suspended);
    }

    #[test]
    fn test_new_model_is_loading() {
        let model = Model::new(Config::default());
        assert_eq!(model.graph_status, GraphStatus::Loading);
        assert!(model.is_loading());
        assert!(model.selected_node().is_none());
        assert!(model.dirty);
    }

    #[test]
    fn test_generations_increase() {
        let mut model = Model::new(Config::default());
        let a = model.next_generation();
        assert!(model.next_generation() > a);
    }
}
