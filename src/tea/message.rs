//! Messages for the TEA (The Elm Architecture) pattern.
//!
//! Messages are inputs to the update function - they come from external sources
//! like keyboard events, background actors, or command completion callbacks.
//! Anything tied to a detail view carries the view's generation so late
//! results for a view that was already closed can be dropped.

use crossterm::event::KeyEvent;
use serde_json::Value;

use crate::actors::LogEvent;
use crate::graph::Graph;
use crate::progress::{FeedResult, InfraProgressRecord};
use crate::source::{FileEntry, OperationEntry};

/// Input messages to the update function.
#[derive(Debug)]
pub enum Message {
    // Keyboard/terminal events
    Key(KeyEvent),
    Resize(u16, u16),

    // From background actors
    /// Spinner animation frame.
    Tick,
    /// A scheduled dashboard refresh fired.
    RefreshDue {
        generation: u64,
    },
    /// A scheduled detail progress poll fired.
    DetailRefreshDue {
        generation: u64,
    },
    Log {
        generation: u64,
        event: LogEvent,
    },

    // Command completion callbacks
    GraphLoaded(Graph),
    GraphFailed(String),
    /// Both progress feeds came back, each possibly failed on its own.
    ProgressFetched {
        workflow: FeedResult,
        infra: FeedResult,
    },
    DetailProgressFetched {
        generation: u64,
        result: Result<Option<InfraProgressRecord>, String>,
    },
    FileTreeLoaded {
        generation: u64,
        result: Result<Vec<FileEntry>, String>,
    },
    FileContentLoaded {
        generation: u64,
        path: String,
        result: Result<String, String>,
    },
    OutputsLoaded {
        generation: u64,
        result: Result<Value, String>,
    },
    HistoryLoaded {
        generation: u64,
        result: Result<Vec<OperationEntry>, String>,
    },
}
