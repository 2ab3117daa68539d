//! Commands for the TEA (The Elm Architecture) pattern.
//!
//! Commands are outputs from the update function - they represent side effects
//! to be executed by the runtime.

use std::time::Duration;

use crate::graph::ResourceIdents;

/// Output commands from the update function.
/// These represent side effects that need to be executed.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Dashboard data
    LoadGraph,
    FetchProgress,
    ScheduleRefresh {
        generation: u64,
        delay: Duration,
    },

    // Detail view data (spawn async tasks)
    FetchDetailProgress {
        generation: u64,
        idents: ResourceIdents,
    },
    ScheduleDetailRefresh {
        generation: u64,
        delay: Duration,
    },
    LoadFileTree {
        generation: u64,
        resource_id: String,
    },
    ReadFile {
        generation: u64,
        resource_id: String,
        path: String,
    },
    LoadOutputs {
        generation: u64,
        resource_id: String,
    },
    LoadHistory {
        generation: u64,
        resource_id: String,
    },

    // Log streaming actor lifecycle
    StartLogStream {
        generation: u64,
        resource_id: String,
    },
    StopLogStream {
        generation: u64,
    },

    // App lifecycle
    Quit,
}
