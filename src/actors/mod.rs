//! Actor system for background tasks.
//!
//! Each actor is an independent tokio task that communicates with the main
//! application via message passing. Actors handle:
//! - Spinner animation ticks (TickerActor)
//! - Per-detail-view log tailing (LogStreamActor)
//! - Delayed refresh messages (RefreshTimer)
//!
//! NOTE: Keyboard input is handled synchronously in the logic thread,
//! not via an actor, for minimum latency.

pub mod log_stream;
pub mod refresh;
pub mod ticker;

use tokio_util::sync::CancellationToken;

pub use log_stream::{LogBatch, LogDiffer, LogEvent, LogStreamActor, LogUpdate};
pub use refresh::RefreshTimer;
pub use ticker::TickerActor;

/// Handle to a running actor, used for graceful shutdown.
#[derive(Debug)]
pub struct ActorHandle {
    cancel: CancellationToken,
}

impl ActorHandle {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Signal the actor to shut down; it exits at its next await point.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
