//! One-shot timers that deliver a message after a delay.
//!
//! Scheduled refreshes are plain messages tagged with a generation; the
//! update function decides whether the generation is still current, so a
//! timer never needs to be cancelled individually. All timers share the
//! app's shutdown token so none outlive the session.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::tea::Message;

#[derive(Clone)]
pub struct RefreshTimer {
    msg_tx: mpsc::UnboundedSender<Message>,
    shutdown: CancellationToken,
}

impl RefreshTimer {
    pub fn new(msg_tx: mpsc::UnboundedSender<Message>, shutdown: CancellationToken) -> Self {
        Self { msg_tx, shutdown }
    }

    pub fn schedule(&self, delay: Duration, message: Message) {
        let tx = self.msg_tx.clone();
        let token = self.shutdown.child_token();
        trace!(?delay, "RefreshTimer::schedule");
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(message);
                }
            }
        });
    }
}
