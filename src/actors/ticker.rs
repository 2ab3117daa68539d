//! Animation ticker for spinners.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::tea::Message;

use super::ActorHandle;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

pub struct TickerActor {
    msg_tx: mpsc::UnboundedSender<Message>,
    interval: Duration,
}

impl TickerActor {
    pub fn new(msg_tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            msg_tx,
            interval: TICK_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn spawn(self) -> ActorHandle {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        debug!("TickerActor::spawn");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel_clone.cancelled() => {
                        debug!("TickerActor cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        if self.msg_tx.send(Message::Tick).is_err() {
                            debug!("TickerActor: message channel closed");
                            break;
                        }
                    }
                }
            }
        });

        ActorHandle::new(cancel)
    }
}
