//! Log streaming actor: polls a resource's latest log and pushes batches of
//! new lines to the message loop.
//!
//! Each poll is diffed against what was already delivered. Content that
//! extends the delivered text becomes an append; content from a different
//! operation (or a rewritten log) replaces the buffer outright, headed by a
//! separator line when the operation changed. Only complete lines are
//! delivered; a trailing partial line is held back until its newline shows
//! up or the same snapshot is seen twice. A partial line shown that way is
//! amended in place once it grows.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::LogStreamSettings;
use crate::source::{LogSnapshot, LogSource};
use crate::tea::Message;
use crate::util::with_timeout;

use super::ActorHandle;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Change to apply to a detail view's log buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogUpdate {
    Append(Vec<String>),
    /// Rewrite the last buffered line, then append `lines`.
    Amend {
        last: String,
        lines: Vec<String>,
    },
    Replace {
        operation_id: String,
        lines: Vec<String>,
    },
}

impl LogUpdate {
    pub fn line_count(&self) -> usize {
        match self {
            Self::Append(lines) | Self::Replace { lines, .. } => lines.len(),
            Self::Amend { lines, .. } => lines.len() + 1,
        }
    }
}

/// Everything the stream reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// A fetch succeeded (first time, or after failures).
    Connected,
    /// The resource has no log yet.
    NoLog,
    Update(LogUpdate),
    Retrying {
        attempt: u32,
        max: u32,
        error: String,
    },
    /// Retries exhausted; the stream has stopped.
    Failed(String),
}

pub fn separator(operation_id: &str) -> String {
    format!("──────── operation {operation_id} ────────")
}

/// Remembers what has been delivered for the current operation.
#[derive(Debug, Default)]
pub struct LogDiffer {
    operation_id: Option<String>,
    delivered: String,
    last_seen: Option<String>,
}

impl LogDiffer {
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    pub fn diff(&mut self, snapshot: LogSnapshot) -> Option<LogUpdate> {
        let LogSnapshot {
            operation_id,
            content,
        } = snapshot;
        let stable = self.last_seen.as_deref() == Some(content.as_str());
        let ready = if stable {
            content.as_str()
        } else {
            complete_lines(&content)
        };

        let update = if self.operation_id.as_deref() != Some(operation_id.as_str()) {
            let mut lines = vec![separator(&operation_id)];
            lines.extend(split_lines(ready));
            self.operation_id = Some(operation_id.clone());
            self.delivered = ready.to_string();
            Some(LogUpdate::Replace {
                operation_id,
                lines,
            })
        } else if let Some(rest) = ready.strip_prefix(self.delivered.as_str()) {
            let shown_partial = self.delivered.rsplit('\n').next().filter(|p| !p.is_empty());
            let update = match shown_partial {
                Some(partial) if !rest.is_empty() && !rest.starts_with('\n') => {
                    let (head, tail) = rest.split_once('\n').unwrap_or((rest, ""));
                    Some(LogUpdate::Amend {
                        last: format!("{partial}{head}").trim_end_matches('\r').to_string(),
                        lines: split_lines(tail),
                    })
                }
                // The partial line's newline is not a new line.
                Some(_) => {
                    let lines = split_lines(rest.strip_prefix('\n').unwrap_or(rest));
                    (!lines.is_empty()).then_some(LogUpdate::Append(lines))
                }
                None => {
                    let lines = split_lines(rest);
                    (!lines.is_empty()).then_some(LogUpdate::Append(lines))
                }
            };
            self.delivered = ready.to_string();
            update
        } else if self.delivered.starts_with(ready) {
            // Held-back partial line, nothing new.
            None
        } else {
            self.delivered = ready.to_string();
            Some(LogUpdate::Replace {
                operation_id,
                lines: split_lines(ready),
            })
        };

        self.last_seen = Some(content);
        update
    }
}

fn complete_lines(content: &str) -> &str {
    match content.rfind('\n') {
        Some(idx) => &content[..=idx],
        None => "",
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(|l| l.trim_end_matches('\r').to_string()).collect()
}

/// Leading part of a drained update that must stay first.
enum Head {
    Plain,
    Amend(String),
    Replace(String),
}

/// Apply an amendment to pending lines. Returns it back when there is no
/// pending line to rewrite, so it must travel as an amend itself.
fn amend_last(lines: &mut Vec<String>, amended: Option<String>) -> Option<String> {
    let last = amended?;
    match lines.last_mut() {
        Some(line) => {
            *line = last;
            None
        }
        None => Some(last),
    }
}

/// Pending lines waiting for the next flush.
#[derive(Debug, Default)]
pub struct LogBatch {
    pending: Option<LogUpdate>,
}

impl LogBatch {
    pub fn push(&mut self, update: LogUpdate) {
        let (amended, more) = match update {
            replace @ LogUpdate::Replace { .. } => {
                self.pending = Some(replace);
                return;
            }
            LogUpdate::Append(more) => (None, more),
            LogUpdate::Amend { last, lines } => (Some(last), lines),
        };
        self.pending = Some(match self.pending.take() {
            None => match amended {
                Some(last) => LogUpdate::Amend { last, lines: more },
                None => LogUpdate::Append(more),
            },
            Some(LogUpdate::Append(mut lines)) => match amend_last(&mut lines, amended) {
                Some(last) => LogUpdate::Amend { last, lines: more },
                None => {
                    lines.extend(more);
                    LogUpdate::Append(lines)
                }
            },
            Some(LogUpdate::Replace {
                operation_id,
                mut lines,
            }) => {
                if let Some(last) = amended {
                    match lines.last_mut() {
                        Some(line) => *line = last,
                        None => lines.push(last),
                    }
                }
                lines.extend(more);
                LogUpdate::Replace {
                    operation_id,
                    lines,
                }
            }
            Some(LogUpdate::Amend { mut last, mut lines }) => {
                if let Some(newer) = amend_last(&mut lines, amended) {
                    last = newer;
                }
                lines.extend(more);
                LogUpdate::Amend { last, lines }
            }
        });
    }

    pub fn len(&self) -> usize {
        self.pending.as_ref().map_or(0, LogUpdate::line_count)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }

    /// Drain into updates of at most `max_lines` lines each. A replace
    /// stays first; the remainder follows as appends.
    pub fn drain(&mut self, max_lines: usize) -> Vec<LogUpdate> {
        let max_lines = max_lines.max(1);
        let Some(update) = self.pending.take() else {
            return Vec::new();
        };
        let (head, lines) = match update {
            LogUpdate::Append(lines) => (Head::Plain, lines),
            LogUpdate::Amend { last, lines } => (Head::Amend(last), lines),
            LogUpdate::Replace {
                operation_id,
                lines,
            } => (Head::Replace(operation_id), lines),
        };

        let mut chunks: Vec<Vec<String>> = lines.chunks(max_lines).map(<[String]>::to_vec).collect();
        if chunks.is_empty() {
            chunks.push(Vec::new());
        }
        let mut head = Some(head);
        let mut out = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match head.take() {
                Some(Head::Replace(operation_id)) => out.push(LogUpdate::Replace {
                    operation_id,
                    lines: chunk,
                }),
                Some(Head::Amend(last)) => out.push(LogUpdate::Amend { last, lines: chunk }),
                _ if chunk.is_empty() => {}
                _ => out.push(LogUpdate::Append(chunk)),
            }
        }
        out
    }
}

pub struct LogStreamActor {
    msg_tx: mpsc::UnboundedSender<Message>,
    source: Arc<dyn LogSource>,
    resource_id: String,
    generation: u64,
    settings: LogStreamSettings,
}

impl LogStreamActor {
    pub fn new(
        msg_tx: mpsc::UnboundedSender<Message>,
        source: Arc<dyn LogSource>,
        resource_id: impl Into<String>,
        generation: u64,
        settings: LogStreamSettings,
    ) -> Self {
        Self {
            msg_tx,
            source,
            resource_id: resource_id.into(),
            generation,
            settings,
        }
    }

    fn emit(&self, event: LogEvent) -> bool {
        self.msg_tx
            .send(Message::Log {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    fn flush(&self, batch: &mut LogBatch) -> bool {
        batch
            .drain(self.settings.batch_lines)
            .into_iter()
            .all(|update| self.emit(LogEvent::Update(update)))
    }

    pub fn spawn(self) -> ActorHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        debug!(resource = %self.resource_id, generation = self.generation, "LogStreamActor::spawn");

        tokio::spawn(async move {
            let settings = self.settings;
            let mut poll = tokio::time::interval(settings.poll_interval);
            poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut flush = tokio::time::interval(settings.flush_interval);
            flush.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut differ = LogDiffer::default();
            let mut batch = LogBatch::default();
            let mut failures: u32 = 0;
            let mut connected = false;
            let mut reported_empty = false;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!(resource = %self.resource_id, "LogStreamActor cancelled");
                        break;
                    }
                    _ = flush.tick() => {
                        if !batch.is_empty() && !self.flush(&mut batch) {
                            break;
                        }
                    }
                    _ = poll.tick() => {
                        let fetched = tokio::select! {
                            biased;
                            _ = token.cancelled() => {
                                debug!(resource = %self.resource_id, "LogStreamActor cancelled mid-fetch");
                                break;
                            }
                            fetched = with_timeout(FETCH_TIMEOUT, self.source.latest_log(&self.resource_id)) => fetched,
                        };
                        match fetched {
                            Ok(snapshot) => {
                                if !connected && !self.emit(LogEvent::Connected) {
                                    break;
                                }
                                connected = true;
                                failures = 0;
                                match snapshot {
                                    Some(snapshot) => {
                                        if let Some(update) = differ.diff(snapshot) {
                                            trace!(lines = update.line_count(), "log diff");
                                            batch.push(update);
                                        }
                                        if batch.len() >= settings.batch_lines && !self.flush(&mut batch) {
                                            break;
                                        }
                                    }
                                    None if !reported_empty => {
                                        reported_empty = true;
                                        if !self.emit(LogEvent::NoLog) {
                                            break;
                                        }
                                    }
                                    None => {}
                                }
                            }
                            Err(e) => {
                                connected = false;
                                failures += 1;
                                if failures > settings.max_retries {
                                    warn!(resource = %self.resource_id, error = %e, "log stream giving up");
                                    self.flush(&mut batch);
                                    self.emit(LogEvent::Failed(e.to_string()));
                                    break;
                                }
                                warn!(
                                    resource = %self.resource_id,
                                    attempt = failures,
                                    max = settings.max_retries,
                                    error = %e,
                                    "log fetch failed, retrying"
                                );
                                let retrying = LogEvent::Retrying {
                                    attempt: failures,
                                    max: settings.max_retries,
                                    error: e.to_string(),
                                };
                                if !self.emit(retrying) {
                                    break;
                                }
                                tokio::select! {
                                    _ = token.cancelled() => break,
                                    _ = tokio::time::sleep(settings.retry_delay) => {}
                                }
                                poll.reset_immediately();
                            }
                        }
                    }
                }
            }
        });

        ActorHandle::new(cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Bundle, BundleSource};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn snap(op: &str, content: &str) -> LogSnapshot {
        LogSnapshot {
            operation_id: op.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_first_snapshot_replaces_with_separator() {
        let mut differ = LogDiffer::default();
        let update = differ.diff(snap("op-1", "a\nb\n")).unwrap();
        assert_eq!(
            update,
            LogUpdate::Replace {
                operation_id: "op-1".into(),
                lines: vec![separator("op-1"), "a".into(), "b".into()],
            }
        );
    }

    #[test]
    fn test_growth_appends_only_new_lines() {
        let mut differ = LogDiffer::default();
        differ.diff(snap("op-1", "a\n"));
        assert_eq!(
            differ.diff(snap("op-1", "a\nb\nc\n")),
            Some(LogUpdate::Append(vec!["b".into(), "c".into()]))
        );
        assert_eq!(differ.diff(snap("op-1", "a\nb\nc\n")), None);
    }

    #[test]
    fn test_operation_change_drops_old_lines() {
        let mut differ = LogDiffer::default();
        differ.diff(snap("X", "x1\nx2\n"));
        let update = differ.diff(snap("Y", "y1\n")).unwrap();
        let LogUpdate::Replace { operation_id, lines } = update else {
            panic!("expected replace");
        };
        assert_eq!(operation_id, "Y");
        assert_eq!(lines, vec![separator("Y"), "y1".to_string()]);
        assert_eq!(differ.operation_id(), Some("Y"));
    }

    #[test]
    fn test_partial_line_held_until_stable() {
        let mut differ = LogDiffer::default();
        differ.diff(snap("op", "a\npart"));
        // Partial line completes.
        assert_eq!(
            differ.diff(snap("op", "a\npartial\n")),
            Some(LogUpdate::Append(vec!["partial".into()]))
        );
        // A trailing partial line seen twice is flushed.
        assert_eq!(differ.diff(snap("op", "a\npartial\nend")), None);
        assert_eq!(
            differ.diff(snap("op", "a\npartial\nend")),
            Some(LogUpdate::Append(vec!["end".into()]))
        );
    }

    #[test]
    fn test_grown_partial_line_amended_in_place() {
        let mut differ = LogDiffer::default();
        differ.diff(snap("op", "a\npart"));
        assert_eq!(
            differ.diff(snap("op", "a\npart")),
            Some(LogUpdate::Append(vec!["part".into()]))
        );
        assert_eq!(
            differ.diff(snap("op", "a\npartial\n")),
            Some(LogUpdate::Amend {
                last: "partial".into(),
                lines: vec![],
            })
        );
        assert_eq!(
            differ.diff(snap("op", "a\npartial\nb\n")),
            Some(LogUpdate::Append(vec!["b".into()]))
        );
    }

    #[test]
    fn test_flushed_partial_amended_with_following_lines() {
        let mut differ = LogDiffer::default();
        differ.diff(snap("op", "10%"));
        differ.diff(snap("op", "10%"));
        assert_eq!(
            differ.diff(snap("op", "10% 50% 100%\ndone\n")),
            Some(LogUpdate::Amend {
                last: "10% 50% 100%".into(),
                lines: vec!["done".into()],
            })
        );
    }

    #[test]
    fn test_rewritten_log_same_operation_replaces_without_separator() {
        let mut differ = LogDiffer::default();
        differ.diff(snap("op", "a\nb\n"));
        assert_eq!(
            differ.diff(snap("op", "z\n")),
            Some(LogUpdate::Replace {
                operation_id: "op".into(),
                lines: vec!["z".into()],
            })
        );
    }

    #[test]
    fn test_batch_merges_and_chunks() {
        let mut batch = LogBatch::default();
        batch.push(LogUpdate::Append(vec!["a".into()]));
        batch.push(LogUpdate::Replace {
            operation_id: "op".into(),
            lines: vec!["s".into()],
        });
        batch.push(LogUpdate::Append(vec!["b".into(), "c".into()]));
        assert_eq!(batch.len(), 3);

        let drained = batch.drain(2);
        assert_eq!(
            drained,
            vec![
                LogUpdate::Replace {
                    operation_id: "op".into(),
                    lines: vec!["s".into(), "b".into()],
                },
                LogUpdate::Append(vec!["c".into()]),
            ]
        );
        assert!(batch.is_empty());
        assert!(batch.drain(2).is_empty());
    }

    #[test]
    fn test_batch_folds_amend_into_pending_lines() {
        let mut batch = LogBatch::default();
        batch.push(LogUpdate::Append(vec!["a".into(), "part".into()]));
        batch.push(LogUpdate::Amend {
            last: "partial".into(),
            lines: vec!["b".into()],
        });
        assert_eq!(
            batch.drain(10),
            vec![LogUpdate::Append(vec!["a".into(), "partial".into(), "b".into()])]
        );

        batch.push(LogUpdate::Amend {
            last: "x".into(),
            lines: vec!["1".into(), "2".into(), "3".into()],
        });
        assert_eq!(batch.len(), 4);
        assert_eq!(
            batch.drain(2),
            vec![
                LogUpdate::Amend {
                    last: "x".into(),
                    lines: vec!["1".into(), "2".into()],
                },
                LogUpdate::Append(vec!["3".into()]),
            ]
        );
    }

    fn fast_settings() -> LogStreamSettings {
        LogStreamSettings {
            poll_interval: Duration::from_millis(20),
            max_retries: 2,
            retry_delay: Duration::from_millis(5),
            flush_interval: Duration::from_millis(10),
            batch_lines: 100,
        }
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<Message>) -> LogEvent {
        let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for log event")
            .expect("channel closed");
        match msg {
            Message::Log { event, .. } => event,
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_delivers_replace_then_append() {
        let mut bundle = Bundle::default();
        bundle.logs.insert("r1".into(), snap("op-1", "one\n"));
        let source = Arc::new(BundleSource::in_memory(bundle));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = LogStreamActor::new(tx, source.clone(), "r1", 7, fast_settings()).spawn();

        assert_eq!(next_event(&mut rx).await, LogEvent::Connected);
        assert!(matches!(
            next_event(&mut rx).await,
            LogEvent::Update(LogUpdate::Replace { .. })
        ));

        source
            .update(|b| {
                b.logs.insert("r1".into(), snap("op-1", "one\ntwo\n"));
            })
            .await;
        assert_eq!(
            next_event(&mut rx).await,
            LogEvent::Update(LogUpdate::Append(vec!["two".into()]))
        );
        handle.shutdown();
    }

    struct Broken {
        calls: AtomicU32,
    }

    #[async_trait]
    impl LogSource for Broken {
        async fn latest_log(&self, _resource_id: &str) -> Result<Option<LogSnapshot>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Source("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_stream_retries_then_fails() {
        let source = Arc::new(Broken {
            calls: AtomicU32::new(0),
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = LogStreamActor::new(tx, source.clone(), "r1", 1, fast_settings()).spawn();

        for attempt in 1..=2 {
            assert!(matches!(
                next_event(&mut rx).await,
                LogEvent::Retrying { attempt: a, max: 2, .. } if a == attempt
            ));
        }
        assert!(matches!(next_event(&mut rx).await, LogEvent::Failed(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        // The task exits after failing, dropping its sender.
        assert!(tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_cancel_stops_stream() {
        let source = Arc::new(BundleSource::in_memory(Bundle::default()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = LogStreamActor::new(tx, source, "r1", 1, fast_settings()).spawn();
        assert_eq!(next_event(&mut rx).await, LogEvent::Connected);
        assert_eq!(next_event(&mut rx).await, LogEvent::NoLog);
        handle.shutdown();
        assert!(handle.is_cancelled());
        assert!(tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .is_none());
    }

    struct Slow {
        started: AtomicU32,
        finished: AtomicU32,
    }

    #[async_trait]
    impl LogSource for Slow {
        async fn latest_log(&self, _resource_id: &str) -> Result<Option<LogSnapshot>> {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(8)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(Some(snap("op", "late\n")))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_inflight_fetch() {
        let source = Arc::new(Slow {
            started: AtomicU32::new(0),
            finished: AtomicU32::new(0),
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = LogStreamActor::new(tx, source.clone(), "r1", 1, fast_settings()).spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.started.load(Ordering::SeqCst), 1);
        handle.shutdown();

        let cancelled_at = tokio::time::Instant::now();
        assert!(rx.recv().await.is_none(), "no message may follow cancellation");
        assert!(cancelled_at.elapsed() < Duration::from_secs(1));
        assert_eq!(source.started.load(Ordering::SeqCst), 1);
        assert_eq!(source.finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_size_threshold_flushes_without_waiting() {
        let mut bundle = Bundle::default();
        bundle.logs.insert("r1".into(), snap("op", "1\n2\n3\n4\n5\n"));
        let source = Arc::new(BundleSource::in_memory(bundle));
        let settings = LogStreamSettings {
            flush_interval: Duration::from_secs(3600),
            batch_lines: 2,
            ..fast_settings()
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = LogStreamActor::new(tx, source, "r1", 1, settings).spawn();

        assert_eq!(next_event(&mut rx).await, LogEvent::Connected);
        assert_eq!(
            next_event(&mut rx).await,
            LogEvent::Update(LogUpdate::Replace {
                operation_id: "op".into(),
                lines: vec![separator("op"), "1".into()],
            })
        );
        assert_eq!(
            next_event(&mut rx).await,
            LogEvent::Update(LogUpdate::Append(vec!["2".into(), "3".into()]))
        );
        assert_eq!(
            next_event(&mut rx).await,
            LogEvent::Update(LogUpdate::Append(vec!["4".into(), "5".into()]))
        );
        handle.shutdown();
    }

    struct Flaky {
        calls: AtomicU32,
    }

    #[async_trait]
    impl LogSource for Flaky {
        async fn latest_log(&self, _resource_id: &str) -> Result<Option<LogSnapshot>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(Error::Source("connection reset".into()));
            }
            Ok(Some(snap("op", "up\n")))
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let source = Arc::new(Flaky {
            calls: AtomicU32::new(0),
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = LogStreamActor::new(tx, source.clone(), "r1", 1, fast_settings()).spawn();

        assert!(matches!(
            next_event(&mut rx).await,
            LogEvent::Retrying { attempt: 1, max: 2, .. }
        ));
        assert_eq!(next_event(&mut rx).await, LogEvent::Connected);
        assert!(matches!(
            next_event(&mut rx).await,
            LogEvent::Update(LogUpdate::Replace { .. })
        ));

        // Later polls keep succeeding without reporting failure.
        tokio::time::sleep(Duration::from_millis(100)).await;
        while let Ok(msg) = rx.try_recv() {
            assert!(
                !matches!(msg, Message::Log { event: LogEvent::Failed(_) | LogEvent::Retrying { .. }, .. }),
                "unexpected {msg:?}"
            );
        }
        assert!(source.calls.load(Ordering::SeqCst) >= 3);
        handle.shutdown();
    }
}
