use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::actors::{ActorHandle, LogStreamActor, RefreshTimer, TickerActor};
use crate::config::{Config, LogStreamSettings};
use crate::graph::{load_graph, GraphBuilder};
use crate::progress::{fetch_record, fetch_tables};
use crate::render::RenderState;
use crate::source::Sources;
use crate::tea::{update, Command, Message, Model};
use crate::util::with_timeout;
use crate::Result;

const MAX_BG_MESSAGES: usize = 50;

/// Upper bound for a single collaborator round trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct LogicThread;

impl LogicThread {
    pub fn run(
        config: Config,
        sources: Sources,
        state_tx: Sender<RenderState>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<()> {
        Runtime::new()?.block_on(Self::run_async(config, sources, state_tx, shutdown))
    }

    async fn run_async(
        config: Config,
        sources: Sources,
        state_tx: Sender<RenderState>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<()> {
        debug!(?sources, refresh = ?config.refresh_interval(), "LogicThread::run_async");

        let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<Message>();
        let mut effects = Effects::new(&config, sources, msg_tx.clone());
        let ticker = TickerActor::new(msg_tx.clone()).spawn();
        let mut model = Model::new(config);

        if let Ok((width, height)) = crossterm::terminal::size() {
            update(&mut model, Message::Resize(width, height));
        }
        effects.execute(Command::LoadGraph);

        send_state(&state_tx, &model);
        let mut esc_filter = EscapeSequenceFilter::new();

        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            // Keyboard input (priority)
            while event::poll(Duration::ZERO)? {
                let msg = match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if let KeyCode::Char(c) = key.code {
                            if esc_filter.filter(c) {
                                continue;
                            }
                        }
                        Message::Key(key)
                    }
                    Event::Resize(width, height) => Message::Resize(width, height),
                    _ => continue,
                };

                if dispatch(&mut model, msg, &mut effects) {
                    shutdown.store(true, Ordering::Relaxed);
                    effects.shutdown();
                    ticker.shutdown();
                    return Ok(());
                }

                if model.dirty {
                    send_state(&state_tx, &model);
                    model.dirty = false;
                }
            }

            // Background messages (bounded)
            for _ in 0..MAX_BG_MESSAGES {
                let Ok(msg) = msg_rx.try_recv() else { break };
                if dispatch(&mut model, msg, &mut effects) {
                    shutdown.store(true, Ordering::Relaxed);
                    effects.shutdown();
                    ticker.shutdown();
                    return Ok(());
                }
            }

            if model.dirty {
                send_state(&state_tx, &model);
                model.dirty = false;
            }

            tokio::time::sleep(Duration::from_micros(500)).await;
        }

        effects.shutdown();
        ticker.shutdown();
        Ok(())
    }
}

/// Run one message through `update` and execute what it asks for.
/// Returns true when the app should quit.
fn dispatch(model: &mut Model, msg: Message, effects: &mut Effects) -> bool {
    update(model, msg)
        .into_iter()
        .any(|cmd| effects.execute(cmd))
}

/// Executes commands: spawns the background work and owns the handles of
/// long-lived per-view actors.
pub struct Effects {
    sources: Sources,
    builder: Arc<GraphBuilder>,
    msg_tx: mpsc::UnboundedSender<Message>,
    timer: RefreshTimer,
    shutdown: CancellationToken,
    log_settings: LogStreamSettings,
    log_streams: HashMap<u64, ActorHandle>,
}

impl Effects {
    pub fn new(config: &Config, sources: Sources, msg_tx: mpsc::UnboundedSender<Message>) -> Self {
        let shutdown = CancellationToken::new();
        Self {
            sources,
            builder: Arc::new(GraphBuilder::new(&config.exclude)),
            timer: RefreshTimer::new(msg_tx.clone(), shutdown.clone()),
            msg_tx,
            shutdown,
            log_settings: config.log_stream_settings(),
            log_streams: HashMap::new(),
        }
    }

    /// Number of log streams currently running.
    pub fn active_streams(&self) -> usize {
        self.log_streams.len()
    }

    /// Execute one command. Returns true for [`Command::Quit`].
    pub fn execute(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::LoadGraph => {
                debug!("Command::LoadGraph");
                let sources = self.sources.clone();
                let builder = self.builder.clone();
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    let result =
                        with_timeout(REQUEST_TIMEOUT, load_graph(sources.catalog.as_ref(), &builder)).await;
                    let msg = match result {
                        Ok(graph) => Message::GraphLoaded(graph),
                        Err(e) => Message::GraphFailed(e.to_string()),
                    };
                    let _ = tx.send(msg);
                });
            }

            Command::FetchProgress => {
                debug!("Command::FetchProgress");
                let sources = self.sources.clone();
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    let fetch = async { Ok(fetch_tables(&sources).await) };
                    let (workflow, infra) = match with_timeout(REQUEST_TIMEOUT, fetch).await {
                        Ok(tables) => tables,
                        Err(e) => (Err(e.to_string()), Err(e.to_string())),
                    };
                    let _ = tx.send(Message::ProgressFetched { workflow, infra });
                });
            }

            Command::ScheduleRefresh { generation, delay } => {
                self.timer.schedule(delay, Message::RefreshDue { generation });
            }

            Command::FetchDetailProgress { generation, idents } => {
                let sources = self.sources.clone();
                self.request(
                    async move { Ok(fetch_record(&sources, &idents).await) },
                    move |result| Message::DetailProgressFetched {
                        generation,
                        result: result.and_then(|inner| inner),
                    },
                );
            }

            Command::ScheduleDetailRefresh { generation, delay } => {
                self.timer
                    .schedule(delay, Message::DetailRefreshDue { generation });
            }

            Command::LoadFileTree {
                generation,
                resource_id,
            } => {
                let exec = self.sources.exec.clone();
                self.request(
                    async move { exec.list_tree(&resource_id).await },
                    move |result| Message::FileTreeLoaded { generation, result },
                );
            }

            Command::ReadFile {
                generation,
                resource_id,
                path,
            } => {
                let exec = self.sources.exec.clone();
                let file = path.clone();
                self.request(
                    async move { exec.read_file(&resource_id, &file).await },
                    move |result| Message::FileContentLoaded {
                        generation,
                        path,
                        result,
                    },
                );
            }

            Command::LoadOutputs {
                generation,
                resource_id,
            } => {
                let detail = self.sources.detail.clone();
                self.request(
                    async move { detail.outputs(&resource_id).await },
                    move |result| Message::OutputsLoaded { generation, result },
                );
            }

            Command::LoadHistory {
                generation,
                resource_id,
            } => {
                let detail = self.sources.detail.clone();
                self.request(
                    async move { detail.history(&resource_id).await },
                    move |result| Message::HistoryLoaded { generation, result },
                );
            }

            Command::StartLogStream {
                generation,
                resource_id,
            } => {
                info!(resource = %resource_id, generation, "Command::StartLogStream");
                let handle = LogStreamActor::new(
                    self.msg_tx.clone(),
                    self.sources.logs.clone(),
                    resource_id,
                    generation,
                    self.log_settings,
                )
                .spawn();
                if let Some(previous) = self.log_streams.insert(generation, handle) {
                    previous.shutdown();
                }
            }

            Command::StopLogStream { generation } => {
                info!(generation, "Command::StopLogStream");
                if let Some(handle) = self.log_streams.remove(&generation) {
                    handle.shutdown();
                }
            }

            Command::Quit => {
                debug!("Command::Quit");
                return true;
            }
        }

        false
    }

    /// Spawn a bounded request whose outcome is wrapped into a message.
    fn request<T, F, M>(&self, fut: F, wrap: M)
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
        M: FnOnce(std::result::Result<T, String>) -> Message + Send + 'static,
    {
        let tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let result = with_timeout(REQUEST_TIMEOUT, fut).await.map_err(|e| {
                warn!(error = %e, "request failed");
                e.to_string()
            });
            let _ = tx.send(wrap(result));
        });
    }

    /// Cancel every actor and pending timer.
    pub fn shutdown(&mut self) {
        debug!(streams = self.log_streams.len(), "Shutting down background work");
        for (_, handle) in self.log_streams.drain() {
            handle.shutdown();
        }
        self.shutdown.cancel();
    }
}

fn send_state(state_tx: &Sender<RenderState>, model: &Model) {
    let _ = state_tx.try_send(model.snapshot());
}

/// Drops the tail of escape sequences that leak through as plain chars.
struct EscapeSequenceFilter {
    len: u8,
    active: bool,
}

impl EscapeSequenceFilter {
    fn new() -> Self {
        Self {
            len: 0,
            active: false,
        }
    }

    fn filter(&mut self, c: char) -> bool {
        if c == '\x1b' || c == '[' || c == 'O' {
            self.active = true;
            self.len = 1;
            return true;
        }
        if self.active {
            self.len += 1;
            if c.is_ascii_alphabetic() || c == '~' || self.len > 10 {
                self.active = false;
            }
            return true;
        }
        false
    }
}
