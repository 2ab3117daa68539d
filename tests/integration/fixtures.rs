//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - Building debug bundles (resources, dependencies, feeds, logs)
//! - Driving the update loop against live `Effects` with an in-memory bundle
//! - Synthesising key events

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use depscope::app::Effects;
use depscope::config::Config;
use depscope::graph::ResourceEntity;
use depscope::source::bundle::{Bundle, BundleSource};
use depscope::source::{LogSnapshot, Sources};
use depscope::tea::{update, Command, Message, Model};

/// Upper bound on waiting for one background message. Time is paused in
/// most tests, so this only trips when nothing is scheduled at all.
const RECV_TIMEOUT: Duration = Duration::from_secs(120);

pub fn resource(id: &str, type_tag: &str) -> ResourceEntity {
    ResourceEntity {
        id: id.to_string(),
        name: format!("{id}-name"),
        key: None,
        type_tag: Some(type_tag.to_string()),
    }
}

pub fn event(kind: &str) -> Value {
    json!({"type": kind, "timestamp": "2024-05-01T10:00:00Z"})
}

/// Workflow feed entry for `id` with the given category map.
pub fn workflow_entry(id: &str, categories: Value) -> Value {
    json!({"id": id, "categories": categories})
}

/// Infra record with `ready` of `total` managed resources ready.
pub fn infra_record(id: &str, status: &str, ready: usize, total: u32) -> Value {
    let resources: Vec<Value> = (0..ready)
        .map(|i| json!({"address": format!("res.{i}"), "state": "ready"}))
        .collect();
    json!({
        "id": id,
        "status": status,
        "planned_resources": total,
        "resources": resources,
        "operation_id": format!("op-{id}"),
    })
}

pub fn log(operation_id: &str, content: &str) -> LogSnapshot {
    LogSnapshot {
        operation_id: operation_id.to_string(),
        content: content.to_string(),
    }
}

/// Builder for bundles used across the suite.
#[derive(Default)]
pub struct BundleBuilder {
    bundle: Bundle,
}

impl BundleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(mut self, id: &str, type_tag: &str) -> Self {
        self.bundle.resources.push(resource(id, type_tag));
        self
    }

    /// `id` depends on each of `on`.
    pub fn depends(mut self, id: &str, on: &[&str]) -> Self {
        self.bundle
            .dependencies
            .insert(id.to_string(), on.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn dependency_error(mut self, id: &str, error: &str) -> Self {
        self.bundle
            .dependency_errors
            .insert(id.to_string(), error.to_string());
        self
    }

    pub fn workflow(mut self, entry: Value) -> Self {
        self.bundle.workflow.push(entry);
        self
    }

    pub fn infra(mut self, record: Value) -> Self {
        self.bundle.infra.push(record);
        self
    }

    pub fn log(mut self, id: &str, snapshot: LogSnapshot) -> Self {
        self.bundle.logs.insert(id.to_string(), snapshot);
        self
    }

    pub fn build(self) -> Bundle {
        self.bundle
    }
}

/// Three-level plan: `net` and `dns` feed `cluster`, which feeds `app`.
pub fn plan_bundle() -> BundleBuilder {
    BundleBuilder::new()
        .resource("net", "terraform")
        .resource("dns", "terraform")
        .resource("cluster", "terraform")
        .resource("app", "helm")
        .depends("cluster", &["net", "dns"])
        .depends("app", &["cluster"])
}

pub fn key(code: KeyCode) -> Message {
    Message::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

pub fn char_key(c: char) -> Message {
    key(KeyCode::Char(c))
}

/// Short intervals so paused-time tests advance quickly.
pub fn test_config() -> Config {
    Config {
        refresh_interval_secs: 2,
        detail_refresh_interval_secs: 1,
        log_poll_interval_secs: 1,
        log_flush_interval_ms: 50,
        ..Config::default()
    }
}

/// The update loop wired to real `Effects` over an in-memory bundle.
pub struct Harness {
    pub model: Model,
    pub effects: Effects,
    pub source: Arc<BundleSource>,
    /// Every command emitted by `update`, in order.
    pub commands: Vec<Command>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Harness {
    pub fn new(bundle: Bundle) -> Self {
        let config = test_config();
        let source = Arc::new(BundleSource::in_memory(bundle));
        let (tx, rx) = mpsc::unbounded_channel();
        let effects = Effects::new(&config, Sources::uniform(source.clone()), tx);
        let mut model = Model::new(config);
        update(&mut model, Message::Resize(120, 40));
        Self {
            model,
            effects,
            source,
            commands: Vec::new(),
            rx,
        }
    }

    /// Feed a message through `update` and execute what it asks for.
    pub fn send(&mut self, msg: Message) -> bool {
        let cmds = update(&mut self.model, msg);
        self.commands.extend(cmds.iter().cloned());
        cmds.into_iter().any(|cmd| self.effects.execute(cmd))
    }

    pub async fn next(&mut self) -> Message {
        tokio::time::timeout(RECV_TIMEOUT, self.rx.recv())
            .await
            .expect("timed out waiting for a background message")
            .expect("message channel closed")
    }

    /// Pump background messages through `update` until one matches.
    pub async fn pump_until<F>(&mut self, mut pred: F)
    where
        F: FnMut(&Message) -> bool,
    {
        loop {
            let msg = self.next().await;
            let hit = pred(&msg);
            self.send(msg);
            if hit {
                return;
            }
        }
    }

    /// Load the graph and land the first progress cycle.
    pub async fn start(&mut self) {
        self.effects.execute(Command::LoadGraph);
        self.pump_until(|m| matches!(m, Message::GraphLoaded(_) | Message::GraphFailed(_)))
            .await;
        if self.model.graph.is_some() {
            self.pump_until(|m| matches!(m, Message::ProgressFetched { .. }))
                .await;
        }
    }

    /// Move the dashboard cursor onto `id`.
    pub fn select(&mut self, id: &str) {
        let layout = self.model.layout.as_ref().expect("graph not loaded");
        self.model.cursor = layout
            .sequence()
            .iter()
            .position(|s| *s == id)
            .unwrap_or_else(|| panic!("{id} not in layout"));
    }

    pub fn progress_of(&self, id: &str) -> Option<depscope::progress::Progress> {
        self.model.progress.get(id).copied()
    }
}
